use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Vector3};

use crate::{
    error::RegularizeError,
    surface::{NurbsSurface, ParametricSurface},
};

use super::Topology;

fn plane(size: f64) -> Arc<dyn ParametricSurface<f64>> {
    Arc::new(NurbsSurface::plane(
        Point3::origin(),
        Vector3::x(),
        Vector3::y(),
        (0., size),
        (0., size),
    ))
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

#[test]
fn polygon_face_is_valid() {
    let mut topo = Topology::new();
    let face = topo
        .add_face_from_polygon(plane(3.), &rect(0., 0., 3., 3.), &[])
        .unwrap();
    topo.validate_face(face, 1e-9).unwrap();
    assert_eq!(topo.loop_vertices(face, 0).unwrap().len(), 4);
    assert_eq!(topo.active_faces(), vec![face]);
    let e = topo.face(face).unwrap().loops()[0].edges()[0];
    assert_relative_eq!(topo.edge_length_3d(e, 4).unwrap(), 3.0, epsilon = 1e-10);
}

#[test]
fn wrongly_oriented_loops_are_rejected() {
    let mut topo = Topology::new();
    let mut outer = rect(0., 0., 3., 3.);
    outer.reverse();
    let res = topo.add_face_from_polygon(plane(3.), &outer, &[]);
    assert!(matches!(res, Err(RegularizeError::MalformedLoop(_))));

    // holes have to run clockwise
    let res = topo.add_face_from_polygon(plane(3.), &rect(0., 0., 3., 3.), &[rect(1., 1., 2., 2.)]);
    assert!(matches!(res, Err(RegularizeError::MalformedLoop(_))));
}

#[test]
fn neighbouring_faces_share_vertices_and_twins() {
    let mut topo = Topology::new();
    let surface = plane(2.);
    let f0 = topo
        .add_face_from_polygon(surface.clone(), &rect(0., 0., 1., 1.), &[])
        .unwrap();
    let f1 = topo
        .add_face_from_polygon(surface, &rect(1., 0., 2., 1.), &[])
        .unwrap();
    assert_eq!(topo.vertices().count(), 6);
    assert_eq!(topo.connect_shared_edges(1e-6).unwrap(), 1);

    let shared = topo
        .vertices()
        .find(|(_, v)| (v.position() - Point3::new(1., 0., 0.)).norm() < 1e-9)
        .map(|(id, _)| id)
        .unwrap();
    assert_eq!(topo.faces_at_vertex(shared).unwrap(), vec![f0, f1]);
}

#[test]
fn split_edge_with_twin_keeps_links() {
    let mut topo = Topology::new();
    let surface = plane(2.);
    let f0 = topo
        .add_face_from_polygon(surface.clone(), &rect(0., 0., 1., 1.), &[])
        .unwrap();
    let f1 = topo
        .add_face_from_polygon(surface, &rect(1., 0., 2., 1.), &[])
        .unwrap();
    topo.connect_shared_edges(1e-6).unwrap();

    // the right edge of the first face runs from (1, 0) to (1, 1)
    let edge = topo.face(f0).unwrap().loops()[0].edges()[1];
    let v = topo.add_vertex(Point3::new(1., 0.25, 0.));
    let (a, b) = topo.split_edge_with_twin(edge, 0.25, v).unwrap();

    assert!(topo.edge(edge).is_err());
    assert_eq!(topo.face(f0).unwrap().loops()[0].len(), 5);
    assert_eq!(topo.face(f1).unwrap().loops()[0].len(), 5);
    let ta = topo.edge(a).unwrap().twin().unwrap();
    let tb = topo.edge(b).unwrap().twin().unwrap();
    assert_eq!(topo.edge(ta).unwrap().face(), f1);
    assert_eq!(topo.edge(tb).unwrap().face(), f1);
    topo.validate_face(f0, 1e-9).unwrap();
    topo.validate_face(f1, 1e-6).unwrap();
    assert_relative_eq!(
        topo.vertex_parameter(v, f1).unwrap(),
        Point2::new(1., 0.25),
        epsilon = 1e-6
    );
}

#[test]
fn remove_face_unlinks_twins() {
    let mut topo = Topology::new();
    let surface = plane(2.);
    let f0 = topo
        .add_face_from_polygon(surface.clone(), &rect(0., 0., 1., 1.), &[])
        .unwrap();
    let f1 = topo
        .add_face_from_polygon(surface, &rect(1., 0., 2., 1.), &[])
        .unwrap();
    topo.connect_shared_edges(1e-6).unwrap();
    topo.remove_face(f0).unwrap();
    assert!(topo.face(f0).is_err());
    let twins = topo.face(f1).unwrap().loops()[0]
        .edges()
        .iter()
        .filter(|e| topo.edge(**e).unwrap().twin().is_some())
        .count();
    assert_eq!(twins, 0);
}
