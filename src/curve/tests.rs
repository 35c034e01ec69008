use approx::assert_relative_eq;
use nalgebra::{Point2, Vector2};

use crate::misc::Ray;

use super::TrimCurve;

fn staircase() -> TrimCurve<f64> {
    TrimCurve::try_polyline(&[
        Point2::new(0., 0.),
        Point2::new(1., 0.),
        Point2::new(1., 1.),
        Point2::new(3., 1.),
    ])
    .unwrap()
}

#[test]
fn polyline_is_parametrized_by_length() {
    let curve = staircase();
    assert_relative_eq!(curve.length(), 4.0);
    assert_relative_eq!(curve.point_at(0.25), Point2::new(1., 0.));
    assert_relative_eq!(curve.point_at(0.375), Point2::new(1., 0.5));
    assert_relative_eq!(curve.point_at(1.0), Point2::new(3., 1.));
}

#[test]
fn tangent_uses_outgoing_segment_at_knots() {
    let curve = staircase();
    assert_relative_eq!(curve.tangent_at(0.25), Vector2::new(0., 4.));
    assert_relative_eq!(curve.tangent_at(1.0), Vector2::new(4., 0.));
    assert_relative_eq!(curve.tangent_at(0.0), Vector2::new(4., 0.));
}

#[test]
fn duplicated_points_collapse_to_line() {
    let curve = TrimCurve::try_polyline(&[
        Point2::new(0., 0.),
        Point2::new(0., 0.),
        Point2::new(2., 0.),
    ])
    .unwrap();
    assert!(curve.is_straight());
    assert!(TrimCurve::<f64>::try_polyline(&[Point2::new(1., 1.)]).is_err());
}

#[test]
fn split_keeps_geometry() {
    let curve = staircase();
    let (head, tail) = curve.try_split_at(0.5).unwrap();
    assert_relative_eq!(head.end(), Point2::new(1., 1.));
    assert_relative_eq!(tail.start(), Point2::new(1., 1.));
    assert_relative_eq!(head.length() + tail.length(), curve.length());
    assert_relative_eq!(tail.end(), curve.end());
    assert!(curve.try_split_at(1.0).is_err());
}

#[test]
fn reversed_swaps_ends() {
    let curve = staircase();
    let rev = curve.reversed();
    assert_relative_eq!(rev.start(), curve.end());
    assert_relative_eq!(rev.point_at(0.25), curve.point_at(0.75));
}

#[test]
fn closest_parameter_on_polyline() {
    let curve = staircase();
    let (t, p) = curve.closest_parameter(&Point2::new(2., 2.));
    assert_relative_eq!(p, Point2::new(2., 1.));
    assert_relative_eq!(t, 0.75);
}

#[test]
fn ray_hits_are_sorted() {
    let curve = staircase();
    let ray = Ray::new(Point2::new(0.5, 0.5), Vector2::new(1., 0.));
    let hits = curve.intersect_ray(&ray);
    assert_eq!(hits.len(), 1);
    assert_relative_eq!(hits[0].0, 0.5);
    assert_relative_eq!(hits[0].1, 0.375);

    let ray = Ray::new(Point2::new(2., -1.), Vector2::new(0., 1.));
    let hits = curve.intersect_ray(&ray);
    assert_eq!(hits.len(), 1);
    assert_relative_eq!(hits[0].0, 2.);
}
