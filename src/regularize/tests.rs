use std::sync::Arc;

use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Point4, Vector3};

use crate::{
    curve::TrimCurve,
    error::RegularizeError,
    surface::{NurbsSurface, ParametricSurface},
    topology::{FaceId, Topology, VertexId},
};

use super::*;

fn plane(size: f64) -> Arc<dyn ParametricSurface<f64>> {
    Arc::new(NurbsSurface::plane(
        Point3::origin(),
        Vector3::x(),
        Vector3::y(),
        (0., size),
        (0., size),
    ))
}

fn quarter_cylinder() -> Arc<dyn ParametricSurface<f64>> {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    let column = |x: f64, y: f64, weight: f64| {
        vec![
            Point4::new(x * weight, y * weight, 0., weight),
            Point4::new(x * weight, y * weight, weight, weight),
        ]
    };
    Arc::new(
        NurbsSurface::try_new(
            2,
            1,
            vec![0., 0., 0., 1., 1., 1.],
            vec![0., 0., 1., 1.],
            vec![column(1., 0., 1.), column(1., 1., w), column(0., 1., 1.)],
        )
        .unwrap(),
    )
}

fn points(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
    coords.iter().map(|(x, y)| Point2::new(*x, *y)).collect()
}

fn face(coords: &[(f64, f64)], holes: &[&[(f64, f64)]]) -> (Topology<f64>, FaceId) {
    let mut topo = Topology::new();
    let holes = holes.iter().map(|h| points(h)).collect::<Vec<_>>();
    let f = topo
        .add_face_from_polygon(plane(4.), &points(coords), &holes)
        .unwrap();
    (topo, f)
}

fn l_shape() -> (Topology<f64>, FaceId) {
    face(
        &[(0., 0.), (2., 0.), (2., 1.), (1., 1.), (1., 2.), (0., 2.)],
        &[],
    )
}

/// A rectangle with a notch cut from its upper right, the notch corner at (2, 1).
fn notch() -> (Topology<f64>, FaceId) {
    face(
        &[
            (0., 0.),
            (3., 0.),
            (4., 0.),
            (4., 1.),
            (2., 1.),
            (2., 3.),
            (0., 3.),
        ],
        &[],
    )
}

fn vertex_at(topo: &Topology<f64>, x: f64, y: f64) -> VertexId {
    topo.find_vertex(&Point3::new(x, y, 0.), 1e-9).unwrap()
}

#[test]
fn check_path_prefers_the_shorter_walk() {
    // corners at 1 and 4 on a loop of 6
    assert!(check_path(6, &[1, 4], 0, 2));
    assert!(!check_path(6, &[1, 4], 2, 4));
    assert!(check_path(6, &[1, 4], 3, 5));
    // both walks take three edges
    assert!(!check_path(6, &[1, 4], 0, 3));
    assert!(!check_path(6, &[1, 4], 2, 2));
}

#[test]
fn get_path_walks_forward() {
    let (mut topo, f) = l_shape();
    let start = topo.face(f).unwrap().loops()[0].edges()[0];
    let d = vertex_at(&topo, 1., 1.);
    let path = get_path(&topo, f, start, d).unwrap();
    assert_eq!(path.len(), 3);
    assert_eq!(topo.edge(path[2]).unwrap().end(), d);

    let stray = topo.add_vertex(Point3::new(5., 5., 0.));
    assert!(matches!(
        get_path(&topo, f, start, stray),
        Err(RegularizeError::UnreachablePath { .. })
    ));
}

#[test]
fn nearly_straight_vertex_is_no_corner() {
    let slope = 4_f64.to_radians().tan();
    let (topo, f) = face(
        &[(0., 0.), (1., 0.), (2., slope), (2., 2.), (0., 2.)],
        &[],
    );
    let kink = vertex_at(&topo, 1., 0.);
    let hints = CornerHints::default();
    let tolerances = Tolerances::default();
    assert!(!is_corner(&topo, f, kink, tolerances.angtol, &hints).unwrap());
    assert!(is_corner(&topo, f, kink, 3_f64.to_radians(), &hints).unwrap());
    assert!(is_corner(&topo, f, kink, 5_f64.to_radians(), &CornerHints::default().with_fixed(vec![kink])).unwrap());

    let corners = corner_vertices(&topo, f, tolerances.angtol, &hints).unwrap();
    assert_eq!(corners.len(), 4);
    assert!(check_regularity(&topo, &corners, f, true, &tolerances).unwrap());

    let in_vec = get_in_vec(&topo, f, kink, tolerances.angtol).unwrap();
    assert!(in_vec.y > 0.99);
}

#[test]
fn corner_classification_is_monotone() {
    let slope = 4_f64.to_radians().tan();
    let (topo, f) = face(
        &[(0., 0.), (1., 0.), (2., slope), (2., 2.), (1., 2.1), (0., 2.)],
        &[],
    );
    let hints = CornerHints::default();
    let counts = (1..=12)
        .map(|deg| {
            corner_vertices(&topo, f, (deg as f64).to_radians(), &hints)
                .unwrap()
                .len()
        })
        .collect::<Vec<_>>();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(counts.first(), Some(&6));
    assert_eq!(counts.last(), Some(&4));
}

#[test]
fn concave_corner_points_into_the_face() {
    let (topo, f) = l_shape();
    let d = vertex_at(&topo, 1., 1.);
    let tolerances = Tolerances::default();
    let in_vec = get_in_vec(&topo, f, d, tolerances.angtol).unwrap();
    let expected = Vector3::new(-1., -1., 0.).normalize();
    assert_relative_eq!(in_vec, expected, epsilon = 1e-10);

    let plane = get_division_plane(&topo, f, d, &tolerances).unwrap();
    assert_relative_eq!(plane.point, Point3::new(1., 1., 0.));
    assert_relative_eq!(plane.normal.dot(&in_vec), 0., epsilon = 1e-12);
    assert_relative_eq!(plane.direction(&Vector3::z()), expected, epsilon = 1e-10);

    let corners = face_corners(&topo, f, tolerances.angtol, &CornerHints::default()).unwrap();
    let concave = corners[0]
        .iter()
        .filter(|c| c.is_concave(tolerances.angtol))
        .collect::<Vec<_>>();
    assert_eq!(concave.len(), 1);
    assert_eq!(concave[0].vertex, d);
    assert_relative_eq!(concave[0].interior_angle(), 1.5 * std::f64::consts::PI, epsilon = 1e-10);
}

#[test]
fn select_cand_vx_is_deterministic() {
    let (topo, f) = l_shape();
    let d = vertex_at(&topo, 1., 1.);
    let a = vertex_at(&topo, 0., 0.);
    let b = vertex_at(&topo, 2., 0.);
    let tolerances = Tolerances::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, tolerances.angtol, &hints).unwrap();
    let in_vec = get_in_vec(&topo, f, d, tolerances.angtol).unwrap();
    let candidates = vec![b, a, a];
    let query = CandidateQuery {
        face: f,
        vertex: d,
        in_vec,
        candidates: &candidates,
        corners: &corners,
        strong: false,
        domain: None,
    };
    let options = CandidateOptions::default();
    let first = select_cand_vx(&topo, &query, &options, &tolerances).unwrap();
    assert_eq!(first, Some(1));
    for _ in 0..4 {
        assert_eq!(
            select_cand_vx(&topo, &query, &options, &tolerances).unwrap(),
            first
        );
    }
}

#[test]
fn opposite_boundary_is_found_when_candidates_fail() {
    let (topo, f) = face(
        &[
            (0., 0.),
            (3., 0.),
            (4., 0.),
            (4., 1.),
            (2., 1.),
            (2., 3.),
            (0., 3.),
        ],
        &[],
    );
    let d = vertex_at(&topo, 2., 1.);
    let tolerances = Tolerances::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, tolerances.angtol, &hints).unwrap();
    assert_eq!(corners.len(), 6);
    let candidates = topo.loop_vertices(f, 0).unwrap();
    let in_vec = get_in_vec(&topo, f, d, tolerances.angtol).unwrap();
    let query = CandidateQuery {
        face: f,
        vertex: d,
        in_vec,
        candidates: &candidates,
        corners: &corners,
        strong: true,
        domain: None,
    };
    let selected =
        select_cand_vx(&topo, &query, &CandidateOptions::default(), &tolerances).unwrap();
    assert_eq!(selected, None);

    let hit = get_opposite_boundary_par(&topo, f, d, &in_vec)
        .unwrap()
        .unwrap();
    assert_eq!(hit.edge, topo.face(f).unwrap().loops()[0].edges()[0]);
    assert_relative_eq!(hit.point, Point3::new(1., 0., 0.), epsilon = 1e-10);
    assert_relative_eq!(hit.parameter, 1. / 3., epsilon = 1e-10);
    assert_relative_eq!(hit.distance, 2_f64.sqrt(), epsilon = 1e-10);
}

#[test]
fn straight_parameter_lines() {
    let mut topo = Topology::new();
    let f = topo
        .add_face_from_polygon(
            quarter_cylinder(),
            &points(&[(0., 0.), (1., 0.), (1., 1.), (0., 1.)]),
            &[],
        )
        .unwrap();
    let find = |x: f64, y: f64, z: f64| topo.find_vertex(&Point3::new(x, y, z), 1e-9).unwrap();
    let (v00, v10, v11) = (find(1., 0., 0.), find(0., 1., 0.), find(0., 1., 1.));

    // along the arc the parameter line bends, along the ruling it does not
    assert!(check_straight_par_cv(&topo, f, v00, v10, 1e-6, 8)
        .unwrap()
        .is_none());
    let ruling = check_straight_par_cv(&topo, f, v10, v11, 1e-6, 8)
        .unwrap()
        .unwrap();
    assert!(ruling.is_straight());

    let surface = quarter_cylinder();
    let curve = build_division_curve(
        surface.as_ref(),
        &Point2::new(0., 0.5),
        &Point2::new(1., 0.5),
        &Tolerances::default(),
        &DivisionOptions::default(),
    )
    .unwrap();
    let DivisionCurve::General(c) = curve else {
        panic!("expected a general curve, got {:?}", curve);
    };
    assert!(c.points().iter().all(|p| (p.y - 0.5).abs() < 1e-6));
    assert_relative_eq!(c.start(), Point2::new(0., 0.5));
    assert_relative_eq!(c.end(), Point2::new(1., 0.5));
}

#[test]
fn closest_boundary_skips_incident_curves() {
    let (topo, f) = face(&[(0., 0.), (3., 0.), (3., 3.), (0., 3.)], &[]);
    let p = Point3::new(1.5, 0.2, 0.);
    let closest = get_closest_boundary_par(&topo, f, None, &p, 1e-6, None)
        .unwrap()
        .unwrap();
    assert_eq!(closest.index, 0);
    assert_relative_eq!(closest.distance, 0.2, epsilon = 1e-8);
    assert_relative_eq!(closest.parameter, 0.5, epsilon = 1e-8);

    let origin = vertex_at(&topo, 0., 0.);
    let inside = Point3::new(1.5, 1.5, 0.);
    let chord = check_straight_par_cv_to_point(&topo, f, origin, &inside, 1e-6, 8)
        .unwrap()
        .unwrap();
    assert_relative_eq!(chord.end(), Point2::new(1.5, 1.5), epsilon = 1e-8);
    let above = Point3::new(1.5, 1.5, 1.);
    assert!(check_straight_par_cv_to_point(&topo, f, origin, &above, 1e-6, 8)
        .unwrap()
        .is_none());

    let closest = get_closest_boundary_par(&topo, f, Some(origin), &p, 1e-6, None)
        .unwrap()
        .unwrap();
    assert_eq!(closest.index, 1);
    assert_relative_eq!(closest.distance, 1.5, epsilon = 1e-8);
}

#[test]
fn regularity_of_simple_faces() {
    let tolerances = Tolerances::default();
    let hints = CornerHints::default();

    let (topo, f) = face(&[(0., 0.), (2., 1.), (0., 2.), (0.5, 1.)], &[]);
    let corners = corner_vertices(&topo, f, tolerances.angtol, &hints).unwrap();
    assert_eq!(corners.len(), 4);
    assert!(!check_regularity(&topo, &corners, f, true, &tolerances).unwrap());
    assert!(check_regularity(&topo, &corners, f, false, &tolerances).unwrap());
    assert_eq!(irregularity(&topo, f, tolerances.angtol, &hints).unwrap(), 1);

    let (topo, f) = l_shape();
    let corners = corner_vertices(&topo, f, tolerances.angtol, &hints).unwrap();
    assert!(!check_regularity(&topo, &corners, f, false, &tolerances).unwrap());
    assert_eq!(irregularity(&topo, f, tolerances.angtol, &hints).unwrap(), 3);

    let hole: &[(f64, f64)] = &[(1., 1.), (1., 2.), (2., 2.), (2., 1.)];
    let (topo, f) = face(&[(0., 0.), (3., 0.), (3., 3.), (0., 3.)], &[hole]);
    assert_eq!(irregularity(&topo, f, tolerances.angtol, &hints).unwrap(), 12);
}

#[test]
fn trim_configuration_checks() {
    let mut topo = Topology::<f64>::new();
    let surface = plane(4.);
    let mut segments_through = |coords: &[(f64, f64)]| {
        let ps = points(coords);
        let vs = ps
            .iter()
            .map(|p| topo.add_vertex(Point3::new(p.x, p.y, 0.)))
            .collect::<Vec<_>>();
        let n = ps.len();
        let segments = (0..n)
            .map(|i| {
                TrimSegment::division(
                    TrimCurve::line(ps[i], ps[(i + 1) % n]),
                    SegmentVertex::Existing(vs[i]),
                    SegmentVertex::Existing(vs[(i + 1) % n]),
                )
            })
            .collect::<Vec<_>>();
        (segments, vs)
    };

    let (square, vs) = segments_through(&[(0., 0.), (1., 0.), (1., 1.), (0., 1.)]);
    let (crossed, ws) = segments_through(&[(0., 0.), (0., 1.), (2., 0.), (2., 2.)]);

    let mut next = vec![];
    let (p0, p2) = (Point3::new(0., 0., 0.), Point3::new(1., 1., 0.));
    check_trim_seg(&topo, surface.as_ref(), &square, &mut next, &p0, &p2, 1e-9).unwrap();
    assert_eq!(
        next,
        vec![SegmentVertex::Existing(vs[1]), SegmentVertex::Existing(vs[3])]
    );

    let sub = SubSurface {
        surface: surface.clone(),
        loops: vec![square.clone()],
    };
    assert!(check_trim_config(&topo, &sub, vs[0], &p2, 1e-9).is_ok());

    let sub = SubSurface {
        surface: surface.clone(),
        loops: vec![crossed],
    };
    assert!(matches!(
        check_trim_config(&topo, &sub, ws[0], &p2, 1e-9),
        Err(RegularizeError::TopologyInconsistency(_))
    ));

    // an open loop
    let open = vec![square[0].clone(), square[1].clone(), square[3].clone()];
    let mut next = vec![];
    assert!(matches!(
        check_trim_seg(&topo, surface.as_ref(), &open, &mut next, &p0, &p2, 1e-9),
        Err(RegularizeError::TopologyInconsistency(_))
    ));
}

#[test]
fn planning_leaves_the_face_untouched() {
    let (topo, f) = l_shape();
    let d = vertex_at(&topo, 1., 1.);
    let a = vertex_at(&topo, 0., 0.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(f, 0).unwrap();
    let request = DivideRequest::new(f, d, &candidates, &corners, &hints);
    let plan = plan_division(&topo, &request, &options).unwrap();

    assert_eq!(plan.target(), &SplitTarget::Vertex(a));
    assert!(matches!(plan.curve(), DivisionCurve::Straight(_)));
    assert_eq!(plan.sub_surfaces().len(), 2);
    assert_eq!(plan.irregularity(options.tolerances.angtol, &hints), 0);
    assert!(topo.face(f).unwrap().is_active());
    assert_eq!(topo.faces().count(), 1);
}

#[test]
fn divide_vertex_splits_l_shape() {
    let (mut topo, f) = l_shape();
    let d = vertex_at(&topo, 1., 1.);
    let a = vertex_at(&topo, 0., 0.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(f, 0).unwrap();
    let request = DivideRequest::new(f, d, &candidates, &corners, &hints);
    let created = divide_vertex(&mut topo, &request, &options).unwrap();

    assert_eq!(created.len(), 2);
    assert!(!topo.face(f).unwrap().is_active());
    assert_eq!(topo.face(f).unwrap().successors(), created.as_slice());
    for c in created.iter() {
        topo.validate_face(*c, 1e-9).unwrap();
        assert_eq!(topo.face(*c).unwrap().parent(), Some(f));
        let corners = corner_vertices(&topo, *c, options.tolerances.angtol, &hints).unwrap();
        assert_eq!(corners.len(), 4);
        assert!(corners.contains(&a) && corners.contains(&d));
        assert!(check_regularity(&topo, &corners, *c, true, &options.tolerances).unwrap());
    }

    let chord = topo.face(created[0]).unwrap().loops()[0]
        .edges()
        .iter()
        .cloned()
        .find(|e| {
            let e = topo.edge(*e).unwrap();
            e.is_incident(a) && e.is_incident(d)
        })
        .unwrap();
    let twin = topo.edge(chord).unwrap().twin().unwrap();
    assert_eq!(topo.edge(twin).unwrap().face(), created[1]);
}

#[test]
fn divide_vertex_on_edge_splits_the_neighbour() {
    let mut topo = Topology::new();
    let surface = plane(5.);
    let l = topo
        .add_face_from_polygon(
            surface.clone(),
            &points(&[
                (0., 1.),
                (3., 1.),
                (4., 1.),
                (4., 2.),
                (2., 2.),
                (2., 4.),
                (0., 4.),
            ]),
            &[],
        )
        .unwrap();
    let below = topo
        .add_face_from_polygon(
            surface,
            &points(&[(0., 0.), (3., 0.), (3., 1.), (0., 1.)]),
            &[],
        )
        .unwrap();
    assert_eq!(topo.connect_shared_edges(1e-9).unwrap(), 1);

    let d = vertex_at(&topo, 2., 2.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, l, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(l, 0).unwrap();
    let request = DivideRequest::new(l, d, &candidates, &corners, &hints);
    let created = divide_vertex(&mut topo, &request, &options).unwrap();
    assert_eq!(created.len(), 2);

    let split_point = vertex_at(&topo, 1., 1.);
    assert_eq!(topo.face(below).unwrap().loops()[0].len(), 5);
    assert!(topo.face(below).unwrap().non_corners().contains(&split_point));
    assert_eq!(topo.faces_at_vertex(split_point).unwrap().len(), 3);
    for c in created.iter() {
        topo.validate_face(*c, 1e-9).unwrap();
    }
    topo.validate_face(below, 1e-9).unwrap();

    // every half of the old shared edge keeps a twin in the face below
    let twinned = created
        .iter()
        .flat_map(|c| topo.face(*c).unwrap().loops()[0].edges().to_vec())
        .filter_map(|e| topo.edge(e).unwrap().twin())
        .filter(|t| topo.edge(*t).unwrap().face() == below)
        .count();
    assert_eq!(twinned, 2);
}

#[test]
fn candidate_domain_excludes_vertices_outside() {
    let (topo, f) = l_shape();
    let d = vertex_at(&topo, 1., 1.);
    let a = vertex_at(&topo, 0., 0.);
    let tolerances = Tolerances::default();
    let corners = corner_vertices(&topo, f, tolerances.angtol, &CornerHints::default()).unwrap();
    let candidates = vec![a];
    let mut query = CandidateQuery {
        face: f,
        vertex: d,
        in_vec: get_in_vec(&topo, f, d, tolerances.angtol).unwrap(),
        candidates: &candidates,
        corners: &corners,
        strong: false,
        domain: Some((Point2::new(0., 0.), Point2::new(2., 2.))),
    };
    let options = CandidateOptions::default();
    assert_eq!(select_cand_vx(&topo, &query, &options, &tolerances).unwrap(), Some(0));

    query.domain = Some((Point2::new(2., 2.), Point2::new(0.5, 0.5)));
    assert_eq!(select_cand_vx(&topo, &query, &options, &tolerances).unwrap(), None);

    // the rectangle is widened by tol2
    query.domain = Some((Point2::new(0.5 * tolerances.tol2, 0.), Point2::new(2., 2.)));
    assert_eq!(select_cand_vx(&topo, &query, &options, &tolerances).unwrap(), Some(0));
}

#[test]
fn strong_selection_widens_the_angle() {
    let (topo, f) = l_shape();
    let d = vertex_at(&topo, 1., 1.);
    let a = vertex_at(&topo, 0., 0.);
    let tolerances = Tolerances::default();
    let corners = corner_vertices(&topo, f, tolerances.angtol, &CornerHints::default()).unwrap();
    let candidates = vec![a];
    // 60 degrees away from the chord towards a
    let heading = 285_f64.to_radians();
    let mut query = CandidateQuery {
        face: f,
        vertex: d,
        in_vec: Vector3::new(heading.cos(), heading.sin(), 0.),
        candidates: &candidates,
        corners: &corners,
        strong: false,
        domain: None,
    };
    let options = CandidateOptions::default();
    assert_eq!(select_cand_vx(&topo, &query, &options, &tolerances).unwrap(), None);
    query.strong = true;
    assert_eq!(select_cand_vx(&topo, &query, &options, &tolerances).unwrap(), Some(0));

    let narrow = options.with_strong_relaxation(1.);
    assert_eq!(select_cand_vx(&topo, &query, &narrow, &tolerances).unwrap(), None);
}

#[test]
fn strong_relaxation_is_capped() {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
    let options = CandidateOptions::<f64>::default();
    assert_relative_eq!(options.max_angle(false), FRAC_PI_4);
    assert_relative_eq!(options.max_angle(true), FRAC_PI_2);

    let wide = options.with_strong_relaxation(4.);
    assert_relative_eq!(wide.max_angle(false), FRAC_PI_4);
    assert_relative_eq!(wide.max_angle(true), 3. * FRAC_PI_4);

    let wider = options.with_max_angle(FRAC_PI_2);
    assert_relative_eq!(wider.max_angle(true), 3. * FRAC_PI_4);
}

#[test]
fn division_pinned_to_an_edge() {
    let (mut topo, f) = notch();
    let d = vertex_at(&topo, 2., 1.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(f, 0).unwrap();
    let bottom = topo.face(f).unwrap().loops()[0].edges()[0];

    let request =
        DivideRequest::new(f, d, &candidates, &corners, &hints).with_candidate_edge(bottom);
    let plan = plan_division(&topo, &request, &options).unwrap();
    let SplitTarget::Boundary(hit) = plan.target() else {
        panic!("expected a boundary target, got {:?}", plan.target());
    };
    assert_eq!(hit.edge, bottom);
    assert_relative_eq!(hit.parameter, 1. / 3., epsilon = 1e-10);

    let created = divide_vertex(&mut topo, &request, &options).unwrap();
    assert_eq!(created.len(), 2);
    let split_point = topo.find_vertex(&Point3::new(1., 0., 0.), 1e-9).unwrap();
    for c in created.iter() {
        topo.validate_face(*c, 1e-9).unwrap();
        assert!(topo.loop_vertices(*c, 0).unwrap().contains(&split_point));
    }
}

#[test]
fn division_pinned_to_an_unreachable_edge_fails() {
    let (mut topo, f) = notch();
    let d = vertex_at(&topo, 2., 1.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(f, 0).unwrap();
    // the left side, which the inward ray from the notch passes below
    let left = topo.face(f).unwrap().loops()[0].edges()[6];

    let request =
        DivideRequest::new(f, d, &candidates, &corners, &hints).with_candidate_edge(left);
    assert!(matches!(
        divide_vertex(&mut topo, &request, &options),
        Err(RegularizeError::ToleranceConflict(_))
    ));
    assert!(topo.face(f).unwrap().is_active());
    assert_eq!(topo.faces().count(), 1);
}

#[test]
fn division_follows_a_given_plane() {
    let (mut topo, f) = notch();
    let d = vertex_at(&topo, 2., 1.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, f, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(f, 0).unwrap();
    // the plane x = 2 instead of the bisecting one
    let plane = DivisionPlane {
        point: Point3::new(2., 1., 0.),
        normal: Vector3::x(),
        in_vec: -Vector3::y(),
    };
    assert_relative_eq!(plane.direction(&Vector3::z()), -Vector3::y());

    let request = DivideRequest::new(f, d, &candidates, &corners, &hints).with_plane(plane);
    let plan = plan_division(&topo, &request, &options).unwrap();
    let SplitTarget::Boundary(hit) = plan.target() else {
        panic!("expected a boundary target, got {:?}", plan.target());
    };
    assert_relative_eq!(hit.point, Point3::new(2., 0., 0.), epsilon = 1e-10);
    assert_relative_eq!(hit.parameter, 2. / 3., epsilon = 1e-10);

    let created = divide_vertex(&mut topo, &request, &options).unwrap();
    assert_eq!(created.len(), 2);
    assert!(topo.find_vertex(&Point3::new(2., 0., 0.), 1e-9).is_some());
    assert!(topo.find_vertex(&Point3::new(1., 0., 0.), 1e-9).is_none());
}

#[test]
fn stale_plan_leaves_the_topology_untouched() {
    let mut topo = Topology::new();
    let surface = plane(5.);
    let l = topo
        .add_face_from_polygon(
            surface.clone(),
            &points(&[
                (0., 1.),
                (3., 1.),
                (4., 1.),
                (4., 2.),
                (2., 2.),
                (2., 4.),
                (0., 4.),
            ]),
            &[],
        )
        .unwrap();
    let below = topo
        .add_face_from_polygon(
            surface,
            &points(&[(0., 0.), (3., 0.), (3., 1.), (0., 1.)]),
            &[],
        )
        .unwrap();
    topo.connect_shared_edges(1e-9).unwrap();

    let d = vertex_at(&topo, 2., 2.);
    let options = RegularizeOptions::default();
    let hints = CornerHints::default();
    let corners = corner_vertices(&topo, l, options.tolerances.angtol, &hints).unwrap();
    let candidates = topo.loop_vertices(l, 0).unwrap();
    let request = DivideRequest::new(l, d, &candidates, &corners, &hints);
    let first = plan_division(&topo, &request, &options).unwrap();
    let second = first.clone();
    commit_division(&mut topo, first).unwrap();

    let vertices = topo.vertices().count();
    let faces = topo.faces().count();
    let below_edges = topo.face(below).unwrap().loops()[0].edges().to_vec();
    let below_non_corners = topo.face(below).unwrap().non_corners().to_vec();
    assert!(matches!(
        commit_division(&mut topo, second),
        Err(RegularizeError::TopologyInconsistency(_))
    ));
    assert_eq!(topo.vertices().count(), vertices);
    assert_eq!(topo.faces().count(), faces);
    assert_eq!(topo.face(below).unwrap().loops()[0].edges(), below_edges.as_slice());
    assert_eq!(topo.face(below).unwrap().non_corners(), below_non_corners.as_slice());
}
