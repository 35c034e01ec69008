use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Point4, Vector2, Vector3};

use super::{NurbsSurface, ParametricSurface};

/// Quarter of a unit cylinder around the z axis, u sweeps the arc and v the height.
fn quarter_cylinder() -> NurbsSurface<f64> {
    let w = std::f64::consts::FRAC_1_SQRT_2;
    let column = |x: f64, y: f64, weight: f64| {
        vec![
            Point4::new(x * weight, y * weight, 0., weight),
            Point4::new(x * weight, y * weight, weight, weight),
        ]
    };
    NurbsSurface::try_new(
        2,
        1,
        vec![0., 0., 0., 1., 1., 1.],
        vec![0., 0., 1., 1.],
        vec![column(1., 0., 1.), column(1., 1., w), column(0., 1., 1.)],
    )
    .unwrap()
}

#[test]
fn rational_surface_lies_on_cylinder() {
    let surface = quarter_cylinder();
    for i in 0..=10 {
        let u = i as f64 / 10.;
        let p = surface.point_at(&Point2::new(u, 0.5));
        assert_relative_eq!(p.x.hypot(p.y), 1.0, epsilon = 1e-10);
        assert_relative_eq!(p.z, 0.5, epsilon = 1e-10);
    }
}

#[test]
fn cylinder_normal_points_outward() {
    let surface = quarter_cylinder();
    let uv = Point2::new(0.5, 0.5);
    let p = surface.point_at(&uv);
    let n = surface.normal_at(&uv).normalize();
    let radial = Vector3::new(p.x, p.y, 0.).normalize();
    assert_relative_eq!(n.dot(&radial).abs(), 1.0, epsilon = 1e-8);
}

#[test]
fn bilinear_derivatives() {
    let surface = NurbsSurface::bilinear(
        Point3::new(0., 0., 0.),
        Point3::new(2., 0., 0.),
        Point3::new(2., 3., 0.),
        Point3::new(0., 3., 0.),
    );
    let d = surface.derivatives(&Point2::new(0.25, 0.75), 2);
    assert_relative_eq!(d[1][0], Vector3::new(2., 0., 0.), epsilon = 1e-10);
    assert_relative_eq!(d[0][1], Vector3::new(0., 3., 0.), epsilon = 1e-10);
    assert_relative_eq!(d[2][0], Vector3::zeros(), epsilon = 1e-10);
    assert_relative_eq!(d[0][2], Vector3::zeros(), epsilon = 1e-10);
}

#[test]
fn parameter_direction_round_trip() {
    let surface = NurbsSurface::plane(
        Point3::origin(),
        Vector3::new(2., 0., 0.),
        Vector3::new(0., 0.5, 0.),
        (0., 1.),
        (0., 1.),
    );
    let uv = Point2::new(0.3, 0.6);
    let dir = Vector2::new(1., 1.);
    let tangent = surface.tangent_at(&uv, &dir);
    assert_relative_eq!(tangent, Vector3::new(2., 0.5, 0.), epsilon = 1e-10);
    let back = surface.to_parameter_direction(&uv, &tangent).unwrap();
    assert_relative_eq!(back, dir, epsilon = 1e-10);
}

#[test]
fn closest_parameter_on_plane() {
    let surface = NurbsSurface::plane(
        Point3::origin(),
        Vector3::x(),
        Vector3::y(),
        (0., 4.),
        (0., 2.),
    );
    let uv = surface
        .closest_parameter(&Point3::new(1.25, 0.5, 3.), None)
        .unwrap();
    assert_relative_eq!(uv, Point2::new(1.25, 0.5), epsilon = 1e-6);

    // outside of the domain, clamped to the boundary
    let uv = surface
        .closest_parameter(&Point3::new(5., 1., 0.), None)
        .unwrap();
    assert_relative_eq!(uv, Point2::new(4., 1.), epsilon = 1e-6);
}

#[test]
fn closest_parameter_on_cylinder() {
    let surface = quarter_cylinder();
    let target = surface.point_at(&Point2::new(0.3, 0.7));
    let outside = Point3::new(target.x * 2., target.y * 2., target.z);
    let uv = surface.closest_parameter(&outside, None).unwrap();
    assert_relative_eq!(surface.point_at(&uv), target, epsilon = 1e-5);
}

#[test]
fn invalid_configuration_is_rejected() {
    let p = Point4::new(0., 0., 0., 1.);
    let res = NurbsSurface::try_new(
        1,
        1,
        vec![0., 0., 1., 1.],
        vec![0., 1.],
        vec![vec![p, p], vec![p, p]],
    );
    assert!(res.is_err());
}
