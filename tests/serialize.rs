#![cfg(feature = "serde")]

use quadrify::prelude::*;

#[test]
fn options_round_trip_through_json() {
    let options = RegularizeOptions::<f64>::default()
        .with_max_splits(12)
        .with_check_convex(false)
        .with_tolerances(Tolerances::default().with_angtol(3_f64.to_radians()));
    let json = serde_json::to_string_pretty(&options).unwrap();
    let back: RegularizeOptions<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(options, back);
}

#[test]
fn trim_curve_serializes_its_points() {
    let curve = TrimCurve::line(nalgebra::Point2::new(0., 0.), nalgebra::Point2::new(1., 2.));
    let json = serde_json::to_value(&curve).unwrap();
    let back: TrimCurve<f64> = serde_json::from_value(json).unwrap();
    assert_eq!(curve, back);
}
