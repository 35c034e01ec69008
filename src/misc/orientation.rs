use nalgebra::{Point2, Vector2};
use num_traits::NumCast;
use robust::{orient2d, Coord};

use super::FloatingPoint;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Orientation {
    CounterClockwise,
    Clockwise,
    Collinear,
}

fn to_coord<T: FloatingPoint>(p: &Point2<T>) -> Coord<f64> {
    Coord {
        x: <f64 as NumCast>::from(p.x).unwrap_or(f64::NAN),
        y: <f64 as NumCast>::from(p.y).unwrap_or(f64::NAN),
    }
}

/// Robust orientation test for three points.
/// implementation from geo crate. (https://github.com/georust/geo)
pub fn orientation<T: FloatingPoint>(p: &Point2<T>, q: &Point2<T>, r: &Point2<T>) -> Orientation {
    let orientation = orient2d(to_coord(p), to_coord(q), to_coord(r));

    if orientation < 0. {
        Orientation::Clockwise
    } else if orientation > 0. {
        Orientation::CounterClockwise
    } else {
        Orientation::Collinear
    }
}

/// z component of the cross product of two planar vectors.
pub fn cross2<T: FloatingPoint>(a: &Vector2<T>, b: &Vector2<T>) -> T {
    a.x * b.y - a.y * b.x
}

/// Signed area of a closed polygon (positive when counter-clockwise).
/// ```
/// use nalgebra::Point2;
/// use quadrify::prelude::signed_area;
/// let square = [
///     Point2::new(0., 0.),
///     Point2::new(1., 0.),
///     Point2::new(1., 1.),
///     Point2::new(0., 1.),
/// ];
/// assert_eq!(signed_area(&square), 1.);
/// let reversed: Vec<_> = square.iter().rev().cloned().collect();
/// assert_eq!(signed_area(&reversed), -1.);
/// ```
pub fn signed_area<T: FloatingPoint>(points: &[Point2<T>]) -> T {
    let n = points.len();
    if n < 3 {
        return T::zero();
    }
    let twice = (0..n).fold(T::zero(), |acc, i| {
        let p = &points[i];
        let q = &points[(i + 1) % n];
        acc + (p.x * q.y - q.x * p.y)
    });
    let half: T = nalgebra::convert(0.5);
    twice * half
}
