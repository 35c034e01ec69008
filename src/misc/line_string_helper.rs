use geo::LineIntersection;
use itertools::Itertools;
use nalgebra::Point2;
use num_traits::NumCast;

use crate::misc::FloatingPoint;

/// Convert parameter space points into a `geo::LineString`.
pub fn to_line_string_helper<T: FloatingPoint>(points: &[Point2<T>]) -> geo::LineString {
    geo::LineString::new(
        points
            .iter()
            .map(|p| {
                geo::Coord::from([
                    <f64 as NumCast>::from(p.x).unwrap_or(f64::NAN),
                    <f64 as NumCast>::from(p.y).unwrap_or(f64::NAN),
                ])
            })
            .collect_vec(),
    )
}

/// Intersection between two segments of line strings
#[derive(Debug, Clone, PartialEq)]
pub struct LineStringIntersection {
    point: Point2<f64>,
    line_index: (usize, usize),
    /// If the intersection is proper, it means that the intersection point is not on the endpoint of the line.
    is_proper: bool,
}

impl LineStringIntersection {
    pub fn point(&self) -> Point2<f64> {
        self.point
    }

    pub fn line_index(&self) -> (usize, usize) {
        self.line_index
    }

    pub fn is_proper(&self) -> bool {
        self.is_proper
    }
}

/// Find the places where a closed polyline touches or crosses itself.
/// Neighbouring segments are skipped, as are contacts in a point shared by the end points of both
/// segments (a slit traversed in both directions) within `tolerance`.
/// ```
/// use nalgebra::Point2;
/// use quadrify::prelude::find_closed_line_string_self_intersections;
/// let bow_tie = [
///     Point2::new(0., 0.),
///     Point2::new(1., 1.),
///     Point2::new(1., 0.),
///     Point2::new(0., 1.),
/// ];
/// assert_eq!(find_closed_line_string_self_intersections(&bow_tie, 1e-9).len(), 1);
/// let square = [
///     Point2::new(0., 0.),
///     Point2::new(1., 0.),
///     Point2::new(1., 1.),
///     Point2::new(0., 1.),
/// ];
/// assert!(find_closed_line_string_self_intersections(&square, 1e-9).is_empty());
/// ```
pub fn find_closed_line_string_self_intersections<T: FloatingPoint>(
    points: &[Point2<T>],
    tolerance: T,
) -> Vec<LineStringIntersection> {
    let n = points.len();
    if n < 3 {
        return vec![];
    }
    let tol = <f64 as NumCast>::from(tolerance).unwrap_or(0.);
    let mut closed = points.to_vec();
    closed.push(points[0]);
    let line = to_line_string_helper(&closed);
    let lines = line.lines().collect_vec();

    let mut res = vec![];
    for i in 0..lines.len() {
        for j in (i + 1)..lines.len() {
            let adjacent = j == i + 1 || (i == 0 && j == lines.len() - 1);
            if adjacent {
                continue;
            }
            let (a, b) = (lines[i], lines[j]);
            let Some(it) = geo::algorithm::line_intersection::line_intersection(a, b) else {
                continue;
            };
            let shared = |c: geo::Coord| {
                let on_end = |l: &geo::Line| {
                    coord_distance(&l.start, &c) < tol || coord_distance(&l.end, &c) < tol
                };
                on_end(&a) && on_end(&b)
            };
            let allowed = match it {
                LineIntersection::SinglePoint { intersection, .. } => shared(intersection),
                LineIntersection::Collinear { intersection } => {
                    // a slit walked there and back again
                    let reversed = coord_distance(&a.start, &b.end) < tol
                        && coord_distance(&a.end, &b.start) < tol;
                    reversed || (shared(intersection.start) && shared(intersection.end))
                }
            };
            if !allowed {
                res.push(to_intersection(it, (i, j)));
            }
        }
    }
    res
}

fn coord_distance(a: &geo::Coord, b: &geo::Coord) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn to_intersection(it: LineIntersection<f64>, line_index: (usize, usize)) -> LineStringIntersection {
    match it {
        LineIntersection::SinglePoint {
            intersection,
            is_proper,
        } => LineStringIntersection {
            point: Point2::new(intersection.x, intersection.y),
            line_index,
            is_proper,
        },
        LineIntersection::Collinear { intersection } => LineStringIntersection {
            point: Point2::new(intersection.start.x, intersection.start.y),
            line_index,
            is_proper: false,
        },
    }
}
