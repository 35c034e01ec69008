use itertools::Itertools;
use nalgebra::{Point2, Vector2};

use crate::misc::{segment_closest_point, FloatingPoint, Line, Ray};

/// A trimming curve in the parameter space of a surface.
/// The curve is parametrized over [0, 1] proportionally to its parameter space length.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrimCurve<T: FloatingPoint> {
    Line { start: Point2<T>, end: Point2<T> },
    Polyline { points: Vec<Point2<T>> },
}

impl<T: FloatingPoint> TrimCurve<T> {
    pub fn line(start: Point2<T>, end: Point2<T>) -> Self {
        Self::Line { start, end }
    }

    /// Create a polyline through the given points.
    /// Consecutive duplicates are dropped, two remaining points collapse to a line.
    pub fn try_polyline(points: &[Point2<T>]) -> anyhow::Result<Self> {
        let points = points
            .iter()
            .cloned()
            .dedup_by(|a, b| (a - b).norm() < T::default_epsilon())
            .collect_vec();
        match points.len() {
            0 | 1 => Err(anyhow::anyhow!(
                "A polyline requires at least two distinct points"
            )),
            2 => Ok(Self::line(points[0], points[1])),
            _ => Ok(Self::Polyline { points }),
        }
    }

    pub fn start(&self) -> Point2<T> {
        match self {
            Self::Line { start, .. } => *start,
            Self::Polyline { points } => points[0],
        }
    }

    pub fn end(&self) -> Point2<T> {
        match self {
            Self::Line { end, .. } => *end,
            Self::Polyline { points } => points[points.len() - 1],
        }
    }

    /// Control polygon of the curve, the curve itself for both variants.
    pub fn points(&self) -> Vec<Point2<T>> {
        match self {
            Self::Line { start, end } => vec![*start, *end],
            Self::Polyline { points } => points.clone(),
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, Self::Line { .. })
    }

    /// Segments of the curve as lines.
    pub fn lines(&self) -> Vec<Line<T>> {
        self.points()
            .into_iter()
            .tuple_windows()
            .map(|(a, b)| Line::new(a, b))
            .collect()
    }

    /// Length in parameter space
    pub fn length(&self) -> T {
        self.lines()
            .iter()
            .fold(T::zero(), |acc, l| acc + l.length())
    }

    /// Normalized parameter at the start of each segment, with a trailing 1.
    fn knots(&self) -> Vec<T> {
        let lines = self.lines();
        let total = self.length();
        let mut knots = Vec::with_capacity(lines.len() + 1);
        let mut acc = T::zero();
        knots.push(acc);
        for line in lines.iter() {
            acc += line.length();
            knots.push(if total > T::zero() {
                acc / total
            } else {
                T::one()
            });
        }
        if let Some(last) = knots.last_mut() {
            *last = T::one();
        }
        knots
    }

    /// Segment index containing `t` and the local parameter on that segment.
    /// Interior knots belong to the following segment.
    fn locate(&self, t: T) -> (usize, T) {
        let knots = self.knots();
        let segments = knots.len() - 1;
        let t = t.max(T::zero()).min(T::one());
        let index = (0..segments)
            .find(|i| t < knots[i + 1])
            .unwrap_or(segments - 1);
        let span = knots[index + 1] - knots[index];
        let local = if span > T::zero() {
            (t - knots[index]) / span
        } else {
            T::zero()
        };
        (index, local)
    }

    pub fn point_at(&self, t: T) -> Point2<T> {
        let points = self.points();
        let (index, local) = self.locate(t);
        let (a, b) = (points[index], points[index + 1]);
        a + (b - a) * local
    }

    /// Derivative with respect to the normalized parameter.
    /// At a polyline knot the outgoing segment is used, except at the end of the curve.
    pub fn tangent_at(&self, t: T) -> Vector2<T> {
        let points = self.points();
        let (index, _) = self.locate(t);
        let dir = points[index + 1] - points[index];
        let norm = dir.norm();
        if norm > T::zero() {
            dir / norm * self.length()
        } else {
            dir
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            Self::Line { start, end } => Self::line(*end, *start),
            Self::Polyline { points } => Self::Polyline {
                points: points.iter().rev().cloned().collect(),
            },
        }
    }

    /// Split the curve at `t` into two curves covering [0, t] and [t, 1].
    pub fn try_split_at(&self, t: T) -> anyhow::Result<(Self, Self)> {
        anyhow::ensure!(
            t > T::zero() && t < T::one(),
            "Split parameter must be inside the open interval (0, 1)"
        );
        let points = self.points();
        let (index, _) = self.locate(t);
        let pivot = self.point_at(t);
        let mut head = points[..=index].to_vec();
        head.push(pivot);
        let mut tail = vec![pivot];
        tail.extend_from_slice(&points[index + 1..]);
        Ok((Self::try_polyline(&head)?, Self::try_polyline(&tail)?))
    }

    /// Evenly spaced samples including both end points.
    pub fn sample(&self, divisions: usize) -> Vec<Point2<T>> {
        let divisions = divisions.max(1);
        let n = T::from_usize(divisions).unwrap_or(T::one());
        (0..=divisions)
            .map(|i| {
                let fi = T::from_usize(i).unwrap_or(T::zero());
                self.point_at(fi / n)
            })
            .collect()
    }

    /// Find the closest parameter to a point in parameter space.
    /// Returns the normalized parameter and the closest point.
    pub fn closest_parameter(&self, point: &Point2<T>) -> (T, Point2<T>) {
        let knots = self.knots();
        self.points()
            .into_iter()
            .tuple_windows()
            .enumerate()
            .map(|(i, (a, b))| segment_closest_point(point, &a, &b, knots[i], knots[i + 1]))
            .fold(None, |best: Option<(T, (T, Point2<T>))>, (t, p)| {
                let d = (p - point).norm();
                match best {
                    Some((bd, _)) if bd <= d => best,
                    _ => Some((d, (t, p))),
                }
            })
            .map(|(_, r)| r)
            .unwrap_or((T::zero(), self.start()))
    }

    /// Intersections with a ray, sorted by ray parameter.
    /// Each item is `(ray parameter, curve parameter)`.
    pub fn intersect_ray(&self, ray: &Ray<T>) -> Vec<(T, T)> {
        let knots = self.knots();
        let mut hits = self
            .points()
            .into_iter()
            .tuple_windows()
            .enumerate()
            .filter_map(|(i, (a, b))| {
                ray.intersect_segment(&a, &b)
                    .map(|(tr, s)| (tr, knots[i] + (knots[i + 1] - knots[i]) * s))
            })
            .collect_vec();
        hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        hits
    }
}
