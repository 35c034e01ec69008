use nalgebra::{Point2, Vector2};

use super::{orientation, FloatingPoint, Orientation};

/// A struct representing a line segment in parameter space.
#[derive(Clone, Debug, PartialEq)]
pub struct Line<T: FloatingPoint> {
    start: Point2<T>,
    end: Point2<T>,
}

impl<T: FloatingPoint> Line<T> {
    pub fn new(start: Point2<T>, end: Point2<T>) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> &Point2<T> {
        &self.start
    }

    pub fn end(&self) -> &Point2<T> {
        &self.end
    }

    pub fn tangent(&self) -> Vector2<T> {
        self.end - self.start
    }

    pub fn length(&self) -> T {
        self.tangent().norm()
    }

    /// Robust intersection test between two lines.
    /// Touching at an end point counts as an intersection, fully collinear lines do not.
    pub fn intersects(&self, other: &Line<T>) -> bool {
        if !self.rect_overlaps(other) {
            return false;
        }

        let p_q1 = orientation(self.start(), self.end(), other.start());
        let p_q2 = orientation(self.start(), self.end(), other.end());

        if matches!(
            (p_q1, p_q2),
            (Orientation::Clockwise, Orientation::Clockwise)
                | (Orientation::CounterClockwise, Orientation::CounterClockwise)
        ) {
            return false;
        }

        let q_p1 = orientation(other.start(), other.end(), self.start());
        let q_p2 = orientation(other.start(), other.end(), self.end());

        if matches!(
            (q_p1, q_p2),
            (Orientation::Clockwise, Orientation::Clockwise)
                | (Orientation::CounterClockwise, Orientation::CounterClockwise)
        ) {
            return false;
        }

        !matches!(
            (p_q1, p_q2, q_p1, q_p2),
            (
                Orientation::Collinear,
                Orientation::Collinear,
                Orientation::Collinear,
                Orientation::Collinear
            )
        )
    }

    /// Proper crossing: the lines pass through each other's interior.
    /// ```
    /// use nalgebra::Point2;
    /// use quadrify::prelude::Line;
    /// let a = Line::new(Point2::new(0., 0.), Point2::new(1., 1.));
    /// let b = Line::new(Point2::new(0., 1.), Point2::new(1., 0.));
    /// let c = Line::new(Point2::new(1., 1.), Point2::new(2., 0.));
    /// assert!(a.crosses(&b));
    /// assert!(!a.crosses(&c));
    /// ```
    pub fn crosses(&self, other: &Line<T>) -> bool {
        if !self.rect_overlaps(other) {
            return false;
        }
        let p_q1 = orientation(self.start(), self.end(), other.start());
        let p_q2 = orientation(self.start(), self.end(), other.end());
        let q_p1 = orientation(other.start(), other.end(), self.start());
        let q_p2 = orientation(other.start(), other.end(), self.end());
        opposite(p_q1, p_q2) && opposite(q_p1, q_p2)
    }

    fn rect_overlaps(&self, other: &Line<T>) -> bool {
        let (a0, a1) = self.bounding_rect();
        let (b0, b1) = other.bounding_rect();
        a0.x <= b1.x && b0.x <= a1.x && a0.y <= b1.y && b0.y <= a1.y
    }

    /// Returns the minimum and maximum corner of the line.
    pub fn bounding_rect(&self) -> (Point2<T>, Point2<T>) {
        (
            Point2::new(self.start.x.min(self.end.x), self.start.y.min(self.end.y)),
            Point2::new(self.start.x.max(self.end.x), self.start.y.max(self.end.y)),
        )
    }
}

fn opposite(a: Orientation, b: Orientation) -> bool {
    matches!(
        (a, b),
        (Orientation::Clockwise, Orientation::CounterClockwise)
            | (Orientation::CounterClockwise, Orientation::Clockwise)
    )
}
