use itertools::Itertools;
use nalgebra::Point2;

use super::{orientation, signed_area, FloatingPoint, Orientation};

/// A closed polygon in parameter space, used to classify points against a trim loop.
#[derive(Debug, Clone)]
pub struct PolygonBoundary<T: FloatingPoint> {
    vertices: Vec<Point2<T>>,
}

impl<T: FloatingPoint> PolygonBoundary<T> {
    pub fn new(vertices: Vec<Point2<T>>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &Vec<Point2<T>> {
        &self.vertices
    }

    /// Signed area, positive for counter-clockwise polygons.
    pub fn area(&self) -> T {
        signed_area(&self.vertices)
    }

    /// Check if a point is contained in the polygon by its winding number.
    /// ```
    /// use nalgebra::Point2;
    /// use quadrify::prelude::PolygonBoundary;
    /// let boundary = PolygonBoundary::new(vec![
    ///   Point2::new(0., 0.),
    ///   Point2::new(1., 0.),
    ///   Point2::new(1., 1.),
    ///   Point2::new(0., 1.),
    /// ]);
    /// assert!(boundary.contains(&Point2::new(0.5, 0.5)));
    /// assert!(!boundary.contains(&Point2::new(0.5, 1.5)));
    /// ```
    pub fn contains(&self, c: &Point2<T>) -> bool {
        let winding_number = self.vertices().iter().circular_tuple_windows().fold(
            0_i32,
            move |winding_number, (p0, p1)| {
                if p0.y <= c.y {
                    if p1.y >= c.y {
                        let o = orientation(p0, p1, c);
                        if o == Orientation::CounterClockwise && p1.y != c.y {
                            return winding_number + 1;
                        }
                    }
                } else if p1.y <= c.y {
                    let o = orientation(p0, p1, c);
                    if o == Orientation::Clockwise {
                        return winding_number - 1;
                    }
                }
                winding_number
            },
        );
        winding_number != 0
    }
}

impl<T: FloatingPoint> FromIterator<Point2<T>> for PolygonBoundary<T> {
    fn from_iter<I: IntoIterator<Item = Point2<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
