use nalgebra::{Point2, Vector2};

use super::{cross2, FloatingPoint};

/// A half line in parameter space.
#[derive(Clone, Debug)]
pub struct Ray<T: FloatingPoint> {
    origin: Point2<T>,
    direction: Vector2<T>,
}

impl<T: FloatingPoint> Ray<T> {
    pub fn new(origin: Point2<T>, direction: Vector2<T>) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> &Point2<T> {
        &self.origin
    }

    pub fn direction(&self) -> &Vector2<T> {
        &self.direction
    }

    pub fn point_at(&self, t: T) -> Point2<T> {
        self.origin + self.direction * t
    }

    /// Find the intersection with the segment `a`-`b`.
    /// Returns the ray parameter and the segment parameter in [0, 1].
    /// ```
    /// use nalgebra::{Point2, Vector2};
    /// use quadrify::prelude::Ray;
    /// let ray = Ray::new(Point2::new(0., 0.), Vector2::new(1., 0.));
    /// let (t, s) = ray
    ///     .intersect_segment(&Point2::new(2., -1.), &Point2::new(2., 1.))
    ///     .unwrap();
    /// assert_eq!(t, 2.);
    /// assert_eq!(s, 0.5);
    /// ```
    pub fn intersect_segment(&self, a: &Point2<T>, b: &Point2<T>) -> Option<(T, T)> {
        let e = b - a;
        let denom = cross2(&self.direction, &e);
        if denom.abs() < T::default_epsilon() {
            return None;
        }
        let w = a - self.origin;
        let t = cross2(&w, &e) / denom;
        let s = cross2(&w, &self.direction) / denom;
        // hits through a segment end survive rounding on both neighbours
        let slack = T::default_epsilon().sqrt();
        if t < T::zero() || s < -slack || s > T::one() + slack {
            None
        } else {
            Some((t, s.clamp(T::zero(), T::one())))
        }
    }
}
