use nalgebra::{Matrix2, Point2, Point3, Vector2, Vector3};

use crate::misc::FloatingPoint;

/// A continuous parametrized surface, the geometry underneath a face.
///
/// The regularization engine only relies on this contract: evaluation, differentials and
/// closest point queries. Faces hold it behind an `Arc` so split faces share their parent's surface.
pub trait ParametricSurface<T: FloatingPoint>: std::fmt::Debug + Send + Sync {
    /// Parameter domain as `((u_min, u_max), (v_min, v_max))`
    fn domain(&self) -> ((T, T), (T, T));

    /// Evaluate the surface at the given parameter
    fn point_at(&self, uv: &Point2<T>) -> Point3<T>;

    /// Partial derivatives where `skl[k][l]` is the k-th derivative in u and l-th in v.
    /// `skl[0][0]` is the position itself.
    fn derivatives(&self, uv: &Point2<T>, order: usize) -> Vec<Vec<Vector3<T>>>;

    /// Find the parameter whose image is closest to `point`.
    fn closest_parameter(
        &self,
        point: &Point3<T>,
        hint: Option<Point2<T>>,
    ) -> anyhow::Result<Point2<T>>;

    /// Non normalized surface normal `Su x Sv`
    fn normal_at(&self, uv: &Point2<T>) -> Vector3<T> {
        let d = self.derivatives(uv, 1);
        d[1][0].cross(&d[0][1])
    }

    /// Push a parameter space direction forward to a tangent vector in 3D.
    fn tangent_at(&self, uv: &Point2<T>, direction: &Vector2<T>) -> Vector3<T> {
        let d = self.derivatives(uv, 1);
        d[1][0] * direction.x + d[0][1] * direction.y
    }

    /// Pull a 3D vector back into parameter space by least squares on the surface jacobian.
    /// Returns `None` at a singular point of the surface.
    fn to_parameter_direction(&self, uv: &Point2<T>, vector: &Vector3<T>) -> Option<Vector2<T>> {
        let d = self.derivatives(uv, 1);
        let (su, sv) = (&d[1][0], &d[0][1]);
        let gram = Matrix2::new(su.dot(su), su.dot(sv), su.dot(sv), sv.dot(sv));
        let rhs = Vector2::new(su.dot(vector), sv.dot(vector));
        gram.lu().solve(&rhs)
    }

    /// Check whether a parameter lies inside the domain, widened by `tolerance`.
    fn contains_parameter(&self, uv: &Point2<T>, tolerance: T) -> bool {
        let ((u0, u1), (v0, v1)) = self.domain();
        uv.x >= u0 - tolerance
            && uv.x <= u1 + tolerance
            && uv.y >= v0 - tolerance
            && uv.y <= v1 + tolerance
    }
}
