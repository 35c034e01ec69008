use argmin::core::ArgminFloat;
use nalgebra::{Point2, Point3, Point4, Vector3, Vector4};

use crate::{
    closest_parameter::find_surface_closest_parameter,
    knot::KnotVector,
    misc::{binomial::Binomial, FloatingPoint},
};

use super::ParametricSurface;

/// Rational B-spline surface in 3D.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NurbsSurface<T: FloatingPoint> {
    /// control points with homogeneous coordinates
    /// the last element of the vector is the `weight`
    control_points: Vec<Vec<Point4<T>>>,
    u_degree: usize,
    v_degree: usize,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
}

impl<T: FloatingPoint> NurbsSurface<T> {
    /// Create a surface from homogeneous control points without checking the configuration.
    pub fn new(
        u_degree: usize,
        v_degree: usize,
        u_knots: Vec<T>,
        v_knots: Vec<T>,
        control_points: Vec<Vec<Point4<T>>>,
    ) -> Self {
        Self {
            u_degree,
            v_degree,
            u_knots: KnotVector::new(u_knots),
            v_knots: KnotVector::new(v_knots),
            control_points,
        }
    }

    /// Create a surface checking that knot vectors, degrees and control net agree.
    pub fn try_new(
        u_degree: usize,
        v_degree: usize,
        u_knots: Vec<T>,
        v_knots: Vec<T>,
        control_points: Vec<Vec<Point4<T>>>,
    ) -> anyhow::Result<Self> {
        let rows = control_points.len();
        let columns = control_points.first().map(|r| r.len()).unwrap_or(0);
        anyhow::ensure!(
            rows > u_degree && columns > v_degree,
            "Too few control points for degree ({}, {})",
            u_degree,
            v_degree
        );
        anyhow::ensure!(
            control_points.iter().all(|r| r.len() == columns),
            "Control net must be rectangular"
        );
        anyhow::ensure!(
            u_knots.len() == rows + u_degree + 1,
            "Invalid u knot count: expected {}, got {}",
            rows + u_degree + 1,
            u_knots.len()
        );
        anyhow::ensure!(
            v_knots.len() == columns + v_degree + 1,
            "Invalid v knot count: expected {}, got {}",
            columns + v_degree + 1,
            v_knots.len()
        );
        anyhow::ensure!(
            control_points
                .iter()
                .flatten()
                .all(|p| p.w > T::zero()),
            "Weights must be positive"
        );

        let surface = Self::new(u_degree, v_degree, u_knots, v_knots, control_points);
        anyhow::ensure!(
            surface.u_knots.is_non_decreasing() && surface.v_knots.is_non_decreasing(),
            "Knot vectors must be non decreasing"
        );
        Ok(surface)
    }

    /// Bilinear patch through four corners ordered as `S(0,0), S(1,0), S(1,1), S(0,1)`.
    ///
    /// # Example
    /// ```
    /// use quadrify::prelude::*;
    /// use nalgebra::{Point2, Point3};
    /// use approx::assert_relative_eq;
    ///
    /// let surface = NurbsSurface::bilinear(
    ///     Point3::new(0., 0., 0.),
    ///     Point3::new(2., 0., 0.),
    ///     Point3::new(2., 2., 1.),
    ///     Point3::new(0., 2., 1.),
    /// );
    /// let p = surface.point_at(&Point2::new(0.5, 0.5));
    /// assert_relative_eq!(p, Point3::new(1., 1., 0.5), epsilon = 1e-10);
    /// ```
    pub fn bilinear(p00: Point3<T>, p10: Point3<T>, p11: Point3<T>, p01: Point3<T>) -> Self {
        let h = |p: Point3<T>| Point4::new(p.x, p.y, p.z, T::one());
        let knots = KnotVector::<T>::bezier(1).as_slice().to_vec();
        Self::new(
            1,
            1,
            knots.clone(),
            knots,
            vec![vec![h(p00), h(p01)], vec![h(p10), h(p11)]],
        )
    }

    /// Planar patch `origin + u * x_axis + v * y_axis` over the given parameter ranges.
    pub fn plane(
        origin: Point3<T>,
        x_axis: Vector3<T>,
        y_axis: Vector3<T>,
        u_range: (T, T),
        v_range: (T, T),
    ) -> Self {
        let at = |u: T, v: T| {
            let p = origin + x_axis * u + y_axis * v;
            Point4::new(p.x, p.y, p.z, T::one())
        };
        let (u0, u1) = u_range;
        let (v0, v1) = v_range;
        Self::new(
            1,
            1,
            vec![u0, u0, u1, u1],
            vec![v0, v0, v1, v1],
            vec![vec![at(u0, v0), at(u0, v1)], vec![at(u1, v0), at(u1, v1)]],
        )
    }

    pub fn u_degree(&self) -> usize {
        self.u_degree
    }

    pub fn v_degree(&self) -> usize {
        self.v_degree
    }

    pub fn u_knots(&self) -> &KnotVector<T> {
        &self.u_knots
    }

    pub fn v_knots(&self) -> &KnotVector<T> {
        &self.v_knots
    }

    pub fn control_points(&self) -> &Vec<Vec<Point4<T>>> {
        &self.control_points
    }

    /// Get the u domain of the knot vector by degree
    pub fn u_knots_domain(&self) -> (T, T) {
        self.u_knots.domain(self.u_degree)
    }

    /// Get the v domain of the knot vector by degree
    pub fn v_knots_domain(&self) -> (T, T) {
        self.v_knots.domain(self.v_degree)
    }

    /// Evaluate the surface at the given u, v parameters to get a homogeneous point
    pub fn point(&self, u: T, v: T) -> Point4<T> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let knot_span_index_u = self.u_knots.find_knot_span_index(n, self.u_degree, u);
        let knot_span_index_v = self.v_knots.find_knot_span_index(m, self.v_degree, v);
        let u_basis_vals = self
            .u_knots
            .basis_functions(knot_span_index_u, u, self.u_degree);
        let v_basis_vals = self
            .v_knots
            .basis_functions(knot_span_index_v, v, self.v_degree);
        let uind = knot_span_index_u - self.u_degree;

        let mut position = Vector4::zeros();
        for l in 0..=self.v_degree {
            let mut temp = Vector4::zeros();
            let vind = knot_span_index_v - self.v_degree + l;

            // sample u isoline
            for k in 0..=self.u_degree {
                temp += self.control_points[uind + k][vind].coords * u_basis_vals[k];
            }

            // add point from u isoline
            position += temp * v_basis_vals[l];
        }

        position.into()
    }

    /// Evaluate the rational derivatives at the given u, v parameters
    pub fn rational_derivatives(&self, u: T, v: T, derivs: usize) -> Vec<Vec<Vector3<T>>> {
        let ders = self.homogeneous_derivatives(u, v, derivs);
        rational_derivatives(&ders, derivs)
    }

    /// Evaluate the homogeneous derivatives at the given u, v parameters
    fn homogeneous_derivatives(&self, u: T, v: T, derivs: usize) -> Vec<Vec<Vector4<T>>> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let du = derivs.min(self.u_degree);
        let dv = derivs.min(self.v_degree);

        let mut skl = vec![vec![Vector4::zeros(); derivs + 1]; derivs + 1];
        let knot_span_index_u = self.u_knots.find_knot_span_index(n, self.u_degree, u);
        let knot_span_index_v = self.v_knots.find_knot_span_index(m, self.v_degree, v);
        let uders =
            self.u_knots
                .derivative_basis_functions(knot_span_index_u, u, self.u_degree, derivs);
        let vders =
            self.v_knots
                .derivative_basis_functions(knot_span_index_v, v, self.v_degree, derivs);
        let mut temp = vec![Vector4::zeros(); self.v_degree + 1];

        for k in 0..=du {
            for (s, column) in temp.iter_mut().enumerate() {
                *column = Vector4::zeros();
                for r in 0..=self.u_degree {
                    *column += self.control_points[knot_span_index_u - self.u_degree + r]
                        [knot_span_index_v - self.v_degree + s]
                        .coords
                        * uders[k][r];
                }
            }

            let dd = (derivs - k).min(dv);
            for l in 0..=dd {
                for (s, column) in temp.iter().enumerate() {
                    skl[k][l] += column * vders[l][s];
                }
            }
        }

        skl
    }
}

/// Compute the rational derivatives of homogeneous derivatives
fn rational_derivatives<T: FloatingPoint>(
    ders: &[Vec<Vector4<T>>],
    derivs: usize,
) -> Vec<Vec<Vector3<T>>> {
    let a_ders: Vec<Vec<Vector3<T>>> = ders
        .iter()
        .map(|row| row.iter().map(|d| d.xyz()).collect())
        .collect();
    let w_ders: Vec<Vec<T>> = ders
        .iter()
        .map(|row| row.iter().map(|d| d.w).collect())
        .collect();

    let mut skl: Vec<Vec<Vector3<T>>> = vec![];
    let mut binom = Binomial::<T>::new();

    for k in 0..=derivs {
        let mut row: Vec<Vector3<T>> = vec![];

        for l in 0..=(derivs - k) {
            let mut v = a_ders[k][l];
            for j in 1..=l {
                let coef = binom.get(l, j) * w_ders[0][j];
                v -= row[l - j] * coef;
            }

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i][0];
                v -= skl[k - i][l] * coef;
                let mut v2 = Vector3::zeros();
                for j in 1..=l {
                    v2 += skl[k - i][l - j] * (binom.get(l, j) * w_ders[i][j]);
                }
                v -= v2 * binom.get(k, i);
            }

            row.push(v / w_ders[0][0]);
        }

        skl.push(row);
    }

    skl
}

impl<T: FloatingPoint + ArgminFloat> ParametricSurface<T> for NurbsSurface<T> {
    fn domain(&self) -> ((T, T), (T, T)) {
        (self.u_knots_domain(), self.v_knots_domain())
    }

    fn point_at(&self, uv: &Point2<T>) -> Point3<T> {
        let p = self.point(uv.x, uv.y);
        Point3::new(p.x / p.w, p.y / p.w, p.z / p.w)
    }

    fn derivatives(&self, uv: &Point2<T>, order: usize) -> Vec<Vec<Vector3<T>>> {
        self.rational_derivatives(uv.x, uv.y, order)
    }

    fn closest_parameter(
        &self,
        point: &Point3<T>,
        hint: Option<Point2<T>>,
    ) -> anyhow::Result<Point2<T>> {
        find_surface_closest_parameter(self, point, hint)
    }
}
