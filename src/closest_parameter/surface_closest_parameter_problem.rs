use std::marker::PhantomData;

use argmin::core::{CostFunction, Gradient, Hessian};
use nalgebra::{Point2, Point3, Vector2, Vector3};

use crate::{misc::FloatingPoint, surface::ParametricSurface};

/// Gradient & Hessian provider for finding the closest parameter on a surface to a given point.
pub struct SurfaceClosestParameterProblem<'a, T: FloatingPoint, S: ?Sized> {
    /// The point to find the closest parameter to.
    point: &'a Point3<T>,
    /// The surface to find the closest parameter on.
    surface: &'a S,
    phantom: PhantomData<T>,
}

impl<'a, T: FloatingPoint, S: ParametricSurface<T> + ?Sized> SurfaceClosestParameterProblem<'a, T, S> {
    pub fn new(point: &'a Point3<T>, surface: &'a S) -> Self {
        SurfaceClosestParameterProblem {
            point,
            surface,
            phantom: PhantomData,
        }
    }
}

impl<T: FloatingPoint, S: ParametricSurface<T> + ?Sized> CostFunction
    for SurfaceClosestParameterProblem<'_, T, S>
{
    type Param = Vector2<T>;
    type Output = T;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        let p = self.surface.point_at(&Point2::new(param.x, param.y));
        let d = p - self.point;
        Ok(d.norm())
    }
}

impl<T: FloatingPoint, S: ParametricSurface<T> + ?Sized> Gradient
    for SurfaceClosestParameterProblem<'_, T, S>
{
    type Param = Vector2<T>;
    type Gradient = Vector3<T>;

    /// S(u, v) - P, projected on the partials by the solver
    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
        let p = self.surface.point_at(&Point2::new(param.x, param.y));
        Ok(p - self.point)
    }
}

impl<T: FloatingPoint, S: ParametricSurface<T> + ?Sized> Hessian
    for SurfaceClosestParameterProblem<'_, T, S>
{
    type Param = Vector2<T>;
    type Hessian = Vec<Vec<Vector3<T>>>;

    fn hessian(&self, param: &Self::Param) -> Result<Self::Hessian, anyhow::Error> {
        Ok(self.surface.derivatives(&Point2::new(param.x, param.y), 2))
    }
}
