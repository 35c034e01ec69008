pub mod surface_closest_parameter_newton;
pub mod surface_closest_parameter_problem;
pub use surface_closest_parameter_newton::*;
pub use surface_closest_parameter_problem::*;

use argmin::core::{ArgminFloat, Executor, State};
use nalgebra::{Point2, Point3, Vector2};

use crate::{misc::FloatingPoint, surface::ParametricSurface};

/// Number of grid cells per direction used to seed the Newton iteration.
const SEED_DIVISIONS: usize = 8;

/// Find the closest parameter on a surface to a given point.
/// A coarse grid over the domain (plus the optional hint) seeds a damped Newton iteration.
pub fn find_surface_closest_parameter<T, S>(
    surface: &S,
    point: &Point3<T>,
    hint: Option<Point2<T>>,
) -> anyhow::Result<Point2<T>>
where
    T: FloatingPoint + ArgminFloat,
    S: ParametricSurface<T> + ?Sized,
{
    let ((u0, u1), (v0, v1)) = surface.domain();
    let divs = T::from_usize(SEED_DIVISIONS).ok_or(anyhow::anyhow!("invalid seed count"))?;
    let du = (u1 - u0) / divs;
    let dv = (v1 - v0) / divs;

    let mut seeds = hint.into_iter().collect::<Vec<_>>();
    for i in 0..=SEED_DIVISIONS {
        for j in 0..=SEED_DIVISIONS {
            let fi = T::from_usize(i).ok_or(anyhow::anyhow!("invalid index"))?;
            let fj = T::from_usize(j).ok_or(anyhow::anyhow!("invalid index"))?;
            seeds.push(Point2::new(u0 + du * fi, v0 + dv * fj));
        }
    }

    let mut best: Option<(T, Point2<T>)> = None;
    for seed in seeds {
        let d = (surface.point_at(&seed) - point).norm();
        match best {
            Some((min, _)) if min <= d => {}
            _ => best = Some((d, seed)),
        }
    }
    let (_, seed) = best.ok_or(anyhow::anyhow!("No seed parameter found"))?;

    let solver = SurfaceClosestParameterNewton::new(((u0, u1), (v0, v1)));
    let res = Executor::new(SurfaceClosestParameterProblem::new(point, surface), solver)
        .configure(|state| state.param(Vector2::new(seed.x, seed.y)).max_iters(32))
        .run()?;
    res.state()
        .get_best_param()
        .map(|p| Point2::new(p.x, p.y))
        .ok_or(anyhow::anyhow!("No best parameter found"))
}
