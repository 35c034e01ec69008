use argmin::{argmin_error_closure, core::*, float};
use nalgebra::{Matrix2, Vector2, Vector3};

use crate::misc::FloatingPoint;

/// Customized Newton's method for finding the closest parameter on a surface
/// Original source: https://argmin-rs.github.io/argmin/argmin/solver/newton/struct.Newton.html
#[derive(Clone, Copy)]
pub struct SurfaceClosestParameterNewton<F> {
    /// domain of the parameter
    domain: ((F, F), (F, F)),
    /// distance under which the iteration halts
    tolerance: F,
}

impl<F> SurfaceClosestParameterNewton<F>
where
    F: ArgminFloat,
{
    pub fn new(domain: ((F, F), (F, F))) -> Self {
        SurfaceClosestParameterNewton {
            domain,
            tolerance: float!(1e-12),
        }
    }
}

type NewtonState<F> = IterState<Vector2<F>, Vector2<F>, (), (), (), F>;

impl<O, F> Solver<O, NewtonState<F>> for SurfaceClosestParameterNewton<F>
where
    F: FloatingPoint + ArgminFloat,
    O: CostFunction<Param = Vector2<F>, Output = F>
        + Gradient<Param = Vector2<F>, Gradient = Vector3<F>>
        + Hessian<Param = Vector2<F>, Hessian = Vec<Vec<Vector3<F>>>>,
{
    const NAME: &'static str = "Surface closest parameter newton method";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: NewtonState<F>,
    ) -> Result<(NewtonState<F>, Option<KV>), Error> {
        let x0 = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            "Closest parameter newton requires an initial parameter."
        ))?;
        let cost = problem.cost(x0)?;
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: NewtonState<F>,
    ) -> Result<(NewtonState<F>, Option<KV>), Error> {
        let param = *state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            "Closest parameter newton requires an initial parameter."
        ))?;

        let dif = problem.gradient(&param)?;
        if dif.norm() < self.tolerance {
            return Ok((state.param(param), None));
        }

        let e = problem.hessian(&param)?;
        let s_u = &e[1][0];
        let s_v = &e[0][1];
        let s_uu = &e[2][0];
        let s_vv = &e[0][2];
        let s_uv = &e[1][1];

        let grad = Vector2::new(s_u.dot(&dif), s_v.dot(&dif));
        let j00 = s_u.dot(s_u) + s_uu.dot(&dif);
        let j01 = s_u.dot(s_v) + s_uv.dot(&dif);
        let j11 = s_v.dot(s_v) + s_vv.dot(&dif);
        let hessian = Matrix2::new(j00, j01, j01, j11);
        let delta = match hessian.lu().solve(&-grad) {
            Some(delta) => delta,
            // flat in one direction, fall back to gauss newton
            None => Matrix2::new(s_u.dot(s_u), s_u.dot(s_v), s_u.dot(s_v), s_v.dot(s_v))
                .lu()
                .solve(&-grad)
                .ok_or(anyhow::anyhow!("Singular surface jacobian"))?,
        };

        // halve the step until the distance decreases
        let mut gamma = F::one();
        let half: F = float!(0.5);
        for _ in 0..8 {
            let candidate = self.constrain(param + delta * gamma);
            let new_cost = problem.cost(&candidate)?;
            if new_cost < state.get_cost() {
                return Ok((state.cost(new_cost).param(candidate), None));
            }
            gamma *= half;
        }

        Ok((state.param(param), None))
    }

    fn terminate(&mut self, state: &NewtonState<F>) -> TerminationStatus {
        if state.iter > state.max_iters {
            return TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        }

        match (state.get_param(), state.get_prev_param()) {
            (Some(current_param), Some(prev_param)) => {
                let delta = (current_param - prev_param).norm();
                if delta < F::epsilon() {
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                } else {
                    TerminationStatus::NotTerminated
                }
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}

impl<F: FloatingPoint + ArgminFloat> SurfaceClosestParameterNewton<F> {
    fn constrain(&self, p: Vector2<F>) -> Vector2<F> {
        Vector2::new(
            clamp_to(p.x, self.domain.0),
            clamp_to(p.y, self.domain.1),
        )
    }
}

fn clamp_to<T: FloatingPoint>(parameter: T, domain: (T, T)) -> T {
    if parameter < domain.0 {
        domain.0
    } else if parameter > domain.1 {
        domain.1
    } else {
        parameter
    }
}
