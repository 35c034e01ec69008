use nalgebra::{Point2, Point3, Vector3};

use crate::{
    curve::TrimCurve,
    error::{RegularizeError, Result},
    misc::{angle_between, segment_closest_point, FloatingPoint},
    surface::ParametricSurface,
    topology::{EdgeId, FaceId, Topology, VertexId},
};

use super::{
    candidate::{get_in_vec, loop_parameter},
    corner::{incident_edges, normalize_or_zero},
    DivisionOptions, Tolerances,
};

/// Plane through a vertex containing the inward direction and the surface normal there.
/// The division curve follows the intersection of this plane with the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivisionPlane<T: FloatingPoint> {
    pub point: Point3<T>,
    pub normal: Vector3<T>,
    pub in_vec: Vector3<T>,
}

impl<T: FloatingPoint> DivisionPlane<T> {
    /// Signed distance of a point from the plane.
    pub fn distance(&self, p: &Point3<T>) -> T {
        (p - self.point).dot(&self.normal)
    }

    /// Direction of the division on a surface with normal `surface_normal`,
    /// oriented along the inward direction.
    pub fn direction(&self, surface_normal: &Vector3<T>) -> Vector3<T> {
        let d = normalize_or_zero(self.normal.cross(surface_normal));
        if d.dot(&self.in_vec) < T::zero() {
            -d
        } else {
            d
        }
    }
}

pub fn get_division_plane<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    tolerances: &Tolerances<T>,
) -> Result<DivisionPlane<T>> {
    let in_vec = get_in_vec(topo, face, vertex, tolerances.angtol)?;
    let uv = loop_parameter(topo, face, vertex)?;
    let surface = topo.face(face)?.surface();
    let n = normalize_or_zero(surface.normal_at(&uv));
    let normal = n.cross(&in_vec);
    if normal.norm() <= T::default_epsilon() {
        return Err(RegularizeError::ToleranceConflict(format!(
            "inward direction at {:?} is parallel to the surface normal",
            vertex
        )));
    }
    Ok(DivisionPlane {
        point: *topo.vertex(vertex)?.position(),
        normal: normal.normalize(),
        in_vec,
    })
}

/// Outcome of building a curve between two parameter points.
#[derive(Debug, Clone, PartialEq)]
pub enum DivisionCurve<T: FloatingPoint> {
    /// the straight parameter line maps to a straight 3D segment
    Straight(TrimCurve<T>),
    /// polyline through the projections of the 3D chord
    General(TrimCurve<T>),
    Unresolved(String),
}

impl<T: FloatingPoint> DivisionCurve<T> {
    pub fn curve(&self) -> Option<&TrimCurve<T>> {
        match self {
            DivisionCurve::Straight(c) | DivisionCurve::General(c) => Some(c),
            DivisionCurve::Unresolved(_) => None,
        }
    }

    pub fn into_curve(self) -> Result<TrimCurve<T>> {
        match self {
            DivisionCurve::Straight(c) | DivisionCurve::General(c) => Ok(c),
            DivisionCurve::Unresolved(reason) => Err(RegularizeError::ToleranceConflict(reason)),
        }
    }
}

/// Straight parameter segment whose image stays within `epsge` of its 3D chord.
fn straight_between<T: FloatingPoint>(
    surface: &dyn ParametricSurface<T>,
    uv0: &Point2<T>,
    uv1: &Point2<T>,
    epsge: T,
    samples: usize,
) -> Option<TrimCurve<T>> {
    if (uv1 - uv0).norm() <= T::default_epsilon() {
        return None;
    }
    let p0 = surface.point_at(uv0);
    let p1 = surface.point_at(uv1);
    let n = T::from_usize(samples + 1)?;
    let straight = (1..=samples).all(|k| {
        let s = T::from_usize(k).unwrap_or(T::zero()) / n;
        let p = surface.point_at(&(uv0 + (uv1 - uv0) * s));
        let (_, q) = segment_closest_point(&p, &p0, &p1, T::zero(), T::one());
        (p - q).norm() <= epsge
    });
    straight.then(|| TrimCurve::line(*uv0, *uv1))
}

/// Straight trim curve between two vertices of a face, if the parameter line between
/// them maps to a straight segment within `epsge`.
pub fn check_straight_par_cv<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vx1: VertexId,
    vx2: VertexId,
    epsge: T,
    samples: usize,
) -> Result<Option<TrimCurve<T>>> {
    let uv0 = loop_parameter(topo, face, vx1)?;
    let uv1 = loop_parameter(topo, face, vx2)?;
    let surface = topo.face(face)?.surface();
    Ok(straight_between(surface.as_ref(), &uv0, &uv1, epsge, samples))
}

/// Same as [`check_straight_par_cv`] towards an arbitrary point of the face,
/// `None` when the point is farther than `epsge` from the surface.
pub fn check_straight_par_cv_to_point<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vx1: VertexId,
    mid: &Point3<T>,
    epsge: T,
    samples: usize,
) -> Result<Option<TrimCurve<T>>> {
    let uv0 = loop_parameter(topo, face, vx1)?;
    let surface = topo.face(face)?.surface();
    let uv1 = surface.closest_parameter(mid, None)?;
    if (surface.point_at(&uv1) - mid).norm() > epsge {
        return Ok(None);
    }
    Ok(straight_between(surface.as_ref(), &uv0, &uv1, epsge, samples))
}

/// Build the curve dividing a face between two parameter points.
pub fn build_division_curve<T: FloatingPoint>(
    surface: &dyn ParametricSurface<T>,
    uv0: &Point2<T>,
    uv1: &Point2<T>,
    tolerances: &Tolerances<T>,
    options: &DivisionOptions,
) -> Result<DivisionCurve<T>> {
    if let Some(c) = straight_between(surface, uv0, uv1, tolerances.epsge, options.straight_samples)
    {
        return Ok(DivisionCurve::Straight(c));
    }

    let p0 = surface.point_at(uv0);
    let p1 = surface.point_at(uv1);
    let n = options.general_samples.max(2);
    let fraction = |k: usize| T::from_usize(k).unwrap_or(T::zero()) / T::from_usize(n).unwrap_or(T::one());
    let mut points = vec![*uv0];
    for k in 1..n {
        let s = fraction(k);
        let target = p0 + (p1 - p0) * s;
        let hint = uv0 + (uv1 - uv0) * s;
        points.push(surface.closest_parameter(&target, Some(hint))?);
    }
    points.push(*uv1);

    let images = points.iter().map(|uv| surface.point_at(uv)).collect::<Vec<_>>();
    for w in images.windows(3) {
        let turn = angle_between(&(w[1] - w[0]), &(w[2] - w[1]));
        if turn > tolerances.bend {
            return Ok(DivisionCurve::Unresolved(format!(
                "division curve bends by {:?} at {:?}",
                turn, w[1]
            )));
        }
    }

    match TrimCurve::try_polyline(&points) {
        Ok(c) => Ok(DivisionCurve::General(c)),
        Err(e) => Ok(DivisionCurve::Unresolved(e.to_string())),
    }
}

/// Nearest boundary location of a face to a 3D point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestBoundary<T: FloatingPoint> {
    /// index in the face's boundary curve list, see [`Topology::boundary_curves`]
    pub index: usize,
    pub edge: EdgeId,
    pub parameter: T,
    pub uv: Point2<T>,
    pub point: Point3<T>,
    pub distance: T,
}

/// Find the boundary curve of a face closest to `point`, skipping curves incident to `vertex`.
/// Searches one loop when `loop_index` is given. Distances within `epsge` of each other
/// keep the earliest curve.
pub fn get_closest_boundary_par<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: Option<VertexId>,
    point: &Point3<T>,
    epsge: T,
    loop_index: Option<usize>,
) -> Result<Option<ClosestBoundary<T>>> {
    let surface = topo.face(face)?.surface();
    let uv = surface.closest_parameter(point, None)?;
    let skip = match vertex {
        Some(v) => incident_edges(topo, face, v)?,
        None => vec![],
    };

    let mut best: Option<ClosestBoundary<T>> = None;
    for (index, (edge, curve)) in topo.boundary_curves(face, loop_index)?.into_iter().enumerate() {
        if skip.contains(&edge) {
            continue;
        }
        let (parameter, closest) = curve.closest_parameter(&uv);
        let p = surface.point_at(&closest);
        let distance = (p - point).norm();
        if best.as_ref().is_some_and(|b| b.distance <= distance + epsge) {
            continue;
        }
        best = Some(ClosestBoundary {
            index,
            edge,
            parameter,
            uv: closest,
            point: p,
            distance,
        });
    }
    Ok(best)
}
