use itertools::Itertools;
use nalgebra::{Point2, Point3, Vector2, Vector3};

use crate::{
    error::{RegularizeError, Result},
    misc::{angle_between, segment_closest_point, FloatingPoint, Line, PolygonBoundary, Ray},
    topology::{EdgeId, FaceId, Topology, VertexId},
};

use super::{
    corner::{first_position, incident_edges, normalize_or_zero, vertex_positions, vertex_tangents},
    path::corner_in_shortest_path,
    CandidateOptions, Tolerances,
};

/// A point on the interior or the end of a boundary edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPoint<T: FloatingPoint> {
    pub edge: EdgeId,
    /// normalized parameter on the edge's curve
    pub parameter: T,
    pub uv: Point2<T>,
    pub point: Point3<T>,
    /// 3D distance from the vertex the search started at
    pub distance: T,
}

/// Inward direction at a vertex, the bisector of the boundary tangents turned into the face.
/// When the tangents are parallel within `angtol` the direction is the surface normal crossed
/// with the outgoing tangent, pointing to the left of the boundary.
pub fn get_in_vec<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    angtol: T,
) -> Result<Vector3<T>> {
    let (loop_index, position) = first_position(topo, face, vertex)?;
    in_vec_at(topo, face, loop_index, position, angtol)
}

pub(crate) fn in_vec_at<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    loop_index: usize,
    position: usize,
    angtol: T,
) -> Result<Vector3<T>> {
    let tangents = vertex_tangents(topo, face, loop_index, position)?;
    let deviation = angle_between(&tangents.incoming, &tangents.outgoing);
    let v = if tangents.is_straight(angtol) {
        tangents.normal.cross(&tangents.outgoing)
    } else if deviation > T::pi() - angtol {
        // the boundary folds back, continue past the tip
        tangents.incoming
    } else {
        let bisector = tangents.outgoing - tangents.incoming;
        if tangents.turn() < T::zero() {
            -bisector
        } else {
            bisector
        }
    };
    Ok(normalize_or_zero(v))
}

/// Parameter of a vertex at its first occurrence on the face boundary.
pub(crate) fn loop_parameter<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
) -> Result<Point2<T>> {
    let (loop_index, position) = first_position(topo, face, vertex)?;
    let e = topo.face(face)?.loops()[loop_index].edge_at(position as isize);
    Ok(topo.edge(e)?.curve().start())
}

/// Cast a ray from a vertex along `direction` in parameter space and return the nearest hit
/// on an edge not incident to the vertex. Equal hits keep the earliest edge in loop order.
pub fn get_opposite_boundary_par<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    direction: &Vector3<T>,
) -> Result<Option<BoundaryPoint<T>>> {
    cast_boundary_ray(topo, face, vertex, direction, None)
}

/// Nearest ray hit on the boundary, restricted to `only` when given.
pub(crate) fn cast_boundary_ray<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    direction: &Vector3<T>,
    only: Option<EdgeId>,
) -> Result<Option<BoundaryPoint<T>>> {
    let f = topo.face(face)?;
    let surface = f.surface();
    let uv0 = loop_parameter(topo, face, vertex)?;
    let Some(dir) = surface.to_parameter_direction(&uv0, direction) else {
        return Err(RegularizeError::ToleranceConflict(format!(
            "surface is singular at {:?}",
            vertex
        )));
    };
    let ray = Ray::new(uv0, dir);
    let incident = incident_edges(topo, face, vertex)?;
    let origin = *topo.vertex(vertex)?.position();

    let mut best: Option<(T, BoundaryPoint<T>)> = None;
    for l in f.loops() {
        for e in l.edges() {
            if incident.contains(e) || only.is_some_and(|o| o != *e) {
                continue;
            }
            let curve = topo.edge(*e)?.curve();
            for (tr, tc) in curve.intersect_ray(&ray) {
                if tr <= T::default_epsilon() {
                    continue;
                }
                if best.as_ref().is_some_and(|(bt, _)| *bt <= tr) {
                    continue;
                }
                let uv = curve.point_at(tc);
                let point = surface.point_at(&uv);
                best = Some((
                    tr,
                    BoundaryPoint {
                        edge: *e,
                        parameter: tc,
                        uv,
                        point,
                        distance: (point - origin).norm(),
                    },
                ));
            }
        }
    }
    Ok(best.map(|(_, b)| b))
}

/// Inputs of a split target selection.
#[derive(Debug, Clone)]
pub struct CandidateQuery<'a, T: FloatingPoint> {
    pub face: FaceId,
    /// vertex to divide
    pub vertex: VertexId,
    /// 3D direction the division should follow
    pub in_vec: Vector3<T>,
    /// pool of split targets, earlier entries win ties
    pub candidates: &'a [VertexId],
    /// corners of the face which must stay on the boundary of the results
    pub corners: &'a [VertexId],
    /// widen the angular acceptance
    pub strong: bool,
    /// parameter rectangle `(min, max)` the candidates must lie in, widened by `tol2`
    pub domain: Option<(Point2<T>, Point2<T>)>,
}

/// Select the best split target for a vertex among the candidates.
/// Returns the index of the chosen candidate, or `None` when every candidate is rejected.
pub fn select_cand_vx<T: FloatingPoint>(
    topo: &Topology<T>,
    query: &CandidateQuery<'_, T>,
    options: &CandidateOptions<T>,
    tolerances: &Tolerances<T>,
) -> Result<Option<usize>> {
    let face = query.face;
    let f = topo.face(face)?;
    let surface = f.surface();
    let uv0 = loop_parameter(topo, face, query.vertex)?;
    let p0 = *topo.vertex(query.vertex)?.position();
    let dir_uv = surface.to_parameter_direction(&uv0, &query.in_vec);

    let adjacent = incident_edges(topo, face, query.vertex)?
        .into_iter()
        .map(|e| topo.edge(e).map(|e| e.opposite(query.vertex)))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect_vec();

    let polygons = f
        .loops()
        .iter()
        .map(|l| {
            l.edges()
                .iter()
                .map(|e| {
                    topo.edge(*e).map(|e| {
                        let points = e.curve().points();
                        points[..points.len() - 1].to_vec()
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(|p| p.concat())
        })
        .collect::<Result<Vec<_>>>()?;
    let boundary = polygons
        .iter()
        .flat_map(|p| {
            p.iter()
                .circular_tuple_windows()
                .map(|(a, b)| Line::new(*a, *b))
        })
        .collect_vec();
    let outer = PolygonBoundary::new(polygons[0].clone());
    let holes = polygons[1..]
        .iter()
        .map(|p| PolygonBoundary::new(p.clone()))
        .collect_vec();

    let domain = query.domain.map(|(lo, hi)| {
        let margin = Vector2::repeat(tolerances.tol2);
        (lo.inf(&hi) - margin, lo.sup(&hi) + margin)
    });

    let positions = f
        .loops()
        .iter()
        .flat_map(|l| l.edges().iter())
        .map(|e| {
            topo.edge(*e)
                .and_then(|e| topo.vertex(e.start()).map(|v| *v.position()))
        })
        .collect::<Result<Vec<_>>>()?;
    let (plo, phi) = bounding_box(positions.iter());
    let scale = {
        let d = (phi - plo).norm();
        if d > T::default_epsilon() {
            d
        } else {
            T::one()
        }
    };

    let ideal = match get_opposite_boundary_par(topo, face, query.vertex, &query.in_vec) {
        Ok(Some(b)) => b.point,
        _ => p0 + query.in_vec * scale,
    };
    let max_angle = options.max_angle(query.strong);
    let half: T = nalgebra::convert(0.5);

    let mut best: Option<(T, usize)> = None;
    for (i, c) in query.candidates.iter().enumerate() {
        if *c == query.vertex || adjacent.contains(c) {
            continue;
        }
        let occurrences = vertex_positions(topo, face, *c)?;
        if occurrences.len() != 1 {
            // absent from the face or visited twice by a slit
            continue;
        }
        if corner_in_shortest_path(topo, face, query.corners, query.vertex, *c)? {
            continue;
        }

        let uv = loop_parameter(topo, face, *c)?;
        let inside = domain.map_or(true, |(lo, hi)| {
            uv.x >= lo.x && uv.x <= hi.x && uv.y >= lo.y && uv.y <= hi.y
        });
        let ahead = dir_uv.map_or(true, |d| (uv - uv0).dot(&d) > T::zero());
        if !inside || !ahead {
            continue;
        }

        let chord = Line::new(uv0, uv);
        if boundary.iter().any(|b| chord.crosses(b)) {
            continue;
        }
        let mid = uv0 + (uv - uv0) * half;
        if !outer.contains(&mid) || holes.iter().any(|h| h.contains(&mid)) {
            continue;
        }
        let grazes = polygons.iter().flatten().any(|w| {
            if (w - uv0).norm() <= tolerances.tol2 || (w - uv).norm() <= tolerances.tol2 {
                return false;
            }
            let (_, closest) = segment_closest_point(w, &uv0, &uv, T::zero(), T::one());
            (closest - w).norm() <= tolerances.tol2
        });
        if grazes {
            continue;
        }

        let pc = *topo.vertex(*c)?.position();
        let angle = angle_between(&(pc - p0), &query.in_vec);
        if angle > max_angle {
            continue;
        }

        let score = options.distance_weight * (pc - ideal).norm() / scale
            + options.angle_weight * angle / max_angle;
        match best {
            Some((s, _)) if s <= score => {}
            _ => best = Some((score, i)),
        }
    }

    if let Some((score, i)) = best {
        log::debug!(
            "selected {:?} for {:?} with score {:?}",
            query.candidates[i],
            query.vertex,
            score
        );
    }
    Ok(best.map(|(_, i)| i))
}

fn bounding_box<'a, T: FloatingPoint>(
    points: impl Iterator<Item = &'a Point3<T>>,
) -> (Point3<T>, Point3<T>) {
    let mut it = points.peekable();
    let first = it.peek().cloned().cloned().unwrap_or_else(Point3::origin);
    it.fold((first, first), |(lo, hi), p| (lo.inf(p), hi.sup(p)))
}
