use std::sync::Arc;

use itertools::Itertools;
use nalgebra::{Point2, Point3};

use crate::{
    curve::TrimCurve,
    error::{RegularizeError, Result},
    misc::{signed_area, FloatingPoint, PolygonBoundary},
    surface::ParametricSurface,
    topology::{EdgeId, Face, FaceId, Loop, Topology, VertexId},
};

use super::{
    candidate::{
        cast_boundary_ray, loop_parameter, select_cand_vx, BoundaryPoint, CandidateQuery,
    },
    corner::{curve_tangents, first_position, incident_edges, vertex_positions, CornerHints},
    division::{
        build_division_curve, get_closest_boundary_par, get_division_plane, DivisionCurve,
        DivisionPlane,
    },
    regularity::irregularity_measure,
    trim_config::check_trim_config,
    RegularizeOptions, Tolerances,
};

/// End point of a trim segment, either a vertex of the model or the division point
/// which only becomes a vertex when the split is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentVertex {
    Existing(VertexId),
    Division,
}

/// A piece of a trim loop of a sub-surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimSegment<T: FloatingPoint> {
    pub curve: TrimCurve<T>,
    pub start: SegmentVertex,
    pub end: SegmentVertex,
    /// edge of the divided face the segment comes from, `None` on the division curve
    pub parent: Option<EdgeId>,
    /// edge of a neighbouring face to link as twin
    pub twin: Option<EdgeId>,
}

impl<T: FloatingPoint> TrimSegment<T> {
    /// Segment covering an existing edge.
    pub fn from_edge(topo: &Topology<T>, edge: EdgeId) -> Result<Self> {
        let e = topo.edge(edge)?;
        Ok(Self {
            curve: e.curve().clone(),
            start: SegmentVertex::Existing(e.start()),
            end: SegmentVertex::Existing(e.end()),
            parent: Some(edge),
            twin: None,
        })
    }

    pub fn division(curve: TrimCurve<T>, start: SegmentVertex, end: SegmentVertex) -> Self {
        Self {
            curve,
            start,
            end,
            parent: None,
            twin: None,
        }
    }

    pub fn is_division(&self) -> bool {
        self.parent.is_none()
    }

    pub fn reversed(&self) -> Self {
        Self {
            curve: self.curve.reversed(),
            start: self.end,
            end: self.start,
            parent: self.parent,
            twin: None,
        }
    }
}

/// A trimmed region of a surface waiting to become a face, outer loop first.
#[derive(Debug, Clone)]
pub struct SubSurface<T: FloatingPoint> {
    pub surface: Arc<dyn ParametricSurface<T>>,
    pub loops: Vec<Vec<TrimSegment<T>>>,
}

impl<T: FloatingPoint> SubSurface<T> {
    /// Irregularity of the region if it became a face.
    /// `non_corners` and `fixed` override the tangent test like [`CornerHints`].
    pub fn irregularity(&self, angtol: T, non_corners: &[VertexId], fixed: &[VertexId]) -> usize {
        let mut corners = 0;
        let mut concave = 0;
        for segments in self.loops.iter() {
            for (a, b) in segments.iter().circular_tuple_windows() {
                let turn = curve_tangents(self.surface.as_ref(), &a.curve, &b.curve).turn();
                let is_corner = match b.start {
                    SegmentVertex::Existing(v) if fixed.contains(&v) => true,
                    SegmentVertex::Existing(v) if non_corners.contains(&v) => false,
                    _ => turn.abs() > angtol,
                };
                if is_corner {
                    corners += 1;
                    if turn < -angtol {
                        concave += 1;
                    }
                }
            }
        }
        irregularity_measure(self.loops.len(), corners, concave)
    }

    fn polygon(segments: &[TrimSegment<T>]) -> Vec<Point2<T>> {
        segments
            .iter()
            .flat_map(|s| {
                let points = s.curve.points();
                points[..points.len() - 1].to_vec()
            })
            .collect()
    }
}

/// Where a division ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitTarget<T: FloatingPoint> {
    Vertex(VertexId),
    /// a point inside a boundary edge
    Boundary(BoundaryPoint<T>),
}

/// Inputs of [`divide_vertex`].
#[derive(Debug, Clone)]
pub struct DivideRequest<'a, T: FloatingPoint> {
    pub face: FaceId,
    /// vertex to divide
    pub vertex: VertexId,
    /// split targets in order of preference
    pub candidates: &'a [VertexId],
    /// restrict the division to end inside this edge
    pub candidate_edge: Option<EdgeId>,
    /// current corners of the face, kept on the boundary of the results
    pub corners: &'a [VertexId],
    pub hints: &'a CornerHints,
    /// computed from the vertex when not given
    pub plane: Option<DivisionPlane<T>>,
    /// parameter rectangle restricting the candidate vertices
    pub domain: Option<(Point2<T>, Point2<T>)>,
    pub strong: bool,
}

impl<'a, T: FloatingPoint> DivideRequest<'a, T> {
    pub fn new(
        face: FaceId,
        vertex: VertexId,
        candidates: &'a [VertexId],
        corners: &'a [VertexId],
        hints: &'a CornerHints,
    ) -> Self {
        Self {
            face,
            vertex,
            candidates,
            candidate_edge: None,
            corners,
            hints,
            plane: None,
            domain: None,
            strong: false,
        }
    }

    pub fn with_candidate_edge(mut self, edge: EdgeId) -> Self {
        self.candidate_edge = Some(edge);
        self
    }

    pub fn with_plane(mut self, plane: DivisionPlane<T>) -> Self {
        self.plane = Some(plane);
        self
    }

    pub fn with_domain(mut self, min: Point2<T>, max: Point2<T>) -> Self {
        self.domain = Some((min, max));
        self
    }

    pub fn with_strong(mut self, strong: bool) -> Self {
        self.strong = strong;
        self
    }
}

/// A validated division of a face, not yet applied to the topology.
#[derive(Debug, Clone)]
pub struct DivisionPlan<T: FloatingPoint> {
    face: FaceId,
    vertex: VertexId,
    target: SplitTarget<T>,
    curve: DivisionCurve<T>,
    subs: Vec<SubSurface<T>>,
    /// twin of the split edge with the parameter of the split point on it
    twin_split: Option<(EdgeId, T)>,
    non_corners: Vec<VertexId>,
}

impl<T: FloatingPoint> DivisionPlan<T> {
    pub fn face(&self) -> FaceId {
        self.face
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    pub fn target(&self) -> &SplitTarget<T> {
        &self.target
    }

    pub fn curve(&self) -> &DivisionCurve<T> {
        &self.curve
    }

    pub fn sub_surfaces(&self) -> &[SubSurface<T>] {
        &self.subs
    }

    /// Summed irregularity of the faces the plan would create.
    pub fn irregularity(&self, angtol: T, hints: &CornerHints) -> usize {
        self.subs
            .iter()
            .map(|s| s.irregularity(angtol, &self.non_corners, &hints.fixed))
            .sum()
    }
}

/// Plan the division of a vertex: choose the target, build the division curve,
/// partition the loops and validate the resulting trim configuration.
/// The topology is left untouched.
pub fn plan_division<T: FloatingPoint>(
    topo: &Topology<T>,
    request: &DivideRequest<'_, T>,
    options: &RegularizeOptions<T>,
) -> Result<DivisionPlan<T>> {
    let tolerances = &options.tolerances;
    let (face, vertex) = (request.face, request.vertex);
    let f = topo.face(face)?;
    let surface = f.surface().clone();

    let plane = match request.plane {
        Some(p) => p,
        None => get_division_plane(topo, face, vertex, tolerances)?,
    };
    let uv0 = loop_parameter(topo, face, vertex)?;
    let direction = plane.direction(&surface.normal_at(&uv0));
    if direction.norm() <= T::default_epsilon() {
        return Err(RegularizeError::ToleranceConflict(format!(
            "division plane of {:?} is tangent to the surface",
            vertex
        )));
    }

    let target = select_target(topo, request, &direction, options)?;
    let (uv1, other_pt) = match &target {
        SplitTarget::Vertex(w) => (loop_parameter(topo, face, *w)?, *topo.vertex(*w)?.position()),
        SplitTarget::Boundary(b) => (b.uv, b.point),
    };

    let curve = build_division_curve(surface.as_ref(), &uv0, &uv1, tolerances, &options.division)?;
    let chord = match &curve {
        DivisionCurve::Straight(c) | DivisionCurve::General(c) => c.clone(),
        DivisionCurve::Unresolved(reason) => {
            return Err(RegularizeError::ToleranceConflict(reason.clone()))
        }
    };
    let half: T = nalgebra::convert(0.5);
    let mid = surface.point_at(&chord.point_at(half));
    if let Some(closest) =
        get_closest_boundary_par(topo, face, Some(vertex), &mid, tolerances.epsge, None)?
    {
        if closest.distance <= tolerances.tol2 {
            return Err(RegularizeError::ToleranceConflict(format!(
                "division of {:?} runs along {:?}",
                vertex, closest.edge
            )));
        }
    }

    let end = match &target {
        SplitTarget::Vertex(w) => SegmentVertex::Existing(*w),
        SplitTarget::Boundary(_) => SegmentVertex::Division,
    };
    let forward = TrimSegment::division(chord, SegmentVertex::Existing(vertex), end);
    let backward = forward.reversed();

    let loops = f
        .loops()
        .iter()
        .map(|l| {
            l.edges()
                .iter()
                .map(|e| TrimSegment::from_edge(topo, *e))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    let (lv, p) = first_position(topo, face, vertex)?;

    let (produced, touched, twin_split) = match &target {
        SplitTarget::Vertex(w) => {
            let (lw, q) = first_position(topo, face, *w)?;
            let produced = if lw == lv {
                let l = &loops[lv];
                vec![
                    [cyclic_run(l, p, q), vec![backward]].concat(),
                    [cyclic_run(l, q, p), vec![forward]].concat(),
                ]
            } else {
                vec![[
                    cyclic_run(&loops[lv], p, p),
                    vec![forward],
                    cyclic_run(&loops[lw], q, q),
                    vec![backward],
                ]
                .concat()]
            };
            (produced, vec![lv, lw], None)
        }
        SplitTarget::Boundary(b) => {
            let (le, q) = topo.loop_of(face, b.edge).ok_or_else(|| {
                RegularizeError::TopologyInconsistency(format!(
                    "{:?} does not bound {:?}",
                    b.edge, face
                ))
            })?;
            let e = topo.edge(b.edge)?;
            let (c0, c1) = e.curve().try_split_at(b.parameter)?;
            let head = TrimSegment {
                curve: c0,
                start: SegmentVertex::Existing(e.start()),
                end: SegmentVertex::Division,
                parent: Some(b.edge),
                twin: None,
            };
            let tail = TrimSegment {
                curve: c1,
                start: SegmentVertex::Division,
                end: SegmentVertex::Existing(e.end()),
                parent: Some(b.edge),
                twin: None,
            };
            let n = loops[le].len();
            let produced = if le == lv {
                let l = &loops[lv];
                vec![
                    [cyclic_run(l, p, q), vec![head, backward]].concat(),
                    [vec![tail], cyclic_run(l, (q + 1) % n, p), vec![forward]].concat(),
                ]
            } else {
                vec![[
                    cyclic_run(&loops[lv], p, p),
                    vec![forward, tail],
                    cyclic_run(&loops[le], (q + 1) % n, q),
                    vec![head, backward],
                ]
                .concat()]
            };
            let twin_split = match e.twin() {
                Some(twin) => Some((twin, twin_parameter(topo, twin, &b.point, b.parameter)?)),
                None => None,
            };
            (produced, vec![lv, le], twin_split)
        }
    };

    let untouched = loops
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !touched.contains(i))
        .map(|(_, l)| l);
    let subs = assign_loops(&surface, produced.into_iter().chain(untouched).collect())?;

    for sub in subs.iter() {
        check_trim_config(topo, sub, vertex, &other_pt, tolerances.epsge)?;
    }

    let chord_ends = match &target {
        SplitTarget::Vertex(w) => vec![vertex, *w],
        SplitTarget::Boundary(_) => vec![vertex],
    };
    let non_corners = f
        .non_corners()
        .iter()
        .chain(request.hints.non_corners.iter())
        .filter(|v| !chord_ends.contains(*v))
        .cloned()
        .unique()
        .collect_vec();

    Ok(DivisionPlan {
        face,
        vertex,
        target,
        curve,
        subs,
        twin_split,
        non_corners,
    })
}

/// Segments of a loop from index `from` up to, not including, `to`; `from == to` walks the whole loop.
fn cyclic_run<T: FloatingPoint>(
    segments: &[TrimSegment<T>],
    from: usize,
    to: usize,
) -> Vec<TrimSegment<T>> {
    let n = segments.len();
    let count = match (to + n - from) % n {
        0 => n,
        c => c,
    };
    (0..count)
        .map(|i| segments[(from + i) % n].clone())
        .collect()
}

/// Parameter on `twin` of the point splitting its partner at `parameter`.
fn twin_parameter<T: FloatingPoint>(
    topo: &Topology<T>,
    twin: EdgeId,
    point: &Point3<T>,
    parameter: T,
) -> Result<T> {
    let te = topo.edge(twin)?;
    let surface = topo.face(te.face())?.surface();
    let hint = te.curve().point_at(T::one() - parameter);
    let uv = surface.closest_parameter(point, Some(hint))?;
    let (t, _) = te.curve().closest_parameter(&uv);
    if t <= T::zero() || t >= T::one() {
        return Err(RegularizeError::TopologyInconsistency(format!(
            "split point does not fall inside the twin {:?}",
            twin
        )));
    }
    Ok(t)
}

/// Group loops into sub-surfaces: counter-clockwise loops bound new regions and
/// every clockwise loop becomes a hole of the smallest region containing it.
fn assign_loops<T: FloatingPoint>(
    surface: &Arc<dyn ParametricSurface<T>>,
    loops: Vec<Vec<TrimSegment<T>>>,
) -> Result<Vec<SubSurface<T>>> {
    let (outers, holes): (Vec<_>, Vec<_>) = loops
        .into_iter()
        .partition(|l| signed_area(&SubSurface::polygon(l)) > T::zero());
    if outers.is_empty() {
        return Err(RegularizeError::TopologyInconsistency(
            "division leaves no outer loop".to_string(),
        ));
    }

    let boundaries = outers
        .iter()
        .map(|l| PolygonBoundary::new(SubSurface::polygon(l)))
        .collect_vec();
    let mut subs = outers
        .into_iter()
        .map(|l| SubSurface {
            surface: surface.clone(),
            loops: vec![l],
        })
        .collect_vec();

    let half: T = nalgebra::convert(0.5);
    for hole in holes {
        let probe = hole
            .iter()
            .find(|s| !s.is_division())
            .or(hole.first())
            .map(|s| s.curve.point_at(half))
            .ok_or_else(|| {
                RegularizeError::TopologyInconsistency("empty hole loop".to_string())
            })?;
        let container = boundaries
            .iter()
            .enumerate()
            .filter(|(_, b)| b.contains(&probe))
            .min_by(|(_, a), (_, b)| {
                a.area()
                    .abs()
                    .partial_cmp(&b.area().abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .ok_or_else(|| {
                RegularizeError::TopologyInconsistency(format!(
                    "hole around {:?} lies outside every region",
                    probe
                ))
            })?;
        subs[container].loops.push(hole);
    }
    Ok(subs)
}

fn select_target<T: FloatingPoint>(
    topo: &Topology<T>,
    request: &DivideRequest<'_, T>,
    direction: &nalgebra::Vector3<T>,
    options: &RegularizeOptions<T>,
) -> Result<SplitTarget<T>> {
    let (face, vertex) = (request.face, request.vertex);
    if let Some(edge) = request.candidate_edge {
        let hit = cast_boundary_ray(topo, face, vertex, direction, Some(edge))?.ok_or_else(|| {
            RegularizeError::ToleranceConflict(format!(
                "division of {:?} does not reach {:?}",
                vertex, edge
            ))
        })?;
        return snap_to_vertex(topo, face, vertex, hit, &options.tolerances);
    }

    let query = CandidateQuery {
        face,
        vertex,
        in_vec: *direction,
        candidates: request.candidates,
        corners: request.corners,
        strong: request.strong,
        domain: request.domain,
    };
    if let Some(i) = select_cand_vx(topo, &query, &options.candidate, &options.tolerances)? {
        return Ok(SplitTarget::Vertex(request.candidates[i]));
    }

    let hit = cast_boundary_ray(topo, face, vertex, direction, None)?.ok_or_else(|| {
        RegularizeError::ToleranceConflict(format!("no split target for {:?}", vertex))
    })?;
    log::debug!(
        "no candidate accepted for {:?}, dividing towards {:?} on {:?}",
        vertex,
        hit.point,
        hit.edge
    );
    snap_to_vertex(topo, face, vertex, hit, &options.tolerances)
}

/// Replace a boundary hit close to an end of its edge by that end vertex.
fn snap_to_vertex<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    hit: BoundaryPoint<T>,
    tolerances: &Tolerances<T>,
) -> Result<SplitTarget<T>> {
    let e = topo.edge(hit.edge)?;
    for w in [e.start(), e.end()] {
        if (topo.vertex(w)?.position() - hit.point).norm() > tolerances.tol2 {
            continue;
        }
        let adjacent = w == vertex
            || incident_edges(topo, face, vertex)?
                .into_iter()
                .any(|i| topo.edge(i).is_ok_and(|i| i.is_incident(w)));
        if adjacent || vertex_positions(topo, face, w)?.len() != 1 {
            return Err(RegularizeError::ToleranceConflict(format!(
                "division of {:?} ends at the unusable vertex {:?}",
                vertex, w
            )));
        }
        return Ok(SplitTarget::Vertex(w));
    }
    Ok(SplitTarget::Boundary(hit))
}

/// Apply a plan: create the division vertex, split the twin of a divided edge,
/// create the new faces and supersede the divided one.
///
/// Every entity the plan refers to is looked up before the topology is touched, so a plan
/// that went stale (its face already divided, its edges gone) fails without changes.
pub fn commit_division<T: FloatingPoint>(
    topo: &mut Topology<T>,
    plan: DivisionPlan<T>,
) -> Result<Vec<FaceId>> {
    check_plan(topo, &plan)?;
    let DivisionPlan {
        face,
        vertex,
        target,
        mut subs,
        twin_split,
        non_corners,
        ..
    } = plan;

    let division_vertex = match &target {
        SplitTarget::Boundary(b) => Some((topo.add_vertex(b.point), b.edge)),
        SplitTarget::Vertex(_) => None,
    };

    if let (Some((v, split)), Some((twin, t))) = (division_vertex, twin_split) {
        let neighbour = topo.edge(twin)?.face();
        // the twin runs backwards: its first half pairs with the second half of the split edge
        let (ta, tb) = topo.split_edge(twin, t, v)?;
        for segment in subs.iter_mut().flat_map(|s| s.loops.iter_mut().flatten()) {
            if segment.parent == Some(split) {
                segment.twin = Some(match segment.end {
                    SegmentVertex::Division => tb,
                    SegmentVertex::Existing(_) => ta,
                });
            }
        }
        let mut straight = topo.face(neighbour)?.non_corners().to_vec();
        straight.push(v);
        topo.face_mut(neighbour)?.set_non_corners(straight);
    }

    let created = create_faces(
        topo,
        &subs,
        face,
        division_vertex.map(|(v, _)| v),
        &non_corners,
    )?;
    topo.supersede(face, created.clone())?;
    log::debug!("divided {:?} at {:?} into {:?}", face, vertex, created);
    Ok(created)
}

/// Whether a plan still matches the topology it was made from.
fn check_plan<T: FloatingPoint>(topo: &Topology<T>, plan: &DivisionPlan<T>) -> Result<()> {
    let f = topo.face(plan.face)?;
    if !f.is_active() {
        return Err(RegularizeError::TopologyInconsistency(format!(
            "{:?} was already divided",
            plan.face
        )));
    }
    topo.vertex(plan.vertex)?;

    let mut edges = vec![];
    for segment in plan.subs.iter().flat_map(|s| s.loops.iter().flatten()) {
        edges.extend(segment.parent);
        edges.extend(segment.twin);
        for label in [segment.start, segment.end] {
            if let SegmentVertex::Existing(v) = label {
                topo.vertex(v)?;
            }
        }
    }
    if let SplitTarget::Boundary(b) = &plan.target {
        edges.push(b.edge);
    }
    if let Some((twin, t)) = plan.twin_split {
        if t <= T::zero() || t >= T::one() {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "split parameter {:?} lies outside {:?}",
                t, twin
            )));
        }
        edges.push(twin);
    }
    for e in edges {
        let edge = topo.edge(e)?;
        if topo.loop_of(edge.face(), e).is_none() {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "{:?} no longer bounds {:?}",
                e,
                edge.face()
            )));
        }
    }
    Ok(())
}

/// Divide a face at a vertex, the top level operation of the engine.
/// Returns the one or two faces replacing `request.face`; on error the topology is unchanged.
pub fn divide_vertex<T: FloatingPoint>(
    topo: &mut Topology<T>,
    request: &DivideRequest<'_, T>,
    options: &RegularizeOptions<T>,
) -> Result<Vec<FaceId>> {
    let plan = plan_division(topo, request, options)?;
    commit_division(topo, plan)
}

/// Turn sub-surfaces into faces of the topology.
/// Edges inherit the twin of the edge they come from; the two sides of a division curve
/// become twins of each other.
pub fn create_faces<T: FloatingPoint>(
    topo: &mut Topology<T>,
    subs: &[SubSurface<T>],
    original: FaceId,
    division_vertex: Option<VertexId>,
    non_corners: &[VertexId],
) -> Result<Vec<FaceId>> {
    let resolve = |label: SegmentVertex| match label {
        SegmentVertex::Existing(v) => Ok(v),
        SegmentVertex::Division => division_vertex.ok_or_else(|| {
            RegularizeError::TopologyInconsistency(
                "segment ends at a division point which was not created".to_string(),
            )
        }),
    };

    let mut created = vec![];
    let mut division_edges = vec![];
    for sub in subs {
        let id = topo.insert_face(Face::new(sub.surface.clone(), Some(original)));
        let mut loops = vec![];
        for segments in sub.loops.iter() {
            let mut edges = vec![];
            for s in segments {
                let e = topo.add_edge(id, resolve(s.start)?, resolve(s.end)?, s.curve.clone())?;
                let inherited = match (s.twin, s.parent) {
                    (Some(twin), _) => Some(twin),
                    (None, Some(parent)) => {
                        let twin = topo.edge(parent)?.twin();
                        if twin.is_some() {
                            topo.edge_mut(parent)?.set_twin(None);
                        }
                        twin
                    }
                    (None, None) => None,
                };
                if let Some(twin) = inherited {
                    topo.link_twins(e, twin)?;
                }
                if s.is_division() {
                    division_edges.push(e);
                }
                edges.push(e);
            }
            loops.push(Loop::new(edges));
        }
        let f = topo.face_mut(id)?;
        *f.loops_mut() = loops;
        f.set_non_corners(non_corners.to_vec());
        created.push(id);
    }

    for (a, b) in division_edges.iter().tuple_combinations() {
        let (ea, eb) = (topo.edge(*a)?, topo.edge(*b)?);
        if ea.twin().is_none() && ea.start() == eb.end() && ea.end() == eb.start() {
            topo.link_twins(*a, *b)?;
        }
    }
    Ok(created)
}
