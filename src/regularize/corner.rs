use nalgebra::Vector3;

use crate::{
    curve::TrimCurve,
    error::{RegularizeError, Result},
    misc::{angle_between, signed_angle, FloatingPoint},
    surface::ParametricSurface,
    topology::{EdgeId, FaceId, Topology, VertexId},
};

/// Vertices whose classification is decided by the caller instead of the tangent test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CornerHints {
    /// known to be no corners, e.g. vertices created on a straight boundary by an earlier split
    pub non_corners: Vec<VertexId>,
    /// always corners, e.g. T-joints of a face set
    pub fixed: Vec<VertexId>,
}

impl CornerHints {
    pub fn new(non_corners: Vec<VertexId>) -> Self {
        Self {
            non_corners,
            fixed: vec![],
        }
    }

    pub fn with_fixed(mut self, fixed: Vec<VertexId>) -> Self {
        self.fixed = fixed;
        self
    }
}

/// Classification of one vertex occurrence in a loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopCorner<T: FloatingPoint> {
    pub vertex: VertexId,
    /// index of the outgoing edge in the loop
    pub position: usize,
    /// signed turning angle around the surface normal, negative for right turns
    pub turn: T,
    pub is_corner: bool,
}

impl<T: FloatingPoint> LoopCorner<T> {
    /// Unsigned deviation from a straight continuation.
    pub fn deviation(&self) -> T {
        self.turn.abs()
    }

    /// Angle inside the trimmed region, above pi for reflex corners.
    pub fn interior_angle(&self) -> T {
        T::pi() - self.turn
    }

    /// A corner turning right by more than `angtol`.
    pub fn is_concave(&self, angtol: T) -> bool {
        self.is_corner && self.turn < -angtol
    }
}

/// Tangents of the boundary at a vertex, mapped to 3D.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VertexTangents<T: FloatingPoint> {
    pub incoming: Vector3<T>,
    pub outgoing: Vector3<T>,
    pub normal: Vector3<T>,
}

impl<T: FloatingPoint> VertexTangents<T> {
    pub fn turn(&self) -> T {
        signed_angle(&self.incoming, &self.outgoing, &self.normal)
    }

    /// Whether incoming and outgoing tangents are parallel within `angtol`.
    pub fn is_straight(&self, angtol: T) -> bool {
        angle_between(&self.incoming, &self.outgoing) <= angtol
    }
}

/// Tangents at the start vertex of the edge at `position` of a loop.
pub(crate) fn vertex_tangents<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    loop_index: usize,
    position: usize,
) -> Result<VertexTangents<T>> {
    let f = topo.face(face)?;
    let l = f.loops().get(loop_index).ok_or_else(|| {
        RegularizeError::UnknownEntity(format!("loop {} of {:?}", loop_index, face))
    })?;
    let outgoing = topo.edge(l.edge_at(position as isize))?;
    let incoming = topo.edge(l.edge_at(position as isize - 1))?;
    Ok(curve_tangents(
        f.surface().as_ref(),
        incoming.curve(),
        outgoing.curve(),
    ))
}

/// Tangents where `incoming` ends and `outgoing` starts on a surface.
pub(crate) fn curve_tangents<T: FloatingPoint>(
    surface: &dyn ParametricSurface<T>,
    incoming: &TrimCurve<T>,
    outgoing: &TrimCurve<T>,
) -> VertexTangents<T> {
    let uv_in = incoming.end();
    let uv = outgoing.start();
    let t_in = surface.tangent_at(&uv_in, &incoming.tangent_at(T::one()));
    let t_out = surface.tangent_at(&uv, &outgoing.tangent_at(T::zero()));
    VertexTangents {
        incoming: normalize_or_zero(t_in),
        outgoing: normalize_or_zero(t_out),
        normal: normalize_or_zero(surface.normal_at(&uv)),
    }
}

pub(crate) fn normalize_or_zero<T: FloatingPoint>(v: Vector3<T>) -> Vector3<T> {
    v.try_normalize(T::default_epsilon()).unwrap_or(v)
}

/// Classify the vertex occurrence at `position` of a loop.
pub fn classify_loop_vertex<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    loop_index: usize,
    position: usize,
    angtol: T,
    hints: &CornerHints,
) -> Result<LoopCorner<T>> {
    let tangents = vertex_tangents(topo, face, loop_index, position)?;
    let l = &topo.face(face)?.loops()[loop_index];
    let vertex = topo.edge(l.edge_at(position as isize))?.start();
    let turn = tangents.turn();
    let inherited = topo.face(face)?.non_corners().contains(&vertex);
    let is_corner = if hints.fixed.contains(&vertex) {
        true
    } else if hints.non_corners.contains(&vertex) || inherited {
        false
    } else {
        turn.abs() > angtol
    };
    Ok(LoopCorner {
        vertex,
        position,
        turn,
        is_corner,
    })
}

/// Classify every vertex occurrence of a loop.
pub fn loop_corners<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    loop_index: usize,
    angtol: T,
    hints: &CornerHints,
) -> Result<Vec<LoopCorner<T>>> {
    let n = topo
        .face(face)?
        .loops()
        .get(loop_index)
        .ok_or_else(|| {
            RegularizeError::UnknownEntity(format!("loop {} of {:?}", loop_index, face))
        })?
        .len();
    (0..n)
        .map(|i| classify_loop_vertex(topo, face, loop_index, i, angtol, hints))
        .collect()
}

/// Classification of all loops of a face, outer loop first.
pub fn face_corners<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    angtol: T,
    hints: &CornerHints,
) -> Result<Vec<Vec<LoopCorner<T>>>> {
    (0..topo.face(face)?.loops().len())
        .map(|i| loop_corners(topo, face, i, angtol, hints))
        .collect()
}

/// Decide whether a vertex is a corner of a face.
/// A vertex visited more than once by the face boundary is a corner if any visit is.
pub fn is_corner<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    angtol: T,
    hints: &CornerHints,
) -> Result<bool> {
    let positions = vertex_positions(topo, face, vertex)?;
    if positions.is_empty() {
        return Err(RegularizeError::TopologyInconsistency(format!(
            "{:?} is not on the boundary of {:?}",
            vertex, face
        )));
    }
    for (loop_index, position) in positions {
        if classify_loop_vertex(topo, face, loop_index, position, angtol, hints)?.is_corner {
            return Ok(true);
        }
    }
    Ok(false)
}

/// All `(loop index, position)` pairs where the vertex starts an edge of the face.
pub fn vertex_positions<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
) -> Result<Vec<(usize, usize)>> {
    let mut positions = vec![];
    for (i, l) in topo.face(face)?.loops().iter().enumerate() {
        for (j, e) in l.edges().iter().enumerate() {
            if topo.edge(*e)?.start() == vertex {
                positions.push((i, j));
            }
        }
    }
    Ok(positions)
}

/// First loop position of a vertex, an error if it does not bound the face.
pub(crate) fn first_position<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
) -> Result<(usize, usize)> {
    vertex_positions(topo, face, vertex)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            RegularizeError::TopologyInconsistency(format!(
                "{:?} is not on the boundary of {:?}",
                vertex, face
            ))
        })
}

/// Edges of the face sharing an end point with `vertex`.
pub(crate) fn incident_edges<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
) -> Result<Vec<EdgeId>> {
    let mut edges = vec![];
    for l in topo.face(face)?.loops() {
        for e in l.edges() {
            if topo.edge(*e)?.is_incident(vertex) {
                edges.push(*e);
            }
        }
    }
    Ok(edges)
}
