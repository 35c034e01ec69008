use std::sync::Arc;

use itertools::Itertools;
use nalgebra::{Point2, Point3};
use slotmap::SlotMap;

use crate::{
    curve::TrimCurve,
    error::{RegularizeError, Result},
    misc::{signed_area, FloatingPoint},
    surface::ParametricSurface,
};

use super::{Edge, EdgeId, Face, FaceId, Loop, Vertex, VertexId};

/// Arena owning every vertex, edge and face of a model.
/// Entities refer to each other by handle, so vertices and edges can be shared by many faces.
#[derive(Debug, Clone)]
pub struct Topology<T: FloatingPoint> {
    vertices: SlotMap<VertexId, Vertex<T>>,
    edges: SlotMap<EdgeId, Edge<T>>,
    faces: SlotMap<FaceId, Face<T>>,
    /// distance under which face builders reuse an existing vertex
    weld_tolerance: T,
}

impl<T: FloatingPoint> Default for Topology<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FloatingPoint> Topology<T> {
    pub fn new() -> Self {
        Self {
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            weld_tolerance: nalgebra::convert(1e-9),
        }
    }

    pub fn with_weld_tolerance(mut self, tolerance: T) -> Self {
        self.weld_tolerance = tolerance;
        self
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex<T>> {
        self.vertices
            .get(id)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", id)))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge<T>> {
        self.edges
            .get(id)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", id)))
    }

    pub fn face(&self, id: FaceId) -> Result<&Face<T>> {
        self.faces
            .get(id)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", id)))
    }

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex<T>> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", id)))
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge<T>> {
        self.edges
            .get_mut(id)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", id)))
    }

    pub(crate) fn face_mut(&mut self, id: FaceId) -> Result<&mut Face<T>> {
        self.faces
            .get_mut(id)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", id)))
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex<T>)> {
        self.vertices.iter()
    }

    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face<T>)> {
        self.faces.iter()
    }

    /// Faces which have not been superseded by a split.
    pub fn active_faces(&self) -> Vec<FaceId> {
        self.faces
            .iter()
            .filter(|(_, f)| f.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn add_vertex(&mut self, position: Point3<T>) -> VertexId {
        self.vertices.insert(Vertex::new(position))
    }

    /// First vertex within `tolerance` of `position`.
    pub fn find_vertex(&self, position: &Point3<T>, tolerance: T) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|(_, v)| (v.position() - position).norm() <= tolerance)
            .map(|(id, _)| id)
    }

    pub fn face_surface(&self, face: FaceId) -> Result<Arc<dyn ParametricSurface<T>>> {
        Ok(self.face(face)?.surface().clone())
    }

    /// Build a face bounded by straight parameter space segments.
    /// The outer polygon runs counter-clockwise, holes clockwise.
    pub fn add_face_from_polygon(
        &mut self,
        surface: Arc<dyn ParametricSurface<T>>,
        outer: &[Point2<T>],
        holes: &[Vec<Point2<T>>],
    ) -> Result<FaceId> {
        let to_curves = |points: &[Point2<T>]| {
            points
                .iter()
                .circular_tuple_windows()
                .map(|(a, b)| TrimCurve::line(*a, *b))
                .collect_vec()
        };
        let loops = std::iter::once(outer)
            .chain(holes.iter().map(|h| h.as_slice()))
            .map(to_curves)
            .collect_vec();
        self.add_face_from_loops(surface, loops)
    }

    /// Build a face from loops of trim curves, the first loop being the outer one.
    /// Vertices are created at curve starts, reusing existing vertices within the weld tolerance.
    pub fn add_face_from_loops(
        &mut self,
        surface: Arc<dyn ParametricSurface<T>>,
        loops: Vec<Vec<TrimCurve<T>>>,
    ) -> Result<FaceId> {
        if loops.is_empty() {
            return Err(RegularizeError::MalformedLoop(
                "a face needs an outer loop".to_string(),
            ));
        }
        for (i, curves) in loops.iter().enumerate() {
            self.check_loop_curves(curves, i == 0)?;
        }

        let face = self.faces.insert(Face::new(surface.clone(), None));
        let mut face_loops = vec![];
        for curves in loops {
            let mut vertices = vec![];
            for c in curves.iter() {
                let position = surface.point_at(&c.start());
                let v = match self.find_vertex(&position, self.weld_tolerance) {
                    Some(v) => v,
                    None => self.add_vertex(position),
                };
                vertices.push(v);
            }
            let edges = curves
                .into_iter()
                .enumerate()
                .map(|(i, c)| {
                    let end = vertices[(i + 1) % vertices.len()];
                    self.add_edge(face, vertices[i], end, c)
                })
                .collect::<Result<Vec<_>>>()?;
            face_loops.push(Loop::new(edges));
        }
        *self.face_mut(face)?.loops_mut() = face_loops;
        log::trace!("added face {:?} with {} loop(s)", face, self.face(face)?.loops().len());
        Ok(face)
    }

    fn check_loop_curves(&self, curves: &[TrimCurve<T>], outer: bool) -> Result<()> {
        if curves.len() < 2 {
            return Err(RegularizeError::MalformedLoop(format!(
                "a loop needs at least two edges, got {}",
                curves.len()
            )));
        }
        for (a, b) in curves.iter().circular_tuple_windows() {
            if (a.end() - b.start()).norm() > self.weld_tolerance {
                return Err(RegularizeError::MalformedLoop(format!(
                    "curve ending at {:?} is followed by a curve starting at {:?}",
                    a.end(),
                    b.start()
                )));
            }
        }
        let polygon = curves
            .iter()
            .flat_map(|c| {
                let points = c.points();
                points[..points.len() - 1].to_vec()
            })
            .collect_vec();
        let area = signed_area(&polygon);
        if outer != (area > T::zero()) {
            return Err(RegularizeError::MalformedLoop(format!(
                "{} loop has the wrong orientation",
                if outer { "outer" } else { "inner" }
            )));
        }
        Ok(())
    }

    /// Insert an edge of `face` and register it at its end points.
    pub(crate) fn add_edge(
        &mut self,
        face: FaceId,
        start: VertexId,
        end: VertexId,
        curve: TrimCurve<T>,
    ) -> Result<EdgeId> {
        let (uv0, uv1) = (curve.start(), curve.end());
        let tolerance = self.weld_tolerance;
        let id = self.edges.insert(Edge::new(start, end, curve, face));
        let v = self.vertex_mut(start)?;
        v.attach_edge(id);
        v.record_parameter(face, uv0, tolerance);
        let v = self.vertex_mut(end)?;
        v.attach_edge(id);
        v.record_parameter(face, uv1, tolerance);
        Ok(id)
    }

    pub(crate) fn insert_face(&mut self, face: Face<T>) -> FaceId {
        self.faces.insert(face)
    }

    /// Link two edges of neighbouring faces running in opposite directions.
    pub fn link_twins(&mut self, a: EdgeId, b: EdgeId) -> Result<()> {
        let (ea, eb) = (self.edge(a)?, self.edge(b)?);
        if ea.start() != eb.end() || ea.end() != eb.start() {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "{:?} and {:?} do not share their end points in opposite order",
                a, b
            )));
        }
        self.edge_mut(a)?.set_twin(Some(b));
        self.edge_mut(b)?.set_twin(Some(a));
        Ok(())
    }

    /// Detect and link twin edges of active faces.
    /// Two edges are twins when they join the same vertices in opposite order and their
    /// midpoints coincide in 3D within `epsge`. Returns the number of linked pairs.
    pub fn connect_shared_edges(&mut self, epsge: T) -> Result<usize> {
        let half: T = nalgebra::convert(0.5);
        let open = self
            .edges
            .iter()
            .filter(|(_, e)| e.twin().is_none())
            .filter(|(_, e)| self.faces.get(e.face()).is_some_and(|f| f.is_active()))
            .map(|(id, _)| id)
            .collect_vec();

        let mut midpoints = vec![];
        for id in open.iter() {
            let e = self.edge(*id)?;
            let surface = self.face(e.face())?.surface();
            midpoints.push(surface.point_at(&e.curve().point_at(half)));
        }

        let mut pairs = vec![];
        let mut used = vec![false; open.len()];
        for i in 0..open.len() {
            if used[i] {
                continue;
            }
            let ei = self.edge(open[i])?;
            for j in (i + 1)..open.len() {
                if used[j] {
                    continue;
                }
                let ej = self.edge(open[j])?;
                let reversed = ei.start() == ej.end() && ei.end() == ej.start();
                if reversed
                    && ei.face() != ej.face()
                    && (midpoints[i] - midpoints[j]).norm() <= epsge
                {
                    used[i] = true;
                    used[j] = true;
                    pairs.push((open[i], open[j]));
                    break;
                }
            }
        }

        for (a, b) in pairs.iter() {
            self.link_twins(*a, *b)?;
        }
        log::debug!("linked {} twin edge pair(s)", pairs.len());
        Ok(pairs.len())
    }

    /// Split an edge at the curve parameter `t`, the new end points meeting at `vertex`.
    /// The edge is replaced in its face's loop by the two halves; a former twin loses its link.
    pub fn split_edge(&mut self, edge: EdgeId, t: T, vertex: VertexId) -> Result<(EdgeId, EdgeId)> {
        let e = self.edge(edge)?.clone();
        let (c0, c1) = e.curve().try_split_at(t)?;
        let face = e.face();
        let a = self.add_edge(face, e.start(), vertex, c0)?;
        let b = self.add_edge(face, vertex, e.end(), c1)?;

        let replaced = self
            .face_mut(face)?
            .loops_mut()
            .iter_mut()
            .any(|l| l.replace(edge, &[a, b]));
        if !replaced {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "{:?} is not part of a loop of {:?}",
                edge, face
            )));
        }

        self.vertex_mut(e.start())?.detach_edge(edge);
        self.vertex_mut(e.end())?.detach_edge(edge);
        if let Some(twin) = e.twin() {
            if let Ok(t) = self.edge_mut(twin) {
                t.set_twin(None);
            }
        }
        self.edges.remove(edge);
        log::trace!("split {:?} into {:?} and {:?}", edge, a, b);
        Ok((a, b))
    }

    /// Split an edge and its twin at the same 3D point, keeping the halves linked.
    pub fn split_edge_with_twin(
        &mut self,
        edge: EdgeId,
        t: T,
        vertex: VertexId,
    ) -> Result<(EdgeId, EdgeId)> {
        let twin = self.edge(edge)?.twin();
        let (a, b) = self.split_edge(edge, t, vertex)?;
        let Some(twin) = twin else {
            return Ok((a, b));
        };

        let te = self.edge(twin)?;
        let surface = self.face(te.face())?.surface().clone();
        let position = *self.vertex(vertex)?.position();
        let hint = te.curve().point_at(T::one() - t);
        let uv = surface.closest_parameter(&position, Some(hint))?;
        let (twin_t, _) = te.curve().closest_parameter(&uv);
        if twin_t <= T::zero() || twin_t >= T::one() {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "split point of {:?} does not fall inside its twin {:?}",
                edge, twin
            )));
        }

        let (ta, tb) = self.split_edge(twin, twin_t, vertex)?;
        self.link_twins(a, tb)?;
        self.link_twins(b, ta)?;
        Ok((a, b))
    }

    /// Remove a face with its edges, e.g. a face superseded by a split.
    /// Shared vertices are kept.
    pub fn remove_face(&mut self, face: FaceId) -> Result<Face<T>> {
        let removed = self
            .faces
            .remove(face)
            .ok_or_else(|| RegularizeError::UnknownEntity(format!("{:?}", face)))?;
        for id in removed.loops().iter().flat_map(|l| l.edges().iter()) {
            let Some(e) = self.edges.remove(*id) else {
                continue;
            };
            for v in [e.start(), e.end()] {
                if let Some(v) = self.vertices.get_mut(v) {
                    v.detach_edge(*id);
                    v.forget_face(face);
                }
            }
            if let Some(twin) = e.twin().and_then(|t| self.edges.get_mut(t)) {
                twin.set_twin(None);
            }
        }
        Ok(removed)
    }

    pub(crate) fn supersede(&mut self, face: FaceId, successors: Vec<FaceId>) -> Result<()> {
        self.face_mut(face)?.supersede(successors);
        Ok(())
    }

    /// Active faces incident to a vertex, in the order of the vertex's edges.
    pub fn faces_at_vertex(&self, vertex: VertexId) -> Result<Vec<FaceId>> {
        let mut faces = vec![];
        for e in self.vertex(vertex)?.edges() {
            let face = self.edge(*e)?.face();
            if self.face(face)?.is_active() && !faces.contains(&face) {
                faces.push(face);
            }
        }
        Ok(faces)
    }

    /// First parameter coordinate of a vertex on a face.
    pub fn vertex_parameter(&self, vertex: VertexId, face: FaceId) -> Result<Point2<T>> {
        self.vertex(vertex)?
            .parameters_on(face)
            .next()
            .cloned()
            .ok_or_else(|| {
                RegularizeError::TopologyInconsistency(format!(
                    "{:?} has no parameter on {:?}",
                    vertex, face
                ))
            })
    }

    /// Position `(loop index, edge index)` of an edge in its face.
    pub fn loop_of(&self, face: FaceId, edge: EdgeId) -> Option<(usize, usize)> {
        let face = self.faces.get(face)?;
        face.loops()
            .iter()
            .enumerate()
            .find_map(|(i, l)| l.position_of(edge).map(|j| (i, j)))
    }

    /// Start vertices of the edges of a loop, a vertex visited twice appears twice.
    pub fn loop_vertices(&self, face: FaceId, loop_index: usize) -> Result<Vec<VertexId>> {
        let l = self.face(face)?.loops().get(loop_index).ok_or_else(|| {
            RegularizeError::UnknownEntity(format!("loop {} of {:?}", loop_index, face))
        })?;
        l.edges()
            .iter()
            .map(|e| self.edge(*e).map(|e| e.start()))
            .collect()
    }

    /// Edges with their curves for one loop, or for all loops when `loop_index` is `None`.
    pub fn boundary_curves(
        &self,
        face: FaceId,
        loop_index: Option<usize>,
    ) -> Result<Vec<(EdgeId, &TrimCurve<T>)>> {
        let f = self.face(face)?;
        let loops = match loop_index {
            Some(i) => vec![f.loops().get(i).ok_or_else(|| {
                RegularizeError::UnknownEntity(format!("loop {} of {:?}", i, face))
            })?],
            None => f.loops().iter().collect(),
        };
        loops
            .into_iter()
            .flat_map(|l| l.edges().iter())
            .map(|id| self.edge(*id).map(|e| (*id, e.curve())))
            .collect()
    }

    /// Length of an edge's image on its face's surface, approximated by a polyline.
    pub fn edge_length_3d(&self, edge: EdgeId, samples: usize) -> Result<T> {
        let e = self.edge(edge)?;
        let surface = self.face(e.face())?.surface();
        let length = e
            .curve()
            .sample(samples)
            .iter()
            .map(|uv| surface.point_at(uv))
            .tuple_windows()
            .fold(T::zero(), |acc, (a, b)| acc + (b - a).norm());
        Ok(length)
    }

    /// Check that every loop of a face is closed and that curve end points
    /// evaluate within `epsge` of their vertices.
    pub fn validate_face(&self, face: FaceId, epsge: T) -> Result<()> {
        let f = self.face(face)?;
        for (i, l) in f.loops().iter().enumerate() {
            if l.is_empty() {
                return Err(RegularizeError::MalformedLoop(format!(
                    "loop {} of {:?} is empty",
                    i, face
                )));
            }
            for (a, b) in l.edges().iter().circular_tuple_windows() {
                let (ea, eb) = (self.edge(*a)?, self.edge(*b)?);
                if ea.end() != eb.start() {
                    return Err(RegularizeError::MalformedLoop(format!(
                        "{:?} does not continue at the end of {:?} in loop {} of {:?}",
                        b, a, i, face
                    )));
                }
            }
            for id in l.edges() {
                let e = self.edge(*id)?;
                for (v, uv) in [(e.start(), e.curve().start()), (e.end(), e.curve().end())] {
                    let position = self.vertex(v)?.position();
                    let d = (f.surface().point_at(&uv) - position).norm();
                    if d > epsge {
                        return Err(RegularizeError::TopologyInconsistency(format!(
                            "{:?} of {:?} is {:?} away from its vertex",
                            id, face, d
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
