use nalgebra::{Point2, Point3};

use crate::misc::FloatingPoint;

use super::{EdgeId, FaceId};

slotmap::new_key_type! {
    /// Handle of a vertex in the topology arena.
    pub struct VertexId;
}

/// A boundary vertex shared by every face referencing it.
#[derive(Debug, Clone)]
pub struct Vertex<T: FloatingPoint> {
    position: Point3<T>,
    /// incident edges of all faces, superseded ones included
    edges: Vec<EdgeId>,
    /// parameter coordinates per face, a seam vertex carries two for the same face
    parameters: Vec<(FaceId, Point2<T>)>,
}

impl<T: FloatingPoint> Vertex<T> {
    pub fn new(position: Point3<T>) -> Self {
        Self {
            position,
            edges: vec![],
            parameters: vec![],
        }
    }

    pub fn position(&self) -> &Point3<T> {
        &self.position
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn parameters(&self) -> &[(FaceId, Point2<T>)] {
        &self.parameters
    }

    /// All parameter coordinates recorded for `face`.
    pub fn parameters_on(&self, face: FaceId) -> impl Iterator<Item = &Point2<T>> {
        self.parameters
            .iter()
            .filter(move |(f, _)| *f == face)
            .map(|(_, uv)| uv)
    }

    pub(crate) fn attach_edge(&mut self, edge: EdgeId) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn detach_edge(&mut self, edge: EdgeId) {
        self.edges.retain(|e| *e != edge);
    }

    /// Record a parameter unless an equal one within `tolerance` is already known.
    pub(crate) fn record_parameter(&mut self, face: FaceId, uv: Point2<T>, tolerance: T) {
        let known = self
            .parameters_on(face)
            .any(|p| (p - uv).norm() <= tolerance);
        if !known {
            self.parameters.push((face, uv));
        }
    }

    pub(crate) fn forget_face(&mut self, face: FaceId) {
        self.parameters.retain(|(f, _)| *f != face);
    }
}
