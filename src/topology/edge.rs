use crate::{curve::TrimCurve, misc::FloatingPoint};

use super::{FaceId, VertexId};

slotmap::new_key_type! {
    /// Handle of an edge in the topology arena.
    pub struct EdgeId;
}

/// A boundary edge of one face.
/// The curve lives in the parameter space of the owning face's surface.
#[derive(Debug, Clone)]
pub struct Edge<T: FloatingPoint> {
    start: VertexId,
    end: VertexId,
    curve: TrimCurve<T>,
    face: FaceId,
    /// matching edge of the neighbouring face, running the opposite way
    twin: Option<EdgeId>,
}

impl<T: FloatingPoint> Edge<T> {
    pub(crate) fn new(start: VertexId, end: VertexId, curve: TrimCurve<T>, face: FaceId) -> Self {
        Self {
            start,
            end,
            curve,
            face,
            twin: None,
        }
    }

    pub fn start(&self) -> VertexId {
        self.start
    }

    pub fn end(&self) -> VertexId {
        self.end
    }

    pub fn curve(&self) -> &TrimCurve<T> {
        &self.curve
    }

    pub fn face(&self) -> FaceId {
        self.face
    }

    pub fn twin(&self) -> Option<EdgeId> {
        self.twin
    }

    /// Check whether the edge touches the vertex.
    pub fn is_incident(&self, vertex: VertexId) -> bool {
        self.start == vertex || self.end == vertex
    }

    /// The end point other than `vertex`, if `vertex` is an end point.
    pub fn opposite(&self, vertex: VertexId) -> Option<VertexId> {
        if self.start == vertex {
            Some(self.end)
        } else if self.end == vertex {
            Some(self.start)
        } else {
            None
        }
    }

    pub(crate) fn set_twin(&mut self, twin: Option<EdgeId>) {
        self.twin = twin;
    }
}
