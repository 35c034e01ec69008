use std::sync::Arc;

use crate::{misc::FloatingPoint, surface::ParametricSurface};

use super::{EdgeId, VertexId};

slotmap::new_key_type! {
    /// Handle of a face in the topology arena.
    pub struct FaceId;
}

/// A closed cycle of edges, `edges[i].end == edges[i + 1].start`.
/// The trimmed region lies on the left: outer loops run counter-clockwise
/// in parameter space and holes clockwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loop {
    edges: Vec<EdgeId>,
}

impl Loop {
    pub fn new(edges: Vec<EdgeId>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edge at a cyclic position.
    pub fn edge_at(&self, index: isize) -> EdgeId {
        let n = self.edges.len() as isize;
        self.edges[index.rem_euclid(n) as usize]
    }

    pub fn position_of(&self, edge: EdgeId) -> Option<usize> {
        self.edges.iter().position(|e| *e == edge)
    }

    pub(crate) fn replace(&mut self, edge: EdgeId, with: &[EdgeId]) -> bool {
        match self.position_of(edge) {
            Some(i) => {
                self.edges.splice(i..=i, with.iter().cloned());
                true
            }
            None => false,
        }
    }
}

/// A trimmed patch of a surface bounded by one outer loop and any number of holes.
#[derive(Debug, Clone)]
pub struct Face<T: FloatingPoint> {
    surface: Arc<dyn ParametricSurface<T>>,
    loops: Vec<Loop>,
    /// vertices known to be no corners of this face, inherited by its successors
    non_corners: Vec<VertexId>,
    parent: Option<FaceId>,
    /// faces replacing this one after a split, empty while the face is active
    successors: Vec<FaceId>,
}

impl<T: FloatingPoint> Face<T> {
    pub(crate) fn new(surface: Arc<dyn ParametricSurface<T>>, parent: Option<FaceId>) -> Self {
        Self {
            surface,
            loops: vec![],
            non_corners: vec![],
            parent,
            successors: vec![],
        }
    }

    pub fn surface(&self) -> &Arc<dyn ParametricSurface<T>> {
        &self.surface
    }

    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    pub fn outer_loop(&self) -> Option<&Loop> {
        self.loops.first()
    }

    pub fn non_corners(&self) -> &[VertexId] {
        &self.non_corners
    }

    pub fn parent(&self) -> Option<FaceId> {
        self.parent
    }

    pub fn successors(&self) -> &[FaceId] {
        &self.successors
    }

    /// A face stays active until a split supersedes it.
    pub fn is_active(&self) -> bool {
        self.successors.is_empty()
    }

    pub(crate) fn loops_mut(&mut self) -> &mut Vec<Loop> {
        &mut self.loops
    }

    pub(crate) fn set_non_corners(&mut self, non_corners: Vec<VertexId>) {
        self.non_corners = non_corners;
    }

    pub(crate) fn supersede(&mut self, successors: Vec<FaceId>) {
        self.successors = successors;
    }
}
