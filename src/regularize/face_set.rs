use itertools::Itertools;

use crate::{
    error::Result,
    misc::FloatingPoint,
    topology::{FaceId, Topology, VertexId},
};

use super::{
    corner::CornerHints,
    driver::{FaceRegularizer, RegularizeOutcome},
    path::{traverse_until_t_joint, TJointTraversal},
    RegularizeOptions,
};

/// Regularizes a set of faces connected through shared edges.
/// Vertices where three or more faces meet can be kept as corners of every face around them,
/// so the resulting patches fit together.
#[derive(Debug)]
pub struct FaceSetRegularizer<'a, T: FloatingPoint> {
    topo: &'a mut Topology<T>,
    options: RegularizeOptions<T>,
}

impl<'a, T: FloatingPoint> FaceSetRegularizer<'a, T> {
    pub fn new(topo: &'a mut Topology<T>, options: RegularizeOptions<T>) -> Self {
        Self { topo, options }
    }

    /// T-joints among the vertices of `faces`, each with the chain of faces around it.
    pub fn t_joints(&self, faces: &[FaceId]) -> Result<Vec<TJointTraversal>> {
        let mut vertices: Vec<VertexId> = vec![];
        for face in faces {
            for l in 0..self.topo.face(*face)?.loops().len() {
                vertices.extend(self.topo.loop_vertices(*face, l)?);
            }
        }
        let mut joints = vec![];
        for v in vertices.into_iter().unique() {
            let around = self.topo.faces_at_vertex(v)?;
            if around.len() < 3 {
                continue;
            }
            let traversal = traverse_until_t_joint(self.topo, &around, v)?;
            log::debug!(
                "t-joint at {:?} between {:?}",
                traversal.vertex,
                traversal.faces
            );
            joints.push(traversal);
        }
        Ok(joints)
    }

    /// Link shared edges of the set, then split every face until all are regular.
    /// With `treat_t_joints_as_corners` the T-joints found up front stay corners of every
    /// face around them, including the faces split off later.
    pub fn regularize(&mut self, faces: &[FaceId]) -> Result<RegularizeOutcome> {
        let linked = self
            .topo
            .connect_shared_edges(self.options.tolerances.epsge)?;
        let mut hints = CornerHints::default();
        if self.options.treat_t_joints_as_corners {
            let joints = self.t_joints(faces)?;
            hints.fixed = joints
                .iter()
                .filter(|j| j.is_t_joint)
                .map(|j| j.vertex)
                .unique()
                .collect();
        }
        log::debug!(
            "regularizing {} face(s) with {} shared edge(s) and {} fixed corner(s)",
            faces.len(),
            linked,
            hints.fixed.len()
        );
        FaceRegularizer::new(&mut *self.topo, self.options)
            .with_hints(hints)
            .run(faces.to_vec())
    }
}
