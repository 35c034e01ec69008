use std::collections::VecDeque;

use itertools::Itertools;

use crate::{
    error::{RegularizeError, Result},
    misc::FloatingPoint,
    topology::{FaceId, Topology, VertexId},
};

use super::{
    corner::{face_corners, CornerHints, LoopCorner},
    regularity::{check_regularity, corner_vertices, irregularity},
    split::{commit_division, plan_division, DivideRequest},
    RegularizeOptions,
};

/// A face the driver gave up on, left non-regular for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct IrreducibleFace {
    pub face: FaceId,
    pub reason: String,
}

/// Result of a driver run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegularizeOutcome {
    /// faces accepted as regular, in the order they were checked
    pub regular: Vec<FaceId>,
    pub irreducible: Vec<IrreducibleFace>,
    /// number of committed divisions
    pub splits: usize,
}

impl RegularizeOutcome {
    pub fn is_complete(&self) -> bool {
        self.irreducible.is_empty()
    }
}

/// Splits faces until every result is regular.
///
/// Faces wait in a work list; each one is checked, and an irregular face is divided once and its
/// successors are queued again. A division is only committed when it strictly lowers the
/// irregularity, which bounds the number of splits.
#[derive(Debug)]
pub struct FaceRegularizer<'a, T: FloatingPoint> {
    topo: &'a mut Topology<T>,
    options: RegularizeOptions<T>,
    hints: CornerHints,
}

impl<'a, T: FloatingPoint> FaceRegularizer<'a, T> {
    pub fn new(topo: &'a mut Topology<T>, options: RegularizeOptions<T>) -> Self {
        Self {
            topo,
            options,
            hints: CornerHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: CornerHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn topology(&self) -> &Topology<T> {
        &*self.topo
    }

    pub fn options(&self) -> &RegularizeOptions<T> {
        &self.options
    }

    pub fn regularize(&mut self, face: FaceId) -> Result<RegularizeOutcome> {
        self.run(vec![face])
    }

    /// Process faces in order until the work list is empty.
    /// Only the split limit aborts the run; other failures mark the face as irreducible.
    pub fn run(&mut self, faces: Vec<FaceId>) -> Result<RegularizeOutcome> {
        let tolerances = self.options.tolerances;
        let mut queue: VecDeque<FaceId> = faces.into();
        let mut outcome = RegularizeOutcome::default();
        let hints = self.hints.clone();

        while let Some(face) = queue.pop_front() {
            if !self.topo.face(face)?.is_active() {
                continue;
            }
            let corners = corner_vertices(self.topo, face, tolerances.angtol, &hints)?;
            let regular = check_regularity(
                self.topo,
                &corners,
                face,
                self.options.check_convex,
                &tolerances,
            )?;
            if regular {
                log::trace!("{:?} is regular with {} corners", face, corners.len());
                outcome.regular.push(face);
                continue;
            }

            if self.topo.face(face)?.loops().len() == 1 && corners.len() < 3 {
                outcome.irreducible.push(IrreducibleFace {
                    face,
                    reason: format!("only {} corner(s)", corners.len()),
                });
                continue;
            }
            if outcome.splits >= self.options.max_splits {
                return Err(RegularizeError::SplitLimitExceeded(self.options.max_splits));
            }

            match self.split(face, &corners, &hints) {
                Ok(created) => {
                    outcome.splits += 1;
                    queue.extend(created);
                }
                Err(e) => {
                    log::warn!("leaving {:?} irregular: {}", face, e);
                    outcome.irreducible.push(IrreducibleFace {
                        face,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Try the offending vertices in order, first with the default acceptance and then with
    /// the strong one, and commit the first division lowering the irregularity.
    fn split(
        &mut self,
        face: FaceId,
        corners: &[VertexId],
        hints: &CornerHints,
    ) -> Result<Vec<FaceId>> {
        let angtol = self.options.tolerances.angtol;
        let before = irregularity(self.topo, face, angtol, hints)?;
        let attempts = self.offending_vertices(face, hints)?;

        let mut last = None;
        for (vertex, candidates) in attempts {
            for strong in [false, true] {
                let request =
                    DivideRequest::new(face, vertex, &candidates, corners, hints).with_strong(strong);
                match plan_division(self.topo, &request, &self.options) {
                    Ok(plan) => {
                        let after = plan.irregularity(angtol, hints);
                        if after < before {
                            log::debug!(
                                "dividing {:?} at {:?}, irregularity {} -> {}",
                                face,
                                vertex,
                                before,
                                after
                            );
                            return commit_division(self.topo, plan);
                        }
                        last = Some(RegularizeError::NoProgress {
                            face,
                            before,
                            after,
                        });
                    }
                    Err(e) if e.is_recoverable() => {
                        log::trace!("division of {:?} at {:?} failed: {}", face, vertex, e);
                        last = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Err(last.unwrap_or(RegularizeError::NoProgress {
            face,
            before,
            after: before,
        }))
    }

    /// Vertices to divide in order of preference, each with its candidate pool.
    ///
    /// With holes, the corners of each hole are tried first, the most reflex ones leading, and
    /// they look for targets on the other loops. Otherwise concave corners come first, most
    /// reflex leading, followed by the remaining corners from the flattest one.
    fn offending_vertices(
        &self,
        face: FaceId,
        hints: &CornerHints,
    ) -> Result<Vec<(VertexId, Vec<VertexId>)>> {
        let angtol = self.options.tolerances.angtol;
        let corners = face_corners(self.topo, face, angtol, hints)?;
        let by_turn = |a: &&LoopCorner<T>, b: &&LoopCorner<T>| {
            a.turn
                .partial_cmp(&b.turn)
                .unwrap_or(std::cmp::Ordering::Equal)
        };

        if corners.len() > 1 {
            let mut attempts = vec![];
            for (li, hole) in corners.iter().enumerate().skip(1) {
                let mut order = hole.iter().filter(|c| c.is_concave(angtol)).collect_vec();
                if order.is_empty() {
                    order = hole.iter().collect_vec();
                }
                order.sort_by(by_turn);
                let mut candidates = vec![];
                for l in (0..corners.len()).filter(|l| *l != li) {
                    candidates.extend(self.topo.loop_vertices(face, l)?);
                }
                for c in order.into_iter().unique_by(|c| c.vertex) {
                    attempts.push((c.vertex, candidates.clone()));
                }
            }
            return Ok(attempts);
        }

        let outer = &corners[0];
        let mut concave = outer.iter().filter(|c| c.is_concave(angtol)).collect_vec();
        concave.sort_by(by_turn);
        let mut convex = outer
            .iter()
            .filter(|c| c.is_corner && !c.is_concave(angtol))
            .collect_vec();
        convex.sort_by(by_turn);

        let candidates = self.topo.loop_vertices(face, 0)?;
        Ok(concave
            .into_iter()
            .chain(convex)
            .unique_by(|c| c.vertex)
            .map(|c| (c.vertex, candidates.clone()))
            .collect())
    }
}
