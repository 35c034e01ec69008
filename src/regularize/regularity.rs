use itertools::Itertools;

use crate::{
    error::Result,
    misc::FloatingPoint,
    topology::{FaceId, Topology, VertexId},
};

use super::{
    corner::{classify_loop_vertex, face_corners, CornerHints},
    Tolerances,
};

/// Samples used to measure edges in 3D.
const EDGE_LENGTH_SAMPLES: usize = 8;

/// Check whether a face with the given corners is a terminal patch:
/// a single loop with three or four corners, all of them convex when `check_convex` is set,
/// and no edge shorter than `epsge`.
pub fn check_regularity<T: FloatingPoint>(
    topo: &Topology<T>,
    corners: &[VertexId],
    face: FaceId,
    check_convex: bool,
    tolerances: &Tolerances<T>,
) -> Result<bool> {
    let f = topo.face(face)?;
    if f.loops().len() != 1 || !(3..=4).contains(&corners.len()) {
        return Ok(false);
    }
    let vertices = topo.loop_vertices(face, 0)?;
    if corners.iter().any(|c| !vertices.contains(c)) {
        return Ok(false);
    }

    if check_convex {
        let hints = CornerHints::default();
        for (i, v) in vertices.iter().enumerate() {
            if !corners.contains(v) {
                continue;
            }
            let c = classify_loop_vertex(topo, face, 0, i, tolerances.angtol, &hints)?;
            if c.turn < -tolerances.angtol {
                return Ok(false);
            }
        }
    }

    for e in f.loops()[0].edges() {
        if topo.edge_length_3d(*e, EDGE_LENGTH_SAMPLES)? <= tolerances.epsge {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Corner vertices of every loop of a face in loop order.
pub fn corner_vertices<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    angtol: T,
    hints: &CornerHints,
) -> Result<Vec<VertexId>> {
    let corners = face_corners(topo, face, angtol, hints)?;
    Ok(corners
        .iter()
        .flatten()
        .filter(|c| c.is_corner)
        .map(|c| c.vertex)
        .unique()
        .collect())
}

/// How far a face is from being regular: four per extra loop, one per concave corner
/// and one per corner beyond four. Zero for any regular face.
pub fn irregularity<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    angtol: T,
    hints: &CornerHints,
) -> Result<usize> {
    let corners = face_corners(topo, face, angtol, hints)?;
    let all = corners.iter().flatten().filter(|c| c.is_corner);
    let count = all.clone().count();
    let concave = all.filter(|c| c.is_concave(angtol)).count();
    Ok(irregularity_measure(corners.len(), count, concave))
}

pub(crate) fn irregularity_measure(loops: usize, corners: usize, concave: usize) -> usize {
    4 * loops.saturating_sub(1) + concave + corners.saturating_sub(4)
}
