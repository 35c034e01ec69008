use crate::{
    error::{RegularizeError, Result},
    misc::FloatingPoint,
    topology::{EdgeId, FaceId, Topology, VertexId},
};

use super::corner::vertex_positions;

/// Walk forward from `start` along its loop until an edge ends at `target`.
/// Returns the traversed edges, `start` included.
pub fn get_path<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    start: EdgeId,
    target: VertexId,
) -> Result<Vec<EdgeId>> {
    let (loop_index, position) = topo.loop_of(face, start).ok_or_else(|| {
        RegularizeError::TopologyInconsistency(format!("{:?} does not bound {:?}", start, face))
    })?;
    let l = &topo.face(face)?.loops()[loop_index];
    let mut path = vec![];
    for i in 0..l.len() {
        let e = l.edge_at((position + i) as isize);
        path.push(e);
        if topo.edge(e)?.end() == target {
            return Ok(path);
        }
    }
    Err(RegularizeError::UnreachablePath {
        from: topo.edge(start)?.start(),
        to: target,
    })
}

/// Check whether a corner lies strictly between loop positions `from` and `to`
/// on the shorter of the two walks around a loop of `len` edges.
/// When both walks have the same number of edges no single shortest path exists and
/// the answer is `false`.
pub fn check_path(len: usize, corner_positions: &[usize], from: usize, to: usize) -> bool {
    if len == 0 || from == to {
        return false;
    }
    let forward = (to + len - from) % len;
    let backward = len - forward;
    let between = |p: usize, a: usize, steps: usize| {
        let offset = (p + len - a) % len;
        offset > 0 && offset < steps
    };
    if forward < backward {
        corner_positions.iter().any(|p| between(*p, from, forward))
    } else if backward < forward {
        corner_positions.iter().any(|p| between(*p, to, backward))
    } else {
        false
    }
}

/// Whether the shortest boundary walk between two vertices of a face passes an existing corner.
/// Vertices on different loops have no boundary path between them.
pub fn corner_in_shortest_path<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    corners: &[VertexId],
    from: VertexId,
    to: VertexId,
) -> Result<bool> {
    let a = vertex_positions(topo, face, from)?;
    let b = vertex_positions(topo, face, to)?;
    let (Some(&(la, pa)), Some(&(lb, pb))) = (a.first(), b.first()) else {
        return Err(RegularizeError::TopologyInconsistency(format!(
            "{:?} or {:?} is not on the boundary of {:?}",
            from, to, face
        )));
    };
    if la != lb {
        return Ok(false);
    }
    let l = &topo.face(face)?.loops()[la];
    let mut corner_positions = vec![];
    for (i, e) in l.edges().iter().enumerate() {
        if corners.contains(&topo.edge(*e)?.start()) {
            corner_positions.push(i);
        }
    }
    Ok(check_path(l.len(), &corner_positions, pa, pb))
}

/// Result of walking a chain of faces from a vertex to the next T-joint.
#[derive(Debug, Clone, PartialEq)]
pub struct TJointTraversal {
    /// T-joint reached, or the last vertex of the chain when it is exhausted
    pub vertex: VertexId,
    /// faces around `vertex` in rotational order
    pub faces: Vec<FaceId>,
    /// vertices passed after the start, `vertex` last
    pub steps: Vec<VertexId>,
    pub is_t_joint: bool,
}

/// Active faces around a vertex, starting at `first` and rotating through twin edges.
/// Faces not reachable through twins are appended in arena order.
pub fn faces_around_vertex<T: FloatingPoint>(
    topo: &Topology<T>,
    first: FaceId,
    vertex: VertexId,
) -> Result<Vec<FaceId>> {
    let mut order = vec![first];

    // rotate through the edges leaving the vertex
    let mut face = first;
    let mut closed = false;
    while let Some(e) = edge_at_vertex(topo, face, vertex, true)? {
        let Some(twin) = topo.edge(e)?.twin() else {
            break;
        };
        let next = topo.edge(twin)?.face();
        if next == first {
            closed = true;
            break;
        }
        if order.contains(&next) {
            break;
        }
        order.push(next);
        face = next;
    }

    // and the other way round through the edges entering it
    if !closed {
        let mut face = first;
        while let Some(e) = edge_at_vertex(topo, face, vertex, false)? {
            let Some(twin) = topo.edge(e)?.twin() else {
                break;
            };
            let next = topo.edge(twin)?.face();
            if order.contains(&next) {
                break;
            }
            order.push(next);
            face = next;
        }
    }

    for f in topo.faces_at_vertex(vertex)? {
        if !order.contains(&f) {
            order.push(f);
        }
    }
    Ok(order)
}

fn edge_at_vertex<T: FloatingPoint>(
    topo: &Topology<T>,
    face: FaceId,
    vertex: VertexId,
    leaving: bool,
) -> Result<Option<EdgeId>> {
    for l in topo.face(face)?.loops() {
        for e in l.edges() {
            let edge = topo.edge(*e)?;
            let end = if leaving { edge.start() } else { edge.end() };
            if end == vertex {
                return Ok(Some(*e));
            }
        }
    }
    Ok(None)
}

/// Follow the boundary shared by `face1` and `face2` from `vertex`, away from `previous`.
/// The walk continues through vertices touched by these two faces only and stops at the
/// first vertex where the common chain ends or another face joins in. `origin` stops the walk
/// on closed chains. Returns the vertices passed, the end vertex last; empty when `vertex`
/// has no shared edge leading away from `previous`.
pub fn end_vx_in_chain<T: FloatingPoint>(
    topo: &Topology<T>,
    face1: FaceId,
    face2: FaceId,
    vertex: VertexId,
    previous: Option<VertexId>,
    origin: VertexId,
) -> Result<Vec<VertexId>> {
    let mut chain = vec![];
    let mut current = vertex;
    let mut prev = previous;
    loop {
        let Some(next) = shared_edge_step(topo, face1, face2, current, prev)? else {
            break;
        };
        chain.push(next);
        if next == origin || next == vertex {
            break;
        }
        let faces = topo.faces_at_vertex(next)?;
        let only_pair = faces.len() == 2 && faces.contains(&face1) && faces.contains(&face2);
        if !only_pair {
            break;
        }
        prev = Some(current);
        current = next;
    }
    Ok(chain)
}

/// Next vertex along an edge of `face1` twinned with `face2`, skipping `previous`.
fn shared_edge_step<T: FloatingPoint>(
    topo: &Topology<T>,
    face1: FaceId,
    face2: FaceId,
    vertex: VertexId,
    previous: Option<VertexId>,
) -> Result<Option<VertexId>> {
    for l in topo.face(face1)?.loops() {
        for e in l.edges() {
            let edge = topo.edge(*e)?;
            let Some(twin) = edge.twin() else {
                continue;
            };
            if topo.edge(twin)?.face() != face2 {
                continue;
            }
            if let Some(other) = edge.opposite(vertex) {
                if Some(other) != previous {
                    return Ok(Some(other));
                }
            }
        }
    }
    Ok(None)
}

/// Walk a chain of faces from `vertex` until a T-joint, a vertex shared by three or
/// more faces, is reached or the chain is exhausted.
/// `vertex_faces` are faces at `vertex`; the first one fixes the rotational order.
pub fn traverse_until_t_joint<T: FloatingPoint>(
    topo: &Topology<T>,
    vertex_faces: &[FaceId],
    vertex: VertexId,
) -> Result<TJointTraversal> {
    let first = match vertex_faces.first() {
        Some(f) => *f,
        None => *topo.faces_at_vertex(vertex)?.first().ok_or_else(|| {
            RegularizeError::TopologyInconsistency(format!("{:?} bounds no active face", vertex))
        })?,
    };

    let faces = faces_around_vertex(topo, first, vertex)?;
    if faces.len() >= 3 {
        return Ok(TJointTraversal {
            vertex,
            faces,
            steps: vec![],
            is_t_joint: true,
        });
    }
    if faces.len() < 2 {
        return Ok(TJointTraversal {
            vertex,
            faces,
            steps: vec![],
            is_t_joint: false,
        });
    }

    // two faces: try both directions of their common boundary
    let mut exhausted = None;
    let mut previous = None;
    for _ in 0..2 {
        let steps = end_vx_in_chain(topo, faces[0], faces[1], vertex, previous, vertex)?;
        let Some(end) = steps.last().cloned() else {
            break;
        };
        let end_faces = faces_around_vertex(topo, faces[0], end)?;
        if end_faces.len() >= 3 {
            log::trace!("chain from {:?} reached t-joint {:?}", vertex, end);
            return Ok(TJointTraversal {
                vertex: end,
                faces: end_faces,
                steps,
                is_t_joint: true,
            });
        }
        previous = steps.first().cloned();
        if exhausted.is_none() {
            exhausted = Some((end, end_faces, steps));
        }
    }

    let (end, end_faces, steps) = exhausted.unwrap_or((vertex, faces, vec![]));
    Ok(TJointTraversal {
        vertex: end,
        faces: end_faces,
        steps,
        is_t_joint: false,
    })
}
