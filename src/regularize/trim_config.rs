use itertools::Itertools;
use nalgebra::{Point2, Point3};

use crate::{
    error::{RegularizeError, Result},
    misc::{find_closed_line_string_self_intersections, signed_area, FloatingPoint, Line},
    surface::ParametricSurface,
    topology::{Topology, VertexId},
};

use super::split::{SegmentVertex, SubSurface, TrimSegment};

/// Check one loop of trim segments.
///
/// Consecutive segments have to meet within `epsge` in 3D and agree on the vertex they share,
/// and every existing vertex has to sit where its segment ends evaluate.
/// The division point, [`SegmentVertex::Division`], is expected at `other_pt`.
/// The end vertex of each segment starting at `vx_point` or `other_pt` is appended to `next_vxs`.
pub fn check_trim_seg<T: FloatingPoint>(
    topo: &Topology<T>,
    surface: &dyn ParametricSurface<T>,
    segments: &[TrimSegment<T>],
    next_vxs: &mut Vec<SegmentVertex>,
    vx_point: &Point3<T>,
    other_pt: &Point3<T>,
    epsge: T,
) -> Result<()> {
    if segments.len() < 2 {
        return Err(RegularizeError::TopologyInconsistency(format!(
            "a trim loop needs at least two segments, got {}",
            segments.len()
        )));
    }

    for (a, b) in segments.iter().circular_tuple_windows() {
        if a.end != b.start {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "segment ending at {:?} is followed by a segment starting at {:?}",
                a.end, b.start
            )));
        }
        let gap = (surface.point_at(&a.curve.end()) - surface.point_at(&b.curve.start())).norm();
        if gap > epsge {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "trim loop is open by {:?} at {:?}",
                gap, a.end
            )));
        }
    }

    for s in segments {
        for (label, uv) in [(s.start, s.curve.start()), (s.end, s.curve.end())] {
            let expected = match label {
                SegmentVertex::Existing(v) => *topo.vertex(v)?.position(),
                SegmentVertex::Division => *other_pt,
            };
            let d = (surface.point_at(&uv) - expected).norm();
            if d > epsge {
                return Err(RegularizeError::TopologyInconsistency(format!(
                    "segment end is {:?} away from {:?}",
                    d, label
                )));
            }
        }
        let p = surface.point_at(&s.curve.start());
        if (p - vx_point).norm() <= epsge || (p - other_pt).norm() <= epsge {
            next_vxs.push(s.end);
        }
    }
    Ok(())
}

fn loop_polygon<T: FloatingPoint>(segments: &[TrimSegment<T>]) -> Vec<Point2<T>> {
    segments
        .iter()
        .flat_map(|s| {
            let points = s.curve.points();
            points[..points.len() - 1].to_vec()
        })
        .collect()
}

/// Check the trim configuration of a sub-surface produced by dividing `vertex`.
/// Every loop must close, the outer loop has to run counter-clockwise and the holes clockwise,
/// and no loop may cross itself or another loop.
/// Returns the successors of the division end points found in the loops.
pub fn check_trim_config<T: FloatingPoint>(
    topo: &Topology<T>,
    sub: &SubSurface<T>,
    vertex: VertexId,
    other_pt: &Point3<T>,
    epsge: T,
) -> Result<Vec<SegmentVertex>> {
    let vx_point = *topo.vertex(vertex)?.position();
    let mut next_vxs = vec![];
    for segments in sub.loops.iter() {
        check_trim_seg(
            topo,
            sub.surface.as_ref(),
            segments,
            &mut next_vxs,
            &vx_point,
            other_pt,
            epsge,
        )?;
    }
    if next_vxs.is_empty() {
        return Err(RegularizeError::TopologyInconsistency(format!(
            "no loop passes through the division of {:?}",
            vertex
        )));
    }

    let polygons = sub.loops.iter().map(|l| loop_polygon(l)).collect_vec();
    for (i, polygon) in polygons.iter().enumerate() {
        let area = signed_area(polygon);
        if (i == 0) != (area > T::zero()) {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "loop {} has the wrong orientation",
                i
            )));
        }
        let crossings = find_closed_line_string_self_intersections(polygon, epsge);
        if let Some(c) = crossings.first() {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "loop {} crosses itself at {:?}",
                i,
                c.point()
            )));
        }
    }

    let lines = polygons
        .iter()
        .map(|p| {
            p.iter()
                .circular_tuple_windows()
                .map(|(a, b)| Line::new(*a, *b))
                .collect_vec()
        })
        .collect_vec();
    for (i, j) in (0..lines.len()).tuple_combinations() {
        let touching = lines[i]
            .iter()
            .cartesian_product(lines[j].iter())
            .any(|(a, b)| a.intersects(b));
        if touching {
            return Err(RegularizeError::TopologyInconsistency(format!(
                "loops {} and {} intersect",
                i, j
            )));
        }
    }
    Ok(next_vxs)
}
