use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, Vector3};

use super::FloatingPoint;

/// Find the closest point on a segment
/// * `pt` - point to project
/// * `start` - start point of segment
/// * `end` - end point of segment
/// * `u0` - first param of segment
/// * `u1` - second param of segment
pub fn segment_closest_point<T: FloatingPoint, D: DimName>(
    pt: &OPoint<T, D>,
    start: &OPoint<T, D>,
    end: &OPoint<T, D>,
    u0: T,
    u1: T,
) -> (T, OPoint<T, D>)
where
    DefaultAllocator: Allocator<D>,
{
    let dif = end - start;
    let l = dif.norm();

    if l < T::default_epsilon() {
        return (u0, start.clone());
    }

    let r = dif / l;
    let o2pt = pt - start;
    let do2ptr = o2pt.dot(&r);

    if do2ptr < T::zero() {
        (u0, start.clone())
    } else if do2ptr > l {
        (u1, end.clone())
    } else {
        (u0 + (u1 - u0) * do2ptr / l, (r * do2ptr + &start.coords).into())
    }
}

/// Unsigned angle between two vectors, zero if either is degenerate.
pub fn angle_between<T: FloatingPoint>(a: &Vector3<T>, b: &Vector3<T>) -> T {
    let na = a.norm();
    let nb = b.norm();
    if na < T::default_epsilon() || nb < T::default_epsilon() {
        return T::zero();
    }
    let c = a.dot(b) / (na * nb);
    c.max(-T::one()).min(T::one()).acos()
}

/// Signed turning angle from `a` to `b` around `axis`, in (-pi, pi].
pub fn signed_angle<T: FloatingPoint>(a: &Vector3<T>, b: &Vector3<T>, axis: &Vector3<T>) -> T {
    let angle = angle_between(a, b);
    if a.cross(b).dot(axis) < T::zero() {
        -angle
    } else {
        angle
    }
}
