#![allow(clippy::needless_range_loop)]

mod closest_parameter;
mod curve;
mod error;
mod knot;
mod misc;
mod regularize;
mod surface;
mod topology;

pub mod prelude {
    pub use crate::closest_parameter::find_surface_closest_parameter;
    pub use crate::curve::*;
    pub use crate::error::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
    pub use crate::regularize::*;
    pub use crate::surface::*;
    pub use crate::topology::*;
}
