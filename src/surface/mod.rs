pub mod nurbs_surface;
pub mod parametric_surface;
pub use nurbs_surface::*;
pub use parametric_surface::*;

#[cfg(test)]
mod tests;
