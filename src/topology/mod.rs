pub mod arena;
pub mod edge;
pub mod face;
pub mod vertex;

pub use arena::*;
pub use edge::*;
pub use face::*;
pub use vertex::*;

#[cfg(test)]
mod tests;
