pub mod candidate;
pub mod corner;
pub mod division;
pub mod driver;
pub mod face_set;
pub mod options;
pub mod path;
pub mod regularity;
pub mod split;
pub mod trim_config;

pub use candidate::*;
pub use corner::*;
pub use division::*;
pub use driver::*;
pub use face_set::*;
pub use options::*;
pub use path::*;
pub use regularity::*;
pub use split::*;
pub use trim_config::*;

#[cfg(test)]
mod tests;
