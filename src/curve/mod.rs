pub mod trim_curve;
pub use trim_curve::*;

#[cfg(test)]
mod tests;
