pub mod binomial;
pub mod floating_point;
pub mod line;
pub mod line_string_helper;
pub mod orientation;
pub mod polygon_boundary;
pub mod ray;
pub mod trigonometry;

pub use binomial::*;
pub use floating_point::*;
pub use line::*;
pub use line_string_helper::*;
pub use orientation::*;
pub use polygon_boundary::*;
pub use ray::*;
pub use trigonometry::*;
