pub mod detector;
pub mod geometry;

pub use detector::*;
pub use geometry::*;
