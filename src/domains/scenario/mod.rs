pub mod host;
pub mod obstacles;
pub mod registry;

pub use host::*;
pub use obstacles::*;
pub use registry::*;
