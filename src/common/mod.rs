pub mod error;
pub mod ids;
pub mod time;

pub use error::*;
pub use ids::*;
pub use time::*;
