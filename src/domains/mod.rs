pub mod collision;
pub mod scenario;
pub mod sync;
pub mod vehicle;

pub use collision::*;
pub use scenario::*;
pub use sync::*;
pub use vehicle::*;
