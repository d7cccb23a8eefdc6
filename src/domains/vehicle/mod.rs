pub mod mobility;
pub mod state;

pub use mobility::*;
pub use state::*;
