pub mod data;
pub mod ports;

pub use data::*;
pub use ports::*;
