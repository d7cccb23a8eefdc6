pub mod command_interface;
pub mod runner;
pub mod scenario_manager;

pub use command_interface::*;
pub use runner::*;
pub use scenario_manager::*;
