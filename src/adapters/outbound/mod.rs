pub mod event_kernel;
pub mod framing;
pub mod memory_connection;
pub mod tcp_connection;

pub use event_kernel::*;
pub use framing::*;
pub use memory_connection::*;
pub use tcp_connection::*;
