pub mod codec;
pub mod outbound;

pub use codec::*;
pub use outbound::*;
