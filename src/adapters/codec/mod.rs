pub mod asm_codec;
pub mod coordinates;
pub mod wire;

pub use asm_codec::*;
pub use coordinates::*;
pub use wire::*;
