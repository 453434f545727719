//! Wire types for the transport layer

pub mod protocol;

pub use protocol::{ClientMsg, PlayerSnapshot, ServerMsg};
