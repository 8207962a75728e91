//! Connected-socket inspection.
//!
//! This crate provides:
//! - `TcpState` and `TcpSnapshot` for the kernel's view of a connection
//! - `ConnectionProbe` trait for peer identity, TCP counters, and forced
//!   shutdown, with a real socket implementation and a mock

pub mod probe;
pub mod snapshot;

pub use probe::{ConnectionProbe, MockProbe, NetError, SocketProbe};
pub use snapshot::{TcpSnapshot, TcpState};
