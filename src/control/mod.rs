//! Out-of-process control channel: a loopback TCP listener accepting `stop`
//! and `status` from a separate client invocation.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial module structure

pub mod address;
pub mod client;
pub mod protocol;
pub mod server;
pub mod store;

pub use address::{resolve_endpoint, ControlEndpoint, ListenSpec};
pub use client::{ControlClient, Exchange, LsbStatus};
pub use protocol::{ControlCommand, ControlResponse};
pub use server::{BoundControl, ControlHost, ControlServer};
pub use store::{FilePortStore, MemoryPortStore, PortStore};
