//! IPC subsystem — Unix socket control plane.
//!
//! Clients exchange length-prefixed s-expression messages to query status
//! and stats, and receive a broadcast event for every emitted action.

pub mod dispatch;
pub mod server;

pub use server::IpcServer;
