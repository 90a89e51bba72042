//! Boardlink Discovery - Discovery backend side of the inventory seam
//!
//! This crate provides:
//! - The registration contract a backend offers to inventory sinks
//! - Deregistration handles that detach a sink when dropped
//! - A manually driven backend for feeds and tests

pub mod backend;
pub mod manual;

pub use backend::{DiscoveryBackend, Registration, SinkRegistry};
pub use manual::ManualDiscovery;
