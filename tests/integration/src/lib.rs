//! Integration test utilities for the XP subsystem
//!
//! Provides in-memory implementations of every port and a harness that
//! wires the full service stack over them, so the end-to-end flows run
//! without PostgreSQL or Redis.

pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
