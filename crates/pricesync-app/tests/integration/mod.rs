//! Integration tests for pricesync-app.
//!
//! These tests verify the interaction between components:
//! - WebSocket connection lifecycle against a local server
//! - Stream and fallback samples flowing into the store and alerts
//! - Session teardown and reconfiguration

pub mod common;
