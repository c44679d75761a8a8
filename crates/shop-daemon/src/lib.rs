//! shop-daemon library target.
//!
//! Exposes the router, state and action orchestration for integration tests.
//! The binary `main.rs` depends on this library target.

pub mod action;
pub mod api_types;
pub mod notify;
pub mod respond;
pub mod routes;
pub mod state;
