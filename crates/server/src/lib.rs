//! Tidegate server library.
//!
//! Exposes the gateway as a library so the binary stays thin and the router
//! can be driven in-process by tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod vault;
