//! Trolley Store library.
//!
//! Document collections, a generic record repository on top of them, and the
//! cart item service. Used by the CLI and the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
