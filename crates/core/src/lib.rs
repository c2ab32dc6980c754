//! Trolley Core - Shared types library.
//!
//! This crate provides the types used across all Trolley components:
//! - `store` - Document collections, generic repositories and the cart service
//! - `cli` - Command-line tools for migrations and record management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Filters and update expressions are evaluated here so
//! every collection backend applies them the same way.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, documents, filters and update expressions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
