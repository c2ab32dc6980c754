//! Core types for Trolley.
//!
//! This module provides type-safe wrappers for common domain concepts and
//! the query vocabulary shared by every document collection.

pub mod document;
pub mod id;
pub mod price;
pub mod update;

pub use document::{Document, Filter, ID_FIELD};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use update::{Update, UpdateError};
