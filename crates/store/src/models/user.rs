//! User records.
//!
//! A user is an opaque document: a generated ID plus whatever fields the
//! caller supplied at creation time.

use serde::{Deserialize, Serialize};

use trolley_core::{Document, UserId};

use crate::db::{Record, Repository};

/// A stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Caller-defined fields.
    #[serde(flatten)]
    pub attributes: Document,
}

/// Fields for a new user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NewUser {
    /// Caller-defined fields.
    pub attributes: Document,
}

impl NewUser {
    /// Create a draft from caller fields.
    #[must_use]
    pub const fn new(attributes: Document) -> Self {
        Self { attributes }
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    type Draft = NewUser;
}

/// Repository for users.
pub type UserRepository = Repository<User>;
