//! Cart records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trolley_core::{CartId, UserId};

use crate::db::{Record, Repository};

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning user, if the cart belongs to a signed-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCart {
    /// Owning user, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewCart {
    /// A cart created now, optionally owned by `user_id`.
    #[must_use]
    pub fn new(user_id: Option<UserId>) -> Self {
        Self {
            user_id,
            created_at: Utc::now(),
        }
    }
}

impl Record for Cart {
    const COLLECTION: &'static str = "carts";
    type Draft = NewCart;
}

/// Repository for carts.
pub type CartRepository = Repository<Cart>;
