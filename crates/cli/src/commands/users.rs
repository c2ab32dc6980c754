//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! trolley user create -f email=ada@example.com -f plan=pro
//! trolley user list -f plan=pro
//! trolley user get <USER_ID>
//! trolley user update <USER_ID> -s plan=team
//! trolley user delete <USER_ID>
//! ```

use thiserror::Error;
use trolley_core::{Filter, UserId};
use trolley_store::db::RepositoryError;
use trolley_store::models::NewUser;
use trolley_store::state::AppState;

use super::{Field, print_json, to_document, to_filter, to_update};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Output could not be rendered.
    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Create a user from the given fields.
///
/// # Errors
///
/// Returns `UserCommandError` if the insert fails.
pub async fn create(state: &AppState, fields: Vec<Field>) -> Result<(), UserCommandError> {
    let user = state.users().create(&NewUser::new(to_document(fields))).await?;
    tracing::info!(user_id = %user.id, "Created user");
    print_json(&user)?;
    Ok(())
}

/// List users matching every given field.
///
/// # Errors
///
/// Returns `UserCommandError` if the query fails.
pub async fn list(state: &AppState, fields: Vec<Field>) -> Result<(), UserCommandError> {
    let users = state.users().find(&to_filter(fields)).await?;
    print_json(&users)?;
    Ok(())
}

/// Show a single user.
///
/// # Errors
///
/// Returns `UserCommandError` with `RepositoryError::NotFound` if the user does not exist.
pub async fn get(state: &AppState, id: UserId) -> Result<(), UserCommandError> {
    let user = state.users().require_one(&Filter::by_id(id)).await?;
    print_json(&user)?;
    Ok(())
}

/// Set fields on a user.
///
/// # Errors
///
/// Returns `UserCommandError` with `RepositoryError::NotFound` if the user does not exist.
pub async fn update(state: &AppState, id: UserId, fields: Vec<Field>) -> Result<(), UserCommandError> {
    let user = state
        .users()
        .require_one_and_update(&Filter::by_id(id), &to_update(fields))
        .await?;
    tracing::info!(user_id = %user.id, "Updated user");
    print_json(&user)?;
    Ok(())
}

/// Delete a user. Deleting a user that does not exist is not an error.
///
/// # Errors
///
/// Returns `UserCommandError` if the delete fails.
pub async fn delete(state: &AppState, id: UserId) -> Result<(), UserCommandError> {
    match state.users().find_one_and_delete(&Filter::by_id(id)).await? {
        Some(user) => {
            tracing::info!(user_id = %user.id, "Deleted user");
            print_json(&user)?;
        }
        None => tracing::info!(user_id = %id, "No user to delete"),
    }
    Ok(())
}
