//! Owner-scoped operations on task items. Every function takes the caller's
//! [`Identity`] and refuses to read or change items recorded under anyone
//! else.

use tracing::{debug, info};
use uuid::Uuid;

use super::repo::TodoStore;
use super::repo_types::{Todo, TodoPatch};
use crate::auth::dto::Identity;
use crate::error::{AppResult, OwnershipError, StoreError, ValidationError};

fn clean_text(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

pub async fn create(store: &dyn TodoStore, identity: &Identity, text: Option<&str>) -> AppResult<Todo> {
    let text = clean_text(text.ok_or(ValidationError::MissingField("text"))?)?;
    let todo = store.insert(identity.user_id, &text).await?;
    info!(user_id = %identity.user_id, todo_id = %todo.id, "todo created");
    Ok(todo)
}

pub async fn list(store: &dyn TodoStore, identity: &Identity) -> AppResult<Vec<Todo>> {
    Ok(store.list_by_owner(identity.user_id).await?)
}

/// Loads `id` and confirms the caller owns it.
async fn load_owned(store: &dyn TodoStore, identity: &Identity, id: Uuid) -> AppResult<Todo> {
    let todo = store.find_by_id(id).await?.ok_or(StoreError::NotFound)?;
    if todo.owner != identity.user_id {
        debug!(user_id = %identity.user_id, todo_id = %id, "todo owned by another user");
        return Err(OwnershipError::Forbidden.into());
    }
    Ok(todo)
}

pub async fn update(
    store: &dyn TodoStore,
    identity: &Identity,
    id: Uuid,
    mut patch: TodoPatch,
) -> AppResult<Todo> {
    if patch.is_empty() {
        return Err(ValidationError::MissingField("text or completed").into());
    }
    if let Some(text) = patch.text.take() {
        patch.text = Some(clean_text(&text)?);
    }

    load_owned(store, identity, id).await?;

    // deleted between the ownership check and the write
    let todo = store
        .update_owned(id, identity.user_id, &patch)
        .await?
        .ok_or(StoreError::NotFound)?;
    info!(user_id = %identity.user_id, todo_id = %id, completed = todo.completed, "todo updated");
    Ok(todo)
}

pub async fn delete(store: &dyn TodoStore, identity: &Identity, id: Uuid) -> AppResult<()> {
    load_owned(store, identity, id).await?;
    if !store.delete_owned(id, identity.user_id).await? {
        return Err(StoreError::NotFound.into());
    }
    info!(user_id = %identity.user_id, todo_id = %id, "todo deleted");
    Ok(())
}
