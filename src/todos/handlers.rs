use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreateTodoRequest, CreatedTodoResponse, DeletedTodoResponse, TodoListResponse,
        UpdatedTodoResponse,
    },
    repo_types::TodoPatch,
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppResult, ValidationError},
    state::AppState,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todo/fetch", get(fetch_todos))
        .route("/todo/create", post(create_todo))
        .route("/todo/update/:id", put(update_todo))
        .route("/todo/delete/:id", delete(delete_todo))
}

fn parse_id(raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidId)
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn fetch_todos(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<TodoListResponse>> {
    let todos = services::list(state.todos.as_ref(), &identity).await?;
    Ok(Json(TodoListResponse { todos }))
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreatedTodoResponse>)> {
    let Json(body) = body?;
    let todo = services::create(state.todos.as_ref(), &identity, body.text.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedTodoResponse {
            message: "Todo created successfully".into(),
            new_todo: todo,
        }),
    ))
}

#[instrument(skip(state, identity, patch), fields(user_id = %identity.user_id))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    patch: Result<Json<TodoPatch>, JsonRejection>,
) -> AppResult<Json<UpdatedTodoResponse>> {
    let id = parse_id(&id)?;
    let Json(patch) = patch?;
    let todo = services::update(state.todos.as_ref(), &identity, id, patch).await?;
    Ok(Json(UpdatedTodoResponse {
        message: "Todo updated successfully".into(),
        todo,
    }))
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedTodoResponse>> {
    let id = parse_id(&id)?;
    services::delete(state.todos.as_ref(), &identity, id).await?;
    Ok(Json(DeletedTodoResponse {
        message: "Todo deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_validation_errors() {
        assert_eq!(parse_id("not-a-uuid"), Err(ValidationError::InvalidId));
        assert_eq!(parse_id(""), Err(ValidationError::InvalidId));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()), Ok(id));
    }
}
