use serde::{Deserialize, Serialize};

use super::repo_types::Todo;

/// Body of `POST /todo/create`. A new todo always starts incomplete, so any
/// `completed` the client sends is ignored along with other unknown fields.
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<Todo>,
}

#[derive(Debug, Serialize)]
pub struct CreatedTodoResponse {
    pub message: String,
    #[serde(rename = "newTodo")]
    pub new_todo: Todo,
}

#[derive(Debug, Serialize)]
pub struct UpdatedTodoResponse {
    pub message: String,
    pub todo: Todo,
}

#[derive(Debug, Serialize)]
pub struct DeletedTodoResponse {
    pub message: String,
}
