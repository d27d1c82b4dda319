use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{Todo, TodoPatch};
use crate::error::StoreError;

/// Item store. Mutations are keyed by `(id, owner)` so each one is a single
/// atomic row operation that cannot touch another user's item.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, owner: Uuid, text: &str) -> Result<Todo, StoreError>;

    /// Items of `owner` in insertion order.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>, StoreError>;

    /// `None` when no item with this id belongs to `owner`.
    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError>;

    /// `false` when nothing was deleted.
    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn insert(&self, owner: Uuid, text: &str) -> Result<Todo, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, owner, text)
            VALUES ($1, $2, $3)
            RETURNING id, owner, text, completed, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(text)
        .fetch_one(&self.db)
        .await?;
        Ok(todo)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, owner, text, completed, created_at, updated_at
            FROM todos
            WHERE owner = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, owner, text, completed, created_at, updated_at
            FROM todos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET text = COALESCE($3, text),
                   completed = COALESCE($4, completed),
                   updated_at = now()
             WHERE id = $1 AND owner = $2
            RETURNING id, owner, text, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(patch.text.as_deref())
        .bind(patch.completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(todo)
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// In-process item store used by tests and `AppState::fake()`.
#[derive(Default)]
pub struct MemoryTodoStore {
    todos: RwLock<Vec<Todo>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn insert(&self, owner: Uuid, text: &str) -> Result<Todo, StoreError> {
        let now = OffsetDateTime::now_utc();
        let todo = Todo {
            id: Uuid::new_v4(),
            owner,
            text: text.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.write().await.push(todo.clone());
        Ok(todo)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Todo>, StoreError> {
        Ok(self
            .todos
            .read()
            .await
            .iter()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>, StoreError> {
        Ok(self.todos.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: &TodoPatch,
    ) -> Result<Option<Todo>, StoreError> {
        let mut todos = self.todos.write().await;
        let Some(todo) = todos.iter_mut().find(|t| t.id == id && t.owner == owner) else {
            return Ok(None);
        };
        if let Some(text) = &patch.text {
            todo.text = text.clone();
        }
        if let Some(completed) = patch.completed {
            todo.completed = completed;
        }
        todo.updated_at = OffsetDateTime::now_utc();
        Ok(Some(todo.clone()))
    }

    async fn delete_owned(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let mut todos = self.todos.write().await;
        let before = todos.len();
        todos.retain(|t| !(t.id == id && t.owner == owner));
        Ok(todos.len() < before)
    }
}
