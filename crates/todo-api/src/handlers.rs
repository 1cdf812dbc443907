use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::{NewTodo, TodoError, TodoId, TodoItem, TodoPatch};
use infrastructure::TodoRepository;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// GET /todos のクエリ
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

/// ストア操作をブロッキング用スレッドで実行する
///
/// ファイルストアは書き込みごとに fsync するため、非同期タスク上で直接呼ばない。
async fn with_repo<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn TodoRepository) -> Result<T, TodoError> + Send + 'static,
{
    let repo = state.repo.clone();
    let result = tokio::task::spawn_blocking(move || op(repo.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?;
    Ok(result?)
}

/// ヘルスチェック
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthBody { status: "ok" }))
}

pub async fn list_todos(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let Query(params) = query?;
    let todos = with_repo(&state, move |repo| repo.list(params.search.as_deref())).await?;
    Ok(Json(todos))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TodoItem>, ApiError> {
    let id = TodoId::from_string(id);
    let todo = with_repo(&state, move |repo| repo.get(&id)).await?;
    Ok(Json(todo))
}

pub async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<NewTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<TodoItem>), ApiError> {
    let Json(input) = payload?;
    let todo = with_repo(&state, move |repo| repo.create(input)).await?;
    info!(todo_id = %todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TodoPatch>, JsonRejection>,
) -> Result<Json<TodoItem>, ApiError> {
    let Json(patch) = payload?;
    let id = TodoId::from_string(id);
    let todo = with_repo(&state, move |repo| repo.update(&id, patch)).await?;
    info!(todo_id = %todo.id, completed = todo.is_completed, "todo updated");
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = TodoId::from_string(id);
    let target = id.clone();
    with_repo(&state, move |repo| repo.delete(&target)).await?;
    info!(todo_id = %id, "todo deleted");
    Ok(StatusCode::NO_CONTENT)
}
