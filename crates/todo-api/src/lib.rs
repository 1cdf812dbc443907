//! ToDo ストアの HTTP API（axum）
//!
//! `GET/POST /todos`、`GET/PUT/DELETE /todos/:id` と `/health` を提供します。
//! 保存先は `TodoRepository` として外部から注入します。

use infrastructure::{InMemoryTodoRepository, TodoRepository};
use std::sync::Arc;

pub mod error;
pub mod handlers;
pub mod router;

pub use error::{ApiError, ErrorBody};

/// メモリストアでルータを構築して返します。
pub fn app() -> axum::Router {
    app_with_state(AppState::default())
}

/// 外部から状態を注入できる版
pub fn app_with_state(state: AppState) -> axum::Router {
    router::build(state)
}

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    repo: Arc<dyn TodoRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn TodoRepository>) -> Self {
        Self { repo }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTodoRepository::new()))
    }

    pub fn repo(&self) -> &Arc<dyn TodoRepository> {
        &self.repo
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
        Router,
    };
    use domain::TodoItem;
    use infrastructure::FileTodoRepository;
    use tower::ServiceExt; // for `oneshot`

    async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(app: &Router, title: &str) -> TodoItem {
        let (status, json) = send(app, "POST", "/todos", Some(serde_json::json!({ "title": title }))).await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn get_health_returns_ok() {
        let (status, json) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn post_todos_returns_201_with_server_fields() {
        let app = app();
        let body = serde_json::json!({
            "title": "  Buy milk  ",
            "description": "2 liters",
            "dueDate": "2024-06-01T10:00:00Z",
            "isImportant": true
        });
        let (status, json) = send(&app, "POST", "/todos", Some(body)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["title"], "Buy milk");
        assert_eq!(json["description"], "2 liters");
        assert_eq!(json["dueDate"], "2024-06-01T10:00:00Z");
        assert_eq!(json["isImportant"], true);
        assert_eq!(json["isCompleted"], false);
        assert_eq!(json["id"].as_str().unwrap().len(), 26);
        assert!(json["createdAt"].is_string());
    }

    #[tokio::test]
    async fn post_todos_with_blank_title_returns_400() {
        let app = app();
        let (status, json) = send(&app, "POST", "/todos", Some(serde_json::json!({ "title": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");

        let (_, list) = send(&app, "GET", "/todos", None).await;
        assert_eq!(list, serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_body_returns_400_envelope() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/todos")
            .header("content-type", "application/json")
            .body(Body::from("{\"title\":"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn get_todo_returns_item_and_404_for_unknown() {
        let app = app();
        let created = create(&app, "Task").await;

        let (status, json) = send(&app, "GET", &format!("/todos/{}", created.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: TodoItem = serde_json::from_value(json).unwrap();
        assert_eq!(fetched, created);

        let (status, json) = send(&app, "GET", "/todos/01HZZZZZZZZZZZZZZZZZZZZZZZ", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn put_with_only_completed_changes_nothing_else() {
        let app = app();
        let body = serde_json::json!({ "title": "Report", "description": "", "isImportant": true });
        let (_, json) = send(&app, "POST", "/todos", Some(body)).await;
        let created: TodoItem = serde_json::from_value(json).unwrap();

        let uri = format!("/todos/{}", created.id);
        let (status, json) = send(&app, "PUT", &uri, Some(serde_json::json!({ "isCompleted": true }))).await;
        assert_eq!(status, StatusCode::OK);
        let updated: TodoItem = serde_json::from_value(json).unwrap();
        assert!(updated.is_completed);

        let (_, json) = send(&app, "GET", &uri, None).await;
        let fetched: TodoItem = serde_json::from_value(json).unwrap();
        assert_eq!(fetched, TodoItem { is_completed: true, ..created });
        assert_eq!(fetched.description.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn put_null_description_clears_it() {
        let app = app();
        let body = serde_json::json!({ "title": "Task", "description": "old" });
        let (_, json) = send(&app, "POST", "/todos", Some(body)).await;
        let id = json["id"].as_str().unwrap().to_string();

        let (status, json) = send(&app, "PUT", &format!("/todos/{id}"), Some(serde_json::json!({ "description": null }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["title"], "Task");
    }

    #[tokio::test]
    async fn put_errors_map_to_400_and_404() {
        let app = app();
        let created = create(&app, "Task").await;

        let (status, _) = send(&app, "PUT", &format!("/todos/{}", created.id), Some(serde_json::json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "PUT", "/todos/missing", Some(serde_json::json!({ "isCompleted": true }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, json) = send(&app, "GET", &format!("/todos/{}", created.id), None).await;
        assert_eq!(json["title"], "Task");
    }

    #[tokio::test]
    async fn list_filters_by_search_query() {
        let app = app();
        let milk = create(&app, "Buy Milk").await;
        create(&app, "Bake bread").await;

        let (status, json) = send(&app, "GET", "/todos?search=MILK", None).await;
        assert_eq!(status, StatusCode::OK);
        let found: Vec<TodoItem> = serde_json::from_value(json).unwrap();
        assert_eq!(found, vec![milk]);

        let (_, json) = send(&app, "GET", "/todos?search=buy%20m", None).await;
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (_, json) = send(&app, "GET", "/todos", None).await;
        assert_eq!(json.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_item() {
        let app = app();
        let created = create(&app, "Task").await;
        let uri = format!("/todos/{}", created.id);

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_and_cors_headers() {
        let app = app();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/todos")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let request = Request::builder().uri("/todos").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .get("access-control-allow-methods")
            .is_some_and(|v| v.to_str().unwrap().contains("PUT")));
    }

    /// 作成のたびに待たされるストア
    struct SlowRepository {
        inner: InMemoryTodoRepository,
        delay: std::time::Duration,
    }

    impl TodoRepository for SlowRepository {
        fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, domain::TodoError> {
            self.inner.list(filter)
        }

        fn get(&self, id: &domain::TodoId) -> Result<TodoItem, domain::TodoError> {
            self.inner.get(id)
        }

        fn create(&self, input: domain::NewTodo) -> Result<TodoItem, domain::TodoError> {
            std::thread::sleep(self.delay);
            self.inner.create(input)
        }

        fn update(&self, id: &domain::TodoId, patch: domain::TodoPatch) -> Result<TodoItem, domain::TodoError> {
            self.inner.update(id, patch)
        }

        fn delete(&self, id: &domain::TodoId) -> Result<(), domain::TodoError> {
            self.inner.delete(id)
        }
    }

    #[tokio::test]
    async fn slow_store_does_not_block_other_requests() {
        let app = app_with_state(AppState::new(Arc::new(SlowRepository {
            inner: InMemoryTodoRepository::new(),
            delay: std::time::Duration::from_millis(200),
        })));
        let finished = std::sync::Mutex::new(Vec::new());

        tokio::join!(
            async {
                let (status, _) =
                    send(&app, "POST", "/todos", Some(serde_json::json!({ "title": "Slow" }))).await;
                assert_eq!(status, StatusCode::CREATED);
                finished.lock().unwrap().push("create");
            },
            async {
                let (status, _) = send(&app, "GET", "/health", None).await;
                assert_eq!(status, StatusCode::OK);
                finished.lock().unwrap().push("health");
            },
        );

        // 単一スレッドのランタイムでも作成待ちの間にヘルスチェックが返る
        assert_eq!(*finished.lock().unwrap(), ["health", "create"]);
    }

    #[tokio::test]
    async fn file_backed_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");

        let app = app_with_state(AppState::new(Arc::new(FileTodoRepository::open(&path).unwrap())));
        let created = create(&app, "Persisted").await;
        drop(app);

        let app = app_with_state(AppState::new(Arc::new(FileTodoRepository::open(&path).unwrap())));
        let (status, json) = send(&app, "GET", &format!("/todos/{}", created.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], "Persisted");
    }
}
