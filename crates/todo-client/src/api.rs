use async_trait::async_trait;
use domain::{NewTodo, TodoId, TodoItem, TodoPatch};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// ToDo ストアに対するクライアント側の操作
///
/// いずれの操作も 1 回だけ試行し、自動リトライは行わない。
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, ClientError>;
    async fn get(&self, id: &TodoId) -> Result<TodoItem, ClientError>;
    async fn create(&self, input: NewTodo) -> Result<TodoItem, ClientError>;
    async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, ClientError>;
    async fn delete(&self, id: &TodoId) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: TodoApi + ?Sized> TodoApi for Arc<T> {
    async fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, ClientError> {
        (**self).list(filter).await
    }

    async fn get(&self, id: &TodoId) -> Result<TodoItem, ClientError> {
        (**self).get(id).await
    }

    async fn create(&self, input: NewTodo) -> Result<TodoItem, ClientError> {
        (**self).create(input).await
    }

    async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, ClientError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &TodoId) -> Result<(), ClientError> {
        (**self).delete(id).await
    }
}

/// サーバーのエラーボディ（`{"error": .., "message": ..}`）
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// REST API を呼び出す実装
#[derive(Debug, Clone)]
pub struct HttpTodoClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTodoClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn todo_url(&self, id: &TodoId) -> String {
        self.url(&format!("/todos/{id}"))
    }
}

/// ステータスコードをエラー分類に対応付け、成功時はボディを復元する
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let resp = check_status(resp).await?;
    Ok(resp.json::<T>().await?)
}

async fn check_status(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = match resp.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    };
    debug!(%status, %message, "todo api returned an error");

    Err(match status {
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        _ => ClientError::Transport(format!("server returned {status}: {message}")),
    })
}

#[async_trait]
impl TodoApi for HttpTodoClient {
    async fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, ClientError> {
        let mut req = self.http.get(self.url("/todos"));
        if let Some(search) = filter {
            req = req.query(&[("search", search)]);
        }
        decode(req.send().await?).await
    }

    async fn get(&self, id: &TodoId) -> Result<TodoItem, ClientError> {
        decode(self.http.get(self.todo_url(id)).send().await?).await
    }

    async fn create(&self, input: NewTodo) -> Result<TodoItem, ClientError> {
        let resp = self.http.post(self.url("/todos")).json(&input).send().await?;
        decode(resp).await
    }

    async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, ClientError> {
        let resp = self.http.put(self.todo_url(id)).json(&patch).send().await?;
        decode(resp).await
    }

    async fn delete(&self, id: &TodoId) -> Result<(), ClientError> {
        check_status(self.http.delete(self.todo_url(id)).send().await?).await?;
        Ok(())
    }
}
