//! ToDo API のクライアントと一覧画面の更新プロトコル
//!
//! 表示層から独立した形で、一覧の再取得・検索語のデバウンス・
//! 完了フラグの楽観的更新を提供します。

pub mod api;
pub mod config;
pub mod error;
pub mod list_view;

pub use api::{HttpTodoClient, TodoApi};
pub use config::ClientConfig;
pub use error::ClientError;
pub use list_view::{RefreshOutcome, TodoListView};
