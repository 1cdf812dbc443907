use crate::records::TodoRecords;
use chrono::Utc;
use domain::{NewTodo, TodoError, TodoId, TodoItem, TodoPatch};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// ToDo ストアの抽象
///
/// 変更系の操作は実装側で直列化され、戻る前に永続化が完了していること
/// （直後の `list` / `get` に必ず反映される）。
pub trait TodoRepository: Send + Sync {
    /// 一覧を取得（タイトルの部分一致、大文字小文字は区別しない）
    fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, TodoError>;
    /// 単一取得
    fn get(&self, id: &TodoId) -> Result<TodoItem, TodoError>;
    /// 作成（ID と作成日時はストアが割り当てる）
    fn create(&self, input: NewTodo) -> Result<TodoItem, TodoError>;
    /// 部分更新
    fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, TodoError>;
    /// 削除
    fn delete(&self, id: &TodoId) -> Result<(), TodoError>;
}

pub(crate) fn poisoned<T>(_: PoisonError<T>) -> TodoError {
    TodoError::Storage("store lock poisoned".to_string())
}

/// メモリ上のみで保持するストア（開発/テスト用）
#[derive(Debug, Default)]
pub struct InMemoryTodoRepository {
    records: RwLock<TodoRecords>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TodoRepository for InMemoryTodoRepository {
    fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, TodoError> {
        Ok(self.records.read().map_err(poisoned)?.list(filter))
    }

    fn get(&self, id: &TodoId) -> Result<TodoItem, TodoError> {
        self.records.read().map_err(poisoned)?.get(id)
    }

    fn create(&self, input: NewTodo) -> Result<TodoItem, TodoError> {
        let item = self
            .records
            .write()
            .map_err(poisoned)?
            .create(input, Utc::now())?;
        debug!(todo_id = %item.id, "todo created");
        Ok(item)
    }

    fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, TodoError> {
        let item = self.records.write().map_err(poisoned)?.update(id, patch)?;
        debug!(todo_id = %id, "todo updated");
        Ok(item)
    }

    fn delete(&self, id: &TodoId) -> Result<(), TodoError> {
        self.records.write().map_err(poisoned)?.delete(id)?;
        debug!(todo_id = %id, "todo deleted");
        Ok(())
    }
}
