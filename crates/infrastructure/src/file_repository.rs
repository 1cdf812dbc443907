use crate::records::TodoRecords;
use crate::repositories::{poisoned, TodoRepository};
use chrono::Utc;
use domain::{NewTodo, TodoError, TodoId, TodoItem, TodoPatch};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, error, info};

/// JSON ファイルに全件を書き出すストア
///
/// 変更のたびに一時ファイルへ書き込んでからリネームで置き換える。
/// 書き込みに失敗した変更はメモリ上にも反映しない。
#[derive(Debug)]
pub struct FileTodoRepository {
    path: PathBuf,
    records: RwLock<TodoRecords>,
}

impl FileTodoRepository {
    /// ファイルを読み込んでストアを開く。ファイルが無ければ空で開始
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TodoError> {
        let path = path.into();
        let records = load(&path)?;
        info!(path = %path.display(), count = records.len(), "todo store opened");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 複製に対して変更を行い、永続化に成功した場合のみ置き換える
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut TodoRecords) -> Result<T, TodoError>,
    ) -> Result<T, TodoError> {
        let mut guard = self.records.write().map_err(poisoned)?;
        let mut next = (*guard).clone();
        let out = op(&mut next)?;
        persist(&self.path, &next).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to persist todo store");
            e
        })?;
        *guard = next;
        Ok(out)
    }
}

fn load(path: &Path) -> Result<TodoRecords, TodoError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TodoRecords::default()),
        Err(e) => return Err(storage_error(path, e)),
    };
    let items: Vec<TodoItem> = serde_json::from_slice(&bytes)
        .map_err(|e| TodoError::Storage(format!("{}: invalid data: {e}", path.display())))?;
    TodoRecords::from_items(items)
}

fn persist(path: &Path, records: &TodoRecords) -> Result<(), TodoError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| storage_error(dir, e))?;
    }

    let json = serde_json::to_vec_pretty(&records.to_items())
        .map_err(|e| TodoError::Storage(e.to_string()))?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = File::create(&tmp).map_err(|e| storage_error(&tmp, e))?;
    file.write_all(&json).map_err(|e| storage_error(&tmp, e))?;
    file.sync_all().map_err(|e| storage_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| storage_error(path, e))?;

    debug!(path = %path.display(), count = records.len(), "todo store persisted");
    Ok(())
}

fn storage_error(path: &Path, e: std::io::Error) -> TodoError {
    TodoError::Storage(format!("{}: {e}", path.display()))
}

impl TodoRepository for FileTodoRepository {
    fn list(&self, filter: Option<&str>) -> Result<Vec<TodoItem>, TodoError> {
        Ok(self.records.read().map_err(poisoned)?.list(filter))
    }

    fn get(&self, id: &TodoId) -> Result<TodoItem, TodoError> {
        self.records.read().map_err(poisoned)?.get(id)
    }

    fn create(&self, input: NewTodo) -> Result<TodoItem, TodoError> {
        let item = self.mutate(|records| records.create(input, Utc::now()))?;
        debug!(todo_id = %item.id, "todo created");
        Ok(item)
    }

    fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, TodoError> {
        let item = self.mutate(|records| records.update(id, patch))?;
        debug!(todo_id = %id, "todo updated");
        Ok(item)
    }

    fn delete(&self, id: &TodoId) -> Result<(), TodoError> {
        self.mutate(|records| records.delete(id))?;
        debug!(todo_id = %id, "todo deleted");
        Ok(())
    }
}
