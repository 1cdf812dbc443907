use chrono::{DateTime, Utc};
use domain::{NewTodo, TodoError, TodoId, TodoItem, TodoPatch};
use std::collections::BTreeMap;

/// ID 順に並んだ ToDo レコードの集合
///
/// ULID はソートすると生成順になるため、一覧の順序は作成順で安定する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoRecords {
    items: BTreeMap<TodoId, TodoItem>,
}

impl TodoRecords {
    /// 既存レコードから集合を構築（ID 重複はエラー）
    pub fn from_items(items: Vec<TodoItem>) -> Result<Self, TodoError> {
        let mut map = BTreeMap::new();
        for item in items {
            let id = item.id.clone();
            if map.insert(id.clone(), item).is_some() {
                return Err(TodoError::Storage(format!("duplicate todo id: {id}")));
            }
        }
        Ok(Self { items: map })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 検索語に一致するレコード。空白のみの検索語は無指定として扱う
    pub fn list(&self, filter: Option<&str>) -> Vec<TodoItem> {
        let filter = filter.filter(|f| !f.trim().is_empty());
        self.items
            .values()
            .filter(|item| filter.map_or(true, |f| item.matches(f)))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &TodoId) -> Result<TodoItem, TodoError> {
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| TodoError::not_found(id))
    }

    pub fn create(&mut self, input: NewTodo, now: DateTime<Utc>) -> Result<TodoItem, TodoError> {
        let mut item = TodoItem::create(input, now)?;
        // 同一ミリ秒内の衝突は実質起きないが、一意性は必ず保証する
        while self.items.contains_key(&item.id) {
            item.id = TodoId::new();
        }
        self.items.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    pub fn update(&mut self, id: &TodoId, patch: TodoPatch) -> Result<TodoItem, TodoError> {
        let current = self
            .items
            .get_mut(id)
            .ok_or_else(|| TodoError::not_found(id))?;
        let updated = current.patched(patch)?;
        *current = updated.clone();
        Ok(updated)
    }

    pub fn delete(&mut self, id: &TodoId) -> Result<TodoItem, TodoError> {
        self.items.remove(id).ok_or_else(|| TodoError::not_found(id))
    }

    pub fn to_items(&self) -> Vec<TodoItem> {
        self.items.values().cloned().collect()
    }
}
