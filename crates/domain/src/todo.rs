//! ToDo レコードのドメインモデル
//!
//! レコードの生成・部分更新・検索条件の判定のみを担当し、
//! 保存先（メモリ/ファイル）については関知しません。

use crate::errors::TodoError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// タイトルの最大文字数（トリム後）
pub const MAX_TITLE_CHARS: usize = 200;

/// ToDo の識別子（ULID 文字列）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ULID に埋め込まれた生成時刻（ミリ秒）
    pub fn timestamp_ms(&self) -> Option<u64> {
        ulid::Ulid::from_string(&self.0)
            .ok()
            .map(|ulid| ulid.timestamp_ms())
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 永続化される ToDo レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: TodoId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// 作成リクエストの内容（POST /todos のボディ）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_important: Option<bool>,
}

impl NewTodo {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// 部分更新の内容（PUT /todos/{id} のボディ）
///
/// `description` と `due_date` は「省略」と「明示的な null（クリア）」を区別する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl TodoPatch {
    /// 完了フラグのみを変更するパッチ
    pub fn completed(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// フィールドが存在すれば値が null でも Some(..) にする
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// タイトルを前後の空白を除いた形に正規化し、検証する
pub fn normalize_title(raw: &str) -> Result<String, TodoError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TodoError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(TodoError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

impl TodoItem {
    /// 新しい ToDo を生成します。ID と作成日時はここで確定します。
    pub fn create(input: NewTodo, now: DateTime<Utc>) -> Result<Self, TodoError> {
        let title = normalize_title(&input.title)?;
        Ok(Self {
            id: TodoId::new(),
            title,
            description: input.description,
            due_date: input.due_date,
            is_important: input.is_important.unwrap_or(false),
            is_completed: false,
            created_at: now,
        })
    }

    /// パッチを適用した新しい状態を返します。
    /// 検証に失敗した場合は元の状態に一切触れません。
    pub fn patched(&self, patch: TodoPatch) -> Result<Self, TodoError> {
        let title = match patch.title {
            Some(raw) => normalize_title(&raw)?,
            None => self.title.clone(),
        };

        Ok(Self {
            id: self.id.clone(),
            title,
            description: patch.description.unwrap_or_else(|| self.description.clone()),
            due_date: patch.due_date.unwrap_or(self.due_date),
            is_important: patch.is_important.unwrap_or(self.is_important),
            is_completed: patch.is_completed.unwrap_or(self.is_completed),
            created_at: self.created_at,
        })
    }

    /// タイトルが検索語を含むか（大文字小文字を区別しない）
    pub fn matches(&self, filter: &str) -> bool {
        self.title.to_lowercase().contains(&filter.to_lowercase())
    }
}
