use thiserror::Error;

/// ToDo 操作で発生するエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    /// 入力値の不備（空タイトルなど）。呼び出し側で修正可能
    #[error("Validation error: {0}")]
    Validation(String),

    /// 指定された ID の ToDo が存在しない
    #[error("Todo not found: {0}")]
    NotFound(String),

    /// 永続化層の失敗
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TodoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound(id.to_string())
    }
}
