use thiserror::Error;

/// クライアント操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// 400: 入力値の不備
    #[error("{0}")]
    Validation(String),

    /// 404: 対象がすでに存在しない
    #[error("todo not found: {0}")]
    NotFound(String),

    /// 通信失敗・サーバー障害・応答の解釈不能
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// 利用者に表示する文言
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::Validation(_) => "Please check your input and try again.",
            ClientError::NotFound(_) => "This item no longer exists.",
            ClientError::Transport(_) => "Could not reach the server. Please try again later.",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
