//! 会话错误类型
//!
//! 服务端错误与网络错误不在这里：它们是 QueryResult 的变体，会被渲染为一条助手消息，而不是向上传播。

use thiserror::Error;

/// 会话编排中可能出现的错误；均可在本地恢复，不会终止进程
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// 已登录时再次登录，需先 reset
    #[error("Session already initialized")]
    AlreadyLoggedIn,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Message cannot be empty")]
    EmptyUtterance,

    /// 当前轮次仍在等待回复（单飞）
    #[error("A reply is still pending")]
    Busy,

    #[error("Table decode error: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(ChatError::Busy.to_string(), "A reply is still pending");
        assert_eq!(
            ChatError::Decode("expected value at line 1".into()).to_string(),
            "Table decode error: expected value at line 1"
        );
    }
}
