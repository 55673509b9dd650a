// ==========================================
// 商品批量导入 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 语义: 远端调用的三态结果中的两种失败
//   - Rejected: 远端已响应但拒绝（校验失败等），不重试
//   - Transport: 未收到响应（网络/超时），可重试
// ==========================================

use thiserror::Error;

/// 远端调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

impl RemoteError {
    /// 是否允许重试（仅传输层失败）
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }

    /// 面向用户的错误文本
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Rejected(msg) | RemoteError::Transport(msg) => msg,
        }
    }
}

/// Result 类型别名
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(RemoteError::Transport("timeout".into()).is_retryable());
        assert!(!RemoteError::Rejected("SKU ya existe".into()).is_retryable());
    }

    #[test]
    fn test_display_is_bare_message() {
        let err = RemoteError::Rejected("Precio invalido".into());
        assert_eq!(err.to_string(), "Precio invalido");
        assert_eq!(err.message(), "Precio invalido");
    }
}
