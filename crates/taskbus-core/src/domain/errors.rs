//! Errors - 実行エラーと設定エラー
//!
//! - `TaskError`: runner が業務的に失敗したことを表す
//! - `ConfigurationError`: 型解決に失敗した（起動を中断すべき）

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ErrorKind は runner 失敗の分類
///
/// - Data: タスクデータ自体が不正（再実行しても無駄）
/// - Partner: 外部の取引先・上流サービスの障害
/// - Internal: それ以外
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Data,
    Partner,
    Internal,
}

/// Failure reported by a runner's business logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    kind: ErrorKind,
    message: String,
}

impl TaskError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Data, message)
    }

    pub fn partner(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Partner, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskError (kind: {:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for TaskError {}

/// Type resolution could not produce a descriptor for a runner.
///
/// Raised at registration time. Callers are expected to abort startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("runner {handler} never binds its type parameters (walk stopped at {reached})")]
    UnboundParameters { handler: String, reached: String },

    #[error("ancestry of {handler} is deeper than {limit} levels")]
    AncestryTooDeep { handler: String, limit: usize },

    #[error("type arguments nest deeper than {limit} levels at `{path}`")]
    NestingTooDeep { limit: usize, path: String },

    #[error("placeholder #{index} has no matching type argument at `{path}`")]
    UnboundPlaceholder { index: usize, path: String },

    #[error("{subject} takes {expected} type arguments, found {found}")]
    Arity {
        subject: String,
        expected: usize,
        found: usize,
    },
}
