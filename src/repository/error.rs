// ==========================================
// 骑手周结算系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 文案: locales/*.yml 的 errors.repository.*
// ==========================================

use crate::i18n::t_with_args;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("{}", t_with_args("errors.repository.connection", &[("message", .0.as_str())]))]
    DatabaseConnectionError(String),

    #[error("{}", t_with_args("errors.repository.lock", &[("message", .0.as_str())]))]
    LockError(String),

    #[error("{}", t_with_args("errors.repository.transaction", &[("message", .0.as_str())]))]
    DatabaseTransactionError(String),

    #[error("{}", t_with_args("errors.repository.query", &[("message", .0.as_str())]))]
    DatabaseQueryError(String),

    #[error("{}", t_with_args("errors.repository.constraint", &[("message", .0.as_str())]))]
    ConstraintViolation(String),

    // ===== 调用方错误 =====
    #[error("{}", t_with_args("errors.repository.invalid_identifier", &[("name", .0.as_str())]))]
    InvalidIdentifier(String),

    #[error("{}", t_with_args(
        "errors.repository.row_rejected",
        &[("index", .index.to_string().as_str()), ("message", .message.as_str())],
    ))]
    RowRejected { index: usize, message: String },
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("constraint") => {
                RepositoryError::ConstraintViolation(msg)
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) => RepositoryError::DatabaseQueryError(msg),
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
