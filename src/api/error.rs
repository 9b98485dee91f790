// ==========================================
// 骑手周结算系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户可读的错误消息
// 文案: locales/*.yml 的 errors.api.*；InvalidInput / NotFound 携带已本地化的消息
// ==========================================

use crate::i18n::t_with_args;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("{}", t_with_args("errors.api.database", &[("message", .0.as_str())]))]
    DatabaseError(String),

    #[error("{}", t_with_args("errors.api.database_connection", &[("message", .0.as_str())]))]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入 / 配置错误
    // ==========================================
    #[error("{}", t_with_args("errors.api.import", &[("message", .0.as_str())]))]
    ImportError(String),

    #[error("{}", t_with_args("errors.api.config", &[("message", .0.as_str())]))]
    ConfigError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DatabaseConnectionError(_) | RepositoryError::LockError(_) => {
                ApiError::DatabaseConnectionError(err.to_string())
            }
            RepositoryError::InvalidIdentifier(_) => ApiError::InvalidInput(err.to_string()),
            RepositoryError::DatabaseTransactionError(_)
            | RepositoryError::DatabaseQueryError(_)
            | RepositoryError::ConstraintViolation(_)
            | RepositoryError::RowRejected { .. } => ApiError::DatabaseError(err.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(_) => ApiError::NotFound(err.to_string()),
            ImportError::InvalidOptions(_) => ApiError::InvalidInput(err.to_string()),
            ImportError::ConfigValueError { .. } => ApiError::ConfigError(err.to_string()),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// API层Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;
