// ==========================================
// 骑手周结算系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 单元格级别的问题不产生错误（按默认值降级），
//       这里只覆盖文件 / 配置 / 持久化层面的失败
// 文案: locales/*.yml 的 errors.import.*
// ==========================================

use crate::i18n::t_with_args;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("{}", t_with_args("errors.import.file_not_found", &[("path", .0.as_str())]))]
    FileNotFound(String),

    #[error("{}", t_with_args("errors.import.unsupported_format", &[("ext", .0.as_str())]))]
    UnsupportedFormat(String),

    #[error("{}", t_with_args("errors.import.file_read", &[("message", .0.as_str())]))]
    FileReadError(String),

    #[error("{}", t_with_args("errors.import.excel_parse", &[("message", .0.as_str())]))]
    ExcelParseError(String),

    // ===== 配置错误 =====
    #[error("{}", t_with_args(
        "errors.import.config_value",
        &[("key", .key.as_str()), ("value", .value.as_str()), ("message", .message.as_str())],
    ))]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    #[error("{}", t_with_args("errors.import.invalid_options", &[("message", .0.as_str())]))]
    InvalidOptions(String),

    // ===== 持久化错误 =====
    #[error("{}", t_with_args(
        "errors.import.insert_failed",
        &[("table", .table.as_str()), ("message", .message.as_str())],
    ))]
    InsertFailed { table: String, message: String },

    #[error("{}", t_with_args(
        "errors.import.delete_failed",
        &[("table", .table.as_str()), ("message", .message.as_str())],
    ))]
    DeleteFailed { table: String, message: String },
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
