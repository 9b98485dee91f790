// ==========================================
// 骑手周结算系统 - 导入层
// ==========================================
// 职责: 结算 Excel → 规范化记录 → 记录存储
// 支持: .xlsx / .xlsm / .xls / .xlsb / .ods
// ==========================================

// 模块声明
pub mod cell_coercion;
pub mod error;
pub mod identifier;
pub mod import_log;
pub mod sheet_extractor;
pub mod workbook;
pub mod workbook_processor;

// 重导出核心类型
pub use cell_coercion::{parse_amount, parse_date, parse_float_prefix, NUMERIC_FIELDS};
pub use error::{ImportError, ImportResult};
pub use identifier::{IdRule, IdentifierExtractor, RiderIdExtractor};
pub use import_log::{ImportLog, LogEntry, LogLevel};
pub use sheet_extractor::{SheetExtraction, SheetExtractor};
pub use workbook::{MatchKind, SheetGrid, SheetMatch, Workbook};
pub use workbook_processor::{
    ImportOptions, ImportReport, PreviewReport, ProgressFn, SheetOutcome, SheetPreview,
    SheetResult, WorkbookProcessor,
};
