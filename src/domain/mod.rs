// ==========================================
// 骑手周结算系统 - 领域模型层
// ==========================================
// 职责: 定义单元格/记录模型、结算实体、基础类型
// 红线: 不含数据访问逻辑,不含计算逻辑
// ==========================================

pub mod record;
pub mod settlement;
pub mod types;

// 重导出核心类型
pub use record::{CellValue, ExtractedRecord, FieldValue, Record};
pub use settlement::{
    FinalSettlement, SettlementFigures, SettlementOverrides, SummaryRecord,
};
pub use types::{PeriodFilter, ReplaceScope, SettlementPeriod, SheetDataType, TaxBasePolicy};
