// ==========================================
// 骑手周结算系统 - API 层
// ==========================================
// 职责: 面向调用方（CLI / 上层服务）的业务接口
// 红线: 不含计算规则（见 engine），不拼 SQL（见 repository）
// ==========================================

pub mod error;
pub mod import_api;
pub mod rider_api;
pub mod settlement_api;

// 重导出
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse, ImportRequest};
pub use rider_api::{RiderApi, RiderLookup};
pub use settlement_api::{
    MonthPeriods, SaveSettlementResponse, SettlementApi, SettlementRequest, SettlementStatistics,
};
