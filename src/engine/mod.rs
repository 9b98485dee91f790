// ==========================================
// 骑手周结算系统 - 引擎层
// ==========================================
// 职责: 实现结算规则,不拼 SQL
// 红线: Engine 不访问存储，输入输出均为领域对象
// ==========================================

pub mod settlement;

// 重导出核心引擎
pub use settlement::{round_half_up, SettlementCalculator, WITHHOLDING_RATE};
