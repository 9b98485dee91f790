// ==========================================
// 骑手周结算系统 - 核心库
// ==========================================
// 流程: 结算 Excel → 规范化记录 → 周汇总 → 最终结算 → 骑手查询
// 技术栈: calamine + rusqlite + tokio
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "ko");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录模型与结算实体
pub mod domain;

// 数据仓储层 - 记录存储
pub mod repository;

// 引擎层 - 结算计算
pub mod engine;

// 导入层 - 工作簿解析
pub mod importer;

// 配置层 - 列映射与系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CellValue, FieldValue, FinalSettlement, PeriodFilter, Record, ReplaceScope,
    SettlementFigures, SettlementOverrides, SettlementPeriod, SummaryRecord, TaxBasePolicy,
};

// 引擎
pub use engine::SettlementCalculator;

// 导入
pub use importer::{ImportOptions, ImportReport, RiderIdExtractor, Workbook, WorkbookProcessor};

// API
pub use api::{ImportApi, RiderApi, SettlementApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "라이더 주간 정산 시스템";
