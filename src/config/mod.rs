// ==========================================
// 骑手周结算系统 - 配置层
// ==========================================
// 职责: 列映射（声明式）与系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod column_map;
pub mod config_manager;
pub mod config_reader;

// 重导出核心配置
pub use column_map::{
    column_to_index, default_column_maps, default_table_mapping, sheet_keys, ColumnMap, ColumnRef,
    FieldMapping, TableMapping,
};
pub use config_manager::{config_keys, ConfigManager};
pub use config_reader::SettlementConfigReader;
