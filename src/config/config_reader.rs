// ==========================================
// 骑手周结算系统 - 配置读取 Trait
// ==========================================
// 职责: 定义导入/结算所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::column_map::ColumnMap;
use crate::domain::types::{ReplaceScope, TaxBasePolicy};
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// SettlementConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait SettlementConfigReader: Send + Sync {
    /// 默认计税口径
    ///
    /// # 默认值
    /// - commission
    async fn get_tax_base_policy(&self) -> Result<TaxBasePolicy, Box<dyn Error + Send + Sync>>;

    /// 导入时目标表的覆盖范围
    ///
    /// # 默认值
    /// - table（整表清空后写入）
    async fn get_replace_scope(&self) -> Result<ReplaceScope, Box<dyn Error + Send + Sync>>;

    /// 预览模式下每张表扫描的数据行数
    ///
    /// # 默认值
    /// - 5
    async fn get_preview_sample_rows(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 列映射集合
    ///
    /// # 返回
    /// - 配置中的 JSON 数组（已校验）；未配置或格式错误时返回内置映射
    async fn get_column_maps(&self) -> Result<Vec<ColumnMap>, Box<dyn Error + Send + Sync>>;
}
