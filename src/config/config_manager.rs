// ==========================================
// 骑手周结算系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (scope_id='global')
// ==========================================

use crate::config::column_map::{default_column_maps, ColumnMap};
use crate::config::config_reader::SettlementConfigReader;
use crate::db::{open_sqlite_connection, table_columns};
use crate::domain::types::{ReplaceScope, TaxBasePolicy};
use crate::repository::error::RepositoryError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

type BoxError = Box<dyn Error + Send + Sync>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, BoxError> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, BoxError> {
        {
            let conn_guard = conn.lock().map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, BoxError> {
        let conn = self.conn.lock().map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, BoxError> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), BoxError> {
        let conn = self.conn.lock().map_err(|e| RepositoryError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, BoxError> {
        let conn = self.conn.lock().map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }
}

// ==========================================
// SettlementConfigReader Trait 实现
// ==========================================
#[async_trait]
impl SettlementConfigReader for ConfigManager {
    async fn get_tax_base_policy(&self) -> Result<TaxBasePolicy, BoxError> {
        let value = self.get_config_or_default(config_keys::TAX_BASE_POLICY, "commission")?;
        Ok(value.parse::<TaxBasePolicy>().unwrap_or_else(|e| {
            tracing::warn!(config_key = config_keys::TAX_BASE_POLICY, error = %e, "计税口径配置无效，使用 commission");
            TaxBasePolicy::Commission
        }))
    }

    async fn get_replace_scope(&self) -> Result<ReplaceScope, BoxError> {
        let value = self.get_config_or_default(config_keys::REPLACE_SCOPE, "table")?;
        Ok(value.parse::<ReplaceScope>().unwrap_or_else(|e| {
            tracing::warn!(config_key = config_keys::REPLACE_SCOPE, error = %e, "覆盖范围配置无效，使用 table");
            ReplaceScope::Table
        }))
    }

    async fn get_preview_sample_rows(&self) -> Result<usize, BoxError> {
        let value = self.get_config_or_default(config_keys::PREVIEW_SAMPLE_ROWS, "5")?;
        Ok(value.trim().parse::<usize>().ok().filter(|n| *n > 0).unwrap_or(5))
    }

    async fn get_column_maps(&self) -> Result<Vec<ColumnMap>, BoxError> {
        let raw = match self.get_config_value(config_keys::COLUMN_MAPS)? {
            Some(v) => v,
            None => return Ok(default_column_maps()),
        };

        let maps: Vec<ColumnMap> = match serde_json::from_str(&raw) {
            Ok(maps) => maps,
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::COLUMN_MAPS,
                    error = %e,
                    "列映射配置格式错误，使用内置映射"
                );
                return Ok(default_column_maps());
            }
        };

        // 逻辑键即目标表，输出字段须为表中已有列
        let conn = self.conn.lock().map_err(|e| RepositoryError::LockError(e.to_string()))?;
        for map in &maps {
            let checked = match map.validate() {
                Ok(()) => {
                    let columns = table_columns(&conn, &map.key)?;
                    map.check_table_columns(&map.key, &columns)
                }
                Err(e) => Err(e),
            };
            if let Err(e) = checked {
                tracing::warn!(
                    config_key = config_keys::COLUMN_MAPS,
                    sheet_key = %map.key,
                    error = %e,
                    "列映射配置校验失败，使用内置映射"
                );
                return Ok(default_column_maps());
            }
        }
        Ok(maps)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 结算
    pub const TAX_BASE_POLICY: &str = "settlement.tax_base_policy";

    // 导入
    pub const REPLACE_SCOPE: &str = "import.replace_scope";
    pub const PREVIEW_SAMPLE_ROWS: &str = "import.preview_sample_rows";
    pub const COLUMN_MAPS: &str = "import.column_maps"; // JSON 数组
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::column_map::FieldMapping;
    use tempfile::NamedTempFile;

    fn setup() -> (NamedTempFile, ConfigManager) {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let (_tmp, manager) = setup();
        assert_eq!(manager.get_tax_base_policy().await.unwrap(), TaxBasePolicy::Commission);
        assert_eq!(manager.get_replace_scope().await.unwrap(), ReplaceScope::Table);
        assert_eq!(manager.get_preview_sample_rows().await.unwrap(), 5);
        assert_eq!(manager.get_column_maps().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_set_and_read_back() {
        let (_tmp, manager) = setup();
        manager
            .set_global_config_value(config_keys::TAX_BASE_POLICY, "remuneration")
            .unwrap();
        manager
            .set_global_config_value(config_keys::REPLACE_SCOPE, "period")
            .unwrap();
        manager
            .set_global_config_value(config_keys::PREVIEW_SAMPLE_ROWS, "12")
            .unwrap();

        assert_eq!(manager.get_tax_base_policy().await.unwrap(), TaxBasePolicy::Remuneration);
        assert_eq!(manager.get_replace_scope().await.unwrap(), ReplaceScope::Period);
        assert_eq!(manager.get_preview_sample_rows().await.unwrap(), 12);
        assert_eq!(manager.get_config_snapshot().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back() {
        let (_tmp, manager) = setup();
        manager
            .set_global_config_value(config_keys::TAX_BASE_POLICY, "salary")
            .unwrap();
        manager
            .set_global_config_value(config_keys::PREVIEW_SAMPLE_ROWS, "0")
            .unwrap();
        manager
            .set_global_config_value(config_keys::COLUMN_MAPS, "not json")
            .unwrap();

        assert_eq!(manager.get_tax_base_policy().await.unwrap(), TaxBasePolicy::Commission);
        assert_eq!(manager.get_preview_sample_rows().await.unwrap(), 5);
        assert_eq!(manager.get_column_maps().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_custom_column_maps() {
        let (_tmp, manager) = setup();
        let mut maps = default_column_maps();
        maps.truncate(2);
        maps[1].sheet_name = "지원금(신규)".to_string();
        manager
            .set_global_config_value(config_keys::COLUMN_MAPS, &serde_json::to_string(&maps).unwrap())
            .unwrap();

        let loaded = manager.get_column_maps().await.unwrap();
        assert_eq!(loaded, maps);
    }

    #[tokio::test]
    async fn test_column_maps_checked_against_schema() {
        let (_tmp, manager) = setup();

        // 表中没有的字段
        let mut maps = default_column_maps();
        maps[1].data_columns.push(FieldMapping::new("memo", "B"));
        manager
            .set_global_config_value(config_keys::COLUMN_MAPS, &serde_json::to_string(&maps).unwrap())
            .unwrap();
        assert_eq!(manager.get_column_maps().await.unwrap(), default_column_maps());

        // 不存在的目标表
        let mut maps = default_column_maps();
        maps[0].key = "monthly_summary".to_string();
        manager
            .set_global_config_value(config_keys::COLUMN_MAPS, &serde_json::to_string(&maps).unwrap())
            .unwrap();
        assert_eq!(manager.get_column_maps().await.unwrap(), default_column_maps());
    }
}
