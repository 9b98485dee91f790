// ==========================================
// 骑手周结算系统 - 应用状态
// ==========================================
// 职责: 打开数据库，组装共享同一连接的各 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiResult, ImportApi, RiderApi, SettlementApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::repository::SqliteRecordStore;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "RIDER_SETTLEMENT_DB";

const DB_FILE_NAME: &str = "rider_settlement.db";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置管理
    pub config: Arc<ConfigManager>,

    /// 工作簿导入API
    pub import_api: Arc<ImportApi<SqliteRecordStore>>,

    /// 结算管理API
    pub settlement_api: Arc<SettlementApi<SqliteRecordStore>>,

    /// 骑手查询API
    pub rider_api: Arc<RiderApi<SqliteRecordStore>>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Err(ApiError): 数据库无法打开或建表失败
    pub fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let version = read_schema_version(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        tracing::debug!(schema_version = ?version, "数据库结构就绪");
        let conn = Arc::new(Mutex::new(conn));

        // 共享连接
        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone())?);
        let config = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        );

        Ok(Self {
            db_path,
            import_api: Arc::new(ImportApi::with_store(store.clone(), config.clone())),
            settlement_api: Arc::new(SettlementApi::new(store.clone(), config.clone())),
            rider_api: Arc::new(RiderApi::new(store)),
            config,
        })
    }
}

/// 默认数据库路径
///
/// 优先级: RIDER_SETTLEMENT_DB 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let path = match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("rider-settlement");
            // 目录创建失败时由打开数据库时报告
            let _ = std::fs::create_dir_all(&dir);
            dir.join(DB_FILE_NAME)
        }
        None => PathBuf::from(".").join(DB_FILE_NAME),
    };
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SettlementPeriod;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
    }

    #[tokio::test]
    async fn test_apis_share_one_database() {
        let tmp = NamedTempFile::new().unwrap();
        let state = AppState::new(tmp.path().to_string_lossy().to_string()).unwrap();

        assert!(state.config.get_config_snapshot().unwrap().is_empty());
        assert!(state.rider_api.available_periods().await.unwrap().is_empty());
        assert!(state
            .settlement_api
            .period_options()
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            state
                .rider_api
                .lookup(SettlementPeriod::new(2024, 6, 2), "김철수1234")
                .await,
            Err(ApiError::NotFound(_))
        ));
    }
}
