// ==========================================
// 骑手周结算系统 - 导入API
// ==========================================
// 职责: 封装工作簿上传（落库）与分析预览
// 配置: 列映射 / 覆盖范围 / 预览行数均从 config_kv 读取
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::column_map::TableMapping;
use crate::config::{ConfigManager, SettlementConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::types::{ReplaceScope, SettlementPeriod};
use crate::i18n::t_with_args;
use crate::importer::{
    ImportOptions, ImportReport, PreviewReport, ProgressFn, Workbook, WorkbookProcessor,
};
use crate::repository::{RecordStore, SqliteRecordStore};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub success: bool,
    /// 面向用户的结果说明
    pub message: String,
    /// 失败原因（success=false 时存在）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 逐表结果与运行日志
    pub report: ImportReport,
}

/// 导入请求参数（未指定的项取配置值）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub period: Option<SettlementPeriod>,
    pub replace_scope: Option<ReplaceScope>,
}

/// 导入API
pub struct ImportApi<S: RecordStore = SqliteRecordStore> {
    store: Arc<S>,
    config: Arc<dyn SettlementConfigReader>,
}

impl ImportApi<SqliteRecordStore> {
    /// 打开数据库，存储与配置共用一个连接
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));

        let store = SqliteRecordStore::from_connection(conn.clone())?;
        let config = ConfigManager::from_connection(conn)
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(Self::with_store(Arc::new(store), Arc::new(config)))
    }
}

impl<S: RecordStore> ImportApi<S> {
    /// 使用外部存储与配置创建
    ///
    /// # 参数
    /// - store: 记录存储
    /// - config: 配置读取器
    pub fn with_store(store: Arc<S>, config: Arc<dyn SettlementConfigReader>) -> Self {
        Self { store, config }
    }

    async fn processor(&self) -> ApiResult<WorkbookProcessor<S>> {
        let maps = self
            .config
            .get_column_maps()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        // 逻辑键即表名，列已在配置读取时与表结构核对
        let tables = TableMapping::identity_for(&maps);
        Ok(WorkbookProcessor::new(self.store.clone(), maps, tables))
    }

    async fn resolve_options(&self, request: ImportRequest) -> ApiResult<ImportOptions> {
        let replace_scope = match request.replace_scope {
            Some(scope) => scope,
            None => self
                .config
                .get_replace_scope()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };
        let options = ImportOptions {
            period: request.period,
            replace_scope,
        };
        options.validate()?;
        Ok(options)
    }

    /// 上传工作簿文件并落库
    ///
    /// # 参数
    /// - file_path: 工作簿路径（.xlsx/.xlsm/.xls/.xlsb/.ods）
    /// - request: 结算周期与覆盖范围
    /// - progress: 逐表进度回调
    ///
    /// # 返回
    /// - Ok(response): 写入失败时 success=false，report 中列出已写入的表
    /// - Err(ApiError): 文件无法打开或参数非法
    #[instrument(skip(self, progress))]
    pub async fn import_workbook(
        &self,
        file_path: &str,
        request: ImportRequest,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> ApiResult<ImportApiResponse> {
        // === 步骤 1: 参数 ===
        let options = self.resolve_options(request).await?;

        // === 步骤 2: 读取工作簿 ===
        let workbook = Workbook::open(file_path)?;

        // === 步骤 3: 处理并落库 ===
        self.run(&workbook, options, progress).await
    }

    /// 上传内存中的工作簿（例如 HTTP 上传体）
    pub async fn import_workbook_bytes(
        &self,
        bytes: Vec<u8>,
        request: ImportRequest,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> ApiResult<ImportApiResponse> {
        let options = self.resolve_options(request).await?;
        let workbook = Workbook::from_bytes(bytes)?;
        self.run(&workbook, options, progress).await
    }

    async fn run(
        &self,
        workbook: &Workbook,
        options: ImportOptions,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> ApiResult<ImportApiResponse> {
        let processor = self.processor().await?;
        let report = processor.process(workbook, options, progress).await?;

        let response = if report.success {
            info!(run_id = %report.run_id, total_saved = report.total_saved, "导入成功");
            ImportApiResponse {
                success: true,
                message: t_with_args(
                    "api.import.success",
                    &[("count", report.total_saved.to_string().as_str())],
                ),
                error: None,
                report,
            }
        } else {
            let error = report.error.clone().unwrap_or_default();
            warn!(run_id = %report.run_id, error = %error, saved = ?report.saved_keys(), "导入中止");
            ImportApiResponse {
                success: false,
                message: t_with_args("api.import.failed", &[("error", error.as_str())]),
                error: Some(error),
                report,
            }
        };
        Ok(response)
    }

    /// 分析模式: 匹配工作表并抽样，不写入
    ///
    /// # 参数
    /// - file_path: 工作簿路径
    /// - sample_rows: 每张表扫描的行数（None 取配置值）
    #[instrument(skip(self))]
    pub async fn preview_workbook(
        &self,
        file_path: &str,
        sample_rows: Option<usize>,
    ) -> ApiResult<PreviewReport> {
        let workbook = Workbook::open(file_path)?;
        self.preview(&workbook, sample_rows).await
    }

    pub async fn preview_workbook_bytes(
        &self,
        bytes: Vec<u8>,
        sample_rows: Option<usize>,
    ) -> ApiResult<PreviewReport> {
        let workbook = Workbook::from_bytes(bytes)?;
        self.preview(&workbook, sample_rows).await
    }

    async fn preview(
        &self,
        workbook: &Workbook,
        sample_rows: Option<usize>,
    ) -> ApiResult<PreviewReport> {
        let sample_rows = match sample_rows {
            Some(n) if n > 0 => n,
            _ => self
                .config
                .get_preview_sample_rows()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };
        let processor = self.processor().await?;
        Ok(processor.preview(workbook, sample_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::column_map::default_column_maps;
    use crate::config::ColumnMap;
    use crate::domain::types::TaxBasePolicy;
    use async_trait::async_trait;
    use std::error::Error;
    use tempfile::NamedTempFile;

    struct FixedConfig {
        replace_scope: ReplaceScope,
    }

    #[async_trait]
    impl SettlementConfigReader for FixedConfig {
        async fn get_tax_base_policy(&self) -> Result<TaxBasePolicy, Box<dyn Error + Send + Sync>> {
            Ok(TaxBasePolicy::Commission)
        }

        async fn get_replace_scope(&self) -> Result<ReplaceScope, Box<dyn Error + Send + Sync>> {
            Ok(self.replace_scope)
        }

        async fn get_preview_sample_rows(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
            Ok(3)
        }

        async fn get_column_maps(&self) -> Result<Vec<ColumnMap>, Box<dyn Error + Send + Sync>> {
            Ok(default_column_maps())
        }
    }

    fn api(scope: ReplaceScope) -> (NamedTempFile, ImportApi<SqliteRecordStore>) {
        let tmp = NamedTempFile::new().unwrap();
        let store = SqliteRecordStore::new(tmp.path().to_str().unwrap()).unwrap();
        let api = ImportApi::with_store(
            Arc::new(store),
            Arc::new(FixedConfig {
                replace_scope: scope,
            }),
        );
        (tmp, api)
    }

    #[tokio::test]
    async fn test_configured_period_scope_needs_period() {
        let (_tmp, api) = api(ReplaceScope::Period);
        let result = api.resolve_options(ImportRequest::default()).await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));

        let options = api
            .resolve_options(ImportRequest {
                period: Some(SettlementPeriod::new(2024, 6, 2)),
                replace_scope: None,
            })
            .await
            .unwrap();
        assert_eq!(options.replace_scope, ReplaceScope::Period);
    }

    #[tokio::test]
    async fn test_request_scope_overrides_config() {
        let (_tmp, api) = api(ReplaceScope::Period);
        let options = api
            .resolve_options(ImportRequest {
                period: None,
                replace_scope: Some(ReplaceScope::Table),
            })
            .await
            .unwrap();
        assert_eq!(options.replace_scope, ReplaceScope::Table);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (_tmp, api) = api(ReplaceScope::Table);
        let result = api
            .import_workbook("/nonexistent/정산.xlsx", ImportRequest::default(), None)
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_preview_uses_configured_sample_rows() {
        let (_tmp, api) = api(ReplaceScope::Table);
        let report = api.preview(&Workbook::default(), None).await.unwrap();
        assert_eq!(report.sheets.len(), 6);
        assert!(report.sheets.iter().all(|s| !s.found()));
    }
}
