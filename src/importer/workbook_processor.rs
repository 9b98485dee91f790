// ==========================================
// 骑手周结算系统 - 工作簿处理器
// ==========================================
// 职责: 按配置的 ColumnMap 逐个处理工作表并落库
// 流程（每个逻辑键）:
//   1. 定位工作表（精确 → 子串）
//   2. SheetExtractor 提取记录（可选打上结算周期）
//   3. 删除旧数据（全表 / 本周期），失败仅记录
//   4. 批量写入，失败则终止整次导入
// 说明: 不做跨表回滚，已写入的表在报告中逐一列出
// ==========================================

use crate::config::column_map::{ColumnMap, TableMapping};
use crate::domain::record::ExtractedRecord;
use crate::domain::settlement::field;
use crate::domain::types::{ReplaceScope, SettlementPeriod};
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_log::ImportLog;
use crate::importer::sheet_extractor::SheetExtractor;
use crate::importer::workbook::{MatchKind, Workbook};
use crate::repository::record_store::{filters, RecordStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// 进度回调: (当前序号 1 起始, 总数, 目标工作表名)
pub type ProgressFn<'a> = dyn FnMut(usize, usize, &str) + Send + 'a;

// ==========================================
// 导入参数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 写入每条记录的结算周期
    pub period: Option<SettlementPeriod>,
    pub replace_scope: ReplaceScope,
}

impl ImportOptions {
    pub fn validate(&self) -> ImportResult<()> {
        if self.replace_scope == ReplaceScope::Period && self.period.is_none() {
            return Err(ImportError::InvalidOptions(t("errors.import.period_required")));
        }
        Ok(())
    }
}

// ==========================================
// 单表结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SheetOutcome {
    /// 工作簿中没有匹配的工作表
    NotFound,
    /// 找到工作表但没有可识别的数据行
    Empty,
    /// 有数据但未配置目标表
    Unmapped,
    /// 已写入
    Saved,
    /// 写入失败（导致整次导入终止）
    Failed(String),
    /// 前序工作表失败，未处理
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetResult {
    pub key: String,
    pub target_sheet: String,
    pub actual_sheet: Option<String>,
    pub match_kind: Option<MatchKind>,
    pub table: Option<String>,
    pub record_count: usize,
    /// 旧数据删除失败（非致命）
    pub delete_error: Option<String>,
    pub outcome: SheetOutcome,
}

impl SheetResult {
    fn new(map: &ColumnMap, outcome: SheetOutcome) -> Self {
        Self {
            key: map.key.clone(),
            target_sheet: map.sheet_name.clone(),
            actual_sheet: None,
            match_kind: None,
            table: None,
            record_count: 0,
            delete_error: None,
            outcome,
        }
    }

    pub fn found(&self) -> bool {
        self.actual_sheet.is_some()
    }

    pub fn is_saved(&self) -> bool {
        self.outcome == SheetOutcome::Saved
    }
}

// ==========================================
// 导入报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: String,
    pub success: bool,
    pub total_saved: usize,
    pub available_sheets: Vec<String>,
    pub options: ImportOptions,
    /// 按配置顺序排列
    pub sheets: Vec<SheetResult>,
    pub error: Option<String>,
    pub log: ImportLog,
}

impl ImportReport {
    pub fn sheet(&self, key: &str) -> Option<&SheetResult> {
        self.sheets.iter().find(|s| s.key == key)
    }

    /// 已写入成功的逻辑键（失败时用于判断补偿范围）
    pub fn saved_keys(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .filter(|s| s.is_saved())
            .map(|s| s.key.as_str())
            .collect()
    }
}

// ==========================================
// 预览（分析模式）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetPreview {
    pub key: String,
    pub target_sheet: String,
    pub exact_match: Option<String>,
    pub similar_match: Option<String>,
    pub actual_sheet: Option<String>,
    pub total_rows: usize,
    pub data_start_row: usize,
    pub identifier_column: String,
    pub sample_records: Vec<ExtractedRecord>,
}

impl SheetPreview {
    pub fn found(&self) -> bool {
        self.exact_match.is_some() || self.similar_match.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewReport {
    pub available_sheets: Vec<String>,
    pub sheets: Vec<SheetPreview>,
    pub log: ImportLog,
}

// ==========================================
// WorkbookProcessor
// ==========================================
pub struct WorkbookProcessor<S: RecordStore> {
    store: Arc<S>,
    extractor: SheetExtractor,
    maps: Vec<ColumnMap>,
    tables: TableMapping,
}

impl<S: RecordStore> WorkbookProcessor<S> {
    /// 创建处理器
    ///
    /// # 参数
    /// - store: 记录存储
    /// - maps: 列映射（按此顺序处理）
    /// - tables: 逻辑键 → 目标表
    pub fn new(store: Arc<S>, maps: Vec<ColumnMap>, tables: TableMapping) -> Self {
        Self {
            store,
            extractor: SheetExtractor::new(),
            maps,
            tables,
        }
    }

    /// 处理并落库
    ///
    /// # 返回
    /// - Ok(report): report.success=false 表示某表写入失败，后续表未处理
    /// - Err(InvalidOptions): 参数非法，未触碰存储
    #[instrument(skip(self, workbook, progress), fields(run_id = tracing::field::Empty))]
    pub async fn process(
        &self,
        workbook: &Workbook,
        options: ImportOptions,
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> ImportResult<ImportReport> {
        options.validate()?;

        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let mut log = ImportLog::new();
        let available_sheets = workbook.sheet_names();
        log.info(t_with_args(
            "import.log.available_sheets",
            &[("sheets", available_sheets.join(", ").as_str())],
        ));

        let total = self.maps.len();
        let mut results = Vec::with_capacity(total);
        let mut total_saved = 0usize;
        let mut fatal: Option<String> = None;

        for (index, map) in self.maps.iter().enumerate() {
            if fatal.is_some() {
                results.push(SheetResult::new(map, SheetOutcome::NotAttempted));
                continue;
            }
            if let Some(cb) = progress.as_deref_mut() {
                cb(index + 1, total, &map.sheet_name);
            }

            let result = self.process_sheet(workbook, map, &options, &mut log).await;
            match &result.outcome {
                SheetOutcome::Saved => total_saved += result.record_count,
                SheetOutcome::Failed(message) => fatal = Some(message.clone()),
                _ => {}
            }
            results.push(result);
        }

        let success = fatal.is_none();
        if success {
            log.info(t_with_args(
                "import.log.total_saved",
                &[("count", total_saved.to_string().as_str())],
            ));
        }
        info!(success, total_saved, "工作簿处理结束");

        Ok(ImportReport {
            run_id,
            success,
            total_saved,
            available_sheets,
            options,
            sheets: results,
            error: fatal,
            log,
        })
    }

    async fn process_sheet(
        &self,
        workbook: &Workbook,
        map: &ColumnMap,
        options: &ImportOptions,
        log: &mut ImportLog,
    ) -> SheetResult {
        // === 步骤 1: 定位工作表 ===
        let Some(found) = workbook.find_sheet(&map.sheet_name) else {
            log.warn(t_with_args("import.log.sheet_not_found", &[("sheet", map.sheet_name.as_str())]));
            return SheetResult::new(map, SheetOutcome::NotFound);
        };
        if found.kind == MatchKind::Substring {
            log.info(t_with_args(
                "import.log.similar_sheet",
                &[("actual", found.name.as_str()), ("target", map.sheet_name.as_str())],
            ));
        }

        let mut result = SheetResult::new(map, SheetOutcome::Empty);
        result.actual_sheet = Some(found.name.clone());
        result.match_kind = Some(found.kind);

        // === 步骤 2: 提取 ===
        let Some(grid) = workbook.sheet(&found.name) else {
            return result;
        };
        let mut records = self.extractor.extract(grid, map).records;
        if let Some(period) = options.period {
            for record in &mut records {
                stamp_period(record, period);
            }
        }
        result.record_count = records.len();
        log.info(t_with_args(
            "import.log.rows_found",
            &[("sheet", found.name.as_str()), ("count", records.len().to_string().as_str())],
        ));

        if records.is_empty() {
            return result;
        }

        let Some(table) = self.tables.resolve(&map.key) else {
            warn!(sheet_key = %map.key, "未配置目标表，跳过写入");
            log.warn(t_with_args("import.log.no_table", &[("key", map.key.as_str())]));
            result.outcome = SheetOutcome::Unmapped;
            return result;
        };
        result.table = Some(table.to_string());

        // === 步骤 3: 清理旧数据（失败不终止） ===
        let deleted = match (options.replace_scope, options.period) {
            (ReplaceScope::Period, Some(p)) => {
                self.store
                    .delete_where(
                        table,
                        &filters([
                            (field::SETTLEMENT_YEAR, p.year),
                            (field::SETTLEMENT_MONTH, p.month),
                            (field::SETTLEMENT_WEEK, p.week),
                        ]),
                    )
                    .await
            }
            _ => self.store.delete_all(table).await,
        };
        if let Err(e) = deleted {
            let message = ImportError::DeleteFailed {
                table: table.to_string(),
                message: e.to_string(),
            }
            .to_string();
            log.error(t_with_args("import.log.delete_failed", &[("error", message.as_str())]));
            result.delete_error = Some(message);
        }

        // === 步骤 4: 写入（失败终止） ===
        match self.store.insert_many(table, &records).await {
            Ok(_) => {
                log.info(t_with_args(
                    "import.log.saved",
                    &[("table", table), ("count", records.len().to_string().as_str())],
                ));
                result.outcome = SheetOutcome::Saved;
            }
            Err(e) => {
                let message = ImportError::InsertFailed {
                    table: table.to_string(),
                    message: e.to_string(),
                }
                .to_string();
                log.error(t_with_args("import.log.insert_failed", &[("error", message.as_str())]));
                result.outcome = SheetOutcome::Failed(message);
            }
        }
        result
    }

    /// 分析模式: 只匹配工作表并抽样，不访问存储
    ///
    /// # 参数
    /// - sample_rows: 每张表从起始行开始扫描的行数
    pub fn preview(&self, workbook: &Workbook, sample_rows: usize) -> PreviewReport {
        let mut log = ImportLog::new();
        let available_sheets = workbook.sheet_names();
        log.info(t_with_args(
            "import.log.available_sheets",
            &[("sheets", available_sheets.join(", ").as_str())],
        ));

        let sheets = self
            .maps
            .iter()
            .map(|map| {
                let exact_match = workbook.exact_sheet(&map.sheet_name);
                let similar_match = workbook.similar_sheet(&map.sheet_name);
                let actual_sheet = exact_match.clone().or_else(|| similar_match.clone());

                let (total_rows, sample_records) = match actual_sheet
                    .as_deref()
                    .and_then(|name| workbook.sheet(name))
                {
                    Some(grid) => {
                        let extraction = self.extractor.extract_rows(grid, map, Some(sample_rows));
                        (extraction.total_rows, extraction.records)
                    }
                    None => {
                        log.warn(t_with_args(
                            "import.log.sheet_not_found",
                            &[("sheet", map.sheet_name.as_str())],
                        ));
                        (0, Vec::new())
                    }
                };

                if let Some(name) = &actual_sheet {
                    log.info(t_with_args(
                        "import.log.rows_found",
                        &[("sheet", name.as_str()), ("count", sample_records.len().to_string().as_str())],
                    ));
                }

                SheetPreview {
                    key: map.key.clone(),
                    target_sheet: map.sheet_name.clone(),
                    exact_match,
                    similar_match,
                    actual_sheet,
                    total_rows,
                    data_start_row: map.data_start_row,
                    identifier_column: map.identifier.column.label().to_string(),
                    sample_records,
                }
            })
            .collect();

        PreviewReport {
            available_sheets,
            sheets,
            log,
        }
    }
}

/// 写入结算周期字段
fn stamp_period(record: &mut ExtractedRecord, period: SettlementPeriod) {
    record.set(field::SETTLEMENT_YEAR, period.year);
    record.set(field::SETTLEMENT_MONTH, period.month);
    record.set(field::SETTLEMENT_WEEK, period.week);
}
