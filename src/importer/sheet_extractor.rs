// ==========================================
// 骑手周结算系统 - 工作表提取器
// ==========================================
// 职责: 按 ColumnMap 逐行解释单个工作表
// 流程: 起始行 → 标识识别 → 逐列取值与转换 → 输出记录
// 红线: 无法识别标识的行静默跳过，不产生错误
// ==========================================

use crate::config::column_map::{ColumnMap, FieldMapping};
use crate::domain::record::{CellValue, ExtractedRecord};
use crate::importer::cell_coercion::coerce_field;
use crate::importer::identifier::{IdentifierExtractor, RiderIdExtractor};
use crate::importer::workbook::{preview_text, SheetGrid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 单表提取结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetExtraction {
    pub records: Vec<ExtractedRecord>,
    /// 工作表总行数（含表头）
    pub total_rows: usize,
    /// 实际扫描的数据行数（不含空行）
    pub scanned_rows: usize,
    /// 未识别出标识而跳过的行数
    pub skipped_rows: usize,
}

// ==========================================
// SheetExtractor
// ==========================================
pub struct SheetExtractor {
    id_extractor: Arc<dyn IdentifierExtractor>,
}

impl SheetExtractor {
    pub fn new() -> Self {
        Self {
            id_extractor: Arc::new(RiderIdExtractor::new()),
        }
    }

    pub fn with_id_extractor(id_extractor: Arc<dyn IdentifierExtractor>) -> Self {
        Self { id_extractor }
    }

    /// 提取整张工作表
    pub fn extract(&self, grid: &SheetGrid, map: &ColumnMap) -> SheetExtraction {
        self.extract_rows(grid, map, None)
    }

    /// 提取工作表，可限制从起始行开始扫描的行数（预览用）
    ///
    /// # 参数
    /// - grid: 工作表网格（绝对行号）
    /// - map: 列映射
    /// - row_limit: None = 扫描到末行；Some(n) = 只看起始行后的 n 行
    pub fn extract_rows(
        &self,
        grid: &SheetGrid,
        map: &ColumnMap,
        row_limit: Option<usize>,
    ) -> SheetExtraction {
        let mut result = SheetExtraction {
            total_rows: grid.row_count(),
            ..Default::default()
        };

        let Some(id_index) = map.identifier.column.to_index() else {
            tracing::warn!(
                sheet_key = %map.key,
                column = %map.identifier.column,
                "标识列无效，跳过整张工作表"
            );
            return result;
        };
        let columns: Vec<(&FieldMapping, Option<usize>)> = map
            .data_columns
            .iter()
            .map(|m| (m, m.column.to_index()))
            .collect();

        let start = map.data_start_row.saturating_sub(1);
        let end = match row_limit {
            Some(limit) => start.saturating_add(limit).min(grid.row_count()),
            None => grid.row_count(),
        };

        for row_index in start..end {
            let row = match grid.row(row_index) {
                Some(row) if !row.is_empty() => row,
                _ => continue,
            };
            result.scanned_rows += 1;

            let raw_id = row.get(id_index).unwrap_or(&CellValue::Empty);
            let Some(rider_id) = self.id_extractor.extract(raw_id) else {
                tracing::trace!(
                    sheet_key = %map.key,
                    row = row_index + 1,
                    raw = %preview_text(raw_id),
                    "未识别骑手标识，跳过"
                );
                result.skipped_rows += 1;
                continue;
            };

            let mut record = ExtractedRecord::new();
            record.set(map.identifier.output_field.as_str(), rider_id);
            for (mapping, index) in &columns {
                let raw = index
                    .and_then(|i| row.get(i))
                    .unwrap_or(&CellValue::Empty);
                record.set(
                    mapping.output_field.as_str(),
                    coerce_field(&mapping.output_field, raw),
                );
            }
            result.records.push(record);
        }

        tracing::debug!(
            sheet_key = %map.key,
            total_rows = result.total_rows,
            scanned = result.scanned_rows,
            extracted = result.records.len(),
            skipped = result.skipped_rows,
            "工作表提取完成"
        );
        result
    }
}

impl Default for SheetExtractor {
    fn default() -> Self {
        Self::new()
    }
}
