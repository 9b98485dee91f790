// ==========================================
// 骑手周结算系统 - 列映射配置
// ==========================================
// 职责: 声明式描述每类工作表的位置与列 → 字段映射
// 红线: 纯数据，解析逻辑只在 importer::sheet_extractor
// ==========================================
// 新增一类工作表 = 在 default_column_maps() 中追加一项
// ==========================================

use crate::domain::types::SheetDataType;
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ==========================================
// ColumnRef - 列字母
// ==========================================
// "A" → 0, "Z" → 25, "AA" → 26（26 进制，无零位）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnRef(String);

impl ColumnRef {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_uppercase())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// 转为 0 起始的列下标；非 A-Z 字符返回 None
    pub fn to_index(&self) -> Option<usize> {
        column_to_index(&self.0)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColumnRef {
    fn from(s: &str) -> Self {
        ColumnRef::new(s)
    }
}

/// 列字母转下标
pub fn column_to_index(label: &str) -> Option<usize> {
    if label.is_empty() {
        return None;
    }
    let mut result: usize = 0;
    for ch in label.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        let digit = (upper as u8 - b'A') as usize + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1)
}

// ==========================================
// FieldMapping - 输出字段 ← 源列
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub output_field: String,
    pub column: ColumnRef,
}

impl FieldMapping {
    pub fn new(output_field: &str, column: &str) -> Self {
        Self {
            output_field: output_field.to_string(),
            column: ColumnRef::new(column),
        }
    }
}

// ==========================================
// ColumnMap - 单类工作表的映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// 逻辑键（同时用于解析目标表）
    pub key: String,
    /// 目标工作表名（精确匹配优先，其次子串匹配）
    pub sheet_name: String,
    #[serde(default = "default_data_type")]
    pub data_type: SheetDataType,
    /// 数据起始行（1 起始）
    pub data_start_row: usize,
    /// 骑手标识列
    pub identifier: FieldMapping,
    /// 其他字段，按声明顺序处理
    pub data_columns: Vec<FieldMapping>,
}

fn default_data_type() -> SheetDataType {
    SheetDataType::List
}

impl ColumnMap {
    /// 校验: 起始行 ≥ 1，列字母合法，输出字段唯一
    pub fn validate(&self) -> ImportResult<()> {
        let invalid = |message: String| ImportError::ConfigValueError {
            key: self.key.clone(),
            value: self.sheet_name.clone(),
            message,
        };

        if self.data_start_row < 1 {
            return Err(invalid(t("errors.import.start_row")));
        }

        let mut seen = HashSet::new();
        for mapping in std::iter::once(&self.identifier).chain(self.data_columns.iter()) {
            if mapping.column.to_index().is_none() {
                return Err(invalid(t_with_args(
                    "errors.import.bad_column",
                    &[
                        ("field", mapping.output_field.as_str()),
                        ("column", mapping.column.label()),
                    ],
                )));
            }
            if !seen.insert(mapping.output_field.as_str()) {
                return Err(invalid(t_with_args(
                    "errors.import.duplicate_field",
                    &[("field", mapping.output_field.as_str())],
                )));
            }
        }
        Ok(())
    }

    /// 全部输出字段（标识字段在前）
    pub fn output_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identifier.output_field.as_str())
            .chain(self.data_columns.iter().map(|m| m.output_field.as_str()))
    }

    /// 核对输出字段都是目标表的列
    ///
    /// # 参数
    /// - table: 目标表名
    /// - columns: 目标表现有列（空集合表示表不存在）
    pub fn check_table_columns(&self, table: &str, columns: &HashSet<String>) -> ImportResult<()> {
        let invalid = |message: String| ImportError::ConfigValueError {
            key: self.key.clone(),
            value: self.sheet_name.clone(),
            message,
        };

        if columns.is_empty() {
            return Err(invalid(t_with_args(
                "errors.import.unknown_table",
                &[("table", table)],
            )));
        }
        if let Some(field) = self.output_fields().find(|f| !columns.contains(*f)) {
            return Err(invalid(t_with_args(
                "errors.import.unknown_field",
                &[("table", table), ("field", field)],
            )));
        }
        Ok(())
    }
}

// ==========================================
// TableMapping - 逻辑键 → 目标表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TableMapping {
    tables: HashMap<String, String>,
}

impl TableMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, table: &str) {
        self.tables.insert(key.to_string(), table.to_string());
    }

    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.tables.get(key).map(String::as_str)
    }

    /// 逻辑键与表名同名
    pub fn identity_for(maps: &[ColumnMap]) -> Self {
        let mut mapping = Self::new();
        for map in maps {
            mapping.insert(&map.key, &map.key);
        }
        mapping
    }
}

// ==========================================
// 逻辑键常量
// ==========================================
pub mod sheet_keys {
    pub const TOTAL_SUMMARY: &str = "total_summary";
    pub const SUPPORT_FUNDS: &str = "support_funds";
    pub const ADDITIONAL_SUPPORT_FUNDS: &str = "additional_support_funds";
    pub const DEDUCTIONS: &str = "deductions";
    pub const HOURLY_INSURANCE_DEDUCTIONS: &str = "hourly_insurance_deductions";
    pub const RETROACTIVE_INSURANCE_DETAILS: &str = "retroactive_insurance_details";
    pub const RIDER_SETTLEMENTS: &str = "rider_settlements";
}

fn map(
    key: &str,
    sheet_name: &str,
    data_type: SheetDataType,
    data_start_row: usize,
    identifier_col: &str,
    columns: &[(&str, &str)],
) -> ColumnMap {
    ColumnMap {
        key: key.to_string(),
        sheet_name: sheet_name.to_string(),
        data_type,
        data_start_row,
        identifier: FieldMapping::new("rider_id", identifier_col),
        data_columns: columns
            .iter()
            .map(|(field, col)| FieldMapping::new(field, col))
            .collect(),
    }
}

/// 内置列映射（标准结算 Excel 模板）
pub fn default_column_maps() -> Vec<ColumnMap> {
    use sheet_keys::*;
    use SheetDataType::{List, Single};

    vec![
        map(
            TOTAL_SUMMARY,
            "종합",
            Single,
            13,
            "C",
            &[
                ("total_orders", "F"),
                ("settlement_amount", "Z"),
                ("total_support_fund", "AA"),
                ("deduction_details", "AB"),
                ("total_settlement_amount", "AC"),
                ("employment_insurance", "AE"),
                ("industrial_accident_insurance", "AG"),
                ("hourly_insurance", "AH"),
                ("retroactive_insurance", "AI"),
                ("expected_settlement_amount", "AJ"),
                ("actual_payment_amount", "AK"),
                ("commission_deduction", "AM"),
                ("remuneration", "AN"),
            ],
        ),
        map(
            SUPPORT_FUNDS,
            "지원금",
            List,
            7,
            "C",
            &[("date", "A"), ("rider_name", "C"), ("store_name", "D"), ("amount", "L")],
        ),
        map(
            ADDITIONAL_SUPPORT_FUNDS,
            "추가지원금",
            List,
            6,
            "C",
            &[("date", "A"), ("rider_name", "C"), ("type", "D"), ("amount", "E")],
        ),
        map(
            DEDUCTIONS,
            "차감내역",
            List,
            6,
            "D",
            &[
                ("date", "B"),
                ("rider_name", "D"),
                ("type", "E"),
                ("store_name", "F"),
                ("amount", "J"),
            ],
        ),
        map(
            HOURLY_INSURANCE_DEDUCTIONS,
            "시간제보험(차감)",
            List,
            6,
            "B",
            &[("date", "A"), ("rider_name", "B"), ("amount", "C")],
        ),
        map(
            RETROACTIVE_INSURANCE_DETAILS,
            "보험료(소급)",
            List,
            6,
            "A",
            &[("rider_name", "A"), ("description", "B"), ("amount", "C")],
        ),
    ]
}

/// 内置表映射（逻辑键与表名一致）
pub fn default_table_mapping() -> TableMapping {
    TableMapping::identity_for(&default_column_maps())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_to_index() {
        assert_eq!(column_to_index("A"), Some(0));
        assert_eq!(column_to_index("Z"), Some(25));
        assert_eq!(column_to_index("AA"), Some(26));
        assert_eq!(column_to_index("AK"), Some(36));
        assert_eq!(column_to_index("AN"), Some(39));
        assert_eq!(column_to_index("ak"), Some(36));
        assert_eq!(column_to_index(""), None);
        assert_eq!(column_to_index("A1"), None);
    }

    #[test]
    fn test_default_maps_are_valid() {
        let maps = default_column_maps();
        assert_eq!(maps.len(), 6);
        for m in &maps {
            m.validate().unwrap();
        }
        assert_eq!(maps[0].key, sheet_keys::TOTAL_SUMMARY);
        assert_eq!(maps[0].data_columns.len(), 13);
    }

    #[test]
    fn test_validate_rejects_duplicate_field() {
        let mut m = default_column_maps().remove(1);
        m.data_columns.push(FieldMapping::new("amount", "M"));
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_column_and_zero_start() {
        let mut m = default_column_maps().remove(1);
        m.data_columns.push(FieldMapping::new("memo", "1"));
        assert!(m.validate().is_err());

        let mut m = default_column_maps().remove(1);
        m.data_start_row = 0;
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_check_table_columns() {
        let columns: HashSet<String> = ["rider_id", "date", "rider_name", "store_name", "amount"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        let mut m = default_column_maps().remove(1);
        assert!(m.check_table_columns("support_funds", &columns).is_ok());

        m.data_columns.push(FieldMapping::new("memo", "B"));
        assert!(m.validate().is_ok());
        let err = m.check_table_columns("support_funds", &columns).unwrap_err();
        assert!(err.to_string().contains("memo"));

        assert!(m.check_table_columns("support_funds", &HashSet::new()).is_err());
    }

    #[test]
    fn test_column_map_json_round_trip() {
        let json = r#"[{
            "key": "support_funds",
            "sheet_name": "지원금",
            "data_start_row": 7,
            "identifier": {"output_field": "rider_id", "column": "c"},
            "data_columns": [{"output_field": "amount", "column": "L"}]
        }]"#;
        let maps: Vec<ColumnMap> = serde_json::from_str(json).unwrap();
        assert_eq!(maps[0].data_type, SheetDataType::List);
        assert_eq!(maps[0].identifier.column.to_index(), Some(2));
    }

    #[test]
    fn test_table_mapping_resolve() {
        let tables = default_table_mapping();
        assert_eq!(tables.resolve("deductions"), Some("deductions"));
        assert_eq!(tables.resolve("unknown"), None);
    }
}
