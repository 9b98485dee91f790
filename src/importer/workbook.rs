// ==========================================
// 骑手周结算系统 - 工作簿加载
// ==========================================
// 职责: calamine 边界，整本工作簿一次性读入内存
// 支持: .xlsx / .xlsm / .xls / .xlsb / .ods
// 红线: 越过此模块后只存在 CellValue，不再出现 calamine 类型
// ==========================================

use crate::domain::record::{format_number, CellValue};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

// ==========================================
// SheetGrid - 单个工作表的单元格网格
// ==========================================
// 行列均为 0 起始的绝对坐标（第 1 行 → 下标 0）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    fn from_range(range: &Range<Data>) -> Self {
        let (start, end) = match (range.start(), range.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => return Self::default(),
        };

        let mut rows = vec![Vec::new(); start.0 as usize];
        for r in start.0..=end.0 {
            let mut row = Vec::with_capacity(end.1 as usize + 1);
            for c in 0..=end.1 {
                row.push(
                    range
                        .get_value((r, c))
                        .map(convert_cell)
                        .unwrap_or(CellValue::Empty),
                );
            }
            // 整行为空时保留空行，保证行号不偏移
            if row.iter().all(CellValue::is_empty) {
                row.clear();
            }
            rows.push(row);
        }
        Self { rows }
    }
}

/// calamine 单元格 → CellValue
fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

// ==========================================
// 工作表匹配结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetMatch {
    pub name: String,
    pub kind: MatchKind,
}

// ==========================================
// Workbook - 已加载的工作簿
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, SheetGrid)>,
}

impl Workbook {
    /// 从文件加载
    ///
    /// # 参数
    /// - path: 工作簿路径（按扩展名识别格式）
    ///
    /// # 返回
    /// - Err(FileNotFound / UnsupportedFormat / ExcelParseError)
    pub fn open<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let sheets = open_workbook_auto(path)?;
        let workbook = Self::read_all(sheets)?;
        tracing::debug!(
            path = %path.display(),
            sheet_count = workbook.sheets.len(),
            "工作簿已加载"
        );
        Ok(workbook)
    }

    /// 从内存字节加载（上传场景）
    pub fn from_bytes(bytes: Vec<u8>) -> ImportResult<Self> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        Self::read_all(sheets)
    }

    /// 直接由网格构造
    pub fn from_sheets(sheets: Vec<(String, SheetGrid)>) -> Self {
        Self { sheets }
    }

    fn read_all<RS: Read + Seek>(mut sheets: Sheets<RS>) -> ImportResult<Self> {
        let names = sheets.sheet_names();
        let mut loaded = Vec::with_capacity(names.len());
        for name in names {
            let range = sheets.worksheet_range(&name)?;
            loaded.push((name, SheetGrid::from_range(&range)));
        }
        Ok(Self { sheets: loaded })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, grid)| grid)
    }

    /// 精确同名的工作表
    pub fn exact_sheet(&self, target: &str) -> Option<String> {
        self.sheets
            .iter()
            .map(|(n, _)| n)
            .find(|n| n.as_str() == target)
            .cloned()
    }

    /// 任一方向子串匹配的第一个工作表（按工作簿顺序，同名也算）
    pub fn similar_sheet(&self, target: &str) -> Option<String> {
        if target.is_empty() {
            return None;
        }
        self.sheets
            .iter()
            .map(|(n, _)| n)
            .find(|n| !n.is_empty() && (n.contains(target) || target.contains(n.as_str())))
            .cloned()
    }

    /// 定位目标工作表: 精确匹配优先，其次子串匹配
    pub fn find_sheet(&self, target: &str) -> Option<SheetMatch> {
        if let Some(name) = self.exact_sheet(target) {
            return Some(SheetMatch {
                name,
                kind: MatchKind::Exact,
            });
        }
        self.similar_sheet(target).map(|name| SheetMatch {
            name,
            kind: MatchKind::Substring,
        })
    }
}

/// 单元格预览文本（日志用）
pub fn preview_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => "(empty)".to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => format!("\"{}\"", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize) -> SheetGrid {
        SheetGrid::from_rows(vec![vec![CellValue::Text("x".into())]; rows])
    }

    fn workbook(names: &[&str]) -> Workbook {
        Workbook::from_sheets(names.iter().map(|n| (n.to_string(), grid(1))).collect())
    }

    #[test]
    fn test_find_sheet_exact_first() {
        let wb = workbook(&["추가지원금", "지원금"]);
        let m = wb.find_sheet("지원금").unwrap();
        assert_eq!(m.name, "지원금");
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn test_find_sheet_substring_both_directions() {
        let wb = workbook(&["종합(수정)", "차감"]);
        let m = wb.find_sheet("종합").unwrap();
        assert_eq!(m.name, "종합(수정)");
        assert_eq!(m.kind, MatchKind::Substring);

        let m = wb.find_sheet("차감내역").unwrap();
        assert_eq!(m.name, "차감");
        assert_eq!(m.kind, MatchKind::Substring);

        assert!(wb.find_sheet("보험료(소급)").is_none());
    }

    #[test]
    fn test_similar_sheet_includes_exact_name() {
        let wb = workbook(&["추가지원금", "지원금"]);
        assert_eq!(wb.exact_sheet("지원금").as_deref(), Some("지원금"));
        assert_eq!(wb.similar_sheet("지원금").as_deref(), Some("추가지원금"));
    }

    #[test]
    fn test_find_sheet_ignores_empty_names() {
        let wb = workbook(&["", "Sheet1"]);
        assert!(wb.find_sheet("종합").is_none());
    }

    #[test]
    fn test_row_out_of_bounds_is_none() {
        let g = grid(2);
        assert_eq!(g.row(0), Some(&[CellValue::Text("x".into())][..]));
        assert_eq!(g.row_count(), 2);
        assert!(g.row(10).is_none());
    }

    #[test]
    fn test_convert_cell_variants() {
        assert_eq!(convert_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(convert_cell(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(convert_cell(&Data::Bool(true)), CellValue::Text("true".into()));
        assert_eq!(convert_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(
            convert_cell(&Data::String("김철수".into())),
            CellValue::Text("김철수".into())
        );
    }

    #[test]
    fn test_open_missing_and_unsupported() {
        assert!(matches!(
            Workbook::open("/nonexistent/settlement.xlsx"),
            Err(ImportError::FileNotFound(_))
        ));

        let tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(matches!(
            Workbook::open(tmp.path()),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
