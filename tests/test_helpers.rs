// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、结算工作簿夹具（真实 .xlsx）
// ==========================================
#![allow(dead_code)]

use rider_settlement::app::AppState;
use rider_settlement::repository::SqliteRecordStore;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::error::Error;
use std::path::Path;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();

    // 建表
    SqliteRecordStore::new(&db_path)?;

    Ok((temp_file, db_path))
}

/// 创建基于临时数据库的应用状态
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (tmp, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    (tmp, state)
}

// ==========================================
// 工作簿夹具
// ==========================================

/// 종합 表中一名骑手的数据
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub rider: String,
    pub total_orders: f64,
    pub commission_deduction: f64,
    pub total_support_fund: f64,
    pub deduction_details: f64,
    pub employment_insurance: f64,
    pub industrial_accident_insurance: f64,
    pub hourly_insurance: f64,
    pub retroactive_insurance: f64,
    pub total_settlement_amount: f64,
    pub actual_payment_amount: f64,
    pub remuneration: f64,
}

impl SummaryRow {
    /// 参考数据: 完整调整后为 101100 (任务费 1000, 预扣款 -300)
    pub fn reference(rider: &str) -> Self {
        Self {
            rider: rider.to_string(),
            total_orders: 120.0,
            commission_deduction: 100000.0,
            total_support_fund: 5000.0,
            deduction_details: -2000.0,
            employment_insurance: -1000.0,
            industrial_accident_insurance: -500.0,
            hourly_insurance: -300.0,
            retroactive_insurance: 200.0,
            total_settlement_amount: 300000.0,
            actual_payment_amount: 290000.0,
            remuneration: 80000.0,
        }
    }
}

/// 明细行: (Excel 日期序列号, 骑手, 金额)
pub type DetailRow<'a> = (f64, &'a str, f64);

/// 结算工作簿内容
#[derive(Debug, Clone, Default)]
pub struct SettlementWorkbook<'a> {
    /// 종합 表名（可带后缀，例如 "종합(수정)"）
    pub summary_sheet: &'a str,
    pub summaries: Vec<SummaryRow>,
    pub support_funds: Vec<DetailRow<'a>>,
    pub additional_support_funds: Vec<DetailRow<'a>>,
    pub deductions: Vec<DetailRow<'a>>,
}

impl<'a> SettlementWorkbook<'a> {
    pub fn new(summary_sheet: &'a str) -> Self {
        Self {
            summary_sheet,
            ..Default::default()
        }
    }

    /// 生成 .xlsx 字节
    pub fn to_bytes(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = self.build()?;
        workbook.save_to_buffer()
    }

    /// 写入 .xlsx 文件
    pub fn save(&self, path: &Path) -> Result<(), XlsxError> {
        let mut workbook = self.build()?;
        workbook.save(path)
    }

    fn build(&self) -> Result<Workbook, XlsxError> {
        let mut workbook = Workbook::new();

        // 종합: 第 13 行起，C 列为骑手
        let sheet = workbook.add_worksheet();
        sheet.set_name(self.summary_sheet)?;
        sheet.write_string(0, 0, "라이더 주간 정산")?;
        sheet.write_string(11, 2, "라이더")?;
        for (i, row) in self.summaries.iter().enumerate() {
            let r = 12 + i as u32;
            sheet.write_string(r, 2, &row.rider)?;
            sheet.write_number(r, 5, row.total_orders)?; // F
            sheet.write_number(r, 26, row.total_support_fund)?; // AA
            // 金额带千分位，验证文本金额解析
            sheet.write_string(r, 27, format_amount(row.deduction_details))?; // AB
            sheet.write_number(r, 28, row.total_settlement_amount)?; // AC
            sheet.write_number(r, 30, row.employment_insurance)?; // AE
            sheet.write_number(r, 32, row.industrial_accident_insurance)?; // AG
            sheet.write_number(r, 33, row.hourly_insurance)?; // AH
            sheet.write_number(r, 34, row.retroactive_insurance)?; // AI
            sheet.write_number(r, 36, row.actual_payment_amount)?; // AK
            sheet.write_string(r, 38, format_amount(row.commission_deduction))?; // AM
            sheet.write_number(r, 39, row.remuneration)?; // AN
        }

        // 지원금: 第 7 行起，A 日期 / C 骑手 / L 金额
        let sheet = workbook.add_worksheet();
        sheet.set_name("지원금")?;
        write_details(sheet, 6, &self.support_funds, 0, 2, 11)?;

        // 추가지원금: 第 6 行起，A 日期 / C 骑手 / E 金额
        let sheet = workbook.add_worksheet();
        sheet.set_name("추가지원금")?;
        write_details(sheet, 5, &self.additional_support_funds, 0, 2, 4)?;

        // 차감내역: 第 6 行起，B 日期 / D 骑手 / J 金额
        let sheet = workbook.add_worksheet();
        sheet.set_name("차감내역")?;
        write_details(sheet, 5, &self.deductions, 1, 3, 9)?;

        Ok(workbook)
    }
}

fn write_details(
    sheet: &mut Worksheet,
    first_row: u32,
    rows: &[DetailRow<'_>],
    date_col: u16,
    rider_col: u16,
    amount_col: u16,
) -> Result<(), XlsxError> {
    sheet.write_string(0, 0, "내역")?;
    for (i, (date, rider, amount)) in rows.iter().enumerate() {
        let r = first_row + i as u32;
        sheet.write_number(r, date_col, *date)?;
        sheet.write_string(r, rider_col, *rider)?;
        sheet.write_number(r, amount_col, *amount)?;
    }
    Ok(())
}

/// 1234567 → "1,234,567"
fn format_amount(value: f64) -> String {
    let digits = format!("{}", value.abs() as i64);
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0.0 {
        format!("-{}", out)
    } else {
        out
    }
}
