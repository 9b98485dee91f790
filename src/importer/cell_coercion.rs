// ==========================================
// 骑手周结算系统 - 单元格值转换
// ==========================================
// 职责: 原始单元格 → 金额 / 日期 / 原样透传
// 红线: 永不报错；无法解析的金额按 0，无法解析的日期原样保留
// ==========================================

use crate::domain::record::{CellValue, FieldValue};
use chrono::DateTime;

/// 按金额处理的字段
pub const NUMERIC_FIELDS: &[&str] = &[
    "amount",
    "total_orders",
    "settlement_amount",
    "total_support_fund",
    "deduction_details",
    "total_settlement_amount",
    "support_amount",
    "employment_insurance",
    "industrial_accident_insurance",
    "hourly_insurance",
    "retroactive_insurance",
    "expected_settlement_amount",
    "actual_payment_amount",
    "commission_deduction",
    "remuneration",
];

/// 按日期处理的字段
pub const DATE_FIELD: &str = "date";

/// Excel 序列日 25569 = 1970-01-01
const EXCEL_UNIX_EPOCH_SERIAL: f64 = 25569.0;
const SECONDS_PER_DAY: f64 = 86400.0;

pub fn is_numeric_field(field: &str) -> bool {
    NUMERIC_FIELDS.contains(&field)
}

/// 金额解析
///
/// - 数值: 原样返回（非有限值按 0）
/// - 文本: 去掉千分位逗号及 [0-9.-] 以外的字符后取最长数字前缀
/// - 空 / 无法解析: 0
pub fn parse_amount(raw: &CellValue) -> f64 {
    match raw {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) => 0.0,
        CellValue::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            parse_float_prefix(&cleaned).unwrap_or(0.0)
        }
        CellValue::Empty => 0.0,
    }
}

/// 取字符串开头最长的合法十进制数: "12.5.3" → 12.5, "7-1" → 7, "-" → None
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

/// 日期解析
///
/// - 数值: 视为 Excel 序列日，转为 YYYY-MM-DD
/// - 文本: 原样透传
/// - 空: Null
pub fn parse_date(raw: &CellValue) -> FieldValue {
    match raw {
        CellValue::Empty => FieldValue::Null,
        CellValue::Text(s) if s.is_empty() => FieldValue::Null,
        CellValue::Text(s) => FieldValue::Text(s.clone()),
        CellValue::Number(serial) => match serial_to_iso_date(*serial) {
            Some(date) => FieldValue::Text(date),
            None => FieldValue::Number(*serial),
        },
    }
}

/// Excel 序列日 → ISO 日期（UTC）
pub fn serial_to_iso_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - EXCEL_UNIX_EPOCH_SERIAL) * SECONDS_PER_DAY * 1000.0).trunc();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// 原样透传（空单元格 → Null）
pub fn pass_through(raw: &CellValue) -> FieldValue {
    match raw {
        CellValue::Empty => FieldValue::Null,
        CellValue::Text(s) if s.is_empty() => FieldValue::Null,
        CellValue::Text(s) => FieldValue::Text(s.clone()),
        CellValue::Number(n) => FieldValue::Number(*n),
    }
}

/// 按字段名选择转换方式
pub fn coerce_field(field: &str, raw: &CellValue) -> FieldValue {
    if is_numeric_field(field) {
        FieldValue::Number(parse_amount(raw))
    } else if field == DATE_FIELD {
        parse_date(raw)
    } else {
        pass_through(raw)
    }
}
