// ==========================================
// 骑手周结算系统 - 结算实体
// ==========================================
// 职责: 汇总记录 / 人工调整项 / 最终结算记录
// 红线: 实体不含计算逻辑（计算见 engine::settlement）
// ==========================================

use crate::domain::record::{FieldValue, Record};
use crate::domain::types::{SettlementPeriod, TaxBasePolicy};
use serde::{Deserialize, Serialize};

// ==========================================
// 字段名常量（与表结构一致）
// ==========================================
pub mod field {
    pub const ID: &str = "id";
    pub const RIDER_ID: &str = "rider_id";
    pub const CREATED_AT: &str = "created_at";
    pub const DATE: &str = "date";

    pub const SETTLEMENT_YEAR: &str = "settlement_year";
    pub const SETTLEMENT_MONTH: &str = "settlement_month";
    pub const SETTLEMENT_WEEK: &str = "settlement_week";

    pub const TOTAL_ORDERS: &str = "total_orders";
    pub const SETTLEMENT_AMOUNT: &str = "settlement_amount";
    pub const TOTAL_SUPPORT_FUND: &str = "total_support_fund";
    pub const DEDUCTION_DETAILS: &str = "deduction_details";
    pub const TOTAL_SETTLEMENT_AMOUNT: &str = "total_settlement_amount";
    pub const EMPLOYMENT_INSURANCE: &str = "employment_insurance";
    pub const INDUSTRIAL_ACCIDENT_INSURANCE: &str = "industrial_accident_insurance";
    pub const HOURLY_INSURANCE: &str = "hourly_insurance";
    pub const RETROACTIVE_INSURANCE: &str = "retroactive_insurance";
    pub const EXPECTED_SETTLEMENT_AMOUNT: &str = "expected_settlement_amount";
    pub const ACTUAL_PAYMENT_AMOUNT: &str = "actual_payment_amount";
    pub const COMMISSION_DEDUCTION: &str = "commission_deduction";
    pub const REMUNERATION: &str = "remuneration";

    pub const COMPANY_NAME: &str = "company_name";
    pub const SUPPORT_FUND: &str = "support_fund";
    pub const MISSION_FEE: &str = "mission_fee";
    pub const PRE_DEDUCTION: &str = "pre_deduction";
    pub const TAX_BASE_POLICY: &str = "tax_base_policy";
    pub const TAX_BASE_AMOUNT: &str = "tax_base_amount";
    pub const FINAL_SETTLEMENT_AMOUNT: &str = "final_settlement_amount";
    pub const WITHHOLDING_TAX: &str = "withholding_tax";
}

// ==========================================
// SummaryRecord - 骑手周汇总（"종합" 表）
// ==========================================
// 缺失的数值字段一律按 0 处理
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: Option<i64>,
    pub rider_id: String,
    pub total_orders: f64,
    pub settlement_amount: f64,
    pub total_support_fund: f64,
    pub deduction_details: f64,
    pub total_settlement_amount: f64,
    pub employment_insurance: f64,
    pub industrial_accident_insurance: f64,
    pub hourly_insurance: f64,
    pub retroactive_insurance: f64,
    pub expected_settlement_amount: f64,
    pub actual_payment_amount: f64,
    pub commission_deduction: f64,
    pub remuneration: f64,
    pub settlement_year: Option<i32>,
    pub settlement_month: Option<i32>,
    pub settlement_week: Option<i32>,
}

impl SummaryRecord {
    pub fn period(&self) -> Option<SettlementPeriod> {
        SettlementPeriod::from_parts(self.settlement_year, self.settlement_month, self.settlement_week)
    }

    /// 从存储行还原
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.get(field::ID).and_then(FieldValue::as_f64).map(|v| v as i64),
            rider_id: record
                .get(field::RIDER_ID)
                .map(|v| match v {
                    FieldValue::Text(s) => s.clone(),
                    FieldValue::Number(n) => crate::domain::record::format_number(*n),
                    FieldValue::Null => String::new(),
                })
                .unwrap_or_default(),
            total_orders: record.number(field::TOTAL_ORDERS),
            settlement_amount: record.number(field::SETTLEMENT_AMOUNT),
            total_support_fund: record.number(field::TOTAL_SUPPORT_FUND),
            deduction_details: record.number(field::DEDUCTION_DETAILS),
            total_settlement_amount: record.number(field::TOTAL_SETTLEMENT_AMOUNT),
            employment_insurance: record.number(field::EMPLOYMENT_INSURANCE),
            industrial_accident_insurance: record.number(field::INDUSTRIAL_ACCIDENT_INSURANCE),
            hourly_insurance: record.number(field::HOURLY_INSURANCE),
            retroactive_insurance: record.number(field::RETROACTIVE_INSURANCE),
            expected_settlement_amount: record.number(field::EXPECTED_SETTLEMENT_AMOUNT),
            actual_payment_amount: record.number(field::ACTUAL_PAYMENT_AMOUNT),
            commission_deduction: record.number(field::COMMISSION_DEDUCTION),
            remuneration: record.number(field::REMUNERATION),
            settlement_year: record.int(field::SETTLEMENT_YEAR),
            settlement_month: record.int(field::SETTLEMENT_MONTH),
            settlement_week: record.int(field::SETTLEMENT_WEEK),
        }
    }
}

// ==========================================
// SettlementOverrides - 人工录入调整项
// ==========================================
// mission_fee: 带符号，直接相加
// pre_deduction: 只取绝对值，始终扣减
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementOverrides {
    pub mission_fee: f64,
    pub pre_deduction: f64,
}

impl SettlementOverrides {
    pub fn new(mission_fee: f64, pre_deduction: f64) -> Self {
        Self {
            mission_fee,
            pre_deduction,
        }
    }

    /// 两项均为有限数
    pub fn is_finite(&self) -> bool {
        self.mission_fee.is_finite() && self.pre_deduction.is_finite()
    }

    pub fn pre_deduction_magnitude(&self) -> f64 {
        self.pre_deduction.abs()
    }
}

// ==========================================
// SettlementFigures - 计算结果三元组
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementFigures {
    pub policy: TaxBasePolicy,
    /// 完整调整后的结算金额（手续费扣除后口径）
    pub final_settlement_amount: f64,
    /// 计税基数
    pub tax_base: f64,
    /// 代扣税 (3.3%)
    pub withholding_tax: f64,
    /// 实发金额 = 计税基数 - 代扣税
    pub actual_payment: f64,
}

// ==========================================
// FinalSettlement - 最终结算记录（rider_settlements 表）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSettlement {
    pub rider_id: String,
    pub period: SettlementPeriod,
    pub company_name: Option<String>,

    // 汇总数据快照
    pub total_orders: f64,
    pub settlement_amount: f64,
    pub support_fund: f64,
    pub deduction_details: f64,
    pub employment_insurance: f64,
    pub industrial_accident_insurance: f64,
    pub hourly_insurance: f64,
    pub retroactive_insurance: f64,

    // 人工录入
    pub mission_fee: f64,
    pub pre_deduction: f64,

    // 计算结果
    pub tax_base_policy: TaxBasePolicy,
    pub tax_base_amount: f64,
    pub final_settlement_amount: f64,
    pub withholding_tax: f64,
    pub actual_payment_amount: f64,
}

impl FinalSettlement {
    pub fn assemble(
        summary: &SummaryRecord,
        period: SettlementPeriod,
        overrides: &SettlementOverrides,
        figures: &SettlementFigures,
        company_name: Option<String>,
    ) -> Self {
        Self {
            rider_id: summary.rider_id.clone(),
            period,
            company_name,
            total_orders: summary.total_orders,
            settlement_amount: summary.settlement_amount,
            support_fund: summary.total_support_fund,
            deduction_details: summary.deduction_details,
            employment_insurance: summary.employment_insurance,
            industrial_accident_insurance: summary.industrial_accident_insurance,
            hourly_insurance: summary.hourly_insurance,
            retroactive_insurance: summary.retroactive_insurance,
            mission_fee: overrides.mission_fee,
            pre_deduction: overrides.pre_deduction_magnitude(),
            tax_base_policy: figures.policy,
            tax_base_amount: figures.tax_base,
            final_settlement_amount: figures.final_settlement_amount,
            withholding_tax: figures.withholding_tax,
            actual_payment_amount: figures.actual_payment,
        }
    }

    pub fn to_record(&self) -> Record {
        Record::new()
            .with(field::RIDER_ID, self.rider_id.as_str())
            .with(field::SETTLEMENT_YEAR, self.period.year)
            .with(field::SETTLEMENT_MONTH, self.period.month)
            .with(field::SETTLEMENT_WEEK, self.period.week)
            .with(field::COMPANY_NAME, self.company_name.clone())
            .with(field::TOTAL_ORDERS, self.total_orders)
            .with(field::SETTLEMENT_AMOUNT, self.settlement_amount)
            .with(field::SUPPORT_FUND, self.support_fund)
            .with(field::DEDUCTION_DETAILS, self.deduction_details)
            .with(field::EMPLOYMENT_INSURANCE, self.employment_insurance)
            .with(field::INDUSTRIAL_ACCIDENT_INSURANCE, self.industrial_accident_insurance)
            .with(field::HOURLY_INSURANCE, self.hourly_insurance)
            .with(field::RETROACTIVE_INSURANCE, self.retroactive_insurance)
            .with(field::MISSION_FEE, self.mission_fee)
            .with(field::PRE_DEDUCTION, self.pre_deduction)
            .with(field::TAX_BASE_POLICY, self.tax_base_policy.to_db_str())
            .with(field::TAX_BASE_AMOUNT, self.tax_base_amount)
            .with(field::FINAL_SETTLEMENT_AMOUNT, self.final_settlement_amount)
            .with(field::WITHHOLDING_TAX, self.withholding_tax)
            .with(field::ACTUAL_PAYMENT_AMOUNT, self.actual_payment_amount)
    }

    /// 从存储行还原；周期字段缺失时返回 None
    pub fn from_record(record: &Record) -> Option<Self> {
        let period = SettlementPeriod::from_parts(
            record.int(field::SETTLEMENT_YEAR),
            record.int(field::SETTLEMENT_MONTH),
            record.int(field::SETTLEMENT_WEEK),
        )?;
        Some(Self {
            rider_id: record.text(field::RIDER_ID).unwrap_or_default().to_string(),
            period,
            company_name: record.text(field::COMPANY_NAME).map(str::to_string),
            total_orders: record.number(field::TOTAL_ORDERS),
            settlement_amount: record.number(field::SETTLEMENT_AMOUNT),
            support_fund: record.number(field::SUPPORT_FUND),
            deduction_details: record.number(field::DEDUCTION_DETAILS),
            employment_insurance: record.number(field::EMPLOYMENT_INSURANCE),
            industrial_accident_insurance: record.number(field::INDUSTRIAL_ACCIDENT_INSURANCE),
            hourly_insurance: record.number(field::HOURLY_INSURANCE),
            retroactive_insurance: record.number(field::RETROACTIVE_INSURANCE),
            mission_fee: record.number(field::MISSION_FEE),
            pre_deduction: record.number(field::PRE_DEDUCTION),
            tax_base_policy: record
                .text(field::TAX_BASE_POLICY)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            tax_base_amount: record.number(field::TAX_BASE_AMOUNT),
            final_settlement_amount: record.number(field::FINAL_SETTLEMENT_AMOUNT),
            withholding_tax: record.number(field::WITHHOLDING_TAX),
            actual_payment_amount: record.number(field::ACTUAL_PAYMENT_AMOUNT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_record_defaults_missing_to_zero() {
        let record = Record::new()
            .with(field::RIDER_ID, "김철수1234")
            .with(field::COMMISSION_DEDUCTION, 100000.0)
            .with(field::SETTLEMENT_YEAR, 2024);

        let summary = SummaryRecord::from_record(&record);
        assert_eq!(summary.rider_id, "김철수1234");
        assert_eq!(summary.commission_deduction, 100000.0);
        assert_eq!(summary.hourly_insurance, 0.0);
        assert_eq!(summary.settlement_year, Some(2024));
        assert_eq!(summary.period(), None);
    }

    #[test]
    fn test_overrides_json_and_finiteness() {
        let o: SettlementOverrides = serde_json::from_str(r#"{"pre_deduction": -300}"#).unwrap();
        assert_eq!(o.mission_fee, 0.0);
        assert_eq!(o.pre_deduction_magnitude(), 300.0);
        assert!(o.is_finite());

        assert!(!SettlementOverrides::new(f64::NAN, 0.0).is_finite());
        assert!(!SettlementOverrides::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_final_settlement_record_round_trip() {
        let summary = SummaryRecord {
            rider_id: "김철수1234".to_string(),
            total_support_fund: 5000.0,
            ..Default::default()
        };
        let period = SettlementPeriod::new(2024, 6, 2);
        let overrides = SettlementOverrides::new(1000.0, -300.0);
        let figures = SettlementFigures {
            policy: TaxBasePolicy::Remuneration,
            final_settlement_amount: 5700.0,
            tax_base: 700.0,
            withholding_tax: 23.0,
            actual_payment: 677.0,
        };

        let settlement = FinalSettlement::assemble(&summary, period, &overrides, &figures, None);
        assert_eq!(settlement.support_fund, 5000.0);
        assert_eq!(settlement.pre_deduction, 300.0);

        let restored = FinalSettlement::from_record(&settlement.to_record()).unwrap();
        assert_eq!(restored, settlement);
    }
}
