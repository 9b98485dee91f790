// ==========================================
// 骑手周结算系统 - 结算计算引擎
// ==========================================
// 职责: 汇总记录 + 人工调整 → 计税基数 / 代扣税 / 实发金额
// 红线: 纯函数，无副作用；预览与保存必须走同一入口
// ==========================================
// 符号规则:
// - 扣款明细 / 雇佣保险 / 工伤保险 / 时薪保险: 取绝对值后扣减
// - 追溯保险: 按原符号直接相加（可能为退款）
// - 预扣款: 取绝对值后扣减；任务费按原符号相加
// ==========================================

use crate::domain::settlement::{SettlementFigures, SettlementOverrides, SummaryRecord};
use crate::domain::types::TaxBasePolicy;

/// 代扣税率 3.3%
pub const WITHHOLDING_RATE: f64 = 0.033;

// ==========================================
// SettlementCalculator
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementCalculator;

impl SettlementCalculator {
    pub fn new() -> Self {
        Self
    }

    /// 简单调整: 原金额 + 任务费 - |预扣款|
    pub fn adjust(&self, original_amount: f64, overrides: &SettlementOverrides) -> f64 {
        original_amount + overrides.mission_fee - overrides.pre_deduction_magnitude()
    }

    /// 完整调整后的手续费扣除后金额
    pub fn fully_adjust(&self, summary: &SummaryRecord, overrides: &SettlementOverrides) -> f64 {
        summary.commission_deduction + summary.total_support_fund
            - summary.deduction_details.abs()
            - summary.employment_insurance.abs()
            - summary.industrial_accident_insurance.abs()
            - summary.hourly_insurance.abs()
            + summary.retroactive_insurance
            + overrides.mission_fee
            - overrides.pre_deduction_magnitude()
    }

    /// 按口径选择计税基数
    pub fn tax_base(
        &self,
        summary: &SummaryRecord,
        overrides: &SettlementOverrides,
        policy: TaxBasePolicy,
    ) -> f64 {
        match policy {
            TaxBasePolicy::Commission => self.fully_adjust(summary, overrides),
            TaxBasePolicy::Remuneration => self.adjust(summary.remuneration, overrides),
        }
    }

    /// 代扣税 = round(计税基数 × 3.3%)，.5 向正无穷取整
    pub fn withholding(&self, tax_base: f64) -> f64 {
        round_half_up(tax_base * WITHHOLDING_RATE)
    }

    /// 完整计算
    pub fn calculate(
        &self,
        summary: &SummaryRecord,
        overrides: &SettlementOverrides,
        policy: TaxBasePolicy,
    ) -> SettlementFigures {
        let final_settlement_amount = self.fully_adjust(summary, overrides);
        let tax_base = self.tax_base(summary, overrides, policy);
        let withholding_tax = self.withholding(tax_base);

        SettlementFigures {
            policy,
            final_settlement_amount,
            tax_base,
            withholding_tax,
            actual_payment: tax_base - withholding_tax,
        }
    }
}

/// 四舍五入（.5 向正无穷）
///
/// x - floor(x) 无舍入误差
pub fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}
