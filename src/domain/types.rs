// ==========================================
// 骑手周结算系统 - 领域类型定义
// ==========================================
// 职责: 结算周期 / 计税口径 / 覆盖范围等基础类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 结算周期 (Settlement Period)
// ==========================================
// (年, 月, 周) 三元组，排序规则: 年 → 月 → 周
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettlementPeriod {
    pub year: i32,
    pub month: i32,
    pub week: i32,
}

impl SettlementPeriod {
    pub fn new(year: i32, month: i32, week: i32) -> Self {
        Self { year, month, week }
    }

    /// 由三个可选字段组装；任一缺失视为"未分配周期"
    pub fn from_parts(year: Option<i32>, month: Option<i32>, week: Option<i32>) -> Option<Self> {
        match (year, month, week) {
            (Some(year), Some(month), Some(week)) => Some(Self { year, month, week }),
            _ => None,
        }
    }

    /// 选项值格式: "2024-6-W2"
    pub fn option_value(&self) -> String {
        format!("{}-{}-W{}", self.year, self.month, self.week)
    }
}

impl fmt::Display for SettlementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.week)
    }
}

impl FromStr for SettlementPeriod {
    type Err = String;

    /// 接受 "2024-6-2" 与 "2024-6-W2" 两种写法
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('-').collect();
        if parts.len() != 3 {
            return Err(format!("无效的结算周期: {}", s));
        }
        let parse = |raw: &str| -> Result<i32, String> {
            raw.trim_start_matches('W')
                .parse::<i32>()
                .map_err(|_| format!("无效的结算周期: {}", s))
        };
        Ok(Self {
            year: parse(parts[0])?,
            month: parse(parts[1])?,
            week: parse(parts[2])?,
        })
    }
}

// ==========================================
// 周期过滤器 (管理端列表)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodFilter {
    All,
    Month { year: i32, month: i32 },
    Week(SettlementPeriod),
}

impl PeriodFilter {
    pub fn matches(&self, period: Option<SettlementPeriod>) -> bool {
        match (self, period) {
            (PeriodFilter::All, _) => true,
            (PeriodFilter::Month { year, month }, Some(p)) => p.year == *year && p.month == *month,
            (PeriodFilter::Week(target), Some(p)) => *target == p,
            _ => false,
        }
    }
}

// ==========================================
// 计税口径 (Tax Base Policy)
// ==========================================
// commission: 按完整调整后的手续费扣除后金额计税
// remuneration: 按报酬 + 任务费 - 预扣款计税
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxBasePolicy {
    #[default]
    Commission,
    Remuneration,
}

impl TaxBasePolicy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TaxBasePolicy::Commission => "commission",
            TaxBasePolicy::Remuneration => "remuneration",
        }
    }
}

impl fmt::Display for TaxBasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FromStr for TaxBasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "commission" => Ok(TaxBasePolicy::Commission),
            "remuneration" => Ok(TaxBasePolicy::Remuneration),
            other => Err(format!("未知的计税口径: {}", other)),
        }
    }
}

// ==========================================
// 导入覆盖范围 (Replace Scope)
// ==========================================
// Table: 清空整张目标表后写入（历史行为）
// Period: 仅删除本次导入周期的数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceScope {
    #[default]
    Table,
    Period,
}

impl FromStr for ReplaceScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(ReplaceScope::Table),
            "period" => Ok(ReplaceScope::Period),
            other => Err(format!("未知的覆盖范围: {}", other)),
        }
    }
}

// ==========================================
// 工作表数据形态
// ==========================================
// 仅作标注，不影响解析流程
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetDataType {
    Single, // 每骑手一行的汇总表
    List,   // 明细流水表
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_parts_requires_all_fields() {
        assert_eq!(
            SettlementPeriod::from_parts(Some(2024), Some(6), Some(2)),
            Some(SettlementPeriod::new(2024, 6, 2))
        );
        assert_eq!(SettlementPeriod::from_parts(Some(2024), None, Some(2)), None);
    }

    #[test]
    fn test_period_parse_both_formats() {
        let a: SettlementPeriod = "2024-6-2".parse().unwrap();
        let b: SettlementPeriod = "2024-6-W2".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.option_value(), "2024-6-W2");
        assert!("2024-6".parse::<SettlementPeriod>().is_err());
    }

    #[test]
    fn test_period_ordering() {
        let mut periods = vec![
            SettlementPeriod::new(2024, 6, 1),
            SettlementPeriod::new(2024, 5, 4),
            SettlementPeriod::new(2024, 6, 3),
        ];
        periods.sort();
        assert_eq!(periods[0], SettlementPeriod::new(2024, 5, 4));
        assert_eq!(periods[2], SettlementPeriod::new(2024, 6, 3));
    }

    #[test]
    fn test_period_filter() {
        let p = Some(SettlementPeriod::new(2024, 6, 2));
        assert!(PeriodFilter::All.matches(None));
        assert!(PeriodFilter::Month { year: 2024, month: 6 }.matches(p));
        assert!(!PeriodFilter::Month { year: 2024, month: 7 }.matches(p));
        assert!(PeriodFilter::Week(SettlementPeriod::new(2024, 6, 2)).matches(p));
        assert!(!PeriodFilter::Week(SettlementPeriod::new(2024, 6, 2)).matches(None));
    }

    #[test]
    fn test_tax_base_policy_parse() {
        assert_eq!("Commission".parse::<TaxBasePolicy>().unwrap(), TaxBasePolicy::Commission);
        assert_eq!("remuneration".parse::<TaxBasePolicy>().unwrap(), TaxBasePolicy::Remuneration);
        assert!("salary".parse::<TaxBasePolicy>().is_err());
        assert_eq!(TaxBasePolicy::default(), TaxBasePolicy::Commission);
    }
}
