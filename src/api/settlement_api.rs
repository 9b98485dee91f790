// ==========================================
// 骑手周结算系统 - 结算管理API
// ==========================================
// 职责: 汇总查询 / 统计 / 周期选项 / 结算预览与保存
// 保存语义: 按 (年, 月, 周) 整体替换 rider_settlements，不做合并
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::column_map::sheet_keys;
use crate::config::SettlementConfigReader;
use crate::domain::settlement::{field, FinalSettlement, SettlementOverrides, SummaryRecord};
use crate::domain::types::{PeriodFilter, SettlementPeriod, TaxBasePolicy};
use crate::engine::SettlementCalculator;
use crate::i18n::t_with_args;
use crate::repository::{filters, Filters, OrderBy, RecordStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info, instrument};

// ==========================================
// 响应类型
// ==========================================

/// 汇总统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementStatistics {
    pub total_riders: usize,
    pub total_orders: f64,
    pub total_settlement_amount: f64,
    pub total_actual_payment: f64,
    pub avg_orders_per_rider: f64,
    pub avg_settlement_per_rider: f64,
}

/// 某月下出现过的周次（新 → 旧）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPeriods {
    pub year: i32,
    pub month: i32,
    pub weeks: Vec<i32>,
}

/// 结算请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// 计税口径（None 取配置值）
    pub policy: Option<TaxBasePolicy>,
    pub company_name: Option<String>,
    /// rider_id → 人工调整项；未出现的骑手按 0 处理
    #[serde(default)]
    pub overrides: HashMap<String, SettlementOverrides>,
}

/// 保存结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSettlementResponse {
    pub period: SettlementPeriod,
    pub saved: usize,
    pub message: String,
    /// 旧数据删除失败（非致命）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_error: Option<String>,
    pub settlements: Vec<FinalSettlement>,
}

// ==========================================
// SettlementApi
// ==========================================
pub struct SettlementApi<S: RecordStore> {
    store: Arc<S>,
    config: Arc<dyn SettlementConfigReader>,
    calculator: SettlementCalculator,
}

impl<S: RecordStore> SettlementApi<S> {
    pub fn new(store: Arc<S>, config: Arc<dyn SettlementConfigReader>) -> Self {
        Self {
            store,
            config,
            calculator: SettlementCalculator::new(),
        }
    }

    /// 汇总列表（创建时间倒序）
    ///
    /// # 参数
    /// - filter: 全部 / 某月 / 某周
    pub async fn list_summaries(&self, filter: PeriodFilter) -> ApiResult<Vec<SummaryRecord>> {
        let rows = self
            .store
            .select_where(
                sheet_keys::TOTAL_SUMMARY,
                &period_filters(filter),
                &[OrderBy::desc(field::CREATED_AT), OrderBy::desc(field::ID)],
            )
            .await?;
        Ok(rows.iter().map(SummaryRecord::from_record).collect())
    }

    /// 汇总统计；没有数据时返回 None
    pub async fn statistics(&self, filter: PeriodFilter) -> ApiResult<Option<SettlementStatistics>> {
        let summaries = self.list_summaries(filter).await?;
        Ok(summarize(&summaries))
    }

    /// 周期选项: 按月分组，月份与周次均为新 → 旧
    ///
    /// 周期字段不完整的汇总不参与分组
    pub async fn period_options(&self) -> ApiResult<Vec<MonthPeriods>> {
        let summaries = self.list_summaries(PeriodFilter::All).await?;

        let mut months: BTreeMap<(i32, i32), BTreeSet<i32>> = BTreeMap::new();
        for period in summaries.iter().filter_map(SummaryRecord::period) {
            months
                .entry((period.year, period.month))
                .or_default()
                .insert(period.week);
        }

        Ok(months
            .into_iter()
            .rev()
            .map(|((year, month), weeks)| MonthPeriods {
                year,
                month,
                weeks: weeks.into_iter().rev().collect(),
            })
            .collect())
    }

    /// 计算某周的最终结算（不落库）
    #[instrument(skip(self, request), fields(period = %period))]
    pub async fn preview(
        &self,
        period: SettlementPeriod,
        request: &SettlementRequest,
    ) -> ApiResult<Vec<FinalSettlement>> {
        let overrides_by_rider = normalize_overrides(&request.overrides)?;
        let summaries = self.list_summaries(PeriodFilter::Week(period)).await?;
        let policy = self.resolve_policy(request.policy).await?;

        Ok(summaries
            .iter()
            .map(|summary| {
                let overrides = overrides_by_rider
                    .get(summary.rider_id.trim())
                    .copied()
                    .unwrap_or_default();
                let figures = self.calculator.calculate(summary, &overrides, policy);
                FinalSettlement::assemble(
                    summary,
                    period,
                    &overrides,
                    &figures,
                    request.company_name.clone(),
                )
            })
            .collect())
    }

    /// 保存某周的最终结算: 先删除该周期旧记录，再整批写入
    ///
    /// # 返回
    /// - Err(NotFound): 该周期没有汇总数据
    /// - Err(DatabaseError): 写入失败（旧记录可能已被删除）
    #[instrument(skip(self, request), fields(period = %period))]
    pub async fn save_final_settlements(
        &self,
        period: SettlementPeriod,
        request: &SettlementRequest,
    ) -> ApiResult<SaveSettlementResponse> {
        // === 步骤 1: 计算 ===
        let settlements = self.preview(period, request).await?;
        if settlements.is_empty() {
            return Err(ApiError::NotFound(t_with_args(
                "api.settlement.no_data",
                &[("period", period.to_string().as_str())],
            )));
        }

        // === 步骤 2: 清理该周期（失败不终止） ===
        let delete_error = match self
            .store
            .delete_where(sheet_keys::RIDER_SETTLEMENTS, &week_filters(period))
            .await
        {
            Ok(deleted) => {
                info!(deleted, "已删除该周期旧结算");
                None
            }
            Err(e) => {
                error!(error = %e, "删除旧结算失败");
                Some(e.to_string())
            }
        };

        // === 步骤 3: 写入 ===
        let records: Vec<_> = settlements.iter().map(FinalSettlement::to_record).collect();
        let saved = self
            .store
            .insert_many(sheet_keys::RIDER_SETTLEMENTS, &records)
            .await?;
        info!(saved, "结算已保存");

        Ok(SaveSettlementResponse {
            period,
            saved,
            message: t_with_args(
                "api.settlement.saved",
                &[("count", saved.to_string().as_str())],
            ),
            delete_error,
            settlements,
        })
    }

    async fn resolve_policy(&self, policy: Option<TaxBasePolicy>) -> ApiResult<TaxBasePolicy> {
        match policy {
            Some(policy) => Ok(policy),
            None => self
                .config
                .get_tax_base_policy()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string())),
        }
    }
}

/// 调整项按去空格后的 rider_id 索引；非有限数拒绝
fn normalize_overrides(
    overrides: &HashMap<String, SettlementOverrides>,
) -> ApiResult<HashMap<&str, SettlementOverrides>> {
    let mut normalized = HashMap::with_capacity(overrides.len());
    for (rider_id, value) in overrides {
        let rider_id = rider_id.trim();
        if !value.is_finite() {
            return Err(ApiError::InvalidInput(t_with_args(
                "api.settlement.invalid_override",
                &[("rider", rider_id)],
            )));
        }
        normalized.insert(rider_id, *value);
    }
    Ok(normalized)
}

/// 周期过滤条件
pub(crate) fn week_filters(period: SettlementPeriod) -> Filters {
    filters([
        (field::SETTLEMENT_YEAR, period.year),
        (field::SETTLEMENT_MONTH, period.month),
        (field::SETTLEMENT_WEEK, period.week),
    ])
}

fn period_filters(filter: PeriodFilter) -> Filters {
    match filter {
        PeriodFilter::All => Filters::new(),
        PeriodFilter::Month { year, month } => filters([
            (field::SETTLEMENT_YEAR, year),
            (field::SETTLEMENT_MONTH, month),
        ]),
        PeriodFilter::Week(period) => week_filters(period),
    }
}

fn summarize(summaries: &[SummaryRecord]) -> Option<SettlementStatistics> {
    if summaries.is_empty() {
        return None;
    }
    let riders = summaries.len() as f64;
    let total_orders: f64 = summaries.iter().map(|s| s.total_orders).sum();
    let total_settlement_amount: f64 = summaries.iter().map(|s| s.total_settlement_amount).sum();

    Some(SettlementStatistics {
        total_riders: summaries.len(),
        total_orders,
        total_settlement_amount,
        total_actual_payment: summaries.iter().map(|s| s.actual_payment_amount).sum(),
        avg_orders_per_rider: total_orders / riders,
        avg_settlement_per_rider: total_settlement_amount / riders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_averages() {
        let summaries = vec![
            SummaryRecord {
                total_orders: 100.0,
                total_settlement_amount: 300000.0,
                actual_payment_amount: 290000.0,
                ..Default::default()
            },
            SummaryRecord {
                total_orders: 50.0,
                total_settlement_amount: 100000.0,
                actual_payment_amount: 95000.0,
                ..Default::default()
            },
        ];
        let stats = summarize(&summaries).unwrap();
        assert_eq!(stats.total_riders, 2);
        assert_eq!(stats.total_orders, 150.0);
        assert_eq!(stats.total_actual_payment, 385000.0);
        assert_eq!(stats.avg_orders_per_rider, 75.0);
        assert_eq!(stats.avg_settlement_per_rider, 200000.0);

        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn test_normalize_overrides_trims_keys() {
        let mut overrides = HashMap::new();
        overrides.insert(" 김철수1234 ".to_string(), SettlementOverrides::new(1000.0, -300.0));
        let normalized = normalize_overrides(&overrides).unwrap();
        assert_eq!(
            normalized.get("김철수1234"),
            Some(&SettlementOverrides::new(1000.0, -300.0))
        );

        overrides.insert("이영희5678".to_string(), SettlementOverrides::new(f64::NAN, 0.0));
        assert!(matches!(
            normalize_overrides(&overrides),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_period_filters() {
        assert!(period_filters(PeriodFilter::All).is_empty());
        assert_eq!(
            period_filters(PeriodFilter::Month {
                year: 2024,
                month: 6
            })
            .len(),
            2
        );
        assert_eq!(
            period_filters(PeriodFilter::Week(SettlementPeriod::new(2024, 6, 2))).len(),
            3
        );
    }
}
