// ==========================================
// 骑手周结算系统 - 骑手查询API
// ==========================================
// 职责: 骑手按周期查询本人结算与明细
// 说明: 明细查询失败只记录日志，返回空列表
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::settlement_api::week_filters;
use crate::config::column_map::sheet_keys;
use crate::domain::record::Record;
use crate::domain::settlement::{field, FinalSettlement};
use crate::domain::types::SettlementPeriod;
use crate::i18n::{t, t_with_args};
use crate::repository::{Filters, OrderBy, RecordStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

/// 骑手查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderLookup {
    pub settlement: FinalSettlement,
    pub support_funds: Vec<Record>,
    pub additional_support_funds: Vec<Record>,
    pub deductions: Vec<Record>,
}

/// 骑手查询API
pub struct RiderApi<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> RiderApi<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 已保存结算的周期（新 → 旧，去重）
    pub async fn available_periods(&self) -> ApiResult<Vec<SettlementPeriod>> {
        let rows = self
            .store
            .select_where(
                sheet_keys::RIDER_SETTLEMENTS,
                &Filters::new(),
                &[
                    OrderBy::desc(field::SETTLEMENT_YEAR),
                    OrderBy::desc(field::SETTLEMENT_MONTH),
                    OrderBy::desc(field::SETTLEMENT_WEEK),
                ],
            )
            .await?;

        let mut periods: Vec<SettlementPeriod> = Vec::new();
        for period in rows.iter().filter_map(|row| {
            SettlementPeriod::from_parts(
                row.int(field::SETTLEMENT_YEAR),
                row.int(field::SETTLEMENT_MONTH),
                row.int(field::SETTLEMENT_WEEK),
            )
        }) {
            if periods.last() != Some(&period) {
                periods.push(period);
            }
        }
        Ok(periods)
    }

    /// 查询骑手某周的结算
    ///
    /// # 参数
    /// - period: 结算周期
    /// - rider_id: 骑手标识（首尾空白忽略）
    ///
    /// # 返回
    /// - Err(InvalidInput): 标识为空
    /// - Err(NotFound): 该周期没有此骑手的结算
    #[instrument(skip(self), fields(period = %period))]
    pub async fn lookup(&self, period: SettlementPeriod, rider_id: &str) -> ApiResult<RiderLookup> {
        let rider_id = rider_id.trim();
        if rider_id.is_empty() {
            return Err(ApiError::InvalidInput(t("api.rider.empty_id")));
        }

        let mut conditions = week_filters(period);
        conditions.push((field::RIDER_ID.to_string(), rider_id.into()));

        let rows = self
            .store
            .select_where(sheet_keys::RIDER_SETTLEMENTS, &conditions, &[])
            .await?;
        if rows.len() > 1 {
            warn!(rider_id, count = rows.len(), "同一周期存在多条结算，取第一条");
        }
        let settlement = rows
            .first()
            .and_then(FinalSettlement::from_record)
            .ok_or_else(|| {
                ApiError::NotFound(t_with_args(
                    "api.rider.not_found",
                    &[("rider", rider_id), ("period", period.to_string().as_str())],
                ))
            })?;

        Ok(RiderLookup {
            settlement,
            support_funds: self.details(sheet_keys::SUPPORT_FUNDS, &conditions).await,
            additional_support_funds: self
                .details(sheet_keys::ADDITIONAL_SUPPORT_FUNDS, &conditions)
                .await,
            deductions: self.details(sheet_keys::DEDUCTIONS, &conditions).await,
        })
    }

    async fn details(&self, table: &str, conditions: &Filters) -> Vec<Record> {
        match self
            .store
            .select_where(table, conditions, &[OrderBy::asc(field::DATE)])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table, error = %e, "明细查询失败");
                Vec::new()
            }
        }
    }
}
