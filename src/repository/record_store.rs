// ==========================================
// 骑手周结算系统 - 通用记录存储接口
// ==========================================
// 职责: 按逻辑表名读写扁平记录
// 操作: delete_all / delete_where / insert_many / select_where
// 实现者: SqliteRecordStore（测试中另有 Mock 实现）
// ==========================================

use crate::domain::record::{FieldValue, Record};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

/// 等值过滤条件（全部满足）
pub type Filters = Vec<(String, FieldValue)>;

/// 构造等值过滤条件
pub fn filters<I, K, V>(pairs: I) -> Filters
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

// ==========================================
// RecordStore Trait
// ==========================================
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 删除表内全部行，返回删除行数
    async fn delete_all(&self, table: &str) -> RepositoryResult<usize>;

    /// 删除满足全部等值条件的行，返回删除行数
    ///
    /// # 说明
    /// - 条件值为 Null 时匹配 IS NULL
    /// - 空条件等同 delete_all
    async fn delete_where(&self, table: &str, filters: &Filters) -> RepositoryResult<usize>;

    /// 批量写入
    ///
    /// # 返回
    /// - Ok(n): 全部写入
    /// - Err: 任一行被拒绝则整批不生效
    async fn insert_many(&self, table: &str, records: &[Record]) -> RepositoryResult<usize>;

    /// 按等值条件读取，可选排序（按声明顺序依次生效）
    async fn select_where(
        &self,
        table: &str,
        filters: &Filters,
        order_by: &[OrderBy],
    ) -> RepositoryResult<Vec<Record>>;
}
