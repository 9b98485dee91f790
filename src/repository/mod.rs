// ==========================================
// 骑手周结算系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供通用记录存储接口,屏蔽数据库细节
// 约束: 所有值使用参数化绑定；表名/列名经标识符校验
// ==========================================

pub mod error;
pub mod record_store;
pub mod sqlite_store;

// 重导出核心类型
pub use error::{RepositoryError, RepositoryResult};
pub use record_store::{filters, Filters, OrderBy, RecordStore, SortDirection};
pub use sqlite_store::SqliteRecordStore;
