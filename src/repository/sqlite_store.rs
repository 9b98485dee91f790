// ==========================================
// 骑手周结算系统 - SQLite 记录存储
// ==========================================
// 职责: RecordStore 的 rusqlite 实现
// 红线: 不含业务逻辑；表名 / 列名必须是合法标识符
// 说明: insert_many 在单个事务内完成，任一行失败整批回滚
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::record::{FieldValue, Record};
use crate::i18n::t;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{Filters, OrderBy, RecordStore, SortDirection};
use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 打开数据库并确保表结构存在
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共用连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

/// 合法标识符: [A-Za-z_][A-Za-z0-9_]*
pub fn validate_identifier(name: &str) -> RepositoryResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidIdentifier(name.to_string()))
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name)
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Number(n) => Value::Real(*n),
        FieldValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(i) => FieldValue::Number(i as f64),
        ValueRef::Real(f) => FieldValue::Number(f),
        ValueRef::Text(t) => FieldValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => FieldValue::Null,
    }
}

/// WHERE 子句 + 绑定参数；Null 条件转为 IS NULL
fn where_clause(filters: &Filters) -> RepositoryResult<(String, Vec<Value>)> {
    if filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }
    let mut parts = Vec::with_capacity(filters.len());
    let mut values = Vec::with_capacity(filters.len());
    for (field, value) in filters {
        validate_identifier(field)?;
        if value.is_null() {
            parts.push(format!("{} IS NULL", quote(field)));
        } else {
            values.push(to_sql_value(value));
            parts.push(format!("{} = ?{}", quote(field), values.len()));
        }
    }
    Ok((format!(" WHERE {}", parts.join(" AND ")), values))
}

fn order_clause(order_by: &[OrderBy]) -> RepositoryResult<String> {
    if order_by.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(order_by.len());
    for order in order_by {
        validate_identifier(&order.field)?;
        let dir = match order.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        parts.push(format!("{} {}", quote(&order.field), dir));
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

// ==========================================
// RecordStore Trait 实现
// ==========================================
#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn delete_all(&self, table: &str) -> RepositoryResult<usize> {
        validate_identifier(table)?;
        let conn = self.get_conn()?;
        let deleted = conn.execute(&format!("DELETE FROM {}", quote(table)), [])?;
        tracing::debug!(table, deleted, "全表删除");
        Ok(deleted)
    }

    async fn delete_where(&self, table: &str, filters: &Filters) -> RepositoryResult<usize> {
        validate_identifier(table)?;
        let (clause, values) = where_clause(filters)?;
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {}{}", quote(table), clause),
            params_from_iter(values.iter()),
        )?;
        tracing::debug!(table, deleted, filter_count = filters.len(), "条件删除");
        Ok(deleted)
    }

    async fn insert_many(&self, table: &str, records: &[Record]) -> RepositoryResult<usize> {
        validate_identifier(table)?;
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for (index, record) in records.iter().enumerate() {
            if record.is_empty() {
                return Err(RepositoryError::RowRejected {
                    index,
                    message: t("errors.repository.empty_record"),
                });
            }
            let mut columns = Vec::with_capacity(record.len());
            let mut values = Vec::with_capacity(record.len());
            for (field, value) in record.iter() {
                validate_identifier(field)?;
                columns.push(quote(field));
                values.push(to_sql_value(value));
            }
            let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                columns.join(", "),
                placeholders.join(", ")
            );
            // 出错时 tx 被 drop，事务自动回滚
            tx.execute(&sql, params_from_iter(values.iter()))
                .map_err(|e| RepositoryError::RowRejected {
                    index,
                    message: e.to_string(),
                })?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tracing::debug!(table, inserted = records.len(), "批量写入完成");
        Ok(records.len())
    }

    async fn select_where(
        &self,
        table: &str,
        filters: &Filters,
        order_by: &[OrderBy],
    ) -> RepositoryResult<Vec<Record>> {
        validate_identifier(table)?;
        let (clause, values) = where_clause(filters)?;
        let order = order_clause(order_by)?;

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}{}{}", quote(table), clause, order))?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let mut record = Record::new();
            for (i, name) in names.iter().enumerate() {
                record.set(name.as_str(), from_sql_value(row.get_ref(i)?));
            }
            Ok(record)
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::record_store::filters;
    use tempfile::NamedTempFile;

    fn setup() -> (NamedTempFile, SqliteRecordStore) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteRecordStore::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, store)
    }

    fn deduction(rider: &str, date: &str, amount: f64, week: i32) -> Record {
        Record::new()
            .with("rider_id", rider)
            .with("date", date)
            .with("amount", amount)
            .with("settlement_year", 2024)
            .with("settlement_month", 6)
            .with("settlement_week", week)
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("total_summary").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("a;DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[tokio::test]
    async fn test_insert_and_select_ordered() {
        let (_tmp, store) = setup();
        let rows = vec![
            deduction("김철수1234", "2024-06-05", -1000.0, 2),
            deduction("김철수1234", "2024-06-03", -2000.0, 2),
            deduction("이영희5678", "2024-06-04", -500.0, 2),
        ];
        assert_eq!(store.insert_many("deductions", &rows).await.unwrap(), 3);

        let found = store
            .select_where(
                "deductions",
                &filters([("rider_id", "김철수1234")]),
                &[OrderBy::asc("date")],
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text("date"), Some("2024-06-03"));
        assert_eq!(found[0].number("amount"), -2000.0);
        assert_eq!(found[0].int("settlement_year"), Some(2024));
        assert!(found[0].get("id").is_some());
        assert!(found[0].text("created_at").is_some());
    }

    #[tokio::test]
    async fn test_insert_many_is_atomic() {
        let (_tmp, store) = setup();
        let rows = vec![
            deduction("김철수1234", "2024-06-05", -1000.0, 2),
            Record::new().with("rider_id", "x").with("no_such_column", 1.0),
        ];
        let err = store.insert_many("deductions", &rows).await.unwrap_err();
        assert!(matches!(err, RepositoryError::RowRejected { index: 1, .. }));

        let all = store.select_where("deductions", &Vec::new(), &[]).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_delete_where_and_all() {
        let (_tmp, store) = setup();
        let rows = vec![
            deduction("김철수1234", "2024-06-05", -1000.0, 1),
            deduction("김철수1234", "2024-06-12", -1000.0, 2),
            deduction("이영희5678", "2024-06-13", -1000.0, 2),
        ];
        store.insert_many("deductions", &rows).await.unwrap();

        let deleted = store
            .delete_where(
                "deductions",
                &filters([
                    ("settlement_year", 2024),
                    ("settlement_month", 6),
                    ("settlement_week", 2),
                ]),
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        assert_eq!(store.delete_all("deductions").await.unwrap(), 1);
        let all = store.select_where("deductions", &Vec::new(), &[]).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_null_filter_matches_is_null() {
        let (_tmp, store) = setup();
        let rows = vec![
            Record::new().with("rider_id", "a1234").with("store_name", FieldValue::Null),
            Record::new().with("rider_id", "b1234").with("store_name", "강남점"),
        ];
        store.insert_many("support_funds", &rows).await.unwrap();

        let found = store
            .select_where("support_funds", &filters([("store_name", FieldValue::Null)]), &[])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text("rider_id"), Some("a1234"));
    }

    #[tokio::test]
    async fn test_rejects_bad_identifiers() {
        let (_tmp, store) = setup();
        assert!(matches!(
            store.delete_all("deductions; --").await,
            Err(RepositoryError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            store
                .select_where("deductions", &Vec::new(), &[OrderBy::desc("date desc")])
                .await,
            Err(RepositoryError::InvalidIdentifier(_))
        ));
    }
}
