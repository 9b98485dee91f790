// ==========================================
// 骑手周结算系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等（CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::collections::HashSet;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：foreign_keys / busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 期间字段 + 时间戳（所有数据表共用）
const COMMON_COLUMNS: &str = r#"
    settlement_year INTEGER,
    settlement_month INTEGER,
    settlement_week INTEGER,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
"#;

/// 初始化 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    let tables: [(&str, &str); 7] = [
        (
            "total_summary",
            r#"
            total_orders REAL,
            settlement_amount REAL,
            total_support_fund REAL,
            deduction_details REAL,
            total_settlement_amount REAL,
            employment_insurance REAL,
            industrial_accident_insurance REAL,
            hourly_insurance REAL,
            retroactive_insurance REAL,
            expected_settlement_amount REAL,
            actual_payment_amount REAL,
            commission_deduction REAL,
            remuneration REAL,
            "#,
        ),
        (
            "support_funds",
            r#"
            date TEXT,
            rider_name TEXT,
            store_name TEXT,
            amount REAL,
            support_amount REAL,
            "#,
        ),
        (
            "additional_support_funds",
            r#"
            date TEXT,
            rider_name TEXT,
            type TEXT,
            amount REAL,
            "#,
        ),
        (
            "deductions",
            r#"
            date TEXT,
            rider_name TEXT,
            type TEXT,
            store_name TEXT,
            amount REAL,
            "#,
        ),
        (
            "hourly_insurance_deductions",
            r#"
            date TEXT,
            rider_name TEXT,
            amount REAL,
            "#,
        ),
        (
            "retroactive_insurance_details",
            r#"
            rider_name TEXT,
            description TEXT,
            amount REAL,
            "#,
        ),
        (
            "rider_settlements",
            r#"
            company_name TEXT,
            total_orders REAL,
            settlement_amount REAL,
            support_fund REAL,
            deduction_details REAL,
            employment_insurance REAL,
            industrial_accident_insurance REAL,
            hourly_insurance REAL,
            retroactive_insurance REAL,
            mission_fee REAL,
            pre_deduction REAL,
            tax_base_policy TEXT,
            tax_base_amount REAL,
            final_settlement_amount REAL,
            withholding_tax REAL,
            actual_payment_amount REAL,
            "#,
        ),
    ];

    for (table, columns) in tables {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rider_id TEXT NOT NULL,
                {columns}
                {COMMON_COLUMNS}
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_period
                ON {table} (settlement_year, settlement_month, settlement_week, rider_id);"
        ))?;
    }

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取表的列名（表不存在时为空集合）
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    names.collect()
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
