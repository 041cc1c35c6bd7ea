//! PostgreSQL数据库适配器
//!
//! 使用sqlx库实现PostgreSQL的目录查询与语句执行

use super::{DatabaseAdapter, ResultSet, Statement};
use crate::error::{QuickTableError, QuickTableResult};
use crate::identifier::{is_safe_type_name, quote_identifier, validate_type_name};
use crate::quick_table_error;
use crate::session::{ActiveTransaction, DatabaseConnection};
use crate::table::Column;
use crate::types::*;
use async_trait::async_trait;
use rat_logger::{debug, warn};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgRow, PgValueFormat};
use sqlx::query::Query;
use sqlx::{Column as _, Executor, Postgres, Row as _, TypeInfo, ValueRef as _};

/// 列目录查询：列名、精确类型、可空、主键、自增、默认值
const COLUMNS_SQL: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        COALESCE(format_type(a.atttypid, a.atttypmod), c.data_type::text) AS full_type,
        (c.is_nullable::text = 'YES') AS is_nullable,
        (pk.column_name IS NOT NULL) AS is_primary,
        (COALESCE(c.column_default::text, '') LIKE 'nextval%'
            OR c.is_identity::text = 'YES') AS is_identity,
        COALESCE(c.column_default::text, '') AS column_default
    FROM information_schema.columns c
    LEFT JOIN pg_catalog.pg_namespace n
        ON n.nspname = c.table_schema::text
    LEFT JOIN pg_catalog.pg_class cl
        ON cl.relnamespace = n.oid AND cl.relname = c.table_name::text
    LEFT JOIN pg_catalog.pg_attribute a
        ON a.attrelid = cl.oid AND a.attname = c.column_name::text
    LEFT JOIN (
        SELECT ku.column_name::text AS column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage ku
            ON tc.constraint_name::text = ku.constraint_name::text
            AND tc.table_schema::text = ku.table_schema::text
            AND tc.table_name::text = ku.table_name::text
        WHERE tc.constraint_type::text = 'PRIMARY KEY'
            AND tc.table_schema::text = $1
            AND tc.table_name::text = $2
    ) pk ON c.column_name::text = pk.column_name
    WHERE c.table_schema::text = $1 AND c.table_name::text = $2
    ORDER BY c.ordinal_position
"#;

const TABLES_SQL: &str = "SELECT table_name::text FROM information_schema.tables \
     WHERE table_schema::text = $1 AND table_type::text = 'BASE TABLE' \
     ORDER BY table_name";

const TABLE_EXISTS_SQL: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema::text = $1 AND table_name::text = $2 AND table_type::text = 'BASE TABLE'";

/// PostgreSQL适配器
pub struct PostgresAdapter;

impl PostgresAdapter {
    fn pool<'a>(&self, connection: &'a DatabaseConnection) -> QuickTableResult<&'a sqlx::PgPool> {
        match connection {
            DatabaseConnection::PostgreSQL(pool) => Ok(pool),
            _ => Err(quick_table_error!(connection, "连接类型不匹配，期望PostgreSQL连接")),
        }
    }

    fn qualified_table(schema: &str, table: &str) -> QuickTableResult<String> {
        Ok(format!("{}.{}", quote_identifier(schema)?, quote_identifier(table)?))
    }
}

/// 按顺序绑定参数
fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [DataValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            DataValue::Null => query.bind(Option::<String>::None),
            DataValue::Bool(b) => query.bind(*b),
            DataValue::Int(i) => query.bind(*i),
            DataValue::Float(f) => query.bind(*f),
            DataValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// 在任意执行器（连接池或事务）上执行语句
pub(crate) async fn execute_on<'c, E>(executor: E, statement: &Statement) -> QuickTableResult<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    debug!("执行PostgreSQL语句: {}", statement.sql);
    let result = if statement.params.is_empty() {
        // 无参数的语句走简单查询协议，可以一次提交多条语句
        executor.execute(statement.sql.as_str()).await?
    } else {
        bind_params(sqlx::query(&statement.sql), &statement.params)
            .execute(executor)
            .await?
    };
    Ok(result.rows_affected())
}

/// 绑定参数时的转换目标类型
///
/// 去掉长度、精度等修饰符，超长的值交给列自身的赋值检查报错，
/// 不会被显式转换悄悄截断
fn cast_target(full_type: &str) -> String {
    let mut stripped = String::with_capacity(full_type.len());
    let mut depth = 0usize;
    for ch in full_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let (base, dimensions) = match normalized.find("[]") {
        Some(pos) => (normalized[..pos].trim_end(), &normalized[pos..]),
        None => (normalized.as_str(), ""),
    };
    // 不带长度的 character 与 bit 等价于长度 1
    let base = match base.to_lowercase().as_str() {
        "character" | "char" => "bpchar".to_string(),
        "bit" => "bit varying".to_string(),
        _ => base.to_string(),
    };
    format!("{}{}", base, dimensions)
}

/// real 按其最短十进制表示转换为 f64
fn widen_f32(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(value as f64)
}

/// 将PostgreSQL行转换为DataValue序列
fn decode_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| decode_cell(row, index, column.type_info().name()))
        .collect()
}

fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> DataValue {
    let decoded = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(|i| DataValue::Int(i as i64))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(|i| DataValue::Int(i as i64))),
        "INT8" => row.try_get::<Option<i64>, _>(index).map(|v| v.map(DataValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|f| DataValue::Float(widen_f32(f)))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index).map(|v| v.map(DataValue::Float)),
        "BOOL" => row.try_get::<Option<bool>, _>(index).map(|v| v.map(DataValue::Bool)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)
            .map(|v| v.map(|u| DataValue::Text(u.to_string()))),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)
            .map(|v| v.map(|json| DataValue::Text(json.to_string()))),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .map(|v| v.map(|d| DataValue::Text(d.format("%Y-%m-%d").to_string()))),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .map(|v| v.map(|t| DataValue::Text(t.format("%H:%M:%S%.f").to_string()))),
        "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(index).map(|v| {
            v.map(|dt| DataValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
        }),
        "TIMESTAMPTZ" => row.try_get::<Option<DateTime<Utc>>, _>(index).map(|v| {
            v.map(|dt| DataValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()))
        }),
        _ => row.try_get::<Option<String>, _>(index).map(|v| v.map(DataValue::Text)),
    };

    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => DataValue::Null,
        Err(e) => decode_text(row, index).unwrap_or_else(|| {
            warn!("无法解码PostgreSQL列 {}（类型 {}）: {}", index, type_name, e);
            DataValue::Null
        }),
    }
}

/// 简单查询协议返回文本格式，任何类型都可以按原文读取
fn decode_text(row: &PgRow, index: usize) -> Option<DataValue> {
    let raw = row.try_get_raw(index).ok()?;
    if raw.is_null() {
        return Some(DataValue::Null);
    }
    if !matches!(raw.format(), PgValueFormat::Text) {
        return None;
    }
    raw.as_str().ok().map(|text| DataValue::Text(text.to_string()))
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn placeholder(&self, index: usize, column: Option<&Column>) -> String {
        // 带上列的精确类型，文本输入由引擎自身完成类型转换
        match column {
            Some(col) if !col.full_type.is_empty() && is_safe_type_name(&col.full_type) => {
                format!("CAST(${} AS {})", index, cast_target(&col.full_type))
            }
            _ => format!("${}", index),
        }
    }

    fn physical_type(&self, simplified: SimplifiedType) -> &'static str {
        match simplified {
            SimplifiedType::Int => "BIGINT",
            SimplifiedType::Text => "TEXT",
        }
    }

    fn identity_type(&self) -> &'static str {
        "BIGSERIAL"
    }

    fn identity_is_inline_key(&self) -> bool {
        false
    }

    fn identity_override(&self) -> Option<&'static str> {
        Some("OVERRIDING SYSTEM VALUE")
    }

    fn drop_table_sql(&self, quoted_table: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", quoted_table)
    }

    fn change_column_type_sql(
        &self,
        quoted_table: &str,
        quoted_column: &str,
        new_type: &str,
    ) -> QuickTableResult<String> {
        validate_type_name(new_type)?;
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
            quoted_table,
            quoted_column,
            new_type.trim(),
            quoted_column,
            new_type.trim()
        ))
    }

    fn select_expression(&self, column: &Column) -> QuickTableResult<String> {
        let quoted = quote_identifier(&column.name)?;
        let expression = match column.full_type.to_lowercase().as_str() {
            "smallint" | "integer" | "bigint" => format!("CAST({} AS bigint)", quoted),
            "real" | "double precision" | "boolean" => quoted,
            _ => format!("CAST({} AS text)", quoted),
        };
        Ok(expression)
    }

    async fn list_tables(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
    ) -> QuickTableResult<Vec<String>> {
        let pool = self.pool(connection)?;
        debug!("查询PostgreSQL表目录，模式: {}", schema);

        let rows = sqlx::query(TABLES_SQL).bind(schema).fetch_all(pool).await?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(row.try_get::<String, _>(0)?);
        }
        Ok(tables)
    }

    async fn table_exists(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<bool> {
        let pool = self.pool(connection)?;
        let count: i64 = sqlx::query_scalar(TABLE_EXISTS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    async fn table_columns(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<Vec<Column>> {
        let pool = self.pool(connection)?;
        debug!("查询PostgreSQL列目录: {}.{}", schema, table);

        let rows = sqlx::query(COLUMNS_SQL)
            .bind(schema)
            .bind(table)
            .fetch_all(pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let data_type: String = row.try_get("data_type")?;
            columns.push(Column {
                name: row.try_get("column_name")?,
                simplified_type: SimplifiedType::classify(&data_type),
                full_type: row.try_get("full_type")?,
                is_primary_key: row.try_get("is_primary")?,
                is_identity: row.try_get("is_identity")?,
                is_nullable: row.try_get("is_nullable")?,
                default_value: row.try_get("column_default")?,
            });
        }
        Ok(columns)
    }

    async fn sync_identity(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
        column: &Column,
    ) -> QuickTableResult<()> {
        let pool = self.pool(connection)?;
        let qualified = Self::qualified_table(schema, table)?;
        // setval(..., max + 1, false)：下一次 nextval 返回 max + 1
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence($1, $2), COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false)",
            quote_identifier(&column.name)?,
            qualified
        );
        debug!("同步PostgreSQL序列: {}", sql);

        sqlx::query(&sql)
            .bind(qualified.as_str())
            .bind(column.name.as_str())
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn execute(
        &self,
        connection: &DatabaseConnection,
        statement: &Statement,
    ) -> QuickTableResult<u64> {
        let pool = self.pool(connection)?;
        execute_on(pool, statement).await
    }

    async fn fetch(
        &self,
        connection: &DatabaseConnection,
        statement: &Statement,
    ) -> QuickTableResult<ResultSet> {
        let pool = self.pool(connection)?;
        debug!("执行PostgreSQL查询: {}", statement.sql);

        let rows = if statement.params.is_empty() {
            pool.fetch_all(statement.sql.as_str()).await?
        } else {
            bind_params(sqlx::query(&statement.sql), &statement.params)
                .fetch_all(pool)
                .await?
        };

        let headers = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => match pool.describe(&statement.sql).await {
                Ok(described) => described
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect(),
                Err(e) => {
                    warn!("无法获取空结果集的列信息: {}", e);
                    Vec::new()
                }
            },
        };

        Ok(ResultSet {
            headers,
            rows: rows.iter().map(decode_row).collect(),
        })
    }

    async fn begin(&self, connection: &DatabaseConnection) -> QuickTableResult<ActiveTransaction> {
        let pool = self.pool(connection)?;
        let tx = pool.begin().await.map_err(QuickTableError::from)?;
        debug!("PostgreSQL事务已开始");
        Ok(ActiveTransaction::PostgreSQL(tx))
    }
}
