//! SQLite数据库适配器
//!
//! 使用sqlx库实现SQLite的目录查询与语句执行

use super::{DatabaseAdapter, ResultSet, Statement};
use crate::error::QuickTableResult;
use crate::identifier::quote_identifier;
use crate::quick_table_error;
use crate::session::{ActiveTransaction, DatabaseConnection};
use crate::table::Column;
use crate::types::*;
use async_trait::async_trait;
use rat_logger::{debug, warn};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column as _, Executor, Row as _, Sqlite, TypeInfo, ValueRef};

/// SQLite适配器
pub struct SqliteAdapter;

impl SqliteAdapter {
    fn pool<'a>(
        &self,
        connection: &'a DatabaseConnection,
    ) -> QuickTableResult<&'a sqlx::SqlitePool> {
        match connection {
            DatabaseConnection::SQLite(pool) => Ok(pool),
            _ => Err(quick_table_error!(connection, "连接类型不匹配，期望SQLite连接")),
        }
    }

    /// 读取建表语句，用于识别 AUTOINCREMENT
    async fn create_sql(
        &self,
        pool: &sqlx::SqlitePool,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<Option<String>> {
        let sql = format!(
            "SELECT sql FROM {}.sqlite_master WHERE type = 'table' AND name = ?",
            quote_identifier(schema)?
        );
        let create_sql: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(table)
            .fetch_optional(pool)
            .await?;
        Ok(create_sql.flatten())
    }
}

/// 按顺序绑定参数
fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [DataValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
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
    E: Executor<'c, Database = Sqlite>,
{
    debug!("执行SQLite语句: {}", statement.sql);
    let result = bind_params(sqlx::query(&statement.sql), &statement.params)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// 将SQLite行转换为DataValue序列
///
/// SQLite 按值而非按列确定存储类型，因此逐个单元格读取实际存储类
fn decode_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|index| decode_cell(row, index))
        .collect()
}

fn decode_cell(row: &SqliteRow, index: usize) -> DataValue {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return DataValue::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(e) => {
            warn!("无法读取SQLite列 {}: {}", index, e);
            return DataValue::Null;
        }
    };

    let decoded = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(index).map(DataValue::Int),
        "REAL" => row.try_get_unchecked::<f64, _>(index).map(DataValue::Float),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| DataValue::Text(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get_unchecked::<String, _>(index).map(DataValue::Text),
    };

    decoded.unwrap_or_else(|e| {
        warn!("无法解码SQLite列 {}（存储类 {}）: {}", index, storage_class, e);
        DataValue::Null
    })
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn placeholder(&self, _index: usize, _column: Option<&Column>) -> String {
        "?".to_string()
    }

    fn physical_type(&self, simplified: SimplifiedType) -> &'static str {
        match simplified {
            SimplifiedType::Int => "INTEGER",
            SimplifiedType::Text => "TEXT",
        }
    }

    fn identity_type(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn identity_is_inline_key(&self) -> bool {
        true
    }

    fn drop_table_sql(&self, quoted_table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", quoted_table)
    }

    fn change_column_type_sql(
        &self,
        _quoted_table: &str,
        _quoted_column: &str,
        _new_type: &str,
    ) -> QuickTableResult<String> {
        Err(quick_table_error!(engine, "SQLite 不支持修改列类型"))
    }

    fn select_expression(&self, column: &Column) -> QuickTableResult<String> {
        quote_identifier(&column.name)
    }

    async fn list_tables(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
    ) -> QuickTableResult<Vec<String>> {
        let pool = self.pool(connection)?;
        let sql = format!(
            "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            quote_identifier(schema)?
        );
        debug!("查询SQLite表目录: {}", sql);

        let tables: Vec<String> = sqlx::query_scalar(&sql).fetch_all(pool).await?;
        Ok(tables)
    }

    async fn table_exists(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<bool> {
        let pool = self.pool(connection)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}.sqlite_master WHERE type = 'table' AND name = ?",
            quote_identifier(schema)?
        );
        let count: i64 = sqlx::query_scalar(&sql).bind(table).fetch_one(pool).await?;
        Ok(count > 0)
    }

    async fn table_columns(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<Vec<Column>> {
        let pool = self.pool(connection)?;
        debug!("查询SQLite列目录: {}.{}", schema, table);

        let rows = sqlx::query(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?, ?) ORDER BY cid",
        )
        .bind(table)
        .bind(schema)
        .fetch_all(pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let full_type: String = row.try_get::<Option<String>, _>("type")?.unwrap_or_default();
            let not_null: i64 = row.try_get("notnull")?;
            let pk_position: i64 = row.try_get("pk")?;
            columns.push(Column {
                name: row.try_get("name")?,
                simplified_type: SimplifiedType::classify(&full_type),
                full_type,
                is_primary_key: pk_position > 0,
                is_identity: false,
                is_nullable: not_null == 0 && pk_position == 0,
                default_value: row
                    .try_get::<Option<String>, _>("dflt_value")?
                    .unwrap_or_default(),
            });
        }

        // 只有唯一的 INTEGER 主键且建表语句带 AUTOINCREMENT 时才算自增列
        let pk_indexes: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.is_primary_key)
            .map(|(index, _)| index)
            .collect();
        if let [pk_index] = pk_indexes.as_slice() {
            let autoincrement = self
                .create_sql(pool, schema, table)
                .await?
                .map(|sql| sql.to_uppercase().contains("AUTOINCREMENT"))
                .unwrap_or(false);
            let column = &mut columns[*pk_index];
            if autoincrement && column.full_type.eq_ignore_ascii_case("INTEGER") {
                column.is_identity = true;
            }
        }

        Ok(columns)
    }

    async fn sync_identity(
        &self,
        connection: &DatabaseConnection,
        _schema: &str,
        table: &str,
        column: &Column,
    ) -> QuickTableResult<()> {
        let pool = self.pool(connection)?;
        debug!("同步SQLite自增计数器: {}.{}", table, column.name);

        // sqlite_sequence 中保存的是已分配的最大值，下一次分配为 seq + 1
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
            .bind(table)
            .execute(pool)
            .await?;
        let sql = format!(
            "INSERT INTO sqlite_sequence(name, seq) SELECT ?, COALESCE(MAX({}), 0) FROM {}",
            quote_identifier(&column.name)?,
            quote_identifier(table)?
        );
        sqlx::query(&sql).bind(table).execute(pool).await?;
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
        debug!("执行SQLite查询: {}", statement.sql);

        let rows = bind_params(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(pool)
            .await?;

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
        let tx = pool.begin().await?;
        debug!("SQLite事务已开始");
        Ok(ActiveTransaction::SQLite(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_inline_primary_key() {
        let adapter = SqliteAdapter;
        assert!(adapter.identity_is_inline_key());
        assert_eq!(adapter.identity_type(), "INTEGER PRIMARY KEY AUTOINCREMENT");
        assert_eq!(adapter.placeholder(4, None), "?");
    }

    #[test]
    fn test_change_column_type_unsupported() {
        let err = SqliteAdapter
            .change_column_type_sql("\"book\"", "\"year\"", "TEXT")
            .unwrap_err();
        assert_eq!(err.kind(), "engine");
    }
}
