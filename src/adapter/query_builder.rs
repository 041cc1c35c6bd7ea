//! SQL语句构建器模块
//!
//! 根据适配器的方言生成 DDL 与 DML。标识符一律引用，
//! 类型名先校验再拼接，数据值始终作为绑定参数传递。

use super::{DatabaseAdapter, Statement};
use crate::error::QuickTableResult;
use crate::identifier::{quote_identifier, validate_type_name};
use crate::quick_table_error;
use crate::table::{Column, Table};
use crate::types::DataValue;

/// SQL语句构建器
pub struct SqlQueryBuilder<'a> {
    adapter: &'a dyn DatabaseAdapter,
}

impl<'a> SqlQueryBuilder<'a> {
    /// 创建绑定到指定方言的构建器
    pub fn new(adapter: &'a dyn DatabaseAdapter) -> Self {
        Self { adapter }
    }

    /// 列的类型声明
    fn column_type(&self, column: &Column) -> QuickTableResult<String> {
        if column.is_identity {
            return Ok(self.adapter.identity_type().to_string());
        }
        let full_type = column.full_type.trim();
        if full_type.is_empty() {
            return Ok(self.adapter.physical_type(column.simplified_type).to_string());
        }
        validate_type_name(full_type)?;
        Ok(full_type.to_string())
    }

    /// 单列定义，如 `"title" TEXT NOT NULL`
    pub fn column_definition(&self, column: &Column) -> QuickTableResult<String> {
        let mut definition = format!(
            "{} {}",
            quote_identifier(&column.name)?,
            self.column_type(column)?
        );
        if !column.is_nullable && !column.is_primary_key && !column.is_identity {
            definition.push_str(" NOT NULL");
        }
        Ok(definition)
    }

    /// 建表语句
    pub fn create_table(&self, table: &str, columns: &[Column]) -> QuickTableResult<String> {
        if columns.is_empty() {
            return Err(quick_table_error!(
                validation,
                "columns",
                format!("表 {} 的列列表不能为空", table)
            ));
        }

        let inline_identity = self.adapter.identity_is_inline_key();
        if inline_identity && columns.iter().any(|col| col.is_identity) {
            let identity_count = columns.iter().filter(|col| col.is_identity).count();
            let pk_count = columns.iter().filter(|col| col.is_primary_key).count();
            let sole_key = columns
                .iter()
                .all(|col| col.is_identity == col.is_primary_key);
            if identity_count != 1 || pk_count != 1 || !sole_key {
                return Err(quick_table_error!(
                    validation,
                    "columns",
                    format!(
                        "表 {} 的自增列必须是唯一的主键列（{} 不支持组合自增主键）",
                        table,
                        self.adapter.database_type().as_str()
                    )
                ));
            }
        }

        let mut parts = Vec::with_capacity(columns.len() + 1);
        for column in columns {
            parts.push(self.column_definition(column)?);
        }

        let key_columns = columns
            .iter()
            .filter(|col| col.is_primary_key && !(inline_identity && col.is_identity))
            .map(|col| quote_identifier(&col.name))
            .collect::<QuickTableResult<Vec<_>>>()?;
        if !key_columns.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", key_columns.join(", ")));
        }

        Ok(format!(
            "CREATE TABLE {} ({})",
            quote_identifier(table)?,
            parts.join(", ")
        ))
    }

    pub fn drop_table(&self, table: &str) -> QuickTableResult<String> {
        Ok(self.adapter.drop_table_sql(&quote_identifier(table)?))
    }

    pub fn add_column(&self, table: &str, column: &Column) -> QuickTableResult<String> {
        Ok(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_identifier(table)?,
            self.column_definition(column)?
        ))
    }

    pub fn drop_column(&self, table: &str, column_name: &str) -> QuickTableResult<String> {
        Ok(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_identifier(table)?,
            quote_identifier(column_name)?
        ))
    }

    pub fn rename_column(
        &self,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> QuickTableResult<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_identifier(table)?,
            quote_identifier(old_name)?,
            quote_identifier(new_name)?
        ))
    }

    pub fn change_column_type(
        &self,
        table: &str,
        column_name: &str,
        new_type: &str,
    ) -> QuickTableResult<String> {
        self.adapter.change_column_type_sql(
            &quote_identifier(table)?,
            &quote_identifier(column_name)?,
            new_type,
        )
    }

    /// 插入语句，`columns` 与 `values` 按位置对应
    ///
    /// NULL 直接写成字面量，其余值绑定为参数；没有列时插入默认行
    pub fn insert(
        &self,
        table: &str,
        columns: &[&Column],
        values: &[DataValue],
    ) -> QuickTableResult<Statement> {
        if columns.is_empty() {
            return self.insert_default(table);
        }
        if columns.len() != values.len() {
            return Err(quick_table_error!(
                validation,
                "values",
                format!("插入 {} 列，但提供了 {} 个值", columns.len(), values.len())
            ));
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut slots = Vec::with_capacity(columns.len());
        let mut params = Vec::new();
        let mut explicit_identity = false;
        for (column, value) in columns.iter().zip(values.iter()) {
            names.push(quote_identifier(&column.name)?);
            if value.is_null() {
                slots.push("NULL".to_string());
            } else {
                explicit_identity |= column.is_identity;
                params.push(value.clone());
                slots.push(self.adapter.placeholder(params.len(), Some(column)));
            }
        }

        let overriding = match self.adapter.identity_override() {
            Some(clause) if explicit_identity => format!(" {}", clause),
            _ => String::new(),
        };
        Ok(Statement::with_params(
            format!(
                "INSERT INTO {} ({}){} VALUES ({})",
                quote_identifier(table)?,
                names.join(", "),
                overriding,
                slots.join(", ")
            ),
            params,
        ))
    }

    /// 插入一条全默认值的行
    pub fn insert_default(&self, table: &str) -> QuickTableResult<Statement> {
        Ok(Statement::new(format!(
            "INSERT INTO {} DEFAULT VALUES",
            quote_identifier(table)?
        )))
    }

    /// 主键条件，参数追加到 `params` 末尾并按其位置编号
    fn key_predicate(
        &self,
        key_columns: &[&Column],
        key: &[DataValue],
        params: &mut Vec<DataValue>,
    ) -> QuickTableResult<String> {
        let mut predicates = Vec::with_capacity(key_columns.len());
        for (column, value) in key_columns.iter().zip(key.iter()) {
            let quoted = quote_identifier(&column.name)?;
            if value.is_null() {
                predicates.push(format!("{} IS NULL", quoted));
            } else {
                params.push(value.clone());
                predicates.push(format!(
                    "{} = {}",
                    quoted,
                    self.adapter.placeholder(params.len(), Some(column))
                ));
            }
        }
        Ok(predicates.join(" AND "))
    }

    /// 按主键删除
    pub fn delete_by_key(&self, table: &Table, key: &[DataValue]) -> QuickTableResult<Statement> {
        table.check_key_arity(key)?;
        let key_columns = table.primary_key_columns();

        let mut params = Vec::new();
        let predicate = self.key_predicate(&key_columns, key, &mut params)?;
        Ok(Statement::with_params(
            format!(
                "DELETE FROM {} WHERE {}",
                quote_identifier(&table.name)?,
                predicate
            ),
            params,
        ))
    }

    /// 按主键更新单个单元格
    pub fn update_cell(
        &self,
        table: &Table,
        column: &Column,
        value: &DataValue,
        key: &[DataValue],
    ) -> QuickTableResult<Statement> {
        table.check_key_arity(key)?;
        let key_columns = table.primary_key_columns();

        let mut params = Vec::new();
        let assignment = if value.is_null() {
            "NULL".to_string()
        } else {
            params.push(value.clone());
            self.adapter.placeholder(1, Some(column))
        };
        let predicate = self.key_predicate(&key_columns, key, &mut params)?;

        Ok(Statement::with_params(
            format!(
                "UPDATE {} SET {} = {} WHERE {}",
                quote_identifier(&table.name)?,
                quote_identifier(&column.name)?,
                assignment,
                predicate
            ),
            params,
        ))
    }

    /// 读取整表，列按物理顺序
    pub fn select_rows(&self, table: &Table) -> QuickTableResult<Statement> {
        let projections = table
            .columns
            .iter()
            .map(|col| {
                Ok(format!(
                    "{} AS {}",
                    self.adapter.select_expression(col)?,
                    quote_identifier(&col.name)?
                ))
            })
            .collect::<QuickTableResult<Vec<_>>>()?;

        Ok(Statement::new(format!(
            "SELECT {} FROM {}",
            projections.join(", "),
            quote_identifier(&table.name)?
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{PostgresAdapter, SqliteAdapter};
    use crate::error::QuickTableError;

    fn book_table() -> Table {
        Table::new(
            "book",
            vec![
                Column::int("id").primary_key(),
                Column::text("isbn").primary_key(),
                Column::text("title"),
            ],
        )
    }

    #[test]
    fn test_create_table_with_composite_key() {
        let adapter = PostgresAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let sql = builder
            .create_table(
                "book",
                &[
                    Column::identity("id").primary_key(),
                    Column::text("isbn").primary_key(),
                    Column::text("title"),
                ],
            )
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"book\" (\"id\" BIGSERIAL, \"isbn\" TEXT, \"title\" TEXT, PRIMARY KEY (\"id\", \"isbn\"))"
        );
    }

    #[test]
    fn test_create_table_sqlite_inline_identity() {
        let adapter = SqliteAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let sql = builder
            .create_table(
                "author",
                &[Column::identity("id").primary_key(), Column::text("name")],
            )
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"author\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"name\" TEXT)"
        );

        let err = builder
            .create_table(
                "book",
                &[
                    Column::identity("id").primary_key(),
                    Column::text("isbn").primary_key(),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, QuickTableError::ValidationError { .. }));
    }

    #[test]
    fn test_create_table_rejects_empty_and_bad_types() {
        let adapter = SqliteAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        assert!(matches!(
            builder.create_table("empty", &[]).unwrap_err(),
            QuickTableError::ValidationError { .. }
        ));
        let bad = Column::text("x").with_full_type("text); DROP TABLE book; --");
        assert!(builder.create_table("t", &[bad]).is_err());
    }

    #[test]
    fn test_not_null_and_full_type() {
        let adapter = PostgresAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let mut col = Column::text("code").with_full_type("character varying(20)");
        col.is_nullable = false;
        assert_eq!(
            builder.column_definition(&col).unwrap(),
            "\"code\" character varying(20) NOT NULL"
        );
    }

    #[test]
    fn test_insert_binds_values_and_inlines_null() {
        let adapter = PostgresAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let title = Column::text("title");
        let year = Column::int("year").with_full_type("bigint");
        let note = Column::text("note");
        let stmt = builder
            .insert(
                "book",
                &[&title, &year, &note],
                &[DataValue::from("Dune"), DataValue::Null, DataValue::Int(1965)],
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"book\" (\"title\", \"year\", \"note\") VALUES ($1, NULL, $2)"
        );
        assert_eq!(stmt.params, vec![DataValue::from("Dune"), DataValue::Int(1965)]);
    }

    #[test]
    fn test_insert_explicit_identity_overrides_generation() {
        let id = Column::identity("id").primary_key();
        let code = Column::text("code").primary_key();
        let values = [DataValue::Int(7), DataValue::from("a")];

        let adapter = PostgresAdapter;
        let stmt = SqlQueryBuilder::new(&adapter)
            .insert("ticket", &[&id, &code], &values)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"ticket\" (\"id\", \"code\") OVERRIDING SYSTEM VALUE VALUES ($1, $2)"
        );

        let stmt = SqlQueryBuilder::new(&adapter)
            .insert("ticket", &[&code], &values[1..])
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"ticket\" (\"code\") VALUES ($1)");

        let adapter = SqliteAdapter;
        let stmt = SqlQueryBuilder::new(&adapter)
            .insert("ticket", &[&id, &code], &values)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"ticket\" (\"id\", \"code\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_insert_without_columns_uses_defaults() {
        let adapter = SqliteAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let stmt = builder.insert("counter", &[], &[]).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO \"counter\" DEFAULT VALUES");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_update_cell_numbers_key_params_after_value() {
        let adapter = PostgresAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let table = book_table();
        let stmt = builder
            .update_cell(
                &table,
                &table.columns[2],
                &DataValue::from("Dune"),
                &[DataValue::Int(1), DataValue::from("978")],
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"book\" SET \"title\" = $1 WHERE \"id\" = $2 AND \"isbn\" = $3"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_delete_by_key_null_component() {
        let adapter = SqliteAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let table = book_table();
        let stmt = builder
            .delete_by_key(&table, &[DataValue::Int(1), DataValue::Null])
            .unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM \"book\" WHERE \"id\" = ? AND \"isbn\" IS NULL"
        );
        assert_eq!(stmt.params, vec![DataValue::Int(1)]);

        assert!(builder.delete_by_key(&table, &[DataValue::Int(1)]).is_err());
    }

    #[test]
    fn test_select_rows_projection() {
        let adapter = PostgresAdapter;
        let builder = SqlQueryBuilder::new(&adapter);
        let table = Table::new(
            "book",
            vec![
                Column::int("id").with_full_type("integer"),
                Column::text("title").with_full_type("text"),
            ],
        );
        assert_eq!(
            builder.select_rows(&table).unwrap().sql,
            "SELECT CAST(\"id\" AS bigint) AS \"id\", CAST(\"title\" AS text) AS \"title\" FROM \"book\""
        );
    }
}
