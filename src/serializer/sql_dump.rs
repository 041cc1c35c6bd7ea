//! SQL 转储渲染
//!
//! 输出可在空模式上顺序重放的纯文本脚本

use crate::adapter::SqlQueryBuilder;
use crate::codec::RowCodec;
use crate::error::QuickTableResult;
use crate::identifier::quote_identifier;
use crate::table::Table;
use crate::types::Row;
use chrono::{DateTime, Utc};

/// 脚本头部
pub fn render_header(generated_at: DateTime<Utc>) -> String {
    format!(
        "-- Database Backup\n-- Generated by {} {}\n-- Date: {}\n\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// 单表的删表、建表与插入语句
///
/// 自增列不出现在 INSERT 的列清单中
pub fn render_table(
    builder: &SqlQueryBuilder<'_>,
    table: &Table,
    rows: &[Row],
) -> QuickTableResult<String> {
    let mut out = format!("-- Table: {}\n", table.name);
    out.push_str(&builder.drop_table(&table.name)?);
    out.push_str(";\n");
    out.push_str(&builder.create_table(&table.name, &table.columns)?);
    out.push_str(";\n");

    let quoted_table = quote_identifier(&table.name)?;
    let insert_columns = table
        .columns
        .iter()
        .filter(|col| !col.is_identity)
        .map(|col| quote_identifier(&col.name))
        .collect::<QuickTableResult<Vec<_>>>()?;

    for row in rows {
        table.check_row_arity(row)?;
        if insert_columns.is_empty() {
            out.push_str(&format!("INSERT INTO {} DEFAULT VALUES;\n", quoted_table));
            continue;
        }
        let literals: Vec<String> = table
            .columns
            .iter()
            .zip(row.iter())
            .filter(|(col, _)| !col.is_identity)
            .map(|(_, value)| RowCodec::to_sql_literal(value))
            .collect();
        out.push_str(&format!(
            "INSERT INTO {} ({}) VALUES ({});\n",
            quoted_table,
            insert_columns.join(", "),
            literals.join(", ")
        ));
    }

    out.push('\n');
    Ok(out)
}
