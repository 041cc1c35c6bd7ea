//! 模式目录
//!
//! 每次调用都重新读取存储的系统目录，不做缓存

use crate::error::QuickTableResult;
use crate::identifier::validate_identifier;
use crate::quick_table_error;
use crate::session::Session;
use crate::table::{Column, Table};
use crate::types::Row;
use rat_logger::debug;

/// 模式目录
#[derive(Debug, Clone, Copy)]
pub struct SchemaCatalog<'a> {
    session: &'a Session,
}

impl<'a> SchemaCatalog<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 列出工作模式下的基础表，按名称排序
    pub async fn list_tables(&self) -> QuickTableResult<Vec<String>> {
        self.session
            .adapter()
            .list_tables(self.session.connection()?, self.session.schema())
            .await
    }

    pub async fn table_exists(&self, table: &str) -> QuickTableResult<bool> {
        validate_identifier(table)?;
        self.session
            .adapter()
            .table_exists(self.session.connection()?, self.session.schema(), table)
            .await
    }

    /// 读取列定义，按物理顺序
    ///
    /// 表不存在时返回 `TableNotFound`，目录查询失败时返回 `EngineError`
    pub async fn get_columns(&self, table: &str) -> QuickTableResult<Vec<Column>> {
        validate_identifier(table)?;
        let columns = self
            .session
            .adapter()
            .table_columns(self.session.connection()?, self.session.schema(), table)
            .await?;

        if columns.is_empty() && !self.table_exists(table).await? {
            return Err(quick_table_error!(table_not_found, table));
        }

        debug!("表 {} 共有 {} 列", table, columns.len());
        Ok(columns)
    }

    /// 读取完整的表定义
    pub async fn table(&self, table: &str) -> QuickTableResult<Table> {
        let columns = self.get_columns(table).await?;
        Ok(Table::new(table, columns))
    }

    /// 读取整表数据，列按物理顺序
    pub async fn table_data(&self, table: &str) -> QuickTableResult<Vec<Row>> {
        let table = self.table(table).await?;
        self.rows_of(&table).await
    }

    /// 读取已知表定义的全部行
    pub(crate) async fn rows_of(&self, table: &Table) -> QuickTableResult<Vec<Row>> {
        let statement = self.session.query_builder().select_rows(table)?;
        let result = self.session.fetch(&statement).await?;
        Ok(result.rows)
    }
}
