//! 表变更器
//!
//! 执行 DDL（建表、删表、增删改列）与通用 DML（插入、按主键删除、
//! 单元格更新、主键变更）。表结构每次都从目录重新读取。

use crate::adapter::Statement;
use crate::codec::RowCodec;
use crate::error::QuickTableResult;
use crate::quick_table_error;
use crate::session::Session;
use crate::table::{
    Column, PrimaryKeyChange, RowEditTracker, SchemaCatalog, SequenceSynchronizer, Table,
};
use crate::types::DataValue;
use rat_logger::{debug, info};

/// 表变更器
#[derive(Debug, Clone, Copy)]
pub struct TableMutator<'a> {
    session: &'a Session,
    catalog: SchemaCatalog<'a>,
}

impl<'a> TableMutator<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            catalog: SchemaCatalog::new(session),
        }
    }

    async fn execute_ddl(&self, sql: String) -> QuickTableResult<()> {
        self.session.execute(&Statement::new(sql)).await?;
        Ok(())
    }

    /// 建表，列列表不能为空
    pub async fn create_table(&self, table: &str, columns: &[Column]) -> QuickTableResult<()> {
        let sql = self.session.query_builder().create_table(table, columns)?;
        self.execute_ddl(sql).await?;
        info!("成功创建表: {}", table);
        Ok(())
    }

    /// 删除表（表不存在时不报错）
    pub async fn drop_table(&self, table: &str) -> QuickTableResult<()> {
        let sql = self.session.query_builder().drop_table(table)?;
        self.execute_ddl(sql).await?;
        info!("成功删除表: {}", table);
        Ok(())
    }

    pub async fn add_column(&self, table: &str, column: &Column) -> QuickTableResult<()> {
        let sql = self.session.query_builder().add_column(table, column)?;
        self.execute_ddl(sql).await?;
        info!("表 {} 新增列 {}", table, column.name);
        Ok(())
    }

    pub async fn drop_column(&self, table: &str, column_name: &str) -> QuickTableResult<()> {
        let sql = self.session.query_builder().drop_column(table, column_name)?;
        self.execute_ddl(sql).await?;
        info!("表 {} 删除列 {}", table, column_name);
        Ok(())
    }

    pub async fn rename_column(
        &self,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> QuickTableResult<()> {
        let sql = self
            .session
            .query_builder()
            .rename_column(table, old_name, new_name)?;
        self.execute_ddl(sql).await?;
        info!("表 {} 列 {} 重命名为 {}", table, old_name, new_name);
        Ok(())
    }

    pub async fn change_column_type(
        &self,
        table: &str,
        column_name: &str,
        new_type: &str,
    ) -> QuickTableResult<()> {
        let sql = self
            .session
            .query_builder()
            .change_column_type(table, column_name, new_type)?;
        self.execute_ddl(sql).await?;
        info!("表 {} 列 {} 类型修改为 {}", table, column_name, new_type);
        Ok(())
    }

    /// 插入一行，`values` 与表的列一一对应；自增列的值被忽略，由存储生成
    pub async fn insert_row(&self, table: &str, values: &[DataValue]) -> QuickTableResult<u64> {
        let table = self.catalog.table(table).await?;
        table.check_row_arity(values)?;

        let row = RowCodec::normalize_row(&table.columns, values);
        let (columns, values): (Vec<&Column>, Vec<DataValue>) = table
            .columns
            .iter()
            .zip(row)
            .filter(|(column, _)| !column.is_identity)
            .unzip();

        let statement = self
            .session
            .query_builder()
            .insert(&table.name, &columns, &values)?;
        let affected = self.session.execute(&statement).await?;
        debug!("表 {} 插入 {} 行", table.name, affected);
        Ok(affected)
    }

    /// 原样写入一整行（含自增列），用于导入恢复
    pub(crate) async fn restore_row(&self, table: &Table, values: &[DataValue]) -> QuickTableResult<u64> {
        table.check_row_arity(values)?;
        let row = RowCodec::normalize_row(&table.columns, values);
        let columns: Vec<&Column> = table.columns.iter().collect();
        let statement = self
            .session
            .query_builder()
            .insert(&table.name, &columns, &row)?;
        self.session.execute(&statement).await
    }

    /// 按主键删除一行
    pub async fn delete_row(&self, table: &str, primary_key: &[DataValue]) -> QuickTableResult<u64> {
        let table = self.catalog.table(table).await?;
        let key = Self::normalize_key(&table, primary_key)?;

        let statement = self.session.query_builder().delete_by_key(&table, &key)?;
        let affected = self.session.execute(&statement).await?;
        debug!("表 {} 删除 {} 行", table.name, affected);
        Ok(affected)
    }

    /// 按主键更新单个单元格
    pub async fn update_cell(
        &self,
        table: &str,
        column_name: &str,
        value: &DataValue,
        primary_key: &[DataValue],
    ) -> QuickTableResult<u64> {
        let table = self.catalog.table(table).await?;
        self.update_cell_in(&table, column_name, value, primary_key)
            .await
    }

    async fn update_cell_in(
        &self,
        table: &Table,
        column_name: &str,
        value: &DataValue,
        primary_key: &[DataValue],
    ) -> QuickTableResult<u64> {
        let column = table.column(column_name).ok_or_else(|| {
            quick_table_error!(
                validation,
                "column",
                format!("表 {} 中没有列 {}", table.name, column_name)
            )
        })?;
        let key = Self::normalize_key(table, primary_key)?;
        let value = RowCodec::normalize_input(column, value);

        let statement = self
            .session
            .query_builder()
            .update_cell(table, column, &value, &key)?;
        let affected = self.session.execute(&statement).await?;
        debug!("表 {} 更新列 {}，影响 {} 行", table.name, column_name, affected);
        Ok(affected)
    }

    /// 同步表中每个自增列的计数器
    pub async fn sync_sequence_for(&self, table: &str) -> QuickTableResult<usize> {
        SequenceSynchronizer::new(self.session)
            .sync_sequence_for(table)
            .await
    }

    /// 以事务方式把 `original_key` 对应的行替换为 `current_row`
    pub async fn change_primary_key(
        &self,
        table: &str,
        original_key: &[DataValue],
        current_row: &[DataValue],
    ) -> QuickTableResult<()> {
        let table = self.catalog.table(table).await?;
        PrimaryKeyChange::new(self.session, table, original_key, current_row)?
            .run()
            .await
    }

    /// 应用一次单元格编辑
    ///
    /// 自增列不可编辑；普通列按行的原主键更新；主键列走主键变更事务，
    /// 成功后消费跟踪器中的原主键
    pub async fn apply_cell_edit(
        &self,
        table: &str,
        tracker: &mut RowEditTracker,
        row_index: usize,
        current_row: &[DataValue],
        column_index: usize,
    ) -> QuickTableResult<()> {
        let table = self.catalog.table(table).await?;
        table.check_row_arity(current_row)?;

        let column = table.columns.get(column_index).ok_or_else(|| {
            quick_table_error!(
                validation,
                "column",
                format!("表 {} 没有第 {} 列", table.name, column_index)
            )
        })?;
        if column.is_identity {
            return Err(quick_table_error!(
                validation,
                "column",
                format!("自增列 {} 由数据库生成，不能编辑", column.name)
            ));
        }

        if column.is_primary_key {
            let original_key = tracker.original_key(row_index).ok_or_else(|| {
                quick_table_error!(
                    validation,
                    "primary_key",
                    format!("第 {} 行没有记录编辑前的主键", row_index)
                )
            })?;
            PrimaryKeyChange::new(self.session, table.clone(), original_key, current_row)?
                .run()
                .await?;
            tracker.take_original_key(row_index);
            return Ok(());
        }

        let key = match tracker.original_key(row_index) {
            Some(key) => key.to_vec(),
            None => table.primary_key_of(current_row)?,
        };
        let column_name = column.name.clone();
        self.update_cell_in(&table, &column_name, &current_row[column_index], &key)
            .await?;
        Ok(())
    }

    fn normalize_key(table: &Table, key: &[DataValue]) -> QuickTableResult<Vec<DataValue>> {
        table.check_key_arity(key)?;
        Ok(table
            .primary_key_columns()
            .iter()
            .zip(key.iter())
            .map(|(column, value)| RowCodec::normalize_input(column, value))
            .collect())
    }
}
