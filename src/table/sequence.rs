//! 自增序列同步
//!
//! 批量导入会显式写入自增列，导入后把计数器推进到 max + 1

use crate::error::QuickTableResult;
use crate::session::Session;
use crate::table::{SchemaCatalog, Table};
use rat_logger::info;

/// 序列同步器
#[derive(Debug, Clone, Copy)]
pub struct SequenceSynchronizer<'a> {
    session: &'a Session,
}

impl<'a> SequenceSynchronizer<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// 按表名同步，返回同步的自增列数量
    pub async fn sync_sequence_for(&self, table: &str) -> QuickTableResult<usize> {
        let table = SchemaCatalog::new(self.session).table(table).await?;
        self.sync_table(&table).await
    }

    /// 同步已知表定义中的每个自增列
    pub async fn sync_table(&self, table: &Table) -> QuickTableResult<usize> {
        let identity_columns = table.identity_columns();
        for column in &identity_columns {
            self.session
                .adapter()
                .sync_identity(
                    self.session.connection()?,
                    self.session.schema(),
                    &table.name,
                    column,
                )
                .await?;
            info!("已同步表 {} 的自增列 {}", table.name, column.name);
        }
        Ok(identity_columns.len())
    }
}
