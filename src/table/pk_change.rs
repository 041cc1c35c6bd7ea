//! 主键变更事务
//!
//! 主键不能原地更新（可能被外键引用，或被引擎视为不可变），
//! 因此在同一事务内先插入新行再删除旧行：
//!
//! `Idle → TxBegun → Inserted → Deleted → Committed`
//!
//! 任一步失败立即回滚并进入 `RolledBack`，旧行保持原样。

use crate::adapter::Statement;
use crate::codec::RowCodec;
use crate::error::QuickTableResult;
use crate::quick_table_error;
use crate::session::{ActiveTransaction, Session};
use crate::table::{SequenceSynchronizer, Table};
use crate::types::DataValue;
use rat_logger::{debug, error, info};

/// 主键变更的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkChangeState {
    Idle,
    TxBegun,
    Inserted,
    Deleted,
    Committed,
    RolledBack,
}

/// 一次主键变更
pub struct PrimaryKeyChange<'a> {
    session: &'a Session,
    table: Table,
    original_key: Vec<DataValue>,
    new_row: Vec<DataValue>,
    state: PkChangeState,
}

impl<'a> PrimaryKeyChange<'a> {
    /// 准备主键变更：`original_key` 为编辑前的主键，`current_row` 为编辑后的整行
    pub fn new(
        session: &'a Session,
        table: Table,
        original_key: &[DataValue],
        current_row: &[DataValue],
    ) -> QuickTableResult<Self> {
        table.check_row_arity(current_row)?;
        table.check_key_arity(original_key)?;

        let key_columns = table.primary_key_columns();
        let original_key = key_columns
            .iter()
            .zip(original_key.iter())
            .map(|(column, value)| RowCodec::normalize_input(column, value))
            .collect();
        let new_row = RowCodec::normalize_row(&table.columns, current_row);

        Ok(Self {
            session,
            table,
            original_key,
            new_row,
            state: PkChangeState::Idle,
        })
    }

    pub fn state(&self) -> PkChangeState {
        self.state
    }

    fn advance(&mut self, next: PkChangeState) {
        debug!(
            "表 {} 主键变更: {:?} -> {:?}",
            self.table.name, self.state, next
        );
        self.state = next;
    }

    /// 执行变更，成功后若表有自增列则同步序列
    pub async fn run(&mut self) -> QuickTableResult<()> {
        if self.state != PkChangeState::Idle {
            return Err(quick_table_error!(
                validation,
                "state",
                format!("主键变更已执行过，当前状态: {:?}", self.state)
            ));
        }

        let builder = self.session.query_builder();
        let all_columns: Vec<_> = self.table.columns.iter().collect();
        let insert = builder.insert(&self.table.name, &all_columns, &self.new_row)?;
        let delete = builder.delete_by_key(&self.table, &self.original_key)?;

        // 目录查询需在事务开始前完成：会话只有一条连接
        let mut tx = self.session.begin().await?;
        self.advance(PkChangeState::TxBegun);

        if let Err(e) = self.insert_then_delete(&mut tx, &insert, &delete).await {
            error!(
                "表 {} 主键变更失败（{:?}），正在回滚: {}",
                self.table.name, self.state, e
            );
            if let Err(rollback_err) = tx.rollback().await {
                error!("表 {} 主键变更回滚失败: {}", self.table.name, rollback_err);
            }
            self.advance(PkChangeState::RolledBack);
            return Err(e);
        }

        if let Err(e) = tx.commit().await {
            error!("表 {} 主键变更提交失败: {}", self.table.name, e);
            self.advance(PkChangeState::RolledBack);
            return Err(e);
        }
        self.advance(PkChangeState::Committed);
        info!("表 {} 主键变更已提交", self.table.name);

        if self.table.has_identity() {
            SequenceSynchronizer::new(self.session)
                .sync_table(&self.table)
                .await?;
        }
        Ok(())
    }

    async fn insert_then_delete(
        &mut self,
        tx: &mut ActiveTransaction,
        insert: &Statement,
        delete: &Statement,
    ) -> QuickTableResult<()> {
        tx.execute(insert).await?;
        self.advance(PkChangeState::Inserted);

        let deleted = tx.execute(delete).await?;
        if deleted == 0 {
            return Err(quick_table_error!(
                engine,
                format!("表 {} 中找不到原主键对应的行", self.table.name)
            ));
        }
        self.advance(PkChangeState::Deleted);
        Ok(())
    }
}
