//! 表管理模块
//!
//! 提供表结构发现、通用行读写、主键变更事务和自增序列同步功能

mod catalog;
mod edit;
mod mutator;
mod pk_change;
mod schema;
mod sequence;

pub use catalog::SchemaCatalog;
pub use edit::RowEditTracker;
pub use mutator::TableMutator;
pub use pk_change::{PkChangeState, PrimaryKeyChange};
pub use schema::{Column, Table};
pub use sequence::SequenceSynchronizer;
