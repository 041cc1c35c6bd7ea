//! rat_quicktable - 运行时模式驱动的数据访问层
//!
//! 在运行时发现表结构（列、类型、主键、自增列），对任意表执行通用的
//! 增删改操作，并把单表或整库导出为 JSON、CSV 和 SQL 转储以便备份恢复。
//! 支持 PostgreSQL 和 SQLite。
//!
//! 库本身不初始化日志系统，由宿主程序负责。

pub mod adapter;
pub mod codec;
pub mod error;
pub mod identifier;
pub mod query_store;
pub mod serializer;
pub mod session;
pub mod table;
pub mod types;

// 重新导出常用类型和函数
pub use adapter::{create_adapter, DatabaseAdapter, ResultSet, SqlQueryBuilder, Statement};
pub use codec::RowCodec;
pub use error::{ErrorBuilder, QuickTableError, QuickTableResult};
pub use query_store::{QueryStore, SavedQuery};
pub use serializer::{
    parse_database_document, ColumnDocument, Serializer, SerializerConfig, TableDocument,
};
pub use session::Session;
pub use table::{
    Column, PkChangeState, PrimaryKeyChange, RowEditTracker, SchemaCatalog, SequenceSynchronizer,
    Table, TableMutator,
};
pub use types::*;

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
