//! 数据库适配器模块
//!
//! 提供统一的存储访问接口，屏蔽不同数据库在目录查询、
//! 占位符、自增列与类型映射上的差异

use crate::error::QuickTableResult;
use crate::session::{ActiveTransaction, DatabaseConnection};
use crate::table::Column;
use crate::types::*;
use async_trait::async_trait;

mod postgres;
mod query_builder;
mod sqlite;

pub use postgres::PostgresAdapter;
pub use query_builder::SqlQueryBuilder;
pub use sqlite::SqliteAdapter;

pub(crate) use postgres::execute_on as pg_execute_on;
pub(crate) use sqlite::execute_on as sqlite_execute_on;

/// 待执行的语句：SQL 文本加按序绑定的参数
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DataValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<DataValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// 查询结果集
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// 列名
    pub headers: Vec<String>,
    /// 行数据
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 数据库适配器trait，定义统一的存储操作接口
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// 适配器对应的数据库类型
    fn database_type(&self) -> DatabaseType;

    /// 第 `index` 个参数的占位符（从 1 开始），`column` 为参数对应的列
    fn placeholder(&self, index: usize, column: Option<&Column>) -> String;

    /// 简化类型对应的物理类型
    fn physical_type(&self, simplified: SimplifiedType) -> &'static str;

    /// 自增列的列类型声明
    fn identity_type(&self) -> &'static str;

    /// 自增列声明是否自带 PRIMARY KEY（此时不进入表级主键子句）
    fn identity_is_inline_key(&self) -> bool;

    /// 显式写入自增列时插在 VALUES 之前的子句
    fn identity_override(&self) -> Option<&'static str> {
        None
    }

    /// 删除表语句（幂等）
    fn drop_table_sql(&self, quoted_table: &str) -> String;

    /// 修改列类型语句
    fn change_column_type_sql(
        &self,
        quoted_table: &str,
        quoted_column: &str,
        new_type: &str,
    ) -> QuickTableResult<String>;

    /// 读取整表时某列的投影表达式
    fn select_expression(&self, column: &Column) -> QuickTableResult<String>;

    /// 列出工作模式下的基础表（按名称排序）
    async fn list_tables(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
    ) -> QuickTableResult<Vec<String>>;

    /// 检查表是否存在
    async fn table_exists(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<bool>;

    /// 读取表的列定义（按物理顺序）
    async fn table_columns(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
    ) -> QuickTableResult<Vec<Column>>;

    /// 把自增列的计数器同步为 max + 1
    async fn sync_identity(
        &self,
        connection: &DatabaseConnection,
        schema: &str,
        table: &str,
        column: &Column,
    ) -> QuickTableResult<()>;

    /// 执行语句，返回影响行数
    async fn execute(
        &self,
        connection: &DatabaseConnection,
        statement: &Statement,
    ) -> QuickTableResult<u64>;

    /// 执行查询
    async fn fetch(
        &self,
        connection: &DatabaseConnection,
        statement: &Statement,
    ) -> QuickTableResult<ResultSet>;

    /// 开启事务
    async fn begin(&self, connection: &DatabaseConnection) -> QuickTableResult<ActiveTransaction>;
}

/// 适配器工厂，根据数据库类型创建对应的适配器
pub fn create_adapter(db_type: &DatabaseType) -> Box<dyn DatabaseAdapter> {
    match db_type {
        DatabaseType::SQLite => Box::new(SqliteAdapter),
        DatabaseType::PostgreSQL => Box::new(PostgresAdapter),
    }
}
