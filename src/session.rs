//! 会话模块
//!
//! 会话持有唯一的一条数据库连接，显式打开、显式关闭。
//! 所有组件都借用同一个会话，不存在全局单例。

use crate::adapter::{
    create_adapter, pg_execute_on, sqlite_execute_on, DatabaseAdapter, ResultSet, SqlQueryBuilder,
    Statement,
};
use crate::error::{QuickTableError, QuickTableResult};
use crate::identifier::quote_identifier;
use crate::quick_table_error;
use crate::types::{ConnectionConfig, DatabaseType, SessionConfig};
use rat_logger::{debug, info};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 数据库连接
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    PostgreSQL(sqlx::PgPool),
    SQLite(sqlx::SqlitePool),
}

impl DatabaseConnection {
    async fn close(&self) {
        match self {
            DatabaseConnection::PostgreSQL(pool) => pool.close().await,
            DatabaseConnection::SQLite(pool) => pool.close().await,
        }
    }
}

/// 进行中的事务
///
/// 未提交就被丢弃时由驱动自动回滚
pub enum ActiveTransaction {
    PostgreSQL(sqlx::Transaction<'static, sqlx::Postgres>),
    SQLite(sqlx::Transaction<'static, sqlx::Sqlite>),
}

impl ActiveTransaction {
    /// 在事务内执行语句
    pub async fn execute(&mut self, statement: &Statement) -> QuickTableResult<u64> {
        match self {
            ActiveTransaction::PostgreSQL(tx) => pg_execute_on(&mut **tx, statement).await,
            ActiveTransaction::SQLite(tx) => sqlite_execute_on(&mut **tx, statement).await,
        }
    }

    pub async fn commit(self) -> QuickTableResult<()> {
        match self {
            ActiveTransaction::PostgreSQL(tx) => tx.commit().await?,
            ActiveTransaction::SQLite(tx) => tx.commit().await?,
        }
        Ok(())
    }

    pub async fn rollback(self) -> QuickTableResult<()> {
        match self {
            ActiveTransaction::PostgreSQL(tx) => tx.rollback().await?,
            ActiveTransaction::SQLite(tx) => tx.rollback().await?,
        }
        Ok(())
    }
}

/// 数据库会话
pub struct Session {
    config: SessionConfig,
    schema: String,
    connection: DatabaseConnection,
    adapter: Box<dyn DatabaseAdapter>,
    open: AtomicBool,
}

impl Session {
    /// 按配置打开会话
    pub async fn open(config: SessionConfig) -> QuickTableResult<Self> {
        config.validate()?;
        let schema = config.working_schema().to_string();
        info!(
            "打开{}会话，工作模式: {}",
            config.db_type.as_str(),
            schema
        );

        let connection = match &config.connection {
            ConnectionConfig::SQLite {
                path,
                create_if_missing,
            } => Self::connect_sqlite(path, *create_if_missing, &config).await?,
            ConnectionConfig::PostgreSQL {
                host,
                port,
                database,
                username,
                password,
                ssl_mode,
            } => {
                let mut options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .database(database)
                    .username(username)
                    .password(password);
                if let Some(mode) = ssl_mode {
                    let mode = PgSslMode::from_str(mode).map_err(|e| {
                        quick_table_error!(config, format!("无效的SSL模式 {}: {}", mode, e))
                    })?;
                    options = options.ssl_mode(mode);
                }

                let search_path = format!("SET search_path TO {}", quote_identifier(&schema)?);
                let pool = PgPoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
                    .after_connect(move |conn, _meta| {
                        let search_path = search_path.clone();
                        Box::pin(async move {
                            sqlx::query(&search_path).execute(&mut *conn).await?;
                            Ok(())
                        })
                    })
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        quick_table_error!(connection, format!("PostgreSQL连接失败: {}", e))
                    })?;
                DatabaseConnection::PostgreSQL(pool)
            }
        };

        info!("{}会话已打开", config.db_type.as_str());
        Ok(Self {
            adapter: create_adapter(&config.db_type),
            config,
            schema,
            connection,
            open: AtomicBool::new(true),
        })
    }

    async fn connect_sqlite(
        path: &str,
        create_if_missing: bool,
        config: &SessionConfig,
    ) -> QuickTableResult<DatabaseConnection> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                quick_table_error!(connection, format!("SQLite连接参数无效: {}", e))
            })?
        } else {
            let file_exists = Path::new(path).exists();
            if !file_exists && !create_if_missing {
                return Err(quick_table_error!(
                    connection,
                    format!("SQLite数据库文件不存在且未启用自动创建: {}", path)
                ));
            }
            if !file_exists {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await.map_err(|e| {
                            quick_table_error!(
                                connection,
                                format!("创建SQLite数据库目录失败: {}", e)
                            )
                        })?;
                    }
                }
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(create_if_missing)
        };

        // 内存数据库随最后一条连接消失，连接必须常驻
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| quick_table_error!(connection, format!("SQLite连接失败: {}", e)))?;
        Ok(DatabaseConnection::SQLite(pool))
    }

    /// 关闭会话，之后的所有操作返回 `SessionClosed`
    pub async fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.connection.close().await;
            info!("{}会话已关闭", self.config.db_type.as_str());
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn database_type(&self) -> DatabaseType {
        self.config.db_type
    }

    /// 工作模式名
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn adapter(&self) -> &dyn DatabaseAdapter {
        self.adapter.as_ref()
    }

    /// 当前方言的语句构建器
    pub fn query_builder(&self) -> SqlQueryBuilder<'_> {
        SqlQueryBuilder::new(self.adapter.as_ref())
    }

    pub(crate) fn connection(&self) -> QuickTableResult<&DatabaseConnection> {
        if !self.is_open() {
            return Err(QuickTableError::SessionClosed);
        }
        Ok(&self.connection)
    }

    pub(crate) async fn execute(&self, statement: &Statement) -> QuickTableResult<u64> {
        self.adapter.execute(self.connection()?, statement).await
    }

    pub(crate) async fn fetch(&self, statement: &Statement) -> QuickTableResult<ResultSet> {
        self.adapter.fetch(self.connection()?, statement).await
    }

    pub(crate) async fn begin(&self) -> QuickTableResult<ActiveTransaction> {
        self.adapter.begin(self.connection()?).await
    }

    /// 执行任意查询语句
    pub async fn execute_query(&self, sql: &str) -> QuickTableResult<ResultSet> {
        debug!("执行自定义查询: {}", sql);
        self.fetch(&Statement::new(sql)).await
    }

    /// 执行任意非查询语句，返回影响行数
    pub async fn execute_non_query(&self, sql: &str) -> QuickTableResult<u64> {
        debug!("执行自定义语句: {}", sql);
        self.execute(&Statement::new(sql)).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("db_type", &self.config.db_type)
            .field("schema", &self.schema)
            .field("open", &self.is_open())
            .finish()
    }
}
