//! 数据库类型定义和配置
//!
//! 定义支持的数据库类型、会话配置和通用标量值类型

use crate::error::QuickTableResult;
use crate::quick_table_error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 支持的数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    /// SQLite 数据库
    SQLite,
    /// PostgreSQL 数据库
    PostgreSQL,
}

impl DatabaseType {
    /// 获取数据库类型的字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::SQLite => "sqlite",
            DatabaseType::PostgreSQL => "postgresql",
        }
    }

    /// 从字符串解析数据库类型
    pub fn from_str(s: &str) -> QuickTableResult<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseType::SQLite),
            "postgresql" | "postgres" | "pg" => Ok(DatabaseType::PostgreSQL),
            _ => Err(quick_table_error!(config, format!("不支持的数据库类型: {}", s))),
        }
    }

    /// 未指定时使用的工作模式名
    pub fn default_schema(&self) -> &'static str {
        match self {
            DatabaseType::SQLite => "main",
            DatabaseType::PostgreSQL => "public",
        }
    }
}

/// 连接配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectionConfig {
    /// SQLite 文件路径（":memory:" 表示内存数据库）
    SQLite {
        /// 数据库文件路径
        path: String,
        /// 是否创建数据库文件（如果不存在）
        create_if_missing: bool,
    },
    /// PostgreSQL 连接配置
    PostgreSQL {
        /// 主机地址
        host: String,
        /// 端口号
        port: u16,
        /// 数据库名
        database: String,
        /// 用户名
        username: String,
        /// 密码
        password: String,
        /// SSL 模式
        ssl_mode: Option<String>,
    },
}

impl ConnectionConfig {
    fn database_type(&self) -> DatabaseType {
        match self {
            ConnectionConfig::SQLite { .. } => DatabaseType::SQLite,
            ConnectionConfig::PostgreSQL { .. } => DatabaseType::PostgreSQL,
        }
    }
}

fn default_connect_timeout() -> u64 {
    30
}

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 数据库类型
    pub db_type: DatabaseType,
    /// 连接配置
    pub connection: ConnectionConfig,
    /// 工作模式（PostgreSQL 的 search_path，SQLite 固定为 main）
    #[serde(default)]
    pub schema: Option<String>,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl SessionConfig {
    /// 创建配置构建器
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// 实际生效的工作模式名
    pub fn working_schema(&self) -> &str {
        match (&self.db_type, &self.schema) {
            (DatabaseType::PostgreSQL, Some(schema)) => schema.as_str(),
            (db_type, _) => db_type.default_schema(),
        }
    }

    /// 检查配置一致性
    pub fn validate(&self) -> QuickTableResult<()> {
        if self.connection.database_type() != self.db_type {
            return Err(quick_table_error!(
                config,
                format!(
                    "数据库类型 {} 与连接配置 {} 不匹配",
                    self.db_type.as_str(),
                    self.connection.database_type().as_str()
                )
            ));
        }

        match &self.connection {
            ConnectionConfig::SQLite { path, .. } => {
                if path.trim().is_empty() {
                    return Err(quick_table_error!(config, "SQLite 路径不能为空"));
                }
            }
            ConnectionConfig::PostgreSQL {
                host, port, database, ..
            } => {
                if host.trim().is_empty() {
                    return Err(quick_table_error!(config, "PostgreSQL 主机地址不能为空"));
                }
                if *port == 0 {
                    return Err(quick_table_error!(config, "PostgreSQL 端口不能为 0"));
                }
                if database.trim().is_empty() {
                    return Err(quick_table_error!(config, "PostgreSQL 数据库名不能为空"));
                }
            }
        }

        if let Some(schema) = &self.schema {
            crate::identifier::validate_identifier(schema)?;
        }

        Ok(())
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> QuickTableResult<Self> {
        let config: SessionConfig = toml::from_str(content)
            .map_err(|e| quick_table_error!(config, format!("解析TOML配置失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: impl AsRef<Path>) -> QuickTableResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

/// 会话配置构建器
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    db_type: Option<DatabaseType>,
    connection: Option<ConnectionConfig>,
    schema: Option<String>,
    connect_timeout_secs: Option<u64>,
}

impl SessionConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置数据库类型
    pub fn db_type(mut self, db_type: DatabaseType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    /// 设置连接配置
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    /// 设置工作模式
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// 设置连接超时时间（秒）
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// 构建配置
    pub fn build(self) -> QuickTableResult<SessionConfig> {
        let connection = self
            .connection
            .ok_or_else(|| quick_table_error!(config, "连接配置必须设置"))?;
        let db_type = self.db_type.unwrap_or_else(|| connection.database_type());

        let config = SessionConfig {
            db_type,
            connection,
            schema: self.schema,
            connect_timeout_secs: self
                .connect_timeout_secs
                .unwrap_or_else(default_connect_timeout),
        };
        config.validate()?;
        Ok(config)
    }
}

/// 便捷函数：SQLite 文件配置
pub fn sqlite_config(path: impl Into<String>) -> QuickTableResult<SessionConfig> {
    SessionConfig::builder()
        .connection(ConnectionConfig::SQLite {
            path: path.into(),
            create_if_missing: true,
        })
        .build()
}

/// 便捷函数：SQLite 内存数据库配置
pub fn sqlite_memory_config() -> SessionConfig {
    SessionConfig {
        db_type: DatabaseType::SQLite,
        connection: ConnectionConfig::SQLite {
            path: ":memory:".to_string(),
            create_if_missing: true,
        },
        schema: None,
        connect_timeout_secs: default_connect_timeout(),
    }
}

/// 便捷函数：PostgreSQL 配置
pub fn postgres_config(
    host: impl Into<String>,
    port: u16,
    database: impl Into<String>,
    username: impl Into<String>,
    password: impl Into<String>,
) -> QuickTableResult<SessionConfig> {
    SessionConfig::builder()
        .connection(ConnectionConfig::PostgreSQL {
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            ssl_mode: None,
        })
        .build()
}

/// 简化列类型，只用于回退逻辑，精确类型见 `Column::full_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimplifiedType {
    #[serde(rename = "int", alias = "INT", alias = "Int")]
    Int,
    #[serde(rename = "text", alias = "TEXT", alias = "Text")]
    Text,
}

impl SimplifiedType {
    /// 物理类型名包含 "int"（不区分大小写）即视为整数
    pub fn classify(physical_type: &str) -> Self {
        if physical_type.to_lowercase().contains("int") {
            SimplifiedType::Int
        } else {
            SimplifiedType::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimplifiedType::Int => "int",
            SimplifiedType::Text => "text",
        }
    }
}

/// 通用标量值类型 - 类型擦除后的单元格值
///
/// 以 untagged 方式序列化，JSON 标量与之一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    Text(String),
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Null => Ok(()),
            DataValue::Bool(b) => write!(f, "{}", b),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl DataValue {
    /// 获取数据类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::Bool(_) => "bool",
            DataValue::Int(_) => "int",
            DataValue::Float(_) => "float",
            DataValue::Text(_) => "text",
        }
    }

    /// 判断是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        DataValue::Int(value as i64)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Float(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DataValue::Null)
    }
}

/// 一行数据，按所属表的列顺序排列
pub type Row = Vec<DataValue>;
