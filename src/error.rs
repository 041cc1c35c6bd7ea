//! 错误处理模块
//!
//! 提供统一的错误类型定义和中文错误信息

use thiserror::Error;

/// QuickTable 统一错误类型
#[derive(Error, Debug)]
pub enum QuickTableError {
    /// 调用方提供的数据形状不合法（数量不匹配、缺少主键、空列表等）
    #[error("参数验证失败: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// 存储引擎拒绝执行语句，message 为引擎原始诊断信息
    #[error("存储引擎执行失败: {message}")]
    EngineError { message: String },

    /// 导入文档格式错误
    #[error("文档格式错误: {message}")]
    FormatError { message: String },

    /// 数据库连接错误
    #[error("数据库连接失败: {message}")]
    ConnectionError { message: String },

    /// 配置错误
    #[error("配置错误: {message}")]
    ConfigError { message: String },

    /// 目录中不存在该表
    #[error("表 '{table}' 不存在")]
    TableNotFound { table: String },

    /// 会话已关闭
    #[error("会话已关闭")]
    SessionClosed,

    /// IO 错误
    #[error("IO 操作失败: {0}")]
    IoError(#[from] std::io::Error),
}

/// QuickTable 结果类型别名
pub type QuickTableResult<T> = Result<T, QuickTableError>;

impl QuickTableError {
    /// 错误类别名称，便于展示层区分处理
    pub fn kind(&self) -> &'static str {
        match self {
            QuickTableError::ValidationError { .. } => "validation",
            QuickTableError::EngineError { .. } => "engine",
            QuickTableError::FormatError { .. } => "format",
            QuickTableError::ConnectionError { .. } => "connection",
            QuickTableError::ConfigError { .. } => "config",
            QuickTableError::TableNotFound { .. } => "table_not_found",
            QuickTableError::SessionClosed => "session_closed",
            QuickTableError::IoError(_) => "io",
        }
    }
}

impl From<sqlx::Error> for QuickTableError {
    fn from(e: sqlx::Error) -> Self {
        ErrorBuilder::engine_error(e)
    }
}

/// 错误构建器 - 提供便捷的错误创建方法
pub struct ErrorBuilder;

impl ErrorBuilder {
    /// 创建验证错误
    pub fn validation_error(
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> QuickTableError {
        QuickTableError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 从驱动错误创建引擎错误，数据库错误只保留引擎自身的诊断文本
    pub fn engine_error(e: sqlx::Error) -> QuickTableError {
        let message = match &e {
            sqlx::Error::Database(db_err) => db_err.message().to_string(),
            other => other.to_string(),
        };
        QuickTableError::EngineError { message }
    }

    /// 创建引擎错误（自定义信息）
    pub fn engine_message(message: impl Into<String>) -> QuickTableError {
        QuickTableError::EngineError {
            message: message.into(),
        }
    }

    /// 创建文档格式错误
    pub fn format_error(message: impl Into<String>) -> QuickTableError {
        QuickTableError::FormatError {
            message: message.into(),
        }
    }

    /// 创建连接错误
    pub fn connection_error(message: impl Into<String>) -> QuickTableError {
        QuickTableError::ConnectionError {
            message: message.into(),
        }
    }

    /// 创建配置错误
    pub fn config_error(message: impl Into<String>) -> QuickTableError {
        QuickTableError::ConfigError {
            message: message.into(),
        }
    }

    /// 创建表不存在错误
    pub fn table_not_found(table: impl Into<String>) -> QuickTableError {
        QuickTableError::TableNotFound {
            table: table.into(),
        }
    }
}

/// 便捷宏 - 快速创建错误
#[macro_export]
macro_rules! quick_table_error {
    (validation, $field:expr, $msg:expr) => {
        $crate::error::ErrorBuilder::validation_error($field, $msg)
    };
    (engine, $msg:expr) => {
        $crate::error::ErrorBuilder::engine_message($msg)
    };
    (format, $msg:expr) => {
        $crate::error::ErrorBuilder::format_error($msg)
    };
    (connection, $msg:expr) => {
        $crate::error::ErrorBuilder::connection_error($msg)
    };
    (config, $msg:expr) => {
        $crate::error::ErrorBuilder::config_error($msg)
    };
    (table_not_found, $table:expr) => {
        $crate::error::ErrorBuilder::table_not_found($table)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ErrorBuilder::validation_error("values", "数量不匹配");
        assert!(matches!(err, QuickTableError::ValidationError { .. }));
        assert_eq!(err.to_string(), "参数验证失败: values - 数量不匹配");
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn test_error_macro() {
        let err = quick_table_error!(table_not_found, "book");
        assert!(matches!(err, QuickTableError::TableNotFound { .. }));
        assert_eq!(err.to_string(), "表 'book' 不存在");

        let err = quick_table_error!(engine, "relation \"book\" does not exist");
        match err {
            QuickTableError::EngineError { message } => {
                assert_eq!(message, "relation \"book\" does not exist");
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }

    #[test]
    fn test_driver_error_keeps_text() {
        let err: QuickTableError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), "engine");
    }
}
