//! 表模式定义
//!
//! 列描述与表描述。两者都由目录即时推导，不做跨调用缓存。

use crate::error::QuickTableResult;
use crate::quick_table_error;
use crate::types::{DataValue, SimplifiedType};
use serde::{Deserialize, Serialize};

/// 列定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    /// 列名
    pub name: String,
    /// 简化类型
    pub simplified_type: SimplifiedType,
    /// 物理类型名，为空表示按简化类型映射
    pub full_type: String,
    /// 是否属于主键
    pub is_primary_key: bool,
    /// 是否为自增（序列/identity）列
    pub is_identity: bool,
    /// 是否可为空
    pub is_nullable: bool,
    /// 默认值表达式
    pub default_value: String,
}

impl Column {
    /// 创建普通列
    pub fn new(name: impl Into<String>, simplified_type: SimplifiedType) -> Self {
        Self {
            name: name.into(),
            simplified_type,
            full_type: String::new(),
            is_primary_key: false,
            is_identity: false,
            is_nullable: true,
            default_value: String::new(),
        }
    }

    /// 整数列
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, SimplifiedType::Int)
    }

    /// 文本列
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, SimplifiedType::Text)
    }

    /// 自增整数列
    pub fn identity(name: impl Into<String>) -> Self {
        Self::int(name).with_identity(true)
    }

    /// 设置主键标记
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.is_nullable = false;
        self
    }

    /// 设置自增标记
    pub fn with_identity(mut self, identity: bool) -> Self {
        self.is_identity = identity;
        if identity {
            self.simplified_type = SimplifiedType::Int;
        }
        self
    }

    /// 设置物理类型
    pub fn with_full_type(mut self, full_type: impl Into<String>) -> Self {
        self.full_type = full_type.into();
        self
    }

    /// 是否按文本处理
    pub fn is_text(&self) -> bool {
        self.simplified_type == SimplifiedType::Text
    }
}

/// 表定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    /// 表名
    pub name: String,
    /// 按物理顺序排列的列
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// 获取主键列（按列序）
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|col| col.is_primary_key).collect()
    }

    /// 获取自增列
    pub fn identity_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|col| col.is_identity).collect()
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|col| col.is_primary_key)
    }

    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|col| col.is_identity)
    }

    /// 获取列定义
    pub fn column(&self, column_name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == column_name)
    }

    /// 获取列序号
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == column_name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    /// 检查整行的值数量
    pub fn check_row_arity(&self, row: &[DataValue]) -> QuickTableResult<()> {
        if row.len() != self.columns.len() {
            return Err(quick_table_error!(
                validation,
                "values",
                format!(
                    "表 {} 有 {} 列，但提供了 {} 个值",
                    self.name,
                    self.columns.len(),
                    row.len()
                )
            ));
        }
        Ok(())
    }

    /// 检查主键值数量，无主键的表直接失败
    pub fn check_key_arity(&self, key: &[DataValue]) -> QuickTableResult<()> {
        let pk_count = self.primary_key_columns().len();
        if pk_count == 0 {
            return Err(quick_table_error!(
                validation,
                "primary_key",
                format!("表 {} 没有主键", self.name)
            ));
        }
        if key.len() != pk_count {
            return Err(quick_table_error!(
                validation,
                "primary_key",
                format!(
                    "表 {} 的主键有 {} 列，但提供了 {} 个主键值",
                    self.name,
                    pk_count,
                    key.len()
                )
            ));
        }
        Ok(())
    }

    /// 将一行投影为主键元组（按列序）
    pub fn primary_key_of(&self, row: &[DataValue]) -> QuickTableResult<Vec<DataValue>> {
        self.check_row_arity(row)?;
        if !self.has_primary_key() {
            return Err(quick_table_error!(
                validation,
                "primary_key",
                format!("表 {} 没有主键", self.name)
            ));
        }
        Ok(self
            .columns
            .iter()
            .zip(row.iter())
            .filter(|(col, _)| col.is_primary_key)
            .map(|(_, value)| value.clone())
            .collect())
    }
}
