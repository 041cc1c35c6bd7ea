//! 行编解码
//!
//! 在引擎的类型化单元格与通用 `DataValue` 之间转换，
//! 并决定空白输入如何映射为 NULL。

use crate::identifier::quote_literal;
use crate::table::Column;
use crate::types::{DataValue, SimplifiedType};

/// 行编解码器
pub struct RowCodec;

impl RowCodec {
    /// 写入前规整单个值
    ///
    /// - NULL 保持 NULL
    /// - 去除首尾空白后为空的文本变为 NULL
    /// - 写往整数列且能解析为 i64 的文本变为整数
    pub fn normalize_input(column: &Column, value: &DataValue) -> DataValue {
        match value {
            DataValue::Null => DataValue::Null,
            DataValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    DataValue::Null
                } else if column.simplified_type == SimplifiedType::Int {
                    match trimmed.parse::<i64>() {
                        Ok(parsed) => DataValue::Int(parsed),
                        Err(_) => value.clone(),
                    }
                } else {
                    value.clone()
                }
            }
            other => other.clone(),
        }
    }

    /// 规整一整行（列与值按位置对应）
    pub fn normalize_row(columns: &[Column], row: &[DataValue]) -> Vec<DataValue> {
        columns
            .iter()
            .zip(row.iter())
            .map(|(column, value)| Self::normalize_input(column, value))
            .collect()
    }

    /// 转为展示/CSV 文本，NULL 为空串
    pub fn to_text(value: &DataValue) -> String {
        value.to_string()
    }

    /// 转为 SQL 字面量：NULL 原样输出，数值不加引号，文本单引号包裹并转义
    pub fn to_sql_literal(value: &DataValue) -> String {
        match value {
            DataValue::Null => "NULL".to_string(),
            DataValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            DataValue::Int(i) => i.to_string(),
            DataValue::Float(f) if f.is_finite() => f.to_string(),
            DataValue::Float(f) => quote_literal(&f.to_string()),
            DataValue::Text(s) => quote_literal(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_becomes_null() {
        let col = Column::text("title");
        assert_eq!(
            RowCodec::normalize_input(&col, &DataValue::Text("   ".to_string())),
            DataValue::Null
        );
        assert_eq!(
            RowCodec::normalize_input(&col, &DataValue::Text(String::new())),
            DataValue::Null
        );
        assert_eq!(
            RowCodec::normalize_input(&col, &DataValue::Text(" x ".to_string())),
            DataValue::Text(" x ".to_string())
        );
    }

    #[test]
    fn test_int_column_parses_text() {
        let col = Column::int("year");
        assert_eq!(
            RowCodec::normalize_input(&col, &DataValue::Text(" 1999 ".to_string())),
            DataValue::Int(1999)
        );
        assert_eq!(
            RowCodec::normalize_input(&col, &DataValue::Text("n/a".to_string())),
            DataValue::Text("n/a".to_string())
        );
        assert_eq!(
            RowCodec::normalize_input(&col, &DataValue::Int(5)),
            DataValue::Int(5)
        );
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(RowCodec::to_sql_literal(&DataValue::Null), "NULL");
        assert_eq!(RowCodec::to_sql_literal(&DataValue::Int(42)), "42");
        assert_eq!(
            RowCodec::to_sql_literal(&DataValue::Text("it's".to_string())),
            "'it''s'"
        );
        assert_eq!(RowCodec::to_sql_literal(&DataValue::Bool(false)), "FALSE");
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(RowCodec::to_text(&DataValue::Null), "");
        assert_eq!(RowCodec::to_text(&DataValue::Int(-3)), "-3");
        assert_eq!(RowCodec::to_text(&DataValue::Bool(true)), "true");
    }
}
