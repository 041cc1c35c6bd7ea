//! 标识符校验与引用
//!
//! 表名、列名无法作为语句参数绑定，只能拼接进 DDL/DML 文本。
//! 所有标识符先校验再以双引号包裹（内部双引号加倍），
//! 类型名则必须匹配安全的类型名模式才允许拼接。

use crate::error::QuickTableResult;
use crate::quick_table_error;
use once_cell::sync::Lazy;
use regex::Regex;

/// 标识符最大长度（PostgreSQL 限制为 63 字节）
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// 形如 `bigint`、`character varying(20)`、`numeric(10, 2)`、`integer[]`、
/// `timestamp(3) without time zone`、`public.citext`
static TYPE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_ .]*(\(\s*\d+\s*(,\s*\d+\s*)?\))?[A-Za-z0-9_ ]*(\[\])*$")
        .expect("类型名正则表达式无效")
});

/// 校验标识符
pub fn validate_identifier(name: &str) -> QuickTableResult<()> {
    if name.is_empty() {
        return Err(quick_table_error!(validation, "identifier", "标识符不能为空"));
    }

    if name.contains('\0') {
        return Err(quick_table_error!(
            validation,
            "identifier",
            format!("标识符包含空字节: {:?}", name)
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(quick_table_error!(
            validation,
            "identifier",
            format!(
                "标识符超过最大长度 {} 字节（实际 {} 字节）: {:?}",
                MAX_IDENTIFIER_LENGTH,
                name.len(),
                name
            )
        ));
    }

    Ok(())
}

/// 校验并引用标识符
pub fn quote_identifier(name: &str) -> QuickTableResult<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// 校验将要拼接进 DDL 的类型名
pub fn validate_type_name(type_name: &str) -> QuickTableResult<()> {
    let trimmed = type_name.trim();
    if trimmed.is_empty() || trimmed.len() > 128 || !TYPE_NAME_PATTERN.is_match(trimmed) {
        return Err(quick_table_error!(
            validation,
            "type",
            format!("非法的列类型名: {:?}", type_name)
        ));
    }
    Ok(())
}

/// 判断类型名能否安全拼接
pub fn is_safe_type_name(type_name: &str) -> bool {
    validate_type_name(type_name).is_ok()
}

/// 引用 SQL 字符串字面量
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("book").unwrap(), "\"book\"");
        assert_eq!(quote_identifier("Order").unwrap(), "\"Order\"");
        assert_eq!(
            quote_identifier("x\"; DROP TABLE book; --").unwrap(),
            "\"x\"\"; DROP TABLE book; --\""
        );
    }

    #[test]
    fn test_reject_bad_identifiers() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("a\0b").is_err());
        assert!(quote_identifier(&"x".repeat(64)).is_err());
        assert!(quote_identifier(&"x".repeat(63)).is_ok());
    }

    #[test]
    fn test_type_names() {
        for ok in [
            "bigint",
            "TEXT",
            "character varying(20)",
            "numeric(10, 2)",
            "integer[]",
            "_int4",
            "timestamp without time zone",
            "timestamp(3) without time zone",
            "public.citext",
        ] {
            assert!(is_safe_type_name(ok), "{} 应该合法", ok);
        }
        for bad in ["", "text; DROP TABLE x", "int)", "text--", "'text'"] {
            assert!(!is_safe_type_name(bad), "{} 应该非法", bad);
        }
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }
}
