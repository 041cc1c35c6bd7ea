//! CSV 渲染
//!
//! 逗号分隔，首行为表头。字段包含逗号、双引号或换行时整体加双引号，
//! 内部双引号加倍；其余字段原样输出。NULL 输出为空字段。

use crate::codec::RowCodec;
use crate::types::Row;
use std::borrow::Cow;

/// 转义单个字段
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = Cow<'a, str>>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        out.push_str(&field);
        first = false;
    }
    out.push('\n');
}

/// 渲染表头与所有行
pub fn render_csv(headers: &[String], rows: &[Row]) -> String {
    let mut out = String::new();
    push_record(&mut out, headers.iter().map(|h| escape_field(h)));
    for row in rows {
        let texts: Vec<String> = row.iter().map(RowCodec::to_text).collect();
        push_record(&mut out, texts.iter().map(|t| escape_field(t)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataValue;

    #[test]
    fn test_quote_only_when_needed() {
        assert_eq!(escape_field("a,b\"c"), "\"a,b\"\"c\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field("plain text"), "plain text");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_render_with_nulls() {
        let headers = vec!["id".to_string(), "title".to_string(), "note".to_string()];
        let rows = vec![
            vec![DataValue::Int(1), DataValue::from("a,b\"c"), DataValue::Null],
            vec![DataValue::Int(2), DataValue::from("Dune"), DataValue::from("ok")],
        ];
        assert_eq!(
            render_csv(&headers, &rows),
            "id,title,note\n1,\"a,b\"\"c\",\n2,Dune,ok\n"
        );
    }

    #[test]
    fn test_header_only() {
        assert_eq!(render_csv(&["x,y".to_string()], &[]), "\"x,y\"\n");
    }
}
