//! 序列化层
//!
//! 把单表或整库导出为 JSON 文档、CSV 和 SQL 转储，并能从 JSON 文档恢复

mod csv;
mod sql_dump;

pub use csv::{escape_field, render_csv};
pub use sql_dump::{render_header, render_table};

use crate::adapter::ResultSet;
use crate::error::QuickTableResult;
use crate::quick_table_error;
use crate::session::Session;
use crate::table::{Column, SchemaCatalog, SequenceSynchronizer, Table, TableMutator};
use crate::types::{Row, SimplifiedType};
use chrono::Utc;
use rat_logger::{error, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 列描述文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: SimplifiedType,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_identity: bool,
}

impl ColumnDocument {
    fn from_column(column: &Column) -> Self {
        Self {
            name: column.name.clone(),
            column_type: column.simplified_type,
            is_primary_key: column.is_primary_key,
            is_identity: column.is_identity,
        }
    }

    fn to_column(&self) -> Column {
        let mut column = Column::new(self.name.clone(), self.column_type).with_identity(self.is_identity);
        if self.is_primary_key {
            column = column.primary_key();
        }
        column
    }
}

/// 表文档：`{"name", "columns", "data"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub name: String,
    pub columns: Vec<ColumnDocument>,
    #[serde(default)]
    pub data: Vec<Row>,
}

impl TableDocument {
    /// 从 JSON 文本解析
    pub fn from_json_str(json: &str) -> QuickTableResult<Self> {
        let document: TableDocument = serde_json::from_str(json)
            .map_err(|e| quick_table_error!(format, format!("表文档解析失败: {}", e)))?;
        document.check()?;
        Ok(document)
    }

    pub fn to_json_string(&self, pretty: bool) -> QuickTableResult<String> {
        to_json(self, pretty)
    }

    /// 结构检查：列不能为空且不能重名，每行的值数量必须等于列数
    fn check(&self) -> QuickTableResult<()> {
        if self.name.trim().is_empty() {
            return Err(quick_table_error!(format, "表文档缺少表名"));
        }
        if self.columns.is_empty() {
            return Err(quick_table_error!(
                format,
                format!("表文档 {} 没有列", self.name)
            ));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(quick_table_error!(
                    format,
                    format!("表文档 {} 的列 {} 重复", self.name, column.name)
                ));
            }
        }
        for (index, row) in self.data.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(quick_table_error!(
                    format,
                    format!(
                        "表文档 {} 第 {} 行有 {} 个值，应为 {} 个",
                        self.name,
                        index,
                        row.len(),
                        self.columns.len()
                    )
                ));
            }
        }
        Ok(())
    }

    fn columns(&self) -> Vec<Column> {
        self.columns.iter().map(ColumnDocument::to_column).collect()
    }
}

/// 解析整库文档（表文档数组）
pub fn parse_database_document(json: &str) -> QuickTableResult<Vec<TableDocument>> {
    let documents: Vec<TableDocument> = serde_json::from_str(json)
        .map_err(|e| quick_table_error!(format, format!("数据库文档解析失败: {}", e)))?;
    for document in &documents {
        document.check()?;
    }
    Ok(documents)
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> QuickTableResult<String> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|e| quick_table_error!(format, format!("JSON序列化失败: {}", e)))
}

/// 序列化配置
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// 写文件时是否美化 JSON
    pub pretty: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// 序列化器
pub struct Serializer<'a> {
    session: &'a Session,
    catalog: SchemaCatalog<'a>,
    mutator: TableMutator<'a>,
    config: SerializerConfig,
}

impl<'a> Serializer<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self::with_config(session, SerializerConfig::default())
    }

    pub fn with_config(session: &'a Session, config: SerializerConfig) -> Self {
        Self {
            session,
            catalog: SchemaCatalog::new(session),
            mutator: TableMutator::new(session),
            config,
        }
    }

    /// 导出单表
    pub async fn export_table(&self, table: &str) -> QuickTableResult<TableDocument> {
        let table = self.catalog.table(table).await?;
        let data = self.catalog.rows_of(&table).await?;
        info!("导出表 {}，共 {} 行", table.name, data.len());
        Ok(TableDocument {
            columns: table.columns.iter().map(ColumnDocument::from_column).collect(),
            name: table.name,
            data,
        })
    }

    /// 导入单表：同名表先删除，再按文档重建、按序写入并同步自增序列
    pub async fn import_table(&self, document: &TableDocument) -> QuickTableResult<()> {
        document.check()?;
        let columns = document.columns();
        // 建表语句能生成才删除旧表，名称、类型或自增约束不合法时旧表保持原样
        self.session
            .query_builder()
            .create_table(&document.name, &columns)?;

        if self.catalog.table_exists(&document.name).await? {
            info!("表 {} 已存在，导入前删除", document.name);
            self.mutator.drop_table(&document.name).await?;
        }
        self.mutator.create_table(&document.name, &columns).await?;

        // 重新读取目录，拿到存储实际使用的类型
        let table = self.catalog.table(&document.name).await?;
        for row in &document.data {
            self.mutator.restore_row(&table, row).await?;
        }
        SequenceSynchronizer::new(self.session)
            .sync_table(&table)
            .await?;

        info!("导入表 {}，共 {} 行", table.name, document.data.len());
        Ok(())
    }

    /// 按目录顺序导出所有表
    pub async fn export_database(&self) -> QuickTableResult<Vec<TableDocument>> {
        let tables = self.catalog.list_tables().await?;
        let mut documents = Vec::with_capacity(tables.len());
        for table in &tables {
            documents.push(self.export_table(table).await?);
        }
        Ok(documents)
    }

    /// 按文档顺序导入所有表，遇到第一个失败即停止；已导入的表保持不变
    pub async fn import_database(&self, documents: &[TableDocument]) -> QuickTableResult<()> {
        let mut imported: Vec<&str> = Vec::with_capacity(documents.len());
        for document in documents {
            if let Err(e) = self.import_table(document).await {
                error!(
                    "导入表 {} 失败，已导入的表保持不变: [{}]，错误: {}",
                    document.name,
                    imported.join(", "),
                    e
                );
                return Err(e);
            }
            imported.push(&document.name);
        }
        info!("数据库导入完成，共 {} 张表", imported.len());
        Ok(())
    }

    pub async fn export_table_json_file(
        &self,
        table: &str,
        path: impl AsRef<Path>,
    ) -> QuickTableResult<()> {
        let document = self.export_table(table).await?;
        let json = document.to_json_string(self.config.pretty)?;
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    pub async fn import_table_json_file(&self, path: impl AsRef<Path>) -> QuickTableResult<()> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let document = TableDocument::from_json_str(&json)?;
        self.import_table(&document).await
    }

    pub async fn export_database_json_file(&self, path: impl AsRef<Path>) -> QuickTableResult<()> {
        let documents = self.export_database().await?;
        let json = to_json(&documents, self.config.pretty)?;
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    pub async fn import_database_json_file(&self, path: impl AsRef<Path>) -> QuickTableResult<()> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        let documents = parse_database_document(&json)?;
        self.import_database(&documents).await
    }

    /// 写出 CSV 文件
    pub async fn write_csv(
        &self,
        rows: &[Row],
        headers: &[String],
        path: impl AsRef<Path>,
    ) -> QuickTableResult<()> {
        tokio::fs::write(path.as_ref(), render_csv(headers, rows)).await?;
        info!("CSV已写入: {}", path.as_ref().display());
        Ok(())
    }

    /// 单表导出为 CSV，表头为列名
    pub async fn export_table_csv(&self, table: &str, path: impl AsRef<Path>) -> QuickTableResult<()> {
        let table = self.catalog.table(table).await?;
        let rows = self.catalog.rows_of(&table).await?;
        self.write_csv(&rows, &table.column_names(), path).await
    }

    /// 查询结果导出为 CSV
    pub async fn export_query_csv(
        &self,
        result: &ResultSet,
        path: impl AsRef<Path>,
    ) -> QuickTableResult<()> {
        self.write_csv(&result.rows, &result.headers, path).await
    }

    /// 渲染整库的 SQL 转储
    pub async fn render_sql_dump(&self) -> QuickTableResult<String> {
        let builder = self.session.query_builder();
        let mut out = render_header(Utc::now());
        for name in self.catalog.list_tables().await? {
            let table: Table = self.catalog.table(&name).await?;
            let rows = self.catalog.rows_of(&table).await?;
            out.push_str(&render_table(&builder, &table, &rows)?);
        }
        Ok(out)
    }

    /// 整库 SQL 转储写入文件
    pub async fn export_sql_dump(&self, path: impl AsRef<Path>) -> QuickTableResult<()> {
        let dump = self.render_sql_dump().await?;
        tokio::fs::write(path.as_ref(), dump).await?;
        info!("SQL转储已写入: {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuickTableError;
    use crate::types::DataValue;

    #[test]
    fn test_parse_table_document() {
        let json = r#"{
            "name": "book",
            "columns": [
                {"name": "id", "type": "int", "isPrimaryKey": true, "isIdentity": true},
                {"name": "title", "type": "text", "isPrimaryKey": false}
            ],
            "data": [[1, "Dune"], [2, null]]
        }"#;
        let document = TableDocument::from_json_str(json).unwrap();
        assert_eq!(document.columns.len(), 2);
        assert!(document.columns[0].is_identity);
        assert!(!document.columns[1].is_identity);
        assert_eq!(document.data[1], vec![DataValue::Int(2), DataValue::Null]);

        let columns = document.columns();
        assert!(columns[0].is_primary_key && !columns[0].is_nullable);
    }

    #[test]
    fn test_malformed_documents_are_format_errors() {
        for json in [
            "not json",
            r#"{"columns": []}"#,
            r#"{"name": "t", "columns": [{"name": "a", "type": "float"}]}"#,
            r#"{"name": "t", "columns": []}"#,
            r#"{"name": "t", "columns": [{"name": "a", "type": "int"}], "data": [[1, 2]]}"#,
            r#"{"name": "t", "columns": [{"name": "a", "type": "int"}, {"name": "a", "type": "text"}]}"#,
        ] {
            let err = TableDocument::from_json_str(json).unwrap_err();
            assert!(
                matches!(err, QuickTableError::FormatError { .. }),
                "{} 应该是格式错误",
                json
            );
        }
    }

    #[test]
    fn test_document_serializes_camel_case() {
        let document = TableDocument {
            name: "t".to_string(),
            columns: vec![ColumnDocument {
                name: "id".to_string(),
                column_type: SimplifiedType::Int,
                is_primary_key: true,
                is_identity: false,
            }],
            data: vec![vec![DataValue::Int(1)]],
        };
        let json = document.to_json_string(false).unwrap();
        assert_eq!(
            json,
            r#"{"name":"t","columns":[{"name":"id","type":"int","isPrimaryKey":true,"isIdentity":false}],"data":[[1]]}"#
        );
    }

    #[test]
    fn test_parse_database_document() {
        let documents = parse_database_document(
            r#"[{"name": "a", "columns": [{"name": "x", "type": "text"}]}]"#,
        )
        .unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].data.is_empty());
        assert!(parse_database_document("{}").is_err());
    }
}
