//! 保存的查询
//!
//! 查询以 `[{"description", "sql"}]` 形式存放在 JSON 文件中，描述唯一

use crate::error::QuickTableResult;
use crate::quick_table_error;
use rat_logger::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 一条保存的查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub description: String,
    pub sql: String,
}

impl SavedQuery {
    pub fn new(description: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            sql: sql.into(),
        }
    }
}

/// 查询集合，保持插入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStore {
    queries: Vec<SavedQuery>,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文本解析，描述重复视为格式错误
    pub fn from_json_str(json: &str) -> QuickTableResult<Self> {
        let queries: Vec<SavedQuery> = serde_json::from_str(json)
            .map_err(|e| quick_table_error!(format, format!("查询文档解析失败: {}", e)))?;

        let mut store = Self::new();
        for query in queries {
            if store.find(&query.description).is_some() {
                return Err(quick_table_error!(
                    format,
                    format!("查询文档中描述重复: {}", query.description)
                ));
            }
            store.queries.push(query);
        }
        Ok(store)
    }

    pub fn to_json_string(&self) -> QuickTableResult<String> {
        serde_json::to_string_pretty(&self.queries)
            .map_err(|e| quick_table_error!(format, format!("JSON序列化失败: {}", e)))
    }

    /// 从文件加载，文件不存在时返回空集合
    pub async fn load(path: impl AsRef<Path>) -> QuickTableResult<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::new());
        }
        let json = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json_str(&json)?;
        info!("加载 {} 条保存的查询: {}", store.len(), path.display());
        Ok(store)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> QuickTableResult<()> {
        tokio::fs::write(path.as_ref(), self.to_json_string()?).await?;
        Ok(())
    }

    pub fn add(&mut self, query: SavedQuery) -> QuickTableResult<()> {
        if query.description.trim().is_empty() {
            return Err(quick_table_error!(validation, "description", "查询描述不能为空"));
        }
        if self.find(&query.description).is_some() {
            return Err(quick_table_error!(
                validation,
                "description",
                format!("查询描述已存在: {}", query.description)
            ));
        }
        self.queries.push(query);
        Ok(())
    }

    pub fn remove(&mut self, description: &str) -> QuickTableResult<SavedQuery> {
        let index = self.position(description)?;
        Ok(self.queries.remove(index))
    }

    pub fn rename(&mut self, old_description: &str, new_description: &str) -> QuickTableResult<()> {
        let index = self.position(old_description)?;
        if old_description != new_description && self.find(new_description).is_some() {
            return Err(quick_table_error!(
                validation,
                "description",
                format!("查询描述已存在: {}", new_description)
            ));
        }
        self.queries[index].description = new_description.to_string();
        Ok(())
    }

    pub fn find(&self, description: &str) -> Option<&SavedQuery> {
        self.queries.iter().find(|q| q.description == description)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedQuery> {
        self.queries.iter()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn position(&self, description: &str) -> QuickTableResult<usize> {
        self.queries
            .iter()
            .position(|q| q.description == description)
            .ok_or_else(|| {
                quick_table_error!(
                    validation,
                    "description",
                    format!("找不到查询: {}", description)
                )
            })
    }
}
