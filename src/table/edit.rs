//! 行编辑跟踪
//!
//! 记录每一行在第一次被编辑时的原主键。同一行先改普通列、
//! 后改主键列时，主键变更仍然按编辑前的主键定位旧行。

use crate::error::QuickTableResult;
use crate::table::Table;
use crate::types::DataValue;
use std::collections::HashMap;

/// 行编辑跟踪器，按行号保存原主键
#[derive(Debug, Clone, Default)]
pub struct RowEditTracker {
    original_keys: HashMap<usize, Vec<DataValue>>,
}

impl RowEditTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行开始编辑，只在第一次调用时记录原主键
    pub fn begin_edit(
        &mut self,
        row_index: usize,
        row: &[DataValue],
        table: &Table,
    ) -> QuickTableResult<()> {
        if self.original_keys.contains_key(&row_index) {
            return Ok(());
        }
        let key = table.primary_key_of(row)?;
        self.original_keys.insert(row_index, key);
        Ok(())
    }

    /// 查看原主键，不消费
    pub fn original_key(&self, row_index: usize) -> Option<&[DataValue]> {
        self.original_keys.get(&row_index).map(Vec::as_slice)
    }

    /// 取走原主键，之后该行不再有记录
    pub fn take_original_key(&mut self, row_index: usize) -> Option<Vec<DataValue>> {
        self.original_keys.remove(&row_index)
    }

    pub fn is_editing(&self, row_index: usize) -> bool {
        self.original_keys.contains_key(&row_index)
    }

    /// 丢弃某行的记录（行被删除或编辑被取消）
    pub fn forget(&mut self, row_index: usize) {
        self.original_keys.remove(&row_index);
    }

    pub fn clear(&mut self) {
        self.original_keys.clear();
    }

    pub fn len(&self) -> usize {
        self.original_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::new(
            "book",
            vec![Column::text("isbn").primary_key(), Column::text("title")],
        )
    }

    fn row(isbn: &str, title: &str) -> Vec<DataValue> {
        vec![DataValue::from(isbn), DataValue::from(title)]
    }

    #[test]
    fn test_first_touch_wins() {
        let table = table();
        let mut tracker = RowEditTracker::new();
        tracker.begin_edit(0, &row("111", "Dune"), &table).unwrap();
        tracker.begin_edit(0, &row("222", "Dune"), &table).unwrap();
        assert_eq!(tracker.original_key(0), Some(&[DataValue::from("111")][..]));
    }

    #[test]
    fn test_take_consumes_once() {
        let table = table();
        let mut tracker = RowEditTracker::new();
        tracker.begin_edit(3, &row("111", "Dune"), &table).unwrap();
        assert_eq!(tracker.take_original_key(3), Some(vec![DataValue::from("111")]));
        assert_eq!(tracker.take_original_key(3), None);
        assert!(!tracker.is_editing(3));
    }

    #[test]
    fn test_forget_and_clear() {
        let table = table();
        let mut tracker = RowEditTracker::new();
        tracker.begin_edit(0, &row("1", "a"), &table).unwrap();
        tracker.begin_edit(1, &row("2", "b"), &table).unwrap();
        tracker.forget(0);
        assert_eq!(tracker.len(), 1);
        tracker.clear();
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_table_without_key_is_rejected() {
        let table = Table::new("log", vec![Column::text("line")]);
        let mut tracker = RowEditTracker::new();
        assert!(tracker.begin_edit(0, &[DataValue::from("x")], &table).is_err());
        assert!(tracker.is_empty());
    }
}
