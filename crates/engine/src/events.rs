//! Event types and the callback surface of the grid.
//!
//! Callbacks are how the host application observes state transitions:
//! per-field value changes during a batch commit, bulk creation of
//! pending rows, and layout/filter/sort/selection mutations. All
//! callbacks fire synchronously inside the gesture that caused them.
//! The event enum plus collector mirror the callbacks for tests.

use std::collections::BTreeMap;

use rowgrid_config::{ActiveFilter, SortKeySpec};
use rowgrid_core::{ColumnId, Record, RowId, Value};

/// Events emitted by grid operations, used by the test harness to verify
/// ordering and exactness of notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// One field of one committed row changed during a batch commit.
    CellValueChanged {
        row_id: RowId,
        column_id: ColumnId,
        old: Value,
        new: Value,
    },
    /// Pending rows were handed to the bulk-creation callback.
    PendingRowsSaved { count: usize },
    SortChanged(Vec<SortKeySpec>),
    /// Columns that currently carry a filter, after a filter mutation.
    FilterChanged { active: Vec<ColumnId> },
    ColumnOrderChanged(Vec<ColumnId>),
    /// Columns explicitly hidden, after a visibility mutation.
    ColumnVisibilityChanged { hidden: Vec<ColumnId> },
    SelectionChanged(Vec<RowId>),
    EditSaved,
    EditCancelled,
}

/// Simple event collector for testing.
#[derive(Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only CellValueChanged events.
    pub fn cell_changes(&self) -> Vec<&GridEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, GridEvent::CellValueChanged { .. }))
            .collect()
    }

    /// Filter to only SelectionChanged events.
    pub fn selection_changes(&self) -> Vec<&GridEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, GridEvent::SelectionChanged(_)))
            .collect()
    }
}

pub type CellValueChangeFn = dyn FnMut(&Record, &str, &Value, &Value);
pub type NewRowsSaveFn = dyn FnMut(&[Record]);
/// Transform applied when a pending row's cell changes, so dependent
/// computed fields can be recalculated before the row is stored back.
pub type PendingCellChangeFn = dyn FnMut(Record, &str, Value) -> Record;
pub type SortChangeFn = dyn FnMut(&[SortKeySpec]);
pub type FilterChangeFn = dyn FnMut(&BTreeMap<ColumnId, ActiveFilter>);
pub type ColumnOrderChangeFn = dyn FnMut(&[ColumnId]);
pub type ColumnVisibilityChangeFn = dyn FnMut(&BTreeMap<ColumnId, bool>);
pub type SelectionChangeFn = dyn FnMut(&[RowId]);
pub type RowClickFn = dyn FnMut(&Record);
pub type NotifyFn = dyn FnMut();

/// The optional callback set supplied at grid construction. Absent
/// callbacks are simply not fired.
#[derive(Default)]
pub struct GridCallbacks {
    /// (row, column id, new value, old value), fired once per actually
    /// changed field during `save_all_changes`, strictly one at a time.
    pub on_cell_value_change: Option<Box<CellValueChangeFn>>,
    /// The full ordered pending-row list, fired once per commit.
    pub on_new_rows_save: Option<Box<NewRowsSaveFn>>,
    pub on_pending_cell_change: Option<Box<PendingCellChangeFn>>,
    pub on_sort_change: Option<Box<SortChangeFn>>,
    pub on_filter_change: Option<Box<FilterChangeFn>>,
    pub on_column_order_change: Option<Box<ColumnOrderChangeFn>>,
    pub on_column_visibility_change: Option<Box<ColumnVisibilityChangeFn>>,
    pub on_selection_change: Option<Box<SelectionChangeFn>>,
    pub on_row_click: Option<Box<RowClickFn>>,
    pub on_row_double_click: Option<Box<RowClickFn>>,
    pub on_edit_save: Option<Box<NotifyFn>>,
    pub on_edit_cancel: Option<Box<NotifyFn>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_collector_filtering() {
        let mut collector = EventCollector::new();
        collector.push(GridEvent::SelectionChanged(vec!["r1".to_string()]));
        collector.push(GridEvent::CellValueChanged {
            row_id: "r1".to_string(),
            column_id: "b".to_string(),
            old: Value::Number(2.0),
            new: Value::Number(3.0),
        });
        collector.push(GridEvent::EditSaved);

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.cell_changes().len(), 1);
        assert_eq!(collector.selection_changes().len(), 1);
    }
}
