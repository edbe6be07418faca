//! Editing state machine: one active cell, a staging area for modified
//! committed rows, and a list of pending (not-yet-created) rows.
//!
//! Deferred commit is two-phase by design: committed rows are never
//! mutated while editing. Patches accumulate in `modified` keyed by data
//! row index; brand-new rows accumulate in `pending` keyed by identity
//! (they have no stable index until committed). `save_all` diffs and
//! emits, `cancel_all` discards; both clear the session completely.
//!
//! States: idle -> editing cell (edit mode on, one active cell) ->
//! batch mode with no active cell -> idle after commit or cancel.

use rustc_hash::{FxHashMap, FxHashSet};

use rowgrid_core::{Accessor, ColumnDef, Record, RowId, Value};

use crate::events::GridCallbacks;

/// Where an edit lands: a committed row (stable data index) or a pending
/// row (identity only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLocator {
    Committed(usize),
    Pending(RowId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCell {
    pub row: RowLocator,
    pub column_id: String,
}

/// Traversal direction for save-and-move (Tab / Shift-Tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
}

/// The field a cell edit writes back to: the accessor's field for plain
/// field accessors, the column id for computed ones.
pub(crate) fn patch_field(col: &ColumnDef) -> &str {
    match &col.accessor {
        Accessor::Field(name) => name,
        Accessor::Computed(_) => &col.id,
    }
}

#[derive(Debug, Clone)]
struct PendingRow {
    id: RowId,
    record: Record,
}

#[derive(Debug, Default)]
pub struct EditingSession {
    active: Option<ActiveCell>,
    edit_mode: bool,
    /// Data row index -> patched snapshot of the whole row.
    modified: FxHashMap<usize, Record>,
    pending: Vec<PendingRow>,
    pending_ids: FxHashSet<RowId>,
    /// Armed by `add_pending`; fires once when the displayed row count is
    /// observed to increase.
    auto_edit_armed: bool,
    observed_row_count: usize,
}

impl EditingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn active_cell(&self) -> Option<&ActiveCell> {
        self.active.as_ref()
    }

    /// Any staged changes awaiting commit or discard?
    pub fn is_dirty(&self) -> bool {
        !self.modified.is_empty() || !self.pending.is_empty()
    }

    pub fn modified_row(&self, data_index: usize) -> Option<&Record> {
        self.modified.get(&data_index)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.pending.iter().map(|p| &p.record)
    }

    pub fn pending_record(&self, index: usize) -> Option<&Record> {
        self.pending.get(index).map(|p| &p.record)
    }

    pub fn pending_id(&self, index: usize) -> Option<&RowId> {
        self.pending.get(index).map(|p| &p.id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending_ids.contains(id)
    }

    /// Position of a pending row within the pending list.
    pub fn pending_position(&self, id: &str) -> Option<usize> {
        self.pending.iter().position(|p| p.id == id)
    }

    /// Open a cell for editing. Editability gating happens in the grid;
    /// the session only records the transition.
    pub fn start(&mut self, cell: ActiveCell) {
        self.edit_mode = true;
        self.active = Some(cell);
    }

    /// Close the active cell. Batch mode and staged patches persist.
    pub fn stop(&mut self) {
        self.active = None;
    }

    /// Stage a field change on a committed row: the patch merges into (or
    /// creates) this row's entry, snapshotted from the unmodified row.
    pub fn patch_committed(&mut self, data_index: usize, base: &Record, field: &str, value: Value) {
        let entry = self
            .modified
            .entry(data_index)
            .or_insert_with(|| base.clone());
        entry.set(field, value);
    }

    /// Patch a pending row in place, located by identity. The optional
    /// transform recomputes dependent fields; without one the change is a
    /// shallow merge of the single field.
    pub fn patch_pending(
        &mut self,
        id: &str,
        column_id: &str,
        field: &str,
        value: Value,
        callbacks: &mut GridCallbacks,
    ) -> bool {
        let Some(pending) = self.pending.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        match callbacks.on_pending_cell_change.as_mut() {
            Some(transform) => {
                pending.record = transform(pending.record.clone(), column_id, value);
            }
            None => pending.record.set(field, value),
        }
        true
    }

    /// Append a freshly created row to the pending list and arm the
    /// auto-edit-after-add flag. Refuses duplicate pending identities.
    pub fn add_pending(&mut self, id: RowId, record: Record) -> bool {
        if !self.pending_ids.insert(id.clone()) {
            return false;
        }
        self.pending.push(PendingRow { id, record });
        self.edit_mode = true;
        self.auto_edit_armed = true;
        true
    }

    /// Report the currently displayed row count. Returns true exactly
    /// once after an add, when the count is seen to increase: the signal
    /// to open the new row's first editable cell.
    pub fn observe_row_count(&mut self, count: usize) -> bool {
        let fired = self.auto_edit_armed && count > self.observed_row_count;
        if fired {
            self.auto_edit_armed = false;
        }
        self.observed_row_count = count;
        fired
    }

    /// Commit everything staged. For each modified row, every column's
    /// old value is diffed against the patched value and the per-field
    /// change callback fires for each real difference, one at a time, so
    /// a consumer recomputing derived state inside one callback observes
    /// it before the next field's diff. Pending rows go to the bulk
    /// creation callback as one ordered list and join the committed
    /// storage. The session ends cleared.
    pub fn save_all(
        &mut self,
        rows: &mut Vec<Record>,
        columns: &[ColumnDef],
        callbacks: &mut GridCallbacks,
    ) -> (usize, usize) {
        let mut changed_fields = 0usize;

        let mut indices: Vec<usize> = self.modified.keys().copied().collect();
        indices.sort_unstable();
        for data_index in indices {
            let Some(patched) = self.modified.remove(&data_index) else {
                continue;
            };
            // Stale index (rows shrank since staging): skip silently.
            let Some(original) = rows.get(data_index) else {
                continue;
            };
            let original = original.clone();
            for col in columns {
                let old = col.display_value(&original);
                let new = col.display_value(&patched);
                if old == new {
                    continue;
                }
                changed_fields += 1;
                if let Some(cb) = callbacks.on_cell_value_change.as_mut() {
                    cb(&patched, &col.id, &new, &old);
                }
            }
            rows[data_index] = patched;
        }

        let created = self.pending.len();
        if created > 0 {
            let records: Vec<Record> = self.pending.drain(..).map(|p| p.record).collect();
            if let Some(cb) = callbacks.on_new_rows_save.as_mut() {
                cb(&records);
            }
            rows.extend(records);
        }

        self.pending_ids.clear();
        self.modified.clear();
        self.active = None;
        self.edit_mode = false;
        self.auto_edit_armed = false;

        (changed_fields, created)
    }

    /// Discard everything staged. No callbacks fire.
    pub fn cancel_all(&mut self) {
        self.modified.clear();
        self.pending.clear();
        self.pending_ids.clear();
        self.active = None;
        self.edit_mode = false;
        self.auto_edit_armed = false;
    }
}
