//! The grid entry point: owns rows, columns, persisted state and the
//! interacting state machines, and runs the derivation pipeline.
//!
//! Pipeline per change: quick search AND enabled per-column filters
//! produce the visibility mask; the sort spec produces a stable
//! permutation; the row view holds both; displayed rows are the visible
//! committed rows (with staged edits overlaid) followed by pending rows.
//! Staged edits never feed back into filtering or sorting; they are
//! uncommitted.
//!
//! Every mutating gesture updates the persisted state, re-runs the
//! pipeline, fires the matching change callback, and schedules a
//! debounced save. The host drives `tick` to let due writes happen and
//! calls `flush_persistence` on unmount.

use std::time::Instant;

use rowgrid_config::{ActiveFilter, DebouncedWriter, GridState, StateStore};
use rowgrid_core::{
    ColumnDef, ColumnId, PinPosition, Record, RowId, RowSelection, SelectionMode, Value,
};

use crate::aggregate::{self, FooterCell};
use crate::editing::{patch_field, ActiveCell, EditingSession, MoveDirection, RowLocator};
use crate::events::GridCallbacks;
use crate::filter::{self, DateHierarchy, UniqueValue};
use crate::layout::{self, PinnedLayout, ResizeSession};
use crate::sort;
use crate::view::RowView;
use crate::viewport::{self, Align, VirtualWindow};

pub type IdentityFn = Box<dyn Fn(&Record) -> RowId>;
pub type RowFactory = Box<dyn FnMut() -> Record>;

pub struct Grid {
    columns: Vec<ColumnDef>,
    rows: Vec<Record>,
    identity: IdentityFn,
    state_key: String,
    store: Box<dyn StateStore>,
    state: GridState,
    writer: DebouncedWriter,
    view: RowView,
    selection: RowSelection,
    selection_controlled: bool,
    editing: EditingSession,
    callbacks: GridCallbacks,
    row_factory: Option<RowFactory>,
    quick_search: String,
    resize: Option<ResizeSession>,
}

impl Grid {
    /// Mount a grid: state comes from the store when a valid snapshot
    /// exists under `state_key`, else from column defaults. The stored
    /// column order is reconciled against the declared set either way.
    pub fn new(
        columns: Vec<ColumnDef>,
        rows: Vec<Record>,
        identity: impl Fn(&Record) -> RowId + 'static,
        state_key: &str,
        store: Box<dyn StateStore>,
    ) -> Self {
        let mut state = GridState::load(&*store, state_key).unwrap_or_else(|| {
            log::debug!("no stored state for {:?}, using defaults", state_key);
            GridState::default_for(&columns)
        });
        let declared: Vec<ColumnId> = columns.iter().map(|c| c.id.clone()).collect();
        state.column_order = layout::reconcile_order(&declared, &state.column_order);

        let selection = RowSelection::new(state.settings.selection_mode);
        let mut grid = Self {
            columns,
            rows,
            identity: Box::new(identity),
            state_key: state_key.to_string(),
            store,
            state,
            writer: DebouncedWriter::default(),
            view: RowView::new(0),
            selection,
            selection_controlled: false,
            editing: EditingSession::new(),
            callbacks: GridCallbacks::default(),
            row_factory: None,
            quick_search: String::new(),
            resize: None,
        };
        grid.refresh();
        grid
    }

    pub fn with_callbacks(mut self, callbacks: GridCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Row factory for `add_row`. Without one, `add_row` is a no-op.
    pub fn with_row_factory(mut self, factory: impl FnMut() -> Record + 'static) -> Self {
        self.row_factory = Some(Box::new(factory));
        self
    }

    /// Seed the (uncontrolled) selection with an initial id set.
    pub fn with_initial_selection(mut self, ids: Vec<RowId>) -> Self {
        self.selection.set_ids(ids);
        self
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn editing(&self) -> &EditingSession {
        &self.editing
    }

    /// Replace the source row collection (the caller owns fetching).
    pub fn set_rows(&mut self, rows: Vec<Record>) {
        self.rows = rows;
        self.refresh();
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn refresh(&mut self) {
        let mask = self.compute_mask();
        let order = sort::sort_permutation(&self.rows, &self.state.sorting, &self.columns);
        self.view.apply(order, mask);

        let count = self.displayed_row_count();
        if self.editing.observe_row_count(count) {
            self.auto_edit_new_row();
        }
    }

    fn compute_mask(&self) -> Vec<bool> {
        let needle = self.quick_search.trim().to_lowercase();
        let search_cols: Vec<&ColumnDef> = if needle.is_empty() {
            Vec::new()
        } else {
            self.visible_columns()
        };
        let active: Vec<(&ColumnDef, &ActiveFilter)> = self
            .state
            .enabled_filters()
            .filter_map(|(id, f)| {
                // Filters referencing undeclared columns are skipped.
                self.columns.iter().find(|c| &c.id == id).map(|c| (c, f))
            })
            .collect();

        self.rows
            .iter()
            .map(|row| {
                if !needle.is_empty() {
                    let hit = search_cols.iter().any(|col| {
                        col.display_value(row)
                            .to_text()
                            .to_lowercase()
                            .contains(&needle)
                    });
                    if !hit {
                        return false;
                    }
                }
                active
                    .iter()
                    .all(|(col, f)| filter::matches(&col.filter_value(row), f))
            })
            .collect()
    }

    /// Declared columns in persisted order, minus the hidden ones.
    pub fn visible_columns(&self) -> Vec<&ColumnDef> {
        self.state
            .column_order
            .iter()
            .filter_map(|id| self.columns.iter().find(|c| &c.id == id))
            .filter(|c| self.state.is_visible(&c.id))
            .collect()
    }

    /// Derived, never stored.
    pub fn visible_column_count(&self) -> usize {
        self.visible_columns().len()
    }

    /// Committed displayed rows plus pending rows.
    pub fn displayed_row_count(&self) -> usize {
        self.view.display_count() + self.editing.pending_len()
    }

    /// The record shown at a display index: committed rows come with
    /// staged modifications overlaid; indices past the committed window
    /// are pending rows.
    pub fn display_record(&self, display_index: usize) -> Option<Record> {
        let committed = self.view.display_count();
        if display_index < committed {
            let data = self.view.display_rows()[display_index];
            Some(
                self.editing
                    .modified_row(data)
                    .cloned()
                    .unwrap_or_else(|| self.rows[data].clone()),
            )
        } else {
            self.editing
                .pending_record(display_index - committed)
                .cloned()
        }
    }

    /// Identities of all displayed rows, in display order.
    pub fn displayed_ids(&self) -> Vec<RowId> {
        let mut ids: Vec<RowId> = self
            .view
            .display_rows()
            .iter()
            .map(|&d| (self.identity)(&self.rows[d]))
            .collect();
        ids.extend(self.editing.pending_records().map(|r| (self.identity)(r)));
        ids
    }

    fn locator_at(&self, display_index: usize) -> Option<RowLocator> {
        let committed = self.view.display_count();
        if display_index < committed {
            Some(RowLocator::Committed(
                self.view.display_rows()[display_index],
            ))
        } else {
            self.editing
                .pending_id(display_index - committed)
                .cloned()
                .map(RowLocator::Pending)
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    fn schedule_save(&mut self) {
        self.writer
            .schedule(&self.state_key, &self.state, Instant::now());
    }

    /// Cooperative tick: lets a due debounced write happen.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.writer.poll(self.store.as_mut(), now)
    }

    /// Write any staged snapshot immediately (unmount path).
    pub fn flush_persistence(&mut self) -> bool {
        self.writer.flush(self.store.as_mut())
    }

    /// Explicit reset: clear storage, drop any staged write, recompute
    /// defaults.
    pub fn reset_state(&mut self) {
        self.writer.cancel();
        if let Err(e) = self.store.remove(&self.state_key) {
            log::warn!(
                "failed to remove stored grid state for {:?}: {}",
                self.state_key,
                e
            );
        }
        self.state = GridState::default_for(&self.columns);
        self.refresh();
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    pub fn set_filter(&mut self, column_id: &str, active: ActiveFilter) {
        if !self.columns.iter().any(|c| c.id == column_id) {
            return;
        }
        self.state.filters.insert(column_id.to_string(), active);
        self.state.disabled_filters.remove(column_id);
        self.after_filter_change();
    }

    pub fn clear_filter(&mut self, column_id: &str) {
        if self.state.filters.remove(column_id).is_none() {
            return;
        }
        self.state.disabled_filters.remove(column_id);
        self.after_filter_change();
    }

    /// Suspend or resume a filter without losing its configuration.
    pub fn set_filter_enabled(&mut self, column_id: &str, enabled: bool) {
        if !self.state.filters.contains_key(column_id) {
            return;
        }
        if enabled {
            self.state.disabled_filters.remove(column_id);
        } else {
            self.state.disabled_filters.insert(column_id.to_string(), true);
        }
        self.after_filter_change();
    }

    pub fn reset_filters(&mut self) {
        if self.state.filters.is_empty() && self.state.disabled_filters.is_empty() {
            return;
        }
        self.state.filters.clear();
        self.state.disabled_filters.clear();
        self.after_filter_change();
    }

    fn after_filter_change(&mut self) {
        self.refresh();
        if let Some(cb) = self.callbacks.on_filter_change.as_mut() {
            cb(&self.state.filters);
        }
        self.schedule_save();
    }

    /// Global case-insensitive text search across visible columns. Not
    /// persisted.
    pub fn set_quick_search(&mut self, text: &str) {
        self.quick_search = text.to_string();
        self.refresh();
    }

    /// Dropdown authoring data for one column.
    pub fn unique_values(&self, column_id: &str) -> Vec<UniqueValue> {
        self.columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| filter::build_unique_values(&self.rows, c))
            .unwrap_or_default()
    }

    /// Date-filter authoring data for one column.
    pub fn date_hierarchy(&self, column_id: &str) -> DateHierarchy {
        self.columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| filter::build_date_hierarchy(&self.rows, c))
            .unwrap_or_default()
    }

    /// Whether the header filter UI is enabled for a column: the settings
    /// override wins, else the column must declare a filter kind.
    pub fn header_filter_enabled(&self, column_id: &str) -> bool {
        if let Some(over) = self.state.settings.header_filters.get(column_id) {
            return *over;
        }
        self.columns
            .iter()
            .find(|c| c.id == column_id)
            .map_or(false, |c| c.filter.is_some())
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Header click: none -> asc -> desc -> removed; additive keeps the
    /// other keys.
    pub fn toggle_sort(&mut self, column_id: &str, additive: bool) {
        let Some(col) = self.columns.iter().find(|c| c.id == column_id) else {
            return;
        };
        if !col.sortable {
            return;
        }
        sort::cycle_sort(&mut self.state.sorting, column_id, additive);
        self.after_sort_change();
    }

    pub fn reset_sorting(&mut self) {
        if self.state.sorting.is_empty() {
            return;
        }
        self.state.sorting.clear();
        self.after_sort_change();
    }

    fn after_sort_change(&mut self) {
        self.refresh();
        if let Some(cb) = self.callbacks.on_sort_change.as_mut() {
            cb(&self.state.sorting);
        }
        self.schedule_save();
    }

    // =========================================================================
    // Column layout
    // =========================================================================

    /// Visible columns partitioned by pin with sticky offsets.
    pub fn layout(&self) -> PinnedLayout {
        let visible = self.visible_columns();
        layout::pinned_layout(&visible, &self.state)
    }

    pub fn begin_resize(&mut self, column_id: &str, pointer_x: f64) -> bool {
        let Some(col) = self.columns.iter().find(|c| c.id == column_id) else {
            return false;
        };
        let width = layout::effective_width(col, &self.state);
        match ResizeSession::begin(col, width, pointer_x) {
            Some(session) => {
                self.resize = Some(session);
                true
            }
            None => false,
        }
    }

    pub fn update_resize(&mut self, pointer_x: f64) {
        if let Some(session) = self.resize.as_mut() {
            session.update(pointer_x);
        }
    }

    /// Animation-frame hook during a resize drag: applies at most one
    /// width per frame to the live layout. Nothing is persisted yet.
    pub fn resize_frame(&mut self) -> Option<f32> {
        let session = self.resize.as_mut()?;
        let width = session.take_frame()?;
        let id = session.column_id().to_string();
        self.state.column_widths.insert(id, width);
        Some(width)
    }

    /// Pointer release: the final width is persisted. Always ends the
    /// gesture, wherever the pointer ended up.
    pub fn end_resize(&mut self) {
        let Some(session) = self.resize.take() else {
            return;
        };
        let (id, width) = session.finish();
        self.state.column_widths.insert(id, width);
        self.schedule_save();
    }

    /// Abandon the gesture and restore the starting width.
    pub fn cancel_resize(&mut self) {
        let Some(session) = self.resize.take() else {
            return;
        };
        let (id, width) = session.cancel();
        self.state.column_widths.insert(id, width);
    }

    /// Drag-drop reorder (remove + reinsert with shift compensation).
    pub fn move_column(&mut self, source: &str, target_index: usize) {
        let Some(col) = self.columns.iter().find(|c| c.id == source) else {
            return;
        };
        if !col.draggable {
            return;
        }
        let before = self.state.column_order.clone();
        layout::move_column(&mut self.state.column_order, source, target_index);
        if self.state.column_order == before {
            return;
        }
        if let Some(cb) = self.callbacks.on_column_order_change.as_mut() {
            cb(&self.state.column_order);
        }
        self.schedule_save();
    }

    pub fn set_pin(&mut self, column_id: &str, pin: PinPosition) {
        if !self.columns.iter().any(|c| c.id == column_id) {
            return;
        }
        self.state.column_pinned.insert(column_id.to_string(), pin);
        self.schedule_save();
    }

    pub fn set_column_visible(&mut self, column_id: &str, visible: bool) {
        let Some(col) = self.columns.iter().find(|c| c.id == column_id) else {
            return;
        };
        if !visible && !col.hideable {
            return;
        }
        layout::set_visible(&mut self.state.column_visibility, column_id, visible);
        self.after_visibility_change();
    }

    pub fn show_all_columns(&mut self, subset: &[ColumnId]) {
        layout::show_all(&mut self.state.column_visibility, subset);
        self.after_visibility_change();
    }

    pub fn hide_all_columns(&mut self, subset: &[ColumnId]) {
        layout::hide_all(&mut self.state.column_visibility, subset);
        self.after_visibility_change();
    }

    fn after_visibility_change(&mut self) {
        // Quick search spans visible columns, so the mask can change.
        self.refresh();
        if let Some(cb) = self.callbacks.on_column_visibility_change.as_mut() {
            cb(&self.state.column_visibility);
        }
        self.schedule_save();
    }

    // =========================================================================
    // Virtualization
    // =========================================================================

    pub fn window(
        &self,
        scroll_offset: f64,
        viewport_height: f64,
        row_height: f64,
        overscan: usize,
    ) -> VirtualWindow {
        viewport::compute_window(
            scroll_offset,
            viewport_height,
            self.displayed_row_count(),
            row_height,
            overscan,
        )
    }

    pub fn scroll_to_row(
        &self,
        index: usize,
        align: Align,
        viewport_height: f64,
        row_height: f64,
    ) -> f64 {
        viewport::scroll_to(
            index,
            align,
            viewport_height,
            self.displayed_row_count(),
            row_height,
        )
    }

    /// Re-clamp a scroll offset after the displayed set changed.
    pub fn clamp_scroll(&self, scroll_offset: f64, viewport_height: f64, row_height: f64) -> f64 {
        viewport::clamp_scroll(
            scroll_offset,
            viewport_height,
            self.displayed_row_count(),
            row_height,
        )
    }

    // =========================================================================
    // Footer
    // =========================================================================

    /// Aggregates over the filtered (never raw) committed row set.
    pub fn footer(&self) -> Vec<FooterCell> {
        let filtered: Vec<&Record> = self
            .view
            .display_rows()
            .iter()
            .filter_map(|&d| self.rows.get(d))
            .collect();
        aggregate::compute_footer(&filtered, &self.columns, &self.state.settings.footer_overrides)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection.mode()
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection.set_mode(mode);
        self.state.settings.selection_mode = mode;
        self.schedule_save();
    }

    pub fn selected_ids(&self) -> &[RowId] {
        self.selection.ids()
    }

    /// Controlled mode: mirror the externally owned id list; it takes
    /// precedence over internal state.
    pub fn set_external_selection(&mut self, ids: Vec<RowId>) {
        self.selection_controlled = true;
        self.selection.set_ids(ids);
    }

    pub fn is_selection_controlled(&self) -> bool {
        self.selection_controlled
    }

    pub fn row_click(&mut self, display_index: usize, shift: bool) {
        let Some(record) = self.display_record(display_index) else {
            return;
        };
        if let Some(cb) = self.callbacks.on_row_click.as_mut() {
            cb(&record);
        }
        let id = (self.identity)(&record);
        let changed = if shift {
            let displayed = self.displayed_ids();
            self.selection.shift_click(&id, &displayed)
        } else {
            self.selection.click(&id)
        };
        if changed {
            self.emit_selection_change();
        }
    }

    pub fn row_double_click(&mut self, display_index: usize) {
        let Some(record) = self.display_record(display_index) else {
            return;
        };
        if let Some(cb) = self.callbacks.on_row_double_click.as_mut() {
            cb(&record);
        }
    }

    pub fn select_all(&mut self) {
        let displayed = self.displayed_ids();
        if self.selection.select_all(&displayed) {
            self.emit_selection_change();
        }
    }

    pub fn deselect_all(&mut self) {
        if self.selection.deselect_all() {
            self.emit_selection_change();
        }
    }

    fn emit_selection_change(&mut self) {
        if let Some(cb) = self.callbacks.on_selection_change.as_mut() {
            cb(self.selection.ids());
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Open a cell for editing. No-op (false) when the column is not
    /// editable for that row or has no editor configured.
    pub fn start_editing(&mut self, display_index: usize, column_id: &str) -> bool {
        let Some(record) = self.display_record(display_index) else {
            return false;
        };
        let Some(col) = self.columns.iter().find(|c| c.id == column_id) else {
            return false;
        };
        if !col.editable_cell(&record) {
            return false;
        }
        let Some(locator) = self.locator_at(display_index) else {
            return false;
        };
        self.editing.start(ActiveCell {
            row: locator,
            column_id: column_id.to_string(),
        });
        true
    }

    /// Close the active cell; batch mode and staged patches persist.
    pub fn stop_editing(&mut self) {
        self.editing.stop();
    }

    /// Persist the active cell's new value into the staging area and
    /// close the cell.
    pub fn save_value(&mut self, value: Value) -> bool {
        let Some(cell) = self.editing.active_cell().cloned() else {
            return false;
        };
        let applied = self.apply_cell_value(&cell, value);
        self.editing.stop();
        applied
    }

    fn apply_cell_value(&mut self, cell: &ActiveCell, value: Value) -> bool {
        let Some(col) = self.columns.iter().find(|c| c.id == cell.column_id) else {
            return false;
        };
        let field = patch_field(col).to_string();
        match &cell.row {
            RowLocator::Committed(data_index) => {
                let Some(base) = self.rows.get(*data_index) else {
                    return false;
                };
                let base = base.clone();
                self.editing.patch_committed(*data_index, &base, &field, value);
                true
            }
            RowLocator::Pending(id) => {
                self.editing
                    .patch_pending(id, &cell.column_id, &field, value, &mut self.callbacks)
            }
        }
    }

    /// Persist the active cell's value, then move to the next editable
    /// cell: the rest of the current row first, then subsequent rows from
    /// column 0. With nothing left, batch mode stays open with no active
    /// cell.
    pub fn save_and_move(&mut self, value: Value, direction: MoveDirection) {
        let Some(cell) = self.editing.active_cell().cloned() else {
            return;
        };
        self.apply_cell_value(&cell, value);
        self.editing.stop();

        let committed = self.view.display_count();
        let row_index = match &cell.row {
            RowLocator::Committed(data) => self.view.data_to_display(*data),
            RowLocator::Pending(id) => self
                .editing
                .pending_position(id)
                .map(|p| committed + p),
        };
        let Some(row_index) = row_index else {
            return;
        };

        let col_ids: Vec<ColumnId> = self
            .visible_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        let Some(col_index) = col_ids.iter().position(|id| *id == cell.column_id) else {
            return;
        };

        if let Some((row, column_id)) = self.find_editable_cell(row_index, col_index, direction, &col_ids)
        {
            self.start_editing(row, &column_id);
        }
    }

    fn find_editable_cell(
        &self,
        row: usize,
        col: usize,
        direction: MoveDirection,
        col_ids: &[ColumnId],
    ) -> Option<(usize, ColumnId)> {
        let total = self.displayed_row_count();
        match direction {
            MoveDirection::Forward => {
                for c in col + 1..col_ids.len() {
                    if self.cell_editable(row, &col_ids[c]) {
                        return Some((row, col_ids[c].clone()));
                    }
                }
                for r in row + 1..total {
                    for id in col_ids {
                        if self.cell_editable(r, id) {
                            return Some((r, id.clone()));
                        }
                    }
                }
            }
            MoveDirection::Backward => {
                for c in (0..col).rev() {
                    if self.cell_editable(row, &col_ids[c]) {
                        return Some((row, col_ids[c].clone()));
                    }
                }
                for r in (0..row).rev() {
                    for c in (0..col_ids.len()).rev() {
                        if self.cell_editable(r, &col_ids[c]) {
                            return Some((r, col_ids[c].clone()));
                        }
                    }
                }
            }
        }
        None
    }

    fn cell_editable(&self, display_index: usize, column_id: &str) -> bool {
        let Some(record) = self.display_record(display_index) else {
            return false;
        };
        self.columns
            .iter()
            .find(|c| c.id == column_id)
            .map_or(false, |c| c.editable_cell(&record))
    }

    /// Append a freshly created pending row. When the displayed count is
    /// observed to increase, the new row's first editable cell opens for
    /// editing (once).
    pub fn add_row(&mut self) -> bool {
        let Some(factory) = self.row_factory.as_mut() else {
            return false;
        };
        let record = factory();
        let id = (self.identity)(&record);
        if !self.editing.add_pending(id, record) {
            return false;
        }
        self.refresh();
        true
    }

    fn auto_edit_new_row(&mut self) {
        let Some(display_index) = self.displayed_row_count().checked_sub(1) else {
            return;
        };
        let col_ids: Vec<ColumnId> = self
            .visible_columns()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        for column_id in col_ids {
            if self.start_editing(display_index, &column_id) {
                return;
            }
        }
    }

    /// Commit every staged change: per-field diff callbacks one at a
    /// time, then the bulk pending-row callback, then a cleared session.
    pub fn save_all_changes(&mut self) {
        self.editing
            .save_all(&mut self.rows, &self.columns, &mut self.callbacks);
        if let Some(cb) = self.callbacks.on_edit_save.as_mut() {
            cb();
        }
        self.refresh();
    }

    /// Discard every staged change; only the cancel notification fires.
    pub fn cancel_all_changes(&mut self) {
        self.editing.cancel_all();
        if let Some(cb) = self.callbacks.on_edit_cancel.as_mut() {
            cb();
        }
        self.refresh();
    }
}
