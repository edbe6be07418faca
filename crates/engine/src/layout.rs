//! Column layout: order reconciliation, drag reorder, pin partitioning
//! with sticky offsets, resize gestures, and visibility toggles.
//!
//! Layout reads column definitions but writes only to the persisted grid
//! state; widths, order, visibility and pins all live there.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use rowgrid_config::GridState;
use rowgrid_core::{ColumnDef, ColumnId, PinPosition};

/// Fallback width for columns with neither a persisted nor a declared
/// width.
pub const DEFAULT_COLUMN_WIDTH: f32 = 80.0;
/// Fallback resize floor when a column declares no minimum.
pub const MIN_COLUMN_WIDTH: f32 = 40.0;

/// Reconcile a stored order against the declared column set: stale ids
/// are dropped, duplicates collapse to their first occurrence, and
/// missing ids are appended in declaration order. The result is always a
/// permutation of the declared ids.
pub fn reconcile_order(declared: &[ColumnId], stored: &[ColumnId]) -> Vec<ColumnId> {
    let declared_set: FxHashSet<&str> = declared.iter().map(String::as_str).collect();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut order: Vec<ColumnId> = Vec::with_capacity(declared.len());

    for id in stored {
        if declared_set.contains(id.as_str()) && seen.insert(id.as_str()) {
            order.push(id.clone());
        }
    }
    for id in declared {
        if seen.insert(id.as_str()) {
            order.push(id.clone());
        }
    }
    order
}

/// Drag-drop reorder: remove the source id, then reinsert at the target
/// index, decrementing the insertion index when the source's original
/// position was before the target (the removal shifted everything left).
pub fn move_column(order: &mut Vec<ColumnId>, source: &str, target_index: usize) {
    let Some(from) = order.iter().position(|id| id == source) else {
        return;
    };
    let id = order.remove(from);
    let mut to = target_index;
    if from < to {
        to -= 1;
    }
    order.insert(to.min(order.len()), id);
}

/// Effective rendered width: persisted override, else declared width,
/// else the fallback default, clamped to the column's bounds.
pub fn effective_width(col: &ColumnDef, state: &GridState) -> f32 {
    let width = state
        .column_widths
        .get(&col.id)
        .copied()
        .or(col.width)
        .unwrap_or(DEFAULT_COLUMN_WIDTH);
    clamp_width(col, width)
}

fn clamp_width(col: &ColumnDef, width: f32) -> f32 {
    let min = col.min_width.unwrap_or(MIN_COLUMN_WIDTH);
    let max = col.max_width.unwrap_or(f32::INFINITY);
    width.clamp(min, max)
}

// =============================================================================
// Pin partitioning
// =============================================================================

/// One visible column placed by the layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutColumn {
    pub id: ColumnId,
    pub width: f32,
    pub pin: PinPosition,
    /// Sticky offset from the pinned edge; `None` for center columns.
    pub offset: Option<f32>,
    /// Last left-pinned / first right-pinned column, for boundary
    /// styling.
    pub boundary: bool,
}

/// Visible columns partitioned by pin position. Relative order within
/// each partition matches the overall column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinnedLayout {
    pub left: Vec<LayoutColumn>,
    pub center: Vec<LayoutColumn>,
    pub right: Vec<LayoutColumn>,
}

impl PinnedLayout {
    /// All visible columns in render order: left, center, right.
    pub fn iter(&self) -> impl Iterator<Item = &LayoutColumn> + '_ {
        self.left.iter().chain(&self.center).chain(&self.right)
    }

    pub fn total_width(&self) -> f32 {
        self.iter().map(|c| c.width).sum()
    }
}

/// Partition the ordered visible columns and accumulate sticky offsets:
/// left-pinned offsets grow left-to-right from 0, right-pinned offsets
/// grow right-to-left from 0. Explicit pins in the grid state override
/// the definition defaults.
pub fn pinned_layout(visible: &[&ColumnDef], state: &GridState) -> PinnedLayout {
    let mut layout = PinnedLayout::default();

    for col in visible {
        let pin = state.pin_for(col);
        let entry = LayoutColumn {
            id: col.id.clone(),
            width: effective_width(col, state),
            pin,
            offset: None,
            boundary: false,
        };
        match pin {
            PinPosition::Left => layout.left.push(entry),
            PinPosition::None => layout.center.push(entry),
            PinPosition::Right => layout.right.push(entry),
        }
    }

    let mut acc = 0.0_f32;
    for col in &mut layout.left {
        col.offset = Some(acc);
        acc += col.width;
    }
    if let Some(last) = layout.left.last_mut() {
        last.boundary = true;
    }

    let mut acc = 0.0_f32;
    for col in layout.right.iter_mut().rev() {
        col.offset = Some(acc);
        acc += col.width;
    }
    if let Some(first) = layout.right.first_mut() {
        first.boundary = true;
    }

    layout
}

// =============================================================================
// Gesture sessions
// =============================================================================

/// A pointer-drag resize in progress. Width changes are read back at most
/// once per animation frame via `take_frame`; the gesture always ends
/// through `finish` or `cancel`, including a pointer released outside the
/// grid surface.
#[derive(Debug, Clone)]
pub struct ResizeSession {
    column_id: ColumnId,
    start_x: f64,
    start_width: f32,
    min: f32,
    max: f32,
    latest_x: f64,
    frame_dirty: bool,
}

impl ResizeSession {
    /// `None` when the column is not resizable.
    pub fn begin(col: &ColumnDef, current_width: f32, pointer_x: f64) -> Option<Self> {
        if !col.resizable {
            return None;
        }
        Some(Self {
            column_id: col.id.clone(),
            start_x: pointer_x,
            start_width: current_width,
            min: col.min_width.unwrap_or(MIN_COLUMN_WIDTH),
            max: col.max_width.unwrap_or(f32::INFINITY),
            latest_x: pointer_x,
            frame_dirty: false,
        })
    }

    pub fn column_id(&self) -> &str {
        &self.column_id
    }

    /// Record pointer movement. Cheap; may be called many times per
    /// frame.
    pub fn update(&mut self, pointer_x: f64) {
        self.latest_x = pointer_x;
        self.frame_dirty = true;
    }

    /// Width for this animation frame, or `None` when nothing moved since
    /// the last frame. This is the per-frame throttle: a burst of pointer
    /// events collapses to one applied width.
    pub fn take_frame(&mut self) -> Option<f32> {
        if !self.frame_dirty {
            return None;
        }
        self.frame_dirty = false;
        Some(self.current_width())
    }

    pub fn current_width(&self) -> f32 {
        let width = self.start_width + (self.latest_x - self.start_x) as f32;
        width.clamp(self.min, self.max)
    }

    /// Final width to persist on pointer release.
    pub fn finish(self) -> (ColumnId, f32) {
        let width = self.current_width();
        (self.column_id, width)
    }

    /// Abandon the gesture; the caller restores the starting width.
    pub fn cancel(self) -> (ColumnId, f32) {
        (self.column_id, self.start_width)
    }
}

/// A column-header drag in progress. Only tracks the hover target; the
/// drop applies `move_column`.
#[derive(Debug, Clone)]
pub struct DragSession {
    source: ColumnId,
    target: Option<usize>,
}

impl DragSession {
    /// `None` when the column is not draggable.
    pub fn begin(col: &ColumnDef) -> Option<Self> {
        if !col.draggable {
            return None;
        }
        Some(Self {
            source: col.id.clone(),
            target: None,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn hover(&mut self, target_index: usize) {
        self.target = Some(target_index);
    }

    /// Apply the reorder. Returns whether the order changed; a drop with
    /// no hover target is a no-op.
    pub fn drop_on(self, order: &mut Vec<ColumnId>) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        let before = order.clone();
        move_column(order, &self.source, target);
        *order != before
    }
}

// =============================================================================
// Visibility
// =============================================================================

pub fn set_visible(visibility: &mut BTreeMap<ColumnId, bool>, id: &str, visible: bool) {
    visibility.insert(id.to_string(), visible);
}

/// Show every column in the caller-supplied subset (typically the
/// hideable columns only).
pub fn show_all(visibility: &mut BTreeMap<ColumnId, bool>, subset: &[ColumnId]) {
    for id in subset {
        visibility.insert(id.clone(), true);
    }
}

pub fn hide_all(visibility: &mut BTreeMap<ColumnId, bool>, subset: &[ColumnId]) {
    for id in subset {
        visibility.insert(id.clone(), false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<ColumnId> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reconcile_drops_stale_appends_missing() {
        let declared = ids(&["a", "b", "c", "d"]);
        let stored = ids(&["c", "ghost", "a", "c"]);
        let order = reconcile_order(&declared, &stored);
        assert_eq!(order, ids(&["c", "a", "b", "d"]));
    }

    #[test]
    fn test_move_column_forward_and_back() {
        let mut order = ids(&["a", "b", "c", "d"]);
        // Move "a" after "c": source before target, index compensated.
        move_column(&mut order, "a", 3);
        assert_eq!(order, ids(&["b", "c", "a", "d"]));

        // Move "d" to the front: source after target, no compensation.
        move_column(&mut order, "d", 0);
        assert_eq!(order, ids(&["d", "b", "c", "a"]));
    }

    #[test]
    fn test_move_column_permutation_invariant() {
        let declared = ids(&["a", "b", "c", "d", "e"]);
        for source in 0..declared.len() {
            for target in 0..=declared.len() {
                let mut order = declared.clone();
                let id = order[source].clone();
                move_column(&mut order, &id, target);

                let mut sorted = order.clone();
                sorted.sort();
                let mut expected = declared.clone();
                expected.sort();
                assert_eq!(sorted, expected, "move {} -> {} lost or duplicated ids", source, target);
            }
        }
    }

    #[test]
    fn test_move_unknown_column_is_noop() {
        let mut order = ids(&["a", "b"]);
        move_column(&mut order, "ghost", 1);
        assert_eq!(order, ids(&["a", "b"]));
    }

    fn pin_cols() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("a", "A").with_width(50.0).pinned(PinPosition::Left),
            ColumnDef::new("b", "B").with_width(60.0).pinned(PinPosition::Left),
            ColumnDef::new("c", "C").with_width(70.0),
            ColumnDef::new("d", "D").with_width(80.0).pinned(PinPosition::Right),
            ColumnDef::new("e", "E").with_width(90.0).pinned(PinPosition::Right),
        ]
    }

    #[test]
    fn test_pin_offsets_accumulate() {
        let cols = pin_cols();
        let state = GridState::default_for(&cols);
        let refs: Vec<&ColumnDef> = cols.iter().collect();
        let layout = pinned_layout(&refs, &state);

        // Left offsets: sum of preceding left widths.
        assert_eq!(layout.left[0].offset, Some(0.0));
        assert_eq!(layout.left[1].offset, Some(50.0));
        // Right offsets accumulate right-to-left.
        assert_eq!(layout.right[1].offset, Some(0.0));
        assert_eq!(layout.right[0].offset, Some(90.0));
        // Center columns have no sticky offset.
        assert_eq!(layout.center[0].offset, None);
        // Boundary marks: last left, first right.
        assert!(layout.left[1].boundary);
        assert!(!layout.left[0].boundary);
        assert!(layout.right[0].boundary);
        assert!(!layout.right[1].boundary);
    }

    #[test]
    fn test_state_pin_overrides_definition() {
        let cols = pin_cols();
        let mut state = GridState::default_for(&cols);
        state.column_pinned.insert("a".into(), PinPosition::None);
        state.column_pinned.insert("c".into(), PinPosition::Left);
        let refs: Vec<&ColumnDef> = cols.iter().collect();
        let layout = pinned_layout(&refs, &state);

        let left_ids: Vec<&str> = layout.left.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(left_ids, ["b", "c"], "relative order preserved");
        let center_ids: Vec<&str> = layout.center.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(center_ids, ["a"]);
    }

    #[test]
    fn test_effective_width_fallbacks() {
        let cols = vec![
            ColumnDef::new("w", "W").with_width(120.0),
            ColumnDef::new("n", "N"),
        ];
        let mut state = GridState::default_for(&cols);
        assert_eq!(effective_width(&cols[0], &state), 120.0);
        assert_eq!(effective_width(&cols[1], &state), DEFAULT_COLUMN_WIDTH);
        state.column_widths.insert("n".into(), 200.0);
        assert_eq!(effective_width(&cols[1], &state), 200.0);
    }

    #[test]
    fn test_resize_clamps_and_throttles() {
        let col = ColumnDef::new("a", "A").with_width_bounds(50.0, 300.0);
        let mut session = ResizeSession::begin(&col, 100.0, 500.0).unwrap();

        // Many pointer events, one frame readback.
        session.update(520.0);
        session.update(540.0);
        session.update(560.0);
        assert_eq!(session.take_frame(), Some(160.0));
        assert_eq!(session.take_frame(), None, "no movement since last frame");

        // Clamped to max.
        session.update(1500.0);
        assert_eq!(session.take_frame(), Some(300.0));

        // Clamped to min, then finish persists the final width.
        session.update(-1500.0);
        let (id, width) = session.finish();
        assert_eq!(id, "a");
        assert_eq!(width, 50.0);
    }

    #[test]
    fn test_resize_cancel_restores_start() {
        let col = ColumnDef::new("a", "A");
        let mut session = ResizeSession::begin(&col, 100.0, 0.0).unwrap();
        session.update(400.0);
        let (_, width) = session.cancel();
        assert_eq!(width, 100.0);
    }

    #[test]
    fn test_resize_refused_for_fixed_column() {
        let mut col = ColumnDef::new("a", "A");
        col.resizable = false;
        assert!(ResizeSession::begin(&col, 100.0, 0.0).is_none());
    }

    #[test]
    fn test_drag_session_drop() {
        let col = ColumnDef::new("a", "A");
        let mut order = ids(&["a", "b", "c"]);

        let mut drag = DragSession::begin(&col).unwrap();
        drag.hover(2);
        assert!(drag.drop_on(&mut order));
        assert_eq!(order, ids(&["b", "a", "c"]));

        // Drop without a hover target is a no-op.
        let drag = DragSession::begin(&col).unwrap();
        assert!(!drag.drop_on(&mut order));
    }

    #[test]
    fn test_visibility_subset_ops() {
        let mut vis = BTreeMap::new();
        let hideable = ids(&["b", "c"]);
        hide_all(&mut vis, &hideable);
        assert_eq!(vis.get("b"), Some(&false));
        assert_eq!(vis.get("c"), Some(&false));
        assert!(!vis.contains_key("a"), "outside the subset untouched");

        show_all(&mut vis, &hideable);
        assert_eq!(vis.get("b"), Some(&true));

        set_visible(&mut vis, "a", false);
        assert_eq!(vis.get("a"), Some(&false));
    }
}
