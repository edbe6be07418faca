//! Row view layer: maps between display space and data space.
//!
//! Key invariants:
//! - Rendering and selection use display space
//! - Row storage and the editing session's modified map use data space
//! - `order` is always a permutation of data rows (sort output)
//! - `visible_mask` is indexed by DATA row (filter output); sorting
//!   never changes it
//! - `display` caches visible data rows in view order and is rebuilt on
//!   every apply

#[derive(Debug, Clone, Default)]
pub struct RowView {
    /// Permutation: position -> data row.
    order: Vec<usize>,
    /// Filter visibility, indexed by data row.
    visible_mask: Vec<bool>,
    /// Visible data rows in display order.
    display: Vec<usize>,
    /// Inverse: data row -> display index (None when hidden).
    data_to_display: Vec<Option<usize>>,
}

impl RowView {
    /// Identity view over `row_count` rows, everything visible.
    pub fn new(row_count: usize) -> Self {
        let mut view = Self::default();
        view.apply((0..row_count).collect(), vec![true; row_count]);
        view
    }

    pub fn row_count(&self) -> usize {
        self.order.len()
    }

    pub fn display_count(&self) -> usize {
        self.display.len()
    }

    /// Visible data rows in display order.
    pub fn display_rows(&self) -> &[usize] {
        &self.display
    }

    pub fn display_to_data(&self, display_index: usize) -> Option<usize> {
        self.display.get(display_index).copied()
    }

    pub fn data_to_display(&self, data_row: usize) -> Option<usize> {
        self.data_to_display.get(data_row).copied().flatten()
    }

    pub fn is_data_visible(&self, data_row: usize) -> bool {
        self.visible_mask.get(data_row).copied().unwrap_or(false)
    }

    pub fn is_filtered(&self) -> bool {
        self.display.len() < self.order.len()
    }

    pub fn is_sorted(&self) -> bool {
        self.order.iter().enumerate().any(|(i, &d)| i != d)
    }

    /// Install a new sort permutation and filter mask together and
    /// rebuild the caches. Both must cover the same row count.
    pub fn apply(&mut self, order: Vec<usize>, visible_mask: Vec<bool>) {
        debug_assert_eq!(order.len(), visible_mask.len());
        self.order = order;
        self.visible_mask = visible_mask;

        self.display.clear();
        self.data_to_display = vec![None; self.order.len()];
        for &data_row in &self.order {
            if self.visible_mask.get(data_row).copied().unwrap_or(false) {
                self.data_to_display[data_row] = Some(self.display.len());
                self.display.push(data_row);
            }
        }
    }
}
