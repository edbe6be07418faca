use serde::{Deserialize, Serialize};

use crate::record::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    None,
    #[default]
    Single,
    Multiple,
}

/// The row selection model: an ordered id set with an anchor for range
/// selection. Ranges are resolved over the currently displayed row order,
/// which the caller passes in; selection itself never sees rows.
#[derive(Debug, Clone)]
pub struct RowSelection {
    mode: SelectionMode,
    selected: Vec<RowId>,
    anchor: Option<RowId>,
}

impl RowSelection {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selected: Vec::new(),
            anchor: None,
        }
    }

    /// Seed an uncontrolled selection with an initial id set.
    pub fn with_initial(mode: SelectionMode, ids: Vec<RowId>) -> Self {
        Self {
            mode,
            selected: ids,
            anchor: None,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        if mode == SelectionMode::None {
            self.selected.clear();
            self.anchor = None;
        }
    }

    pub fn ids(&self) -> &[RowId] {
        &self.selected
    }

    pub fn contains(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Mirror an externally owned id list (controlled mode). The external
    /// list takes precedence over anything accumulated internally.
    pub fn set_ids(&mut self, ids: Vec<RowId>) {
        self.selected = ids;
    }

    /// Plain click. Single: clicking a selected row clears, any other row
    /// replaces. Multiple: toggles membership and moves the anchor.
    /// Returns whether the selection changed.
    pub fn click(&mut self, id: &str) -> bool {
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Single => {
                if self.contains(id) {
                    self.selected.clear();
                    self.anchor = None;
                } else {
                    self.selected = vec![id.to_string()];
                    self.anchor = Some(id.to_string());
                }
                true
            }
            SelectionMode::Multiple => {
                if let Some(pos) = self.selected.iter().position(|s| s == id) {
                    self.selected.remove(pos);
                } else {
                    self.selected.push(id.to_string());
                }
                self.anchor = Some(id.to_string());
                true
            }
        }
    }

    /// Shift-click: select the contiguous range between the anchor and the
    /// clicked row, inclusive, over the displayed order, whichever end is
    /// earlier. Falls back to a plain click when there is no usable anchor.
    pub fn shift_click(&mut self, id: &str, displayed: &[RowId]) -> bool {
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Single => self.click(id),
            SelectionMode::Multiple => {
                let anchor = match &self.anchor {
                    Some(a) => a.clone(),
                    None => return self.click(id),
                };
                let anchor_pos = displayed.iter().position(|r| *r == anchor);
                let click_pos = displayed.iter().position(|r| r == id);
                let (Some(a), Some(b)) = (anchor_pos, click_pos) else {
                    return self.click(id);
                };
                let (start, end) = (a.min(b), a.max(b));
                self.selected = displayed[start..=end].to_vec();
                true
            }
        }
    }

    /// Select the full displayed set (multiple mode only).
    pub fn select_all(&mut self, displayed: &[RowId]) -> bool {
        if self.mode != SelectionMode::Multiple {
            return false;
        }
        self.selected = displayed.to_vec();
        true
    }

    pub fn deselect_all(&mut self) -> bool {
        if self.mode == SelectionMode::None || self.selected.is_empty() {
            return false;
        }
        self.selected.clear();
        self.anchor = None;
        true
    }
}
