//! The versioned, persisted grid state snapshot.
//!
//! One `GridState` per grid, keyed by a caller-supplied identifier. It is
//! created from storage (or defaults) at mount, mutated in place by every
//! layout/filter/sort gesture, and written back through the debounced
//! writer. Loading an older schema applies additive migration: fields the
//! old shape lacks are filled with defaults, everything still valid is
//! kept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rowgrid_core::{ColumnDef, ColumnId, PinPosition, SelectionMode};

use crate::filter::ActiveFilter;
use crate::store::StateStore;

/// Bump when the persisted shape changes. Loads with any other version go
/// through additive migration and are treated as current afterwards.
pub const SCHEMA_VERSION: u32 = 3;

/// One entry of the multi-key sort spec, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKeySpec {
    pub column_id: ColumnId,
    #[serde(default)]
    pub descending: bool,
}

impl SortKeySpec {
    pub fn asc(column_id: &str) -> Self {
        Self {
            column_id: column_id.to_string(),
            descending: false,
        }
    }

    pub fn desc(column_id: &str) -> Self {
        Self {
            column_id: column_id.to_string(),
            descending: true,
        }
    }
}

/// Serializable footer override kept in settings. `None` means "no
/// override"; any other variant replaces the column's declared
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FooterAggregate {
    #[default]
    None,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    DistinctCount,
}

/// Grid-level settings persisted alongside layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridSettings {
    pub selection_mode: SelectionMode,
    /// Per-column header-filter enable override; absent = column default.
    pub header_filters: BTreeMap<ColumnId, bool>,
    /// Per-column footer aggregation override.
    pub footer_overrides: BTreeMap<ColumnId, FooterAggregate>,
    pub striped_rows: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::default(),
            header_filters: BTreeMap::new(),
            footer_overrides: BTreeMap::new(),
            striped_rows: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridState {
    pub column_widths: BTreeMap<ColumnId, f32>,
    pub column_order: Vec<ColumnId>,
    /// Missing entry = visible.
    pub column_visibility: BTreeMap<ColumnId, bool>,
    /// Explicit pin overrides; missing entry = column definition default.
    pub column_pinned: BTreeMap<ColumnId, PinPosition>,
    pub sorting: Vec<SortKeySpec>,
    pub filters: BTreeMap<ColumnId, ActiveFilter>,
    /// A filter can be kept but temporarily suspended.
    pub disabled_filters: BTreeMap<ColumnId, bool>,
    pub settings: GridSettings,
    pub version: u32,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            column_widths: BTreeMap::new(),
            column_order: Vec::new(),
            column_visibility: BTreeMap::new(),
            column_pinned: BTreeMap::new(),
            sorting: Vec::new(),
            filters: BTreeMap::new(),
            disabled_filters: BTreeMap::new(),
            settings: GridSettings::default(),
            version: SCHEMA_VERSION,
        }
    }
}

impl GridState {
    /// Fresh state for a column set: declaration order, visibility from
    /// the declared flag, widths only where a width was declared,
    /// everything else empty.
    pub fn default_for(columns: &[ColumnDef]) -> Self {
        let mut state = Self::default();
        state.column_order = columns.iter().map(|c| c.id.clone()).collect();
        for col in columns {
            if !col.visible {
                state.column_visibility.insert(col.id.clone(), false);
            }
            if let Some(width) = col.width {
                state.column_widths.insert(col.id.clone(), width);
            }
        }
        state
    }

    /// Load from storage. Absent or unparseable entries yield `None` and
    /// the caller falls back to defaults; a version mismatch is migrated
    /// additively and treated as current.
    pub fn load(store: &dyn StateStore, key: &str) -> Option<Self> {
        let raw = store.read(key)?;
        let mut state: GridState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("discarding unparseable grid state for {:?}: {}", key, e);
                return None;
            }
        };
        if state.version != SCHEMA_VERSION {
            log::debug!(
                "migrating grid state for {:?} from v{} to v{}",
                key,
                state.version,
                SCHEMA_VERSION
            );
            state.version = SCHEMA_VERSION;
        }
        Some(state)
    }

    /// Whether a column is visible under this state.
    pub fn is_visible(&self, id: &str) -> bool {
        self.column_visibility.get(id).copied().unwrap_or(true)
    }

    /// Effective pin for a column: explicit state entry, else the
    /// definition default.
    pub fn pin_for(&self, col: &ColumnDef) -> PinPosition {
        self.column_pinned.get(&col.id).copied().unwrap_or(col.pin)
    }

    /// Whether a column's filter is present and not suspended.
    pub fn filter_enabled(&self, id: &str) -> bool {
        self.filters.contains_key(id) && !self.disabled_filters.get(id).copied().unwrap_or(false)
    }

    /// Filters that currently participate in evaluation.
    pub fn enabled_filters(&self) -> impl Iterator<Item = (&ColumnId, &ActiveFilter)> + '_ {
        self.filters
            .iter()
            .filter(|(id, _)| !self.disabled_filters.get(*id).copied().unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ActiveFilter;
    use crate::store::MemoryStore;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("name", "Name").with_width(160.0),
            ColumnDef::new("city", "City"),
            ColumnDef::new("notes", "Notes").hidden(),
        ]
    }

    #[test]
    fn test_default_for_columns() {
        let state = GridState::default_for(&columns());
        assert_eq!(state.column_order, ["name", "city", "notes"]);
        assert_eq!(state.column_widths.get("name"), Some(&160.0));
        assert!(!state.column_widths.contains_key("city"));
        assert!(state.is_visible("name"));
        assert!(!state.is_visible("notes"));
        assert!(state.sorting.is_empty());
        assert!(state.filters.is_empty());
        assert_eq!(state.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_load_absent_and_malformed() {
        let mut store = MemoryStore::new();
        assert!(GridState::load(&store, "missing").is_none());

        store.write("broken", "{not json").unwrap();
        assert!(GridState::load(&store, "broken").is_none());
    }

    #[test]
    fn test_migration_fills_missing_fields() {
        // Older shape: no columnPinned, no disabledFilters, old version.
        let old = r#"{
            "columnWidths": {"name": 120.0},
            "columnOrder": ["name", "city"],
            "columnVisibility": {"city": false},
            "sorting": [{"columnId": "name", "descending": true}],
            "filters": {},
            "settings": {},
            "version": 1
        }"#;
        let mut store = MemoryStore::new();
        store.write("grid", old).unwrap();

        let state = GridState::load(&store, "grid").unwrap();
        assert_eq!(state.version, SCHEMA_VERSION);
        assert!(state.column_pinned.is_empty());
        assert!(state.disabled_filters.is_empty());
        // Still-valid fields preserved unchanged.
        assert_eq!(state.column_widths.get("name"), Some(&120.0));
        assert_eq!(state.column_order, ["name", "city"]);
        assert!(!state.is_visible("city"));
        assert_eq!(state.sorting, vec![SortKeySpec::desc("name")]);
    }

    #[test]
    fn test_disabled_filter_excluded_from_enabled_set() {
        let mut state = GridState::default();
        state
            .filters
            .insert("city".into(), ActiveFilter::dropdown(["A"], false));
        state
            .filters
            .insert("name".into(), ActiveFilter::dropdown(["B"], false));
        state.disabled_filters.insert("city".into(), true);

        assert!(!state.filter_enabled("city"));
        assert!(state.filter_enabled("name"));
        let enabled: Vec<_> = state.enabled_filters().map(|(id, _)| id.clone()).collect();
        assert_eq!(enabled, ["name"]);
    }

    #[test]
    fn test_wire_format_round_trip() {
        let mut state = GridState::default_for(&columns());
        state.sorting.push(SortKeySpec::asc("city"));
        state
            .filters
            .insert("city".into(), ActiveFilter::dropdown(["Oslo"], true));
        state
            .column_pinned
            .insert("name".into(), PinPosition::Left);

        let json = serde_json::to_string_pretty(&state).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "columnWidths",
            "columnOrder",
            "columnVisibility",
            "columnPinned",
            "sorting",
            "filters",
            "disabledFilters",
            "settings",
            "version",
        ] {
            assert!(parsed.get(key).is_some(), "missing key {}", key);
        }

        let back: GridState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
