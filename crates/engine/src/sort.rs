//! Multi-key stable sorting driven by the persisted sort spec.
//!
//! The engine never reorders row storage; it produces a permutation of
//! data-row indices that the row view applies. Stability matters: rows
//! tied on every sort key keep their original relative order.

use std::cmp::Ordering;

use rowgrid_config::SortKeySpec;
use rowgrid_core::{value, ColumnDef, Record};

/// Stable permutation of `0..rows.len()` under the sort spec. Spec
/// entries naming undeclared columns are skipped; an effectively empty
/// spec yields the identity permutation.
pub fn sort_permutation(
    rows: &[Record],
    spec: &[SortKeySpec],
    columns: &[ColumnDef],
) -> Vec<usize> {
    let keys: Vec<(&SortKeySpec, &ColumnDef)> = spec
        .iter()
        .filter_map(|entry| {
            columns
                .iter()
                .find(|c| c.id == entry.column_id)
                .map(|c| (entry, c))
        })
        .collect();

    let mut order: Vec<usize> = (0..rows.len()).collect();
    if keys.is_empty() {
        return order;
    }

    order.sort_by(|&a, &b| {
        for (entry, col) in &keys {
            let left = col.sort_value(&rows[a]);
            let right = col.sort_value(&rows[b]);
            let mut ord = value::compare(&left, &right);
            if entry.descending {
                ord = ord.reverse();
            }
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    order
}

/// Header-click gesture over the sort spec: none -> ascending ->
/// descending -> removed. A plain click replaces the whole spec with this
/// column's next state; an additive (shift) click cycles this column in
/// place, preserving the other keys and its own priority.
pub fn cycle_sort(spec: &mut Vec<SortKeySpec>, column_id: &str, additive: bool) {
    let existing = spec.iter().position(|s| s.column_id == column_id);
    let next_descending = match existing {
        None => Some(false),
        Some(i) if !spec[i].descending => Some(true),
        Some(_) => None,
    };

    if additive {
        match (existing, next_descending) {
            (Some(i), Some(descending)) => spec[i].descending = descending,
            (Some(i), None) => {
                spec.remove(i);
            }
            (None, Some(descending)) => spec.push(SortKeySpec {
                column_id: column_id.to_string(),
                descending,
            }),
            (None, None) => {}
        }
    } else {
        spec.clear();
        if let Some(descending) = next_descending {
            spec.push(SortKeySpec {
                column_id: column_id.to_string(),
                descending,
            });
        }
    }
}
