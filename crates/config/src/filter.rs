//! Active filter configurations: the evaluable, persisted filter state
//! for one column, as opposed to the static filter capability declared on
//! the column definition.
//!
//! Set-valued fields use `BTreeSet` so they serialize as ordered arrays
//! and reconstruct into sets on load.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Conditions for the text input filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputCondition {
    #[default]
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    NotContains,
    NotEqual,
    Blank,
    NotBlank,
}

impl InputCondition {
    /// Blank/notBlank need no filter value; everything else does.
    pub fn requires_value(&self) -> bool {
        !matches!(self, InputCondition::Blank | InputCondition::NotBlank)
    }
}

/// Conditions for the numeric filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumericCondition {
    #[default]
    Equals,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Between,
}

/// The applied filter for one column. Filter values are kept as the raw
/// strings the authoring UI produced; numeric parsing happens at
/// evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActiveFilter {
    #[serde(rename_all = "camelCase")]
    Dropdown {
        #[serde(default)]
        selected: BTreeSet<String>,
        #[serde(default)]
        show_blanks: bool,
    },
    #[serde(rename_all = "camelCase")]
    Input {
        #[serde(default)]
        condition: InputCondition,
        #[serde(default)]
        value: String,
    },
    #[serde(rename_all = "camelCase")]
    Numeric {
        #[serde(default)]
        condition: NumericCondition,
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_to: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DateTree {
        /// Selected day keys, `YYYY-MM-DD`.
        #[serde(default)]
        selected: BTreeSet<String>,
        #[serde(default)]
        show_blanks: bool,
    },
}

impl ActiveFilter {
    pub fn dropdown<I: IntoIterator<Item = S>, S: Into<String>>(
        selected: I,
        show_blanks: bool,
    ) -> Self {
        ActiveFilter::Dropdown {
            selected: selected.into_iter().map(Into::into).collect(),
            show_blanks,
        }
    }

    pub fn input(condition: InputCondition, value: &str) -> Self {
        ActiveFilter::Input {
            condition,
            value: value.to_string(),
        }
    }

    pub fn numeric(condition: NumericCondition, value: &str) -> Self {
        ActiveFilter::Numeric {
            condition,
            value: value.to_string(),
            value_to: None,
        }
    }

    pub fn numeric_between(value: &str, value_to: &str) -> Self {
        ActiveFilter::Numeric {
            condition: NumericCondition::Between,
            value: value.to_string(),
            value_to: Some(value_to.to_string()),
        }
    }

    pub fn date_tree<I: IntoIterator<Item = S>, S: Into<String>>(
        selected: I,
        show_blanks: bool,
    ) -> Self {
        ActiveFilter::DateTree {
            selected: selected.into_iter().map(Into::into).collect(),
            show_blanks,
        }
    }
}
