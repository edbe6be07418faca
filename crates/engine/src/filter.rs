//! Active-filter evaluation and filter-authoring data.
//!
//! Evaluation is a pure predicate over one cell value: the grid resolves
//! a column's filter value (filter accessor override, else the display
//! accessor) and asks whether it passes the column's active filter.
//! Filters combine with logical AND across all enabled columns; that
//! combination lives in the grid pipeline, not here.
//!
//! Authoring data feeds the filter popovers: unique value counts for the
//! dropdown filter, and a year/month/day tree of day keys for the date
//! filter's tri-state bulk selection.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;
use serde::Serialize;

use rowgrid_config::{ActiveFilter, InputCondition, NumericCondition};
use rowgrid_core::{ColumnDef, Record, Value};

/// Does one cell value pass one active filter?
pub fn matches(value: &Value, filter: &ActiveFilter) -> bool {
    match filter {
        ActiveFilter::Dropdown {
            selected,
            show_blanks,
        } => {
            if value.is_blank() {
                *show_blanks
            } else {
                selected.contains(&value.to_text())
            }
        }
        ActiveFilter::Input { condition, value: needle } => {
            input_matches(value, *condition, needle)
        }
        ActiveFilter::Numeric {
            condition,
            value: raw,
            value_to,
        } => numeric_matches(value, *condition, raw, value_to.as_deref()),
        ActiveFilter::DateTree {
            selected,
            show_blanks,
        } => {
            if value.is_blank() {
                *show_blanks
            } else {
                match day_key(value) {
                    Some(key) => selected.contains(&key),
                    None => false,
                }
            }
        }
    }
}

fn input_matches(value: &Value, condition: InputCondition, needle: &str) -> bool {
    match condition {
        InputCondition::Blank => return value.is_blank(),
        InputCondition::NotBlank => return !value.is_blank(),
        _ => {}
    }
    if needle.trim().is_empty() {
        // Value-requiring condition with no value: no-op filter.
        return true;
    }
    let hay = value.to_text().to_lowercase();
    let needle = needle.to_lowercase();
    match condition {
        InputCondition::Contains => hay.contains(&needle),
        InputCondition::Equals => hay == needle,
        InputCondition::StartsWith => hay.starts_with(&needle),
        InputCondition::EndsWith => hay.ends_with(&needle),
        InputCondition::NotContains => !hay.contains(&needle),
        InputCondition::NotEqual => hay != needle,
        InputCondition::Blank | InputCondition::NotBlank => true,
    }
}

fn numeric_matches(
    value: &Value,
    condition: NumericCondition,
    raw: &str,
    raw_to: Option<&str>,
) -> bool {
    if condition == NumericCondition::Between {
        // Between constrains only when both bounds are valid finite
        // numbers; otherwise rows pass unfiltered.
        let (Some(lo), Some(hi)) = (parse_finite(raw), raw_to.and_then(parse_finite)) else {
            return true;
        };
        let Some(n) = value.as_number() else {
            return false;
        };
        return n >= lo && n <= hi;
    }
    // Relational conditions fail outright on a non-numeric cell or filter
    // value.
    let (Some(bound), Some(n)) = (parse_finite(raw), value.as_number()) else {
        return false;
    };
    match condition {
        NumericCondition::Equals => n == bound,
        NumericCondition::NotEqual => n != bound,
        NumericCondition::GreaterThan => n > bound,
        NumericCondition::LessThan => n < bound,
        NumericCondition::GreaterThanOrEqual => n >= bound,
        NumericCondition::LessThanOrEqual => n <= bound,
        NumericCondition::Between => true,
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

// =============================================================================
// Day keys
// =============================================================================

/// The cell value truncated to a local calendar day, `YYYY-MM-DD`.
/// Numbers are Unix milliseconds; text is parsed as RFC 3339, naive
/// datetime, or plain date. Unparseable non-blank values have no key.
pub fn day_key(value: &Value) -> Option<String> {
    day_date(value).map(|d| d.format("%Y-%m-%d").to_string())
}

fn day_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(millis) => DateTime::from_timestamp_millis(*millis as i64)
            .map(|dt| dt.with_timezone(&Local).date_naive()),
        Value::Text(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    // Tolerate a date prefix on longer strings (e.g. fractional seconds).
    if s.len() > 10 {
        if let Ok(d) = NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d") {
            return Some(d);
        }
    }
    None
}

// =============================================================================
// Filter authoring data
// =============================================================================

/// One dropdown entry: a distinct string form with its row count. The
/// blank bucket collects null/empty values and always sorts last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueValue {
    pub value: String,
    pub count: usize,
    pub is_blank: bool,
}

/// Distinct filter values for a column, alphabetical with the blank
/// bucket forced last. Buckets by exact string form of the filter value.
pub fn build_unique_values(rows: &[Record], column: &ColumnDef) -> Vec<UniqueValue> {
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    let mut blanks = 0usize;
    for row in rows {
        let value = column.filter_value(row);
        if value.is_blank() {
            blanks += 1;
        } else {
            *counts.entry(value.to_text()).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<UniqueValue> = counts
        .into_iter()
        .map(|(value, count)| UniqueValue {
            value,
            count,
            is_blank: false,
        })
        .collect();
    entries.sort_by(|a, b| {
        let left = a.value.to_lowercase();
        let right = b.value.to_lowercase();
        left.cmp(&right).then_with(|| a.value.cmp(&b.value))
    });

    if blanks > 0 {
        entries.push(UniqueValue {
            value: String::new(),
            count: blanks,
            is_blank: true,
        });
    }
    entries
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayNode {
    pub day: u32,
    /// The day key, `YYYY-MM-DD`.
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthNode {
    pub month: u32,
    pub days: Vec<DayNode>,
}

impl MonthNode {
    pub fn day_keys(&self) -> Vec<String> {
        self.days.iter().map(|d| d.key.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearNode {
    pub year: i32,
    pub months: Vec<MonthNode>,
}

impl YearNode {
    pub fn day_keys(&self) -> Vec<String> {
        self.months.iter().flat_map(|m| m.day_keys()).collect()
    }
}

/// Year -> month -> day tree over all non-blank, parseable values of a
/// column, plus the flat key list. Drives tri-state (checked /
/// indeterminate / unchecked) bulk selection at year and month
/// granularity: a node is checked when all of its day keys are selected,
/// indeterminate when some are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateHierarchy {
    pub years: Vec<YearNode>,
    pub all_day_keys: Vec<String>,
}

pub fn build_date_hierarchy(rows: &[Record], column: &ColumnDef) -> DateHierarchy {
    let mut tree: BTreeMap<i32, BTreeMap<u32, BTreeMap<u32, usize>>> = BTreeMap::new();
    for row in rows {
        let value = column.filter_value(row);
        if value.is_blank() {
            continue;
        }
        if let Some(date) = day_date(&value) {
            *tree
                .entry(date.year())
                .or_default()
                .entry(date.month())
                .or_default()
                .entry(date.day())
                .or_insert(0) += 1;
        }
    }

    let mut hierarchy = DateHierarchy::default();
    for (year, months) in tree {
        let mut year_node = YearNode {
            year,
            months: Vec::new(),
        };
        for (month, days) in months {
            let mut month_node = MonthNode {
                month,
                days: Vec::new(),
            };
            for (day, count) in days {
                let key = format!("{:04}-{:02}-{:02}", year, month, day);
                hierarchy.all_day_keys.push(key.clone());
                month_node.days.push(DayNode { day, key, count });
            }
            year_node.months.push(month_node);
        }
        hierarchy.years.push(year_node);
    }
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowgrid_core::FilterKind;

    fn city_rows() -> Vec<Record> {
        vec![
            Record::new().with("city", "A"),
            Record::new().with("city", ""),
            Record::new().with("city", "B"),
        ]
    }

    fn city_col() -> ColumnDef {
        ColumnDef::new("city", "City").with_filter(FilterKind::Dropdown)
    }

    #[test]
    fn test_dropdown_with_blanks() {
        let filter = ActiveFilter::dropdown(["A"], true);
        let passes: Vec<bool> = city_rows()
            .iter()
            .map(|r| matches(&r.value("city"), &filter))
            .collect();
        assert_eq!(passes, [true, true, false]);
    }

    #[test]
    fn test_dropdown_without_blanks() {
        let filter = ActiveFilter::dropdown(["A", "B"], false);
        let passes: Vec<bool> = city_rows()
            .iter()
            .map(|r| matches(&r.value("city"), &filter))
            .collect();
        assert_eq!(passes, [true, false, true]);
    }

    #[test]
    fn test_dropdown_matches_numeric_string_form() {
        let filter = ActiveFilter::dropdown(["42"], false);
        assert!(matches(&Value::Number(42.0), &filter));
        assert!(!matches(&Value::Number(42.5), &filter));
    }

    #[test]
    fn test_input_conditions() {
        let v = Value::Text("Rowboat".into());
        let cases = [
            (InputCondition::Contains, "OWB", true),
            (InputCondition::Contains, "xyz", false),
            (InputCondition::Equals, "rowboat", true),
            (InputCondition::StartsWith, "row", true),
            (InputCondition::EndsWith, "BOAT", true),
            (InputCondition::NotContains, "xyz", true),
            (InputCondition::NotEqual, "rowboat", false),
        ];
        for (condition, needle, expected) in cases {
            assert_eq!(
                matches(&v, &ActiveFilter::input(condition, needle)),
                expected,
                "{:?} {:?}",
                condition,
                needle
            );
        }
    }

    #[test]
    fn test_input_blank_conditions() {
        let blank = ActiveFilter::input(InputCondition::Blank, "");
        let not_blank = ActiveFilter::input(InputCondition::NotBlank, "");
        assert!(matches(&Value::Empty, &blank));
        assert!(matches(&Value::Text("  ".into()), &blank));
        assert!(!matches(&Value::Text("x".into()), &blank));
        assert!(matches(&Value::Text("x".into()), &not_blank));
    }

    #[test]
    fn test_input_empty_value_is_noop() {
        let filter = ActiveFilter::input(InputCondition::Contains, "   ");
        assert!(matches(&Value::Text("anything".into()), &filter));
        assert!(matches(&Value::Empty, &filter));
    }

    #[test]
    fn test_numeric_between_scenario() {
        let rows = [5.0, 10.0, 15.0].map(Value::Number);
        let filter = ActiveFilter::numeric_between("8", "12");
        let passing: Vec<&Value> = rows.iter().filter(|v| matches(v, &filter)).collect();
        assert_eq!(passing, [&Value::Number(10.0)]);
    }

    #[test]
    fn test_numeric_between_invalid_bound_unconstrained() {
        let filter = ActiveFilter::numeric_between("8", "oops");
        assert!(matches(&Value::Number(100.0), &filter));
        assert!(matches(&Value::Text("not a number".into()), &filter));
    }

    #[test]
    fn test_numeric_relational() {
        let gt = ActiveFilter::numeric(NumericCondition::GreaterThan, "10");
        assert!(matches(&Value::Number(11.0), &gt));
        assert!(!matches(&Value::Number(10.0), &gt));
        assert!(matches(&Value::Text("12".into()), &gt), "text coerces");

        let ge = ActiveFilter::numeric(NumericCondition::GreaterThanOrEqual, "10");
        assert!(matches(&Value::Number(10.0), &ge));
    }

    #[test]
    fn test_numeric_non_numeric_fails_relational() {
        let eq = ActiveFilter::numeric(NumericCondition::Equals, "10");
        assert!(!matches(&Value::Text("abc".into()), &eq));
        assert!(!matches(&Value::Empty, &eq));

        let bad_bound = ActiveFilter::numeric(NumericCondition::LessThan, "oops");
        assert!(!matches(&Value::Number(1.0), &bad_bound));
    }

    #[test]
    fn test_filter_idempotence() {
        let rows = city_rows();
        let filter = ActiveFilter::dropdown(["A"], true);
        let once: Vec<&Record> = rows
            .iter()
            .filter(|r| matches(&r.value("city"), &filter))
            .collect();
        let twice: Vec<&&Record> = once
            .iter()
            .filter(|r| matches(&r.value("city"), &filter))
            .collect();
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn test_day_key_forms() {
        assert_eq!(
            day_key(&Value::Text("2024-03-05".into())).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            day_key(&Value::Text("2024-03-05T10:30:00".into())).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            day_key(&Value::Text("2024-03-05 10:30:00".into())).as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(day_key(&Value::Text("yesterday".into())), None);
        assert_eq!(day_key(&Value::Empty), None);
    }

    #[test]
    fn test_date_tree_filter() {
        let filter = ActiveFilter::date_tree(["2024-03-05"], false);
        assert!(matches(&Value::Text("2024-03-05T23:59:00".into()), &filter));
        assert!(!matches(&Value::Text("2024-03-06".into()), &filter));
        assert!(!matches(&Value::Text("garbage".into()), &filter));

        let with_blanks = ActiveFilter::date_tree(["2024-03-05"], true);
        assert!(matches(&Value::Empty, &with_blanks));
    }

    #[test]
    fn test_unique_values_alphabetical_blank_last() {
        let rows = vec![
            Record::new().with("city", "Oslo"),
            Record::new().with("city", "bergen"),
            Record::new().with("city", "Oslo"),
            Record::new().with("city", ""),
            Record::new().with("city", "Aas"),
        ];
        let unique = build_unique_values(&rows, &city_col());
        let names: Vec<&str> = unique.iter().map(|u| u.value.as_str()).collect();
        assert_eq!(names, ["Aas", "bergen", "Oslo", ""]);
        assert_eq!(unique[2].count, 2);
        assert!(unique[3].is_blank);
        assert_eq!(unique[3].count, 1);
    }

    #[test]
    fn test_date_hierarchy_grouping() {
        let rows = vec![
            Record::new().with("when", "2023-12-31"),
            Record::new().with("when", "2024-01-05"),
            Record::new().with("when", "2024-01-05T08:00:00"),
            Record::new().with("when", "2024-02-01"),
            Record::new().with("when", ""),
            Record::new().with("when", "not a date"),
        ];
        let col = ColumnDef::new("when", "When").with_filter(FilterKind::DateTree);
        let tree = build_date_hierarchy(&rows, &col);

        assert_eq!(tree.years.len(), 2);
        assert_eq!(tree.years[0].year, 2023);
        assert_eq!(tree.years[1].year, 2024);
        assert_eq!(tree.years[1].months.len(), 2);
        assert_eq!(tree.years[1].months[0].days[0].count, 2);
        assert_eq!(
            tree.all_day_keys,
            ["2023-12-31", "2024-01-05", "2024-02-01"]
        );
        assert_eq!(tree.years[1].day_keys(), ["2024-01-05", "2024-02-01"]);
    }
}
