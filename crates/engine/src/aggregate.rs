//! Footer aggregation over the filtered row set.
//!
//! A column participates when it declares a footer spec, or when the
//! grid settings carry a non-none override for it. Values are resolved
//! through the display accessor; numeric aggregations coerce and skip
//! what will not coerce.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashSet;

use rowgrid_config::FooterAggregate;
use rowgrid_core::{AggregateKind, AggregateValue, ColumnDef, ColumnId, Record, Value};

/// One computed footer result.
#[derive(Debug, Clone)]
pub struct FooterCell {
    pub column_id: ColumnId,
    pub label: Option<String>,
    pub value: AggregateValue,
    pub formatted: String,
}

/// Compute footer cells for every participating column, over the rows
/// that survived filtering (never the raw set).
pub fn compute_footer(
    rows: &[&Record],
    columns: &[ColumnDef],
    overrides: &BTreeMap<ColumnId, FooterAggregate>,
) -> Vec<FooterCell> {
    let mut cells = Vec::new();
    for col in columns {
        let override_kind = overrides.get(&col.id).copied().unwrap_or_default();
        let (kind, spec) = match (override_kind, &col.footer) {
            (FooterAggregate::None, Some(spec)) => (spec.kind.clone(), Some(spec)),
            (FooterAggregate::None, None) => continue,
            // A settings override replaces the declared aggregation but
            // keeps the declared label/formatter.
            (ov, spec) => (builtin_kind(ov), spec.as_ref()),
        };

        let values: Vec<_> = rows.iter().map(|r| col.display_value(r)).collect();
        let value = compute(&kind, &values);

        let label = spec
            .and_then(|s| s.label.clone())
            .or_else(|| auto_label(&kind).map(str::to_string));
        let formatted = match spec.and_then(|s| s.formatter.as_ref()) {
            Some(f) => f(&value),
            None => default_format(&value),
        };

        cells.push(FooterCell {
            column_id: col.id.clone(),
            label,
            value,
            formatted,
        });
    }
    cells
}

fn builtin_kind(ov: FooterAggregate) -> AggregateKind {
    match ov {
        FooterAggregate::Count => AggregateKind::Count,
        FooterAggregate::Sum => AggregateKind::Sum,
        FooterAggregate::Avg => AggregateKind::Avg,
        FooterAggregate::Min => AggregateKind::Min,
        FooterAggregate::Max => AggregateKind::Max,
        FooterAggregate::DistinctCount => AggregateKind::DistinctCount,
        FooterAggregate::None => AggregateKind::Count,
    }
}

fn compute(kind: &AggregateKind, values: &[Value]) -> AggregateValue {
    match kind {
        AggregateKind::Count => AggregateValue::Number(values.len() as f64),
        AggregateKind::Sum => AggregateValue::Number(numeric_sum(values)),
        AggregateKind::Avg => {
            if values.is_empty() {
                AggregateValue::Number(0.0)
            } else {
                AggregateValue::Number(numeric_sum(values) / values.len() as f64)
            }
        }
        AggregateKind::Min => AggregateValue::Number(
            numbers(values)
                .min()
                .map(|n| n.into_inner())
                .unwrap_or(0.0),
        ),
        AggregateKind::Max => AggregateValue::Number(
            numbers(values)
                .max()
                .map(|n| n.into_inner())
                .unwrap_or(0.0),
        ),
        AggregateKind::DistinctCount => {
            let distinct: FxHashSet<String> = values.iter().map(|v| v.to_text()).collect();
            AggregateValue::Number(distinct.len() as f64)
        }
        AggregateKind::Custom(f) => f(values),
    }
}

fn numbers<'a>(
    values: &'a [Value],
) -> impl Iterator<Item = OrderedFloat<f64>> + 'a {
    values.iter().filter_map(|v| v.as_number()).map(OrderedFloat)
}

fn numeric_sum(values: &[Value]) -> f64 {
    numbers(values).map(|n| n.into_inner()).sum()
}

/// Auto label per aggregation kind. Sum deliberately has none: a footer
/// sum shows the bare formatted value.
fn auto_label(kind: &AggregateKind) -> Option<&'static str> {
    match kind {
        AggregateKind::Sum | AggregateKind::Custom(_) => None,
        AggregateKind::Count => Some("Count"),
        AggregateKind::Avg => Some("Avg"),
        AggregateKind::Min => Some("Min"),
        AggregateKind::Max => Some("Max"),
        AggregateKind::DistinctCount => Some("Distinct"),
    }
}

/// Default formatting: integers grouped with thousands separators,
/// non-integers capped at two decimals (grouped integer part).
fn default_format(value: &AggregateValue) -> String {
    match value {
        AggregateValue::Text(s) => s.clone(),
        AggregateValue::Number(n) => format_number(*n),
    }
}

fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return format!("{}", n);
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        group_thousands(n as i64)
    } else {
        let rounded = (n * 100.0).round() / 100.0;
        let whole = rounded.trunc() as i64;
        let frac = format!("{:.2}", rounded.abs().fract());
        format!("{}.{}", group_thousands(whole), &frac[2..])
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rowgrid_core::{AggregateSpec, Value};

    fn amount_col(kind: AggregateKind) -> ColumnDef {
        ColumnDef::new("amount", "Amount").with_footer(AggregateSpec::new(kind))
    }

    fn rows() -> Vec<Record> {
        vec![
            Record::new().with("amount", 10i64).with("city", "Oslo"),
            Record::new().with("amount", 25.5).with("city", "Bergen"),
            Record::new().with("amount", "n/a").with("city", "Oslo"),
            Record::new().with("amount", 4i64).with("city", "Oslo"),
        ]
    }

    fn footer_for(kind: AggregateKind, rows: &[Record]) -> FooterCell {
        let cols = vec![amount_col(kind)];
        let refs: Vec<&Record> = rows.iter().collect();
        compute_footer(&refs, &cols, &BTreeMap::new())
            .into_iter()
            .next()
            .unwrap()
    }

    #[test]
    fn test_sum_skips_non_numeric() {
        let cell = footer_for(AggregateKind::Sum, &rows());
        assert_eq!(cell.value, AggregateValue::Number(39.5));
        assert_eq!(cell.label, None, "sum has no auto label");
        assert_eq!(cell.formatted, "39.50");
    }

    #[test]
    fn test_count_is_row_count() {
        let cell = footer_for(AggregateKind::Count, &rows());
        assert_eq!(cell.value, AggregateValue::Number(4.0));
        assert_eq!(cell.label.as_deref(), Some("Count"));
    }

    #[test]
    fn test_avg_divides_by_row_count() {
        let cell = footer_for(AggregateKind::Avg, &rows());
        assert_eq!(cell.value, AggregateValue::Number(39.5 / 4.0));
    }

    #[test]
    fn test_min_max_and_empty_default() {
        assert_eq!(
            footer_for(AggregateKind::Min, &rows()).value,
            AggregateValue::Number(4.0)
        );
        assert_eq!(
            footer_for(AggregateKind::Max, &rows()).value,
            AggregateValue::Number(25.5)
        );
        // Empty filtered set: extrema default to 0.
        assert_eq!(
            footer_for(AggregateKind::Min, &[]).value,
            AggregateValue::Number(0.0)
        );
        assert_eq!(
            footer_for(AggregateKind::Avg, &[]).value,
            AggregateValue::Number(0.0)
        );
    }

    #[test]
    fn test_distinct_count_string_coerced() {
        let rows = rows();
        let cols = vec![ColumnDef::new("city", "City")
            .with_footer(AggregateSpec::new(AggregateKind::DistinctCount))];
        let refs: Vec<&Record> = rows.iter().collect();
        let cell = compute_footer(&refs, &cols, &BTreeMap::new())
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(cell.value, AggregateValue::Number(2.0));
        assert_eq!(cell.label.as_deref(), Some("Distinct"));
    }

    #[test]
    fn test_custom_reducer_and_formatter() {
        let spec = AggregateSpec::new(AggregateKind::Custom(Arc::new(|values| {
            let n = values.iter().filter(|v| v.as_number().is_none()).count();
            AggregateValue::Text(format!("{} non-numeric", n))
        })));
        let cols = vec![ColumnDef::new("amount", "Amount").with_footer(spec)];
        let rows = rows();
        let refs: Vec<&Record> = rows.iter().collect();
        let cell = compute_footer(&refs, &cols, &BTreeMap::new())
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(cell.formatted, "1 non-numeric");
    }

    #[test]
    fn test_caller_label_and_formatter_win() {
        let mut spec = AggregateSpec::new(AggregateKind::Sum).with_label("Total");
        spec.formatter = Some(Arc::new(|v| match v {
            AggregateValue::Number(n) => format!("${:.2}", n),
            AggregateValue::Text(s) => s.clone(),
        }));
        let cols = vec![ColumnDef::new("amount", "Amount").with_footer(spec)];
        let rows = rows();
        let refs: Vec<&Record> = rows.iter().collect();
        let cell = compute_footer(&refs, &cols, &BTreeMap::new())
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(cell.label.as_deref(), Some("Total"));
        assert_eq!(cell.formatted, "$39.50");
    }

    #[test]
    fn test_settings_override_beats_declared() {
        let cols = vec![amount_col(AggregateKind::Sum)];
        let rows = rows();
        let refs: Vec<&Record> = rows.iter().collect();
        let mut overrides = BTreeMap::new();
        overrides.insert("amount".to_string(), FooterAggregate::Max);
        let cell = compute_footer(&refs, &cols, &overrides)
            .into_iter()
            .next()
            .unwrap();
        assert_eq!(cell.value, AggregateValue::Number(25.5));
    }

    #[test]
    fn test_override_enables_footer_without_declared_spec() {
        let cols = vec![ColumnDef::new("amount", "Amount")];
        let rows = rows();
        let refs: Vec<&Record> = rows.iter().collect();

        assert!(compute_footer(&refs, &cols, &BTreeMap::new()).is_empty());

        let mut overrides = BTreeMap::new();
        overrides.insert("amount".to_string(), FooterAggregate::Count);
        let cells = compute_footer(&refs, &cols, &overrides);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].value, AggregateValue::Number(4.0));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(1234567.0), "1,234,567");
        assert_eq!(format_number(-1234.0), "-1,234");
        assert_eq!(format_number(1234.5678), "1,234.57");
        assert_eq!(format_number(0.5), "0.50");
        assert_eq!(format_number(12.0), "12");
    }
}
