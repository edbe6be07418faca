use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::value::Value;

pub type ColumnId = String;

/// How a column reads its value out of a record: a field key, or an
/// arbitrary function of the whole record.
#[derive(Clone)]
pub enum Accessor {
    Field(String),
    Computed(Arc<dyn Fn(&Record) -> Value + Send + Sync>),
}

impl Accessor {
    pub fn field(name: &str) -> Self {
        Accessor::Field(name.to_string())
    }

    pub fn computed(f: impl Fn(&Record) -> Value + Send + Sync + 'static) -> Self {
        Accessor::Computed(Arc::new(f))
    }

    pub fn value(&self, record: &Record) -> Value {
        match self {
            Accessor::Field(name) => record.value(name),
            Accessor::Computed(f) => f(record),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Field(name) => write!(f, "Accessor::Field({:?})", name),
            Accessor::Computed(_) => write!(f, "Accessor::Computed(..)"),
        }
    }
}

/// Whether a column is fixed to an edge or scrolls with the center region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinPosition {
    #[default]
    None,
    Left,
    Right,
}

/// The filter authoring/evaluation mode a column offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    Dropdown,
    Input,
    Numeric,
    DateTree,
}

/// Built-in cell editor kinds, plus a renderer-resolved custom key.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorKind {
    Text,
    Number,
    Boolean,
    Select { options: Vec<String> },
    Custom(String),
}

/// Per-column editability: a static flag or a row predicate.
#[derive(Clone)]
pub enum Editable {
    Never,
    Always,
    Predicate(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
}

impl Editable {
    pub fn allows(&self, record: &Record) -> bool {
        match self {
            Editable::Never => false,
            Editable::Always => true,
            Editable::Predicate(p) => p(record),
        }
    }
}

impl fmt::Debug for Editable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Editable::Never => write!(f, "Editable::Never"),
            Editable::Always => write!(f, "Editable::Always"),
            Editable::Predicate(_) => write!(f, "Editable::Predicate(..)"),
        }
    }
}

/// Footer aggregation over the filtered row set.
#[derive(Clone)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    DistinctCount,
    /// Caller-supplied reducer; may return a pre-formatted string.
    Custom(Arc<dyn Fn(&[Value]) -> AggregateValue + Send + Sync>),
}

impl fmt::Debug for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateKind::Count => "Count",
            AggregateKind::Sum => "Sum",
            AggregateKind::Avg => "Avg",
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
            AggregateKind::DistinctCount => "DistinctCount",
            AggregateKind::Custom(_) => "Custom(..)",
        };
        write!(f, "AggregateKind::{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateValue {
    Number(f64),
    Text(String),
}

/// Footer configuration for one column.
#[derive(Clone)]
pub struct AggregateSpec {
    pub kind: AggregateKind,
    /// Caller label; when absent an auto label per kind is used
    /// (sum deliberately has none).
    pub label: Option<String>,
    pub formatter: Option<Arc<dyn Fn(&AggregateValue) -> String + Send + Sync>>,
}

impl AggregateSpec {
    pub fn new(kind: AggregateKind) -> Self {
        Self {
            kind,
            label: None,
            formatter: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

impl fmt::Debug for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateSpec")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .finish()
    }
}

/// Declared configuration for one column. Layout mutations (width, order,
/// visibility, pin) live in the persisted grid state and override the
/// defaults declared here.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub header: String,
    pub accessor: Accessor,
    /// Override accessor used for filter evaluation when display and
    /// filter values diverge.
    pub filter_accessor: Option<Accessor>,
    /// Override accessor used for sorting.
    pub sort_accessor: Option<Accessor>,
    pub width: Option<f32>,
    pub min_width: Option<f32>,
    pub max_width: Option<f32>,
    pub resizable: bool,
    pub sortable: bool,
    pub draggable: bool,
    pub hideable: bool,
    /// Visible by default; the persisted visibility map overrides this.
    pub visible: bool,
    pub filter: Option<FilterKind>,
    pub footer: Option<AggregateSpec>,
    pub pin: PinPosition,
    pub editable: Editable,
    pub editor: Option<EditorKind>,
}

impl ColumnDef {
    pub fn new(id: &str, header: &str) -> Self {
        Self {
            id: id.to_string(),
            header: header.to_string(),
            accessor: Accessor::field(id),
            filter_accessor: None,
            sort_accessor: None,
            width: None,
            min_width: None,
            max_width: None,
            resizable: true,
            sortable: true,
            draggable: true,
            hideable: true,
            visible: true,
            filter: None,
            footer: None,
            pin: PinPosition::None,
            editable: Editable::Never,
            editor: None,
        }
    }

    pub fn with_accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn with_filter_accessor(mut self, accessor: Accessor) -> Self {
        self.filter_accessor = Some(accessor);
        self
    }

    pub fn with_sort_accessor(mut self, accessor: Accessor) -> Self {
        self.sort_accessor = Some(accessor);
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_width_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_width = Some(min);
        self.max_width = Some(max);
        self
    }

    pub fn with_filter(mut self, kind: FilterKind) -> Self {
        self.filter = Some(kind);
        self
    }

    pub fn with_footer(mut self, spec: AggregateSpec) -> Self {
        self.footer = Some(spec);
        self
    }

    pub fn pinned(mut self, pin: PinPosition) -> Self {
        self.pin = pin;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_editor(mut self, editable: Editable, editor: EditorKind) -> Self {
        self.editable = editable;
        self.editor = Some(editor);
        self
    }

    /// Value shown in the cell.
    pub fn display_value(&self, record: &Record) -> Value {
        self.accessor.value(record)
    }

    /// Value the filter engine evaluates (filter accessor override, else
    /// display accessor).
    pub fn filter_value(&self, record: &Record) -> Value {
        match &self.filter_accessor {
            Some(a) => a.value(record),
            None => self.accessor.value(record),
        }
    }

    /// Value the sort engine compares.
    pub fn sort_value(&self, record: &Record) -> Value {
        match &self.sort_accessor {
            Some(a) => a.value(record),
            None => self.accessor.value(record),
        }
    }

    /// A cell is editable when the row predicate allows it AND an editor
    /// is configured. Both gates are required; failing either is a no-op,
    /// not an error.
    pub fn editable_cell(&self, record: &Record) -> bool {
        self.editor.is_some() && self.editable.allows(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_field_and_computed() {
        let r = Record::new().with("qty", 4i64).with("price", 2.5);
        let field = Accessor::field("qty");
        assert_eq!(field.value(&r), Value::Number(4.0));

        let total = Accessor::computed(|r| {
            let qty = r.value("qty").as_number().unwrap_or(0.0);
            let price = r.value("price").as_number().unwrap_or(0.0);
            Value::Number(qty * price)
        });
        assert_eq!(total.value(&r), Value::Number(10.0));
    }

    #[test]
    fn test_filter_accessor_falls_back_to_display() {
        let col = ColumnDef::new("name", "Name");
        let r = Record::new().with("name", "Ada");
        assert_eq!(col.filter_value(&r), Value::Text("Ada".into()));
        assert_eq!(col.sort_value(&r), Value::Text("Ada".into()));
    }

    #[test]
    fn test_editable_cell_requires_editor() {
        let r = Record::new();
        let no_editor = ColumnDef::new("a", "A");
        assert!(!no_editor.editable_cell(&r));

        let gated = ColumnDef::new("b", "B").with_editor(
            Editable::Predicate(Arc::new(|r: &Record| r.value("locked") != Value::Bool(true))),
            EditorKind::Text,
        );
        assert!(gated.editable_cell(&r));
        let locked = Record::new().with("locked", true);
        assert!(!gated.editable_cell(&locked));
    }
}
