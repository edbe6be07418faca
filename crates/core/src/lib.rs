pub mod column;
pub mod record;
pub mod selection;
pub mod value;

pub use column::{
    Accessor, AggregateKind, AggregateSpec, AggregateValue, ColumnDef, ColumnId, Editable,
    EditorKind, FilterKind, PinPosition,
};
pub use record::{Record, RowId};
pub use selection::{RowSelection, SelectionMode};
pub use value::Value;
