//! Test harness for grid scenarios with event tracking.
//!
//! `GridHarness` wires a fully configured people grid to an in-memory
//! store and an event collector: every callback records a `GridEvent`,
//! so scenario tests can assert on notification exactness and ordering
//! without GUI dependencies.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rowgrid_config::MemoryStore;
use rowgrid_core::{
    AggregateKind, AggregateSpec, ColumnDef, Editable, EditorKind, FilterKind, Record,
};

use crate::events::{EventCollector, GridCallbacks, GridEvent};
use crate::grid::Grid;

pub struct GridHarness {
    pub grid: Grid,
    pub events: Rc<RefCell<EventCollector>>,
    pub store: Rc<RefCell<MemoryStore>>,
}

pub fn people_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", "Id").with_width(60.0),
        ColumnDef::new("name", "Name")
            .with_width(160.0)
            .with_filter(FilterKind::Input)
            .with_editor(Editable::Always, EditorKind::Text),
        ColumnDef::new("city", "City")
            .with_filter(FilterKind::Dropdown)
            .with_editor(
                Editable::Always,
                EditorKind::Select {
                    options: vec!["Oslo".into(), "Bergen".into(), "Tromso".into()],
                },
            ),
        ColumnDef::new("age", "Age")
            .with_filter(FilterKind::Numeric)
            .with_footer(AggregateSpec::new(AggregateKind::Sum))
            .with_editor(Editable::Always, EditorKind::Number),
        ColumnDef::new("joined", "Joined").with_filter(FilterKind::DateTree),
        ColumnDef::new("notes", "Notes").hidden(),
    ]
}

pub fn people_rows() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", "r1")
            .with("name", "Alice")
            .with("city", "Oslo")
            .with("age", 30i64)
            .with("joined", "2024-01-05"),
        Record::new()
            .with("id", "r2")
            .with("name", "Bob")
            .with("city", "Bergen")
            .with("age", 25i64)
            .with("joined", "2024-01-05"),
        Record::new()
            .with("id", "r3")
            .with("name", "Cara")
            .with("city", "Oslo")
            .with("age", 35i64)
            .with("joined", "2024-02-10"),
        Record::new()
            .with("id", "r4")
            .with("name", "Dan")
            .with("city", "")
            .with("age", 28i64),
        Record::new()
            .with("id", "r5")
            .with("name", "Eve")
            .with("city", "Tromso")
            .with("age", 22i64)
            .with("joined", "2023-12-31"),
    ]
}

impl GridHarness {
    pub fn people() -> Self {
        Self::with_store("people-grid", Rc::new(RefCell::new(MemoryStore::new())))
    }

    /// Build against an existing store, e.g. one pre-seeded with a
    /// persisted snapshot.
    pub fn with_store(key: &str, store: Rc<RefCell<MemoryStore>>) -> Self {
        let events = Rc::new(RefCell::new(EventCollector::new()));
        let callbacks = wire_callbacks(&events);

        let next_pending = Cell::new(0usize);
        let grid = Grid::new(
            people_columns(),
            people_rows(),
            |r: &Record| r.value("id").to_text(),
            key,
            Box::new(store.clone()),
        )
        .with_callbacks(callbacks)
        .with_row_factory(move || {
            let n = next_pending.get() + 1;
            next_pending.set(n);
            Record::new()
                .with("id", format!("p{}", n))
                .with("name", "")
                .with("city", "")
        });

        Self {
            grid,
            events,
            store,
        }
    }

    pub fn events(&self) -> Vec<GridEvent> {
        self.events.borrow().events().to_vec()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }
}

fn wire_callbacks(events: &Rc<RefCell<EventCollector>>) -> GridCallbacks {
    let mut callbacks = GridCallbacks::default();

    let sink = events.clone();
    callbacks.on_cell_value_change = Some(Box::new(move |row, column_id, new, old| {
        sink.borrow_mut().push(GridEvent::CellValueChanged {
            row_id: row.value("id").to_text(),
            column_id: column_id.to_string(),
            old: old.clone(),
            new: new.clone(),
        });
    }));

    let sink = events.clone();
    callbacks.on_new_rows_save = Some(Box::new(move |rows| {
        sink.borrow_mut()
            .push(GridEvent::PendingRowsSaved { count: rows.len() });
    }));

    let sink = events.clone();
    callbacks.on_sort_change = Some(Box::new(move |spec| {
        sink.borrow_mut().push(GridEvent::SortChanged(spec.to_vec()));
    }));

    let sink = events.clone();
    callbacks.on_filter_change = Some(Box::new(move |filters| {
        sink.borrow_mut().push(GridEvent::FilterChanged {
            active: filters.keys().cloned().collect(),
        });
    }));

    let sink = events.clone();
    callbacks.on_column_order_change = Some(Box::new(move |order| {
        sink.borrow_mut()
            .push(GridEvent::ColumnOrderChanged(order.to_vec()));
    }));

    let sink = events.clone();
    callbacks.on_column_visibility_change = Some(Box::new(move |visibility| {
        sink.borrow_mut().push(GridEvent::ColumnVisibilityChanged {
            hidden: visibility
                .iter()
                .filter(|(_, visible)| !**visible)
                .map(|(id, _)| id.clone())
                .collect(),
        });
    }));

    let sink = events.clone();
    callbacks.on_selection_change = Some(Box::new(move |ids| {
        sink.borrow_mut()
            .push(GridEvent::SelectionChanged(ids.to_vec()));
    }));

    let sink = events.clone();
    callbacks.on_edit_save = Some(Box::new(move || {
        sink.borrow_mut().push(GridEvent::EditSaved);
    }));

    let sink = events.clone();
    callbacks.on_edit_cancel = Some(Box::new(move || {
        sink.borrow_mut().push(GridEvent::EditCancelled);
    }));

    callbacks
}
