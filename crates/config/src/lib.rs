// Persisted per-grid configuration

pub mod debounce;
pub mod filter;
pub mod state;
pub mod store;

pub use debounce::DebouncedWriter;
pub use filter::{ActiveFilter, InputCondition, NumericCondition};
pub use state::{FooterAggregate, GridSettings, GridState, SortKeySpec, SCHEMA_VERSION};
pub use store::{FileStore, MemoryStore, StateStore};
