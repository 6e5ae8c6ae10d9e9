//! persist-runtime
//!
//! The contract that code emitted by `protoc-gen-persist` is compiled against:
//! the [`Store`] boundary, the execution [`Context`], the [`PersistError`]
//! taxonomy, the [`Record`] and [`PrimaryKey`] traits, conversion helpers for
//! well-known types, and the association synchronization helpers used by the
//! generated CRUD operations.
//!
//! Generated files reference everything in this crate by absolute path, so the
//! only requirement on the consuming crate is a dependency on `persist-runtime`
//! (and on `prost` / `prost-types` for the message types themselves).

#![warn(missing_docs)]

pub mod association;
pub mod context;
pub mod convert;
pub mod error;
pub mod hooks;
#[cfg(feature = "memory")]
pub mod memory;
pub mod query;
pub mod record;
pub mod store;
pub mod types;

pub use association::MutationStrategy;
pub use context::Context;
pub use error::{ArgumentError, BoxError, PersistError};
pub use hooks::{HookResult, NoHooks};
pub use query::{CollectionOperators, Condition, FieldSelection, Pagination, Query, SortKey};
pub use record::{PrimaryKey, Record, Value};
pub use store::{Store, Upserted};

pub use prost_types::FieldMask;

// Generated code names these through the runtime so consumers need no extra dependencies.
pub use chrono;
pub use uuid;
