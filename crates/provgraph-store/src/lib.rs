//! provgraph-store: SQLite-backed property graph with provenance federation.
//!
//! This crate is the single writer of persisted graph state. All reads and
//! writes run inside a scoped transaction so a caller never observes a
//! half-applied mutation, and all conditions surface as `StoreError` kinds.

pub mod dispatch;
pub mod error;
pub mod mutations;
pub mod queries;
pub mod schema;
pub mod store;
pub mod traverse;

pub use dispatch::{Action, CommandDispatcher, DispatchError};
pub use error::{EntityKind, StoreError};
pub use mutations::ImportStats;
pub use queries::GraphSchema;
pub use store::GraphStore;

pub type Result<T> = std::result::Result<T, StoreError>;
