//! sql_pushdown: compile relational plans into warehouse SQL.
//!
//! Callers describe a computation as a chain of relational operations
//! (set or drop a column, project, filter, group, deduplicate) over a base
//! table. Every operation returns a new immutable [`Relation`] carrying the
//! SQL that computes it, nested over its parent as a derived table, so the
//! whole computation can be pushed down to BigQuery or PostgreSQL as a single
//! statement.
//!
//! Invalid input never panics and rarely errors: an operation given an
//! expression it cannot render returns an *invalid* relation that absorbs
//! every later operation. Only malformed base tables, plan documents and
//! configuration surface as [`PushdownError`].
//!
//! # Layout
//!
//! - [`relational`]: dialects, expressions, definitions, builders, relations
//! - [`plan`]: JSON/TOML plan documents compiled into relation chains
//! - [`config`]: TOML configuration with `PUSHDOWN_*` environment overrides
//! - [`error`]: validation and library error types
//! - [`hash`]: SQL fingerprints used for generated names

pub mod config;
pub mod error;
pub mod hash;
pub mod plan;
pub mod relational;

pub use config::PushdownConfig;
pub use error::{PushdownError, PushdownErrorKind, ValidationError};
pub use plan::PlanSpec;
pub use relational::{
    Dialect, Expression, ExpressionFactory, QueryBuilder, Relation, SelectList, SqlDataset,
};
