//! Relational plans compiled to nested SQL.
//!
//! A caller starts from [`Relation::from_table`] and applies algebraic
//! operations. Each operation validates its expressions against the
//! relation's [`Dialect`], renders one statement with the matching builder
//! (wrapping the previous SQL as a derived table), and returns a new
//! relation. Nothing is executed; the output is SQL text.
//!
//! # Example
//!
//! ```
//! use sql_pushdown::relational::{Dialect, ExpressionFactory, Relation, SelectList, SqlDataset};
//!
//! let factory = ExpressionFactory::new(Dialect::BigQuery);
//! let base = Relation::from_table(
//!     Dialect::BigQuery,
//!     "proj",
//!     "ds",
//!     &SqlDataset::new("tbl", "ds"),
//!     ["a", "b"],
//! )
//! .unwrap();
//! let projected = base.select(&SelectList::new().with("a", factory.compile("a")));
//! assert_eq!(
//!     projected.transform_expression(),
//!     Some("SELECT a AS a FROM (SELECT a AS a, b AS b FROM `proj.ds.tbl`) AS ds"),
//! );
//! ```

pub mod builders;
pub mod definition;
pub mod dialect;
pub mod expression;
pub mod relation;

pub use builders::QueryBuilder;
pub use definition::{
    DeduplicateDefinition, FilterFunction, GroupByDefinition, OrderExpression, SelectList,
};
pub use dialect::Dialect;
pub use expression::{
    Expression, ExpressionFactory, ForeignExpression, SqlExpression, supports, supports_all,
};
pub use relation::{Operation, Relation, SqlDataset};
