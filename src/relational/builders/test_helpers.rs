//! Shared test helpers for builder and relation unit tests.

use crate::relational::definition::SelectList;
use crate::relational::dialect::Dialect;
use crate::relational::expression::{Expression, ExpressionFactory, ForeignExpression};
use crate::relational::relation::{Relation, SqlDataset};

// ── Factories ───────────────────────────────────────────────────────────

pub fn bq() -> ExpressionFactory {
    ExpressionFactory::new(Dialect::BigQuery)
}

pub fn pg() -> ExpressionFactory {
    ExpressionFactory::new(Dialect::PostgreSql)
}

/// A valid expression from some other compiler.
pub fn foreign(text: &str) -> Expression {
    ForeignExpression::new("external", text, true).into()
}

// ── Select lists ────────────────────────────────────────────────────────

/// Select list mapping each name to its own BigQuery column reference.
pub fn bq_list(cols: &[&str]) -> SelectList {
    cols.iter().map(|c| (*c, bq().compile(c))).collect()
}

pub fn pg_list(cols: &[&str]) -> SelectList {
    cols.iter().map(|c| (*c, pg().compile(c))).collect()
}

// ── Relations ───────────────────────────────────────────────────────────

/// Base BigQuery relation over `proj.ds.tbl` with logical dataset `ds`.
pub fn bq_base(cols: &[&str]) -> Relation {
    Relation::from_table(
        Dialect::BigQuery,
        "proj",
        "ds",
        &SqlDataset::new("tbl", "ds"),
        cols.iter().copied(),
    )
    .unwrap()
}

/// Base PostgreSQL relation over `public.tbl` with logical dataset `ds`.
pub fn pg_base(cols: &[&str]) -> Relation {
    Relation::from_table(
        Dialect::PostgreSql,
        "",
        "public",
        &SqlDataset::new("tbl", "ds"),
        cols.iter().copied(),
    )
    .unwrap()
}

// ── Assertions ──────────────────────────────────────────────────────────

pub fn assert_sql_contains(sql: &str, expected: &str) {
    assert!(
        sql.contains(expected),
        "Expected SQL to contain:\n  {expected}\nGot:\n  {sql}",
    );
}

pub fn assert_sql_not_contains(sql: &str, unexpected: &str) {
    assert!(
        !sql.contains(unexpected),
        "Expected SQL NOT to contain:\n  {unexpected}\nGot:\n  {sql}",
    );
}

/// Number of derived-table subselects (`FROM (`) in a statement.
pub fn nesting_depth(sql: &str) -> usize {
    sql.matches("FROM (").count()
}
