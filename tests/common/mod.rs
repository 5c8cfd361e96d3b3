//! Shared fixtures for integration tests. Nothing here touches a database.

#![allow(dead_code)]

use regex_lite::Regex;
use sql_pushdown::relational::{Dialect, ExpressionFactory, Relation, SqlDataset};

pub const BQ: ExpressionFactory = ExpressionFactory::new(Dialect::BigQuery);
pub const PG: ExpressionFactory = ExpressionFactory::new(Dialect::PostgreSql);

/// `proj.ds.orders` with columns `id, customer, amount, ts`, aliased `orders`.
pub fn bq_orders() -> Relation {
    Relation::from_table(
        Dialect::BigQuery,
        "proj",
        "ds",
        &SqlDataset::new("orders", "orders"),
        ["id", "customer", "amount", "ts"],
    )
    .unwrap()
}

/// `public.orders` with columns `id, customer, amount, ts`, aliased `orders`.
pub fn pg_orders() -> Relation {
    Relation::from_table(
        Dialect::PostgreSql,
        "",
        "public",
        &SqlDataset::new("orders", "orders"),
        ["id", "customer", "amount", "ts"],
    )
    .unwrap()
}

pub fn base(dialect: Dialect, columns: &[String]) -> Relation {
    Relation::from_table(
        dialect,
        "proj",
        "ds",
        &SqlDataset::new("tbl", "ds"),
        columns.iter().cloned(),
    )
    .unwrap()
}

/// Alias list of the outermost `SELECT` of `sql`.
///
/// Only valid for statements whose select items contain no `", "` and no
/// `" FROM "`, which holds for everything the fixtures generate.
pub fn outer_aliases(sql: &str) -> Vec<String> {
    if sql.starts_with("SELECT FROM ") {
        return Vec::new();
    }
    let re = Regex::new(r"^SELECT (.*?) FROM ").unwrap();
    let Some(caps) = re.captures(sql) else {
        return Vec::new();
    };
    caps[1]
        .split(", ")
        .filter_map(|item| item.rsplit_once(" AS ").map(|(_, alias)| alias.to_string()))
        .collect()
}

/// Number of derived tables in `sql`.
pub fn nesting_depth(sql: &str) -> usize {
    sql.matches("FROM (").count()
}

pub fn sql(relation: &Relation) -> &str {
    relation
        .transform_expression()
        .expect("relation should be valid")
}
