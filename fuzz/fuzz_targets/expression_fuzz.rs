//! Arbitrary text through the expression factory and into a filter.
//!
//! The scanner must never panic, and whatever it accepts must compile into
//! a relation whose outermost WHERE clause is that exact text.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sql_pushdown::relational::{Dialect, ExpressionFactory, Relation, SqlDataset};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for dialect in [Dialect::BigQuery, Dialect::PostgreSql] {
        let expr = ExpressionFactory::new(dialect).expression(text);
        let _ = ExpressionFactory::new(dialect).compile(text);
        let _ = dialect.quote_ident(text);

        let Ok(base) = Relation::from_table(
            dialect,
            "p",
            "d",
            &SqlDataset::new("t", "t"),
            ["a", "b"],
        ) else {
            return;
        };
        let filtered = base.filter(&expr);
        assert_eq!(filtered.is_valid(), expr.is_valid());
        if let Some(sql) = filtered.transform_expression() {
            assert!(sql.ends_with(&format!(" WHERE {text}")));
        }
    }
});
