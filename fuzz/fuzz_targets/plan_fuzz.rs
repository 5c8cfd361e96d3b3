//! Arbitrary JSON plan documents compiled for both dialects.
//!
//! Decoding may fail; compiling a decoded plan must never panic, and a
//! valid result always lists its columns in the outermost select.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sql_pushdown::relational::Dialect;
use sql_pushdown::{PlanSpec, PushdownConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(plan) = PlanSpec::from_json(text) else {
        return;
    };
    for dialect in [Dialect::BigQuery, Dialect::PostgreSql] {
        let config = PushdownConfig {
            dialect,
            project: Some("p".into()),
            dataset: Some("d".into()),
        };
        if let Ok(relation) = plan.compile(&config) {
            if let Some(sql) = relation.transform_expression() {
                assert!(sql.starts_with("SELECT"));
                assert_eq!(relation.depth().is_some(), relation.is_valid());
            }
        }
    }
});
