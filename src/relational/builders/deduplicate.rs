//! Deduplication: keep one row per partition of the dedup keys.
//!
//! ```text
//! SELECT <alias> AS <alias>, ...
//! FROM (SELECT <list>, ROW_NUMBER() OVER (PARTITION BY <keys> ORDER BY <order>) AS <rn>
//!       FROM (<source>) AS <dataset>) AS <dataset>
//! WHERE <rn> = 1
//! ```
//!
//! Rows are ranked by the caller's ordering expressions only, in the order
//! given: MIN ranks `ASC NULLS LAST`, MAX ranks `DESC NULLS LAST`. No
//! implicit secondary key is added, so rows tied on every ordering
//! expression are resolved by the warehouse's `ROW_NUMBER()`. Without keys
//! the whole input is one partition; without ordering expressions the
//! `ORDER BY` is omitted.
//!
//! The window is computed in the inner select, where only source columns are
//! in scope, so keys and ordering expressions can never resolve to a
//! select-list alias. The outer select re-projects the aliases and drops
//! the ranking column.

use crate::hash::{fingerprint_hex, multi_fingerprint};
use crate::relational::builders::{
    QueryBuilder, aliased, derived_table, expression_list, select_clause, select_items,
};
use crate::relational::definition::DeduplicateDefinition;
use crate::relational::dialect::Dialect;

/// Prefix of the generated ranking column.
pub const RANKING_COLUMN_PREFIX: &str = "__rn";

pub struct DeduplicateBuilder<'a> {
    dialect: Dialect,
    definition: &'a DeduplicateDefinition,
    source: &'a str,
    dataset_name: &'a str,
}

impl<'a> DeduplicateBuilder<'a> {
    pub fn new(
        dialect: Dialect,
        definition: &'a DeduplicateDefinition,
        source: &'a str,
        dataset_name: &'a str,
    ) -> Self {
        DeduplicateBuilder {
            dialect,
            definition,
            source,
            dataset_name,
        }
    }

    /// Name of the ranking column.
    ///
    /// Derived from a fingerprint of the source so it is stable for a given
    /// input; a numeric suffix is added if it collides with an output alias.
    pub fn ranking_column(&self) -> String {
        let base = format!(
            "{RANKING_COLUMN_PREFIX}_{}",
            fingerprint_hex(multi_fingerprint(&[self.source, self.dataset_name]))
        );
        let taken = |candidate: &str| {
            self.definition
                .select_expressions()
                .names()
                .any(|n| n.eq_ignore_ascii_case(candidate))
        };
        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn window_spec(&self) -> String {
        let mut parts = Vec::new();
        let keys = self.definition.dedup_expressions();
        if !keys.is_empty() {
            parts.push(format!("PARTITION BY {}", expression_list(keys)));
        }
        let order = self.definition.order_expressions();
        if !order.is_empty() {
            let items: Vec<String> = order
                .iter()
                .map(|o| format!("{} {}", o.expression.text(), o.function.order_sql()))
                .collect();
            parts.push(format!("ORDER BY {}", items.join(", ")));
        }
        parts.join(" ")
    }
}

impl QueryBuilder for DeduplicateBuilder<'_> {
    fn get_query(&self) -> String {
        let rn = self.dialect.quote_ident(&self.ranking_column());
        let select = self.definition.select_expressions();

        let ranking = format!("ROW_NUMBER() OVER ({}) AS {rn}", self.window_spec());
        let inner_select = if select.is_empty() {
            format!("SELECT {ranking}")
        } else {
            format!("{}, {ranking}", select_clause(self.dialect, select))
        };
        let inner = format!(
            "{inner_select} FROM {from}",
            from = derived_table(self.dialect, self.source, self.dataset_name),
        );

        let outer_items: Vec<String> = select
            .names()
            .map(|alias| aliased(self.dialect, &self.dialect.quote_ident(alias), alias))
            .collect();
        format!(
            "{outer} FROM {from} WHERE {rn} = 1",
            outer = select_items(&outer_items),
            from = derived_table(self.dialect, &inner, self.dataset_name),
        )
    }
}
