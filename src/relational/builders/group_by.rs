//! Grouped aggregation over a derived table.
//!
//! `SELECT <list> FROM (<source>) AS <dataset> [GROUP BY <keys>]`
//!
//! An empty key list renders a global aggregate with no `GROUP BY`.

use crate::relational::builders::{QueryBuilder, derived_table, expression_list, select_clause};
use crate::relational::definition::GroupByDefinition;
use crate::relational::dialect::Dialect;

pub struct GroupByBuilder<'a> {
    dialect: Dialect,
    definition: &'a GroupByDefinition,
    source: &'a str,
    dataset_name: &'a str,
}

impl<'a> GroupByBuilder<'a> {
    pub fn new(
        dialect: Dialect,
        definition: &'a GroupByDefinition,
        source: &'a str,
        dataset_name: &'a str,
    ) -> Self {
        GroupByBuilder {
            dialect,
            definition,
            source,
            dataset_name,
        }
    }
}

impl QueryBuilder for GroupByBuilder<'_> {
    fn get_query(&self) -> String {
        let mut sql = format!(
            "{select} FROM {from}",
            select = select_clause(self.dialect, self.definition.select_expressions()),
            from = derived_table(self.dialect, self.source, self.dataset_name),
        );
        let keys = self.definition.group_by_expressions();
        if !keys.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&expression_list(keys));
        }
        sql
    }
}
