//! Projection (and optional filter) over a derived table.
//!
//! `SELECT <list> FROM (<source>) AS <dataset> [WHERE <condition>]`
//!
//! Used by set-column, drop-column, select, and filter. The previous
//! relation's SQL becomes the derived table, so every use adds exactly one
//! nesting level.

use crate::relational::builders::{QueryBuilder, derived_table, select_clause};
use crate::relational::definition::SelectList;
use crate::relational::dialect::Dialect;
use crate::relational::expression::Expression;

pub struct NestedSelectBuilder<'a> {
    dialect: Dialect,
    columns: &'a SelectList,
    source: &'a str,
    dataset_name: &'a str,
    filter: Option<&'a Expression>,
}

impl<'a> NestedSelectBuilder<'a> {
    pub fn new(
        dialect: Dialect,
        columns: &'a SelectList,
        source: &'a str,
        dataset_name: &'a str,
    ) -> Self {
        NestedSelectBuilder {
            dialect,
            columns,
            source,
            dataset_name,
            filter: None,
        }
    }

    /// Add a `WHERE` condition.
    pub fn with_filter(mut self, filter: Option<&'a Expression>) -> Self {
        self.filter = filter;
        self
    }
}

impl QueryBuilder for NestedSelectBuilder<'_> {
    fn get_query(&self) -> String {
        let mut sql = format!(
            "{select} FROM {from}",
            select = select_clause(self.dialect, self.columns),
            from = derived_table(self.dialect, self.source, self.dataset_name),
        );
        if let Some(filter) = self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter.text());
        }
        sql
    }
}
