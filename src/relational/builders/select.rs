//! Base select over a physical table.
//!
//! `SELECT <expr> AS <alias>, ... FROM <table>`

use crate::relational::builders::{QueryBuilder, select_clause};
use crate::relational::definition::SelectList;
use crate::relational::dialect::Dialect;

/// Renders the leaf statement of every relation chain.
pub struct SelectBuilder<'a> {
    dialect: Dialect,
    columns: &'a SelectList,
    table: &'a str,
}

impl<'a> SelectBuilder<'a> {
    /// `table` must already be a rendered table reference
    /// (see [`Dialect::table_reference`]).
    pub fn new(dialect: Dialect, columns: &'a SelectList, table: &'a str) -> Self {
        SelectBuilder {
            dialect,
            columns,
            table,
        }
    }
}

impl QueryBuilder for SelectBuilder<'_> {
    fn get_query(&self) -> String {
        format!(
            "{select} FROM {table}",
            select = select_clause(self.dialect, self.columns),
            table = self.table,
        )
    }
}
