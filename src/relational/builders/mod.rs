//! Per-statement SQL builders.
//!
//! Each builder renders exactly one `SELECT` statement from a select list,
//! a source (a table reference or the previous relation's SQL), and its own
//! metadata. Builders are pure: identical inputs render identical text.
//! They do not re-validate expressions; [`Relation`](crate::Relation)
//! checks support before it ever constructs one.

pub mod deduplicate;
pub mod group_by;
pub mod nested_select;
pub mod select;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use deduplicate::DeduplicateBuilder;
pub use group_by::GroupByBuilder;
pub use nested_select::NestedSelectBuilder;
pub use select::SelectBuilder;

use crate::relational::definition::SelectList;
use crate::relational::dialect::Dialect;
use crate::relational::expression::Expression;

/// A renderer of one SQL statement.
pub trait QueryBuilder {
    /// Render the statement.
    fn get_query(&self) -> String;
}

/// `SELECT <expr> AS <alias>, ...`, or a bare `SELECT` for an empty list.
pub(crate) fn select_clause(dialect: Dialect, columns: &SelectList) -> String {
    let items: Vec<String> = columns
        .iter()
        .map(|(alias, expr)| aliased(dialect, expr.text(), alias))
        .collect();
    select_items(&items)
}

pub(crate) fn select_items(items: &[String]) -> String {
    if items.is_empty() {
        "SELECT".to_string()
    } else {
        format!("SELECT {}", items.join(", "))
    }
}

pub(crate) fn aliased(dialect: Dialect, sql: &str, alias: &str) -> String {
    format!("{sql} AS {}", dialect.quote_ident(alias))
}

/// `(<source>) AS <dataset>`
pub(crate) fn derived_table(dialect: Dialect, source: &str, dataset_name: &str) -> String {
    format!("({source}) AS {}", dialect.quote_ident(dataset_name))
}

pub(crate) fn expression_list(exprs: &[Expression]) -> String {
    exprs
        .iter()
        .map(Expression::text)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn test_select_clause_aliases_every_column() {
        let list = bq_list(&["a", "b"]);
        assert_eq!(
            select_clause(Dialect::BigQuery, &list),
            "SELECT a AS a, b AS b"
        );
    }

    #[test]
    fn test_select_clause_quotes_aliases() {
        let list = SelectList::new().with("from", bq().expression("1"));
        assert_eq!(
            select_clause(Dialect::BigQuery, &list),
            "SELECT 1 AS `from`"
        );
    }

    #[test]
    fn test_select_clause_empty() {
        assert_eq!(select_clause(Dialect::BigQuery, &SelectList::new()), "SELECT");
    }

    #[test]
    fn test_derived_table() {
        assert_eq!(
            derived_table(Dialect::PostgreSql, "SELECT 1", "My Data"),
            "(SELECT 1) AS \"My Data\""
        );
    }

    #[test]
    fn test_expression_list() {
        let exprs = vec![bq().compile("a"), bq().expression("LOWER(b)")];
        assert_eq!(expression_list(&exprs), "a, LOWER(b)");
        assert_eq!(expression_list(&[]), "");
    }
}
