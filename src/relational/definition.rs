//! Select lists and aggregation definitions supplied by callers.

use serde::{Deserialize, Serialize};

use crate::relational::expression::Expression;

/// Ordered output-column → expression mapping.
///
/// Insertion order is projection order. Inserting an existing name replaces
/// its expression in place, keeping its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectList {
    entries: Vec<(String, Expression)>,
}

impl SelectList {
    pub fn new() -> Self {
        SelectList::default()
    }

    /// Insert or replace `name`, returning the previous expression.
    pub fn insert(&mut self, name: impl Into<String>, expr: Expression) -> Option<Expression> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, expr)),
            None => {
                self.entries.push((name, expr));
                None
            }
        }
    }

    /// Chainable [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.insert(name, expr);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Expression> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Rename `from` to `to` in place. Returns false when `from` is absent.
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == from) {
            Some((name, _)) => {
                *name = to.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Output column names in projection order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.entries.iter().map(|(_, e)| e)
    }
}

impl<S: Into<String>> FromIterator<(S, Expression)> for SelectList {
    fn from_iter<I: IntoIterator<Item = (S, Expression)>>(iter: I) -> Self {
        let mut list = SelectList::new();
        for (name, expr) in iter {
            list.insert(name, expr);
        }
        list
    }
}

/// Which row of a deduplicate partition survives for an ordering expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterFunction {
    /// Keep the row with the smallest value (`ASC NULLS LAST`).
    Min,
    /// Keep the row with the largest value (`DESC NULLS LAST`).
    Max,
}

impl FilterFunction {
    pub fn order_sql(self) -> &'static str {
        match self {
            FilterFunction::Min => "ASC NULLS LAST",
            FilterFunction::Max => "DESC NULLS LAST",
        }
    }
}

/// A tie-break ordering expression of a deduplicate definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderExpression {
    pub expression: Expression,
    pub function: FilterFunction,
}

impl OrderExpression {
    pub fn min(expression: Expression) -> Self {
        OrderExpression {
            expression,
            function: FilterFunction::Min,
        }
    }

    pub fn max(expression: Expression) -> Self {
        OrderExpression {
            expression,
            function: FilterFunction::Max,
        }
    }
}

/// Select list plus grouping keys.
///
/// Select-list entries that are not grouping keys are expected to be
/// aggregates; that shape is not checked here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupByDefinition {
    select: SelectList,
    group_by: Vec<Expression>,
}

impl GroupByDefinition {
    pub fn new(select: SelectList, group_by: Vec<Expression>) -> Self {
        GroupByDefinition { select, group_by }
    }

    pub fn select(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.select.insert(name, expr);
        self
    }

    pub fn group_by(mut self, expr: Expression) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn select_expressions(&self) -> &SelectList {
        &self.select
    }

    pub fn group_by_expressions(&self) -> &[Expression] {
        &self.group_by
    }

    /// Every expression the definition references.
    pub fn all_expressions(&self) -> impl Iterator<Item = &Expression> {
        self.select.expressions().chain(self.group_by.iter())
    }
}

/// Select list, partition keys, and tie-break ordering for deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeduplicateDefinition {
    select: SelectList,
    dedup_keys: Vec<Expression>,
    order: Vec<OrderExpression>,
}

impl DeduplicateDefinition {
    pub fn new(select: SelectList, dedup_keys: Vec<Expression>, order: Vec<OrderExpression>) -> Self {
        DeduplicateDefinition {
            select,
            dedup_keys,
            order,
        }
    }

    pub fn select(mut self, name: impl Into<String>, expr: Expression) -> Self {
        self.select.insert(name, expr);
        self
    }

    pub fn dedup_on(mut self, expr: Expression) -> Self {
        self.dedup_keys.push(expr);
        self
    }

    pub fn order_by(mut self, order: OrderExpression) -> Self {
        self.order.push(order);
        self
    }

    pub fn select_expressions(&self) -> &SelectList {
        &self.select
    }

    pub fn dedup_expressions(&self) -> &[Expression] {
        &self.dedup_keys
    }

    pub fn order_expressions(&self) -> &[OrderExpression] {
        &self.order
    }

    pub fn all_expressions(&self) -> impl Iterator<Item = &Expression> {
        self.select
            .expressions()
            .chain(self.dedup_keys.iter())
            .chain(self.order.iter().map(|o| &o.expression))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::dialect::Dialect;
    use crate::relational::expression::{ExpressionFactory, ForeignExpression};

    const BQ: ExpressionFactory = ExpressionFactory::new(Dialect::BigQuery);

    #[test]
    fn test_select_list_preserves_insertion_order() {
        let list = SelectList::new()
            .with("b", BQ.compile("b"))
            .with("a", BQ.compile("a"))
            .with("c", BQ.compile("c"));
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_select_list_replace_keeps_position() {
        let mut list = SelectList::new()
            .with("a", BQ.compile("a"))
            .with("b", BQ.compile("b"));
        let old = list.insert("a", BQ.expression("a + 1"));
        assert_eq!(old.map(|e| e.text().to_string()), Some("a".to_string()));
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(list.get("a").map(Expression::text), Some("a + 1"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_select_list_remove() {
        let mut list: SelectList = [("a", BQ.compile("a")), ("b", BQ.compile("b"))]
            .into_iter()
            .collect();
        assert!(list.remove("a").is_some());
        assert!(list.remove("a").is_none());
        assert!(!list.contains("a"));
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_select_list_rename_keeps_position_and_expression() {
        let mut list = SelectList::new()
            .with("id", BQ.compile("id"))
            .with("b", BQ.compile("b"));
        assert!(list.rename("id", "ID"));
        assert!(!list.rename("missing", "x"));
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["ID", "b"]);
        assert_eq!(list.get("ID").map(Expression::text), Some("id"));
    }

    #[test]
    fn test_group_by_all_expressions() {
        let def = GroupByDefinition::default()
            .select("k", BQ.compile("k"))
            .select("total", BQ.expression("SUM(v)"))
            .group_by(BQ.compile("k"));
        let texts: Vec<&str> = def.all_expressions().map(Expression::text).collect();
        assert_eq!(texts, vec!["k", "SUM(v)", "k"]);
    }

    #[test]
    fn test_deduplicate_all_expressions_include_order() {
        let foreign: Expression = ForeignExpression::new("other", "ts", true).into();
        let def = DeduplicateDefinition::default()
            .select("id", BQ.compile("id"))
            .dedup_on(BQ.compile("id"))
            .order_by(OrderExpression::max(foreign.clone()));
        assert_eq!(def.all_expressions().count(), 3);
        assert!(def.all_expressions().any(|e| *e == foreign));
    }

    #[test]
    fn test_filter_function_order_sql() {
        assert_eq!(FilterFunction::Min.order_sql(), "ASC NULLS LAST");
        assert_eq!(FilterFunction::Max.order_sql(), "DESC NULLS LAST");
    }
}
