//! Immutable relational plan nodes.
//!
//! A [`Relation`] is either valid (it owns its compiled SQL and output
//! columns) or invalid (terminal; it carries only a [`ValidationError`]).
//! Every algebraic operation returns a new relation and leaves the receiver
//! untouched. Compilation is incremental: each operation wraps the
//! receiver's SQL text as a derived table and never walks the lineage.
//!
//! # Invariants
//!
//! - `columns()` equals the alias list of the outermost `SELECT` of
//!   `transform_expression()`.
//! - An operation on an invalid relation returns that same relation.
//! - The parent link is a [`Weak`] pointer kept for introspection only.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{DefinitionKind, PushdownError, ValidationError};
use crate::hash::sql_fingerprint;
use crate::relational::builders::{
    DeduplicateBuilder, GroupByBuilder, NestedSelectBuilder, QueryBuilder, SelectBuilder,
};
use crate::relational::definition::{DeduplicateDefinition, GroupByDefinition, SelectList};
use crate::relational::dialect::Dialect;
use crate::relational::expression::{Expression, ExpressionFactory, supports, supports_all};

/// Physical table descriptor handed over by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDataset {
    table_name: String,
    dataset_name: String,
}

impl SqlDataset {
    /// `table_name` is the physical table; `dataset_name` is the logical
    /// name used as the derived-table alias in every generated statement.
    pub fn new(table_name: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        SqlDataset {
            table_name: table_name.into(),
            dataset_name: dataset_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }
}

/// The operation that produced a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Base,
    SetColumn,
    DropColumn,
    Select,
    Filter,
    GroupBy,
    Deduplicate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Base => "base",
            Operation::SetColumn => "set_column",
            Operation::DropColumn => "drop_column",
            Operation::Select => "select",
            Operation::Filter => "filter",
            Operation::GroupBy => "group_by",
            Operation::Deduplicate => "deduplicate",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
enum RelationNode {
    Valid(ValidNode),
    Invalid(ValidationError),
}

#[derive(Debug)]
struct ValidNode {
    dialect: Dialect,
    dataset: Arc<SqlDataset>,
    columns: Vec<String>,
    sql: String,
    depth: usize,
    operation: Operation,
    parent: Weak<RelationNode>,
}

impl ValidNode {
    fn factory(&self) -> ExpressionFactory {
        ExpressionFactory::new(self.dialect)
    }

    /// Current columns as a select list of plain column references.
    fn selected_columns(&self) -> SelectList {
        let factory = self.factory();
        self.columns
            .iter()
            .map(|c| (c.as_str(), factory.compile(c)))
            .collect()
    }

    /// The current column that `name` refers to under the dialect's
    /// identifier rules.
    fn matching_column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .find(|c| self.dialect.same_identifier(c, name))
    }

    /// Output names must be legal and pairwise distinct.
    fn acceptable_names<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<&str> = names.into_iter().collect();
        names.iter().all(|n| self.dialect.is_legal_identifier(n))
            && !self.dialect.has_duplicate_names(names)
    }
}

/// One immutable step of a logical plan.
///
/// Cloning is cheap: the node is shared behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Relation {
    node: Arc<RelationNode>,
}

impl Relation {
    /// Create the base relation selecting `columns` from a physical table.
    ///
    /// `project` and `dataset` qualify the table (`dataset` is the schema in
    /// PostgreSQL, where `project` is ignored). Fails with
    /// [`PushdownError::InvalidArgument`] when a required name is empty or
    /// when `columns` is empty, repeats a name, or holds an illegal
    /// identifier.
    pub fn from_table<I, S>(
        dialect: Dialect,
        project: &str,
        dataset: &str,
        source: &SqlDataset,
        columns: I,
    ) -> Result<Relation, PushdownError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if dialect.uses_project() && project.trim().is_empty() {
            return Err(PushdownError::InvalidArgument(format!(
                "a project is required for {dialect} tables"
            )));
        }
        if dataset.trim().is_empty() {
            return Err(PushdownError::InvalidArgument(
                "a dataset is required to qualify the source table".into(),
            ));
        }
        if source.table_name().trim().is_empty() {
            return Err(PushdownError::InvalidArgument(
                "source table name is empty".into(),
            ));
        }
        if !dialect.is_legal_identifier(source.dataset_name()) {
            return Err(PushdownError::InvalidArgument(format!(
                "dataset name '{}' is not a legal {dialect} identifier",
                source.dataset_name()
            )));
        }

        let factory = ExpressionFactory::new(dialect);
        let mut selected = SelectList::new();
        for column in columns {
            let column = column.into();
            let expr = factory.compile(&column);
            if !expr.is_valid() {
                return Err(PushdownError::InvalidArgument(format!(
                    "column '{column}' is not a legal {dialect} identifier"
                )));
            }
            if selected
                .names()
                .any(|existing| dialect.same_identifier(existing, &column))
            {
                return Err(PushdownError::InvalidArgument(format!(
                    "column '{column}' is listed more than once"
                )));
            }
            selected.insert(column, expr);
        }
        if selected.is_empty() {
            return Err(PushdownError::InvalidArgument(
                "a base relation needs at least one column".into(),
            ));
        }

        let table = dialect.table_reference(project, dataset, source.table_name());
        let sql = SelectBuilder::new(dialect, &selected, &table).get_query();
        let columns: Vec<String> = selected.names().map(str::to_string).collect();

        tracing::debug!(
            %dialect,
            table = %table,
            columns = columns.len(),
            "created base relation"
        );

        Ok(Relation {
            node: Arc::new(RelationNode::Valid(ValidNode {
                dialect,
                dataset: Arc::new(source.clone()),
                columns,
                sql,
                depth: 0,
                operation: Operation::Base,
                parent: Weak::new(),
            })),
        })
    }

    /// Create a terminal invalid relation.
    pub fn invalid(error: ValidationError) -> Relation {
        Relation {
            node: Arc::new(RelationNode::Invalid(error)),
        }
    }

    fn valid(&self) -> Option<&ValidNode> {
        match &*self.node {
            RelationNode::Valid(node) => Some(node),
            RelationNode::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid().is_some()
    }

    /// The rejection this relation carries, `None` when valid.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match &*self.node {
            RelationNode::Valid(_) => None,
            RelationNode::Invalid(err) => Some(err),
        }
    }

    /// Output columns in projection order. Empty for an invalid relation.
    pub fn columns(&self) -> &[String] {
        match self.valid() {
            Some(node) => &node.columns,
            None => &[],
        }
    }

    /// The compiled SQL of this node.
    pub fn transform_expression(&self) -> Option<&str> {
        self.valid().map(|node| node.sql.as_str())
    }

    pub fn dialect(&self) -> Option<Dialect> {
        self.valid().map(|node| node.dialect)
    }

    pub fn dataset(&self) -> Option<&SqlDataset> {
        self.valid().map(|node| node.dataset.as_ref())
    }

    /// Number of operations applied since the base relation.
    pub fn depth(&self) -> Option<usize> {
        self.valid().map(|node| node.depth)
    }

    pub fn operation(&self) -> Option<Operation> {
        self.valid().map(|node| node.operation)
    }

    /// The relation this one was derived from, while it is still alive.
    pub fn parent(&self) -> Option<Relation> {
        self.valid()
            .and_then(|node| node.parent.upgrade())
            .map(|node| Relation { node })
    }

    /// This relation followed by every still-alive ancestor, nearest first.
    pub fn lineage(&self) -> Vec<Relation> {
        let mut out = vec![self.clone()];
        let mut current = self.parent();
        while let Some(relation) = current {
            current = relation.parent();
            out.push(relation);
        }
        out
    }

    /// Fingerprint of the compiled SQL.
    pub fn fingerprint(&self) -> Option<u64> {
        self.valid().map(|node| sql_fingerprint(&node.sql))
    }

    /// A factory producing expressions this relation accepts.
    pub fn expression_factory(&self) -> Option<ExpressionFactory> {
        self.valid().map(ValidNode::factory)
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Relation) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    // ── Algebraic operations ────────────────────────────────────────────

    /// Add or replace one output column.
    ///
    /// A new name is appended; an existing name keeps its position and
    /// takes the new expression.
    pub fn set_column(&self, name: &str, value: &Expression) -> Relation {
        let Some(node) = self.valid() else {
            return self.clone();
        };
        if !supports(node.dialect, value) || !node.dialect.is_legal_identifier(name) {
            return self.reject(Operation::SetColumn, ValidationError::UnsupportedExpression);
        }

        let mut selected = node.selected_columns();
        if let Some(existing) = node.matching_column(name) {
            selected.rename(existing, name);
        }
        selected.insert(name, value.clone());
        let sql = NestedSelectBuilder::new(
            node.dialect,
            &selected,
            &node.sql,
            node.dataset.dataset_name(),
        )
        .get_query();
        self.derive(node, Operation::SetColumn, &selected, sql)
    }

    /// Remove one output column. Dropping an absent name still wraps.
    ///
    /// Dropping the last column is allowed and renders `SELECT FROM (...)`.
    /// PostgreSQL runs that as a zero-column result; BigQuery rejects it
    /// when the statement is executed.
    pub fn drop_column(&self, name: &str) -> Relation {
        let Some(node) = self.valid() else {
            return self.clone();
        };

        let mut selected = node.selected_columns();
        if let Some(existing) = node.matching_column(name) {
            selected.remove(existing);
        }
        let sql = NestedSelectBuilder::new(
            node.dialect,
            &selected,
            &node.sql,
            node.dataset.dataset_name(),
        )
        .get_query();
        self.derive(node, Operation::DropColumn, &selected, sql)
    }

    /// Replace the select list entirely.
    ///
    /// An empty list is accepted and renders `SELECT FROM (...)`, which
    /// only PostgreSQL can execute.
    pub fn select(&self, columns: &SelectList) -> Relation {
        let Some(node) = self.valid() else {
            return self.clone();
        };
        if !supports_all(node.dialect, columns.expressions()) || !node.acceptable_names(columns.names())
        {
            return self.reject(Operation::Select, ValidationError::UnsupportedExpression);
        }

        let sql = NestedSelectBuilder::new(
            node.dialect,
            columns,
            &node.sql,
            node.dataset.dataset_name(),
        )
        .get_query();
        self.derive(node, Operation::Select, columns, sql)
    }

    /// Keep rows satisfying `condition`; columns are unchanged.
    pub fn filter(&self, condition: &Expression) -> Relation {
        let Some(node) = self.valid() else {
            return self.clone();
        };
        if !supports(node.dialect, condition) {
            return self.reject(Operation::Filter, ValidationError::UnsupportedExpression);
        }

        let selected = node.selected_columns();
        let sql = NestedSelectBuilder::new(
            node.dialect,
            &selected,
            &node.sql,
            node.dataset.dataset_name(),
        )
        .with_filter(Some(condition))
        .get_query();
        self.derive(node, Operation::Filter, &selected, sql)
    }

    /// Aggregate by the definition's keys.
    pub fn group_by(&self, definition: &GroupByDefinition) -> Relation {
        let Some(node) = self.valid() else {
            return self.clone();
        };
        if !supports_all(node.dialect, definition.all_expressions())
            || !node.acceptable_names(definition.select_expressions().names())
        {
            return self.reject(
                Operation::GroupBy,
                ValidationError::InvalidDefinition(DefinitionKind::GroupBy),
            );
        }

        let sql = GroupByBuilder::new(
            node.dialect,
            definition,
            &node.sql,
            node.dataset.dataset_name(),
        )
        .get_query();
        self.derive(
            node,
            Operation::GroupBy,
            definition.select_expressions(),
            sql,
        )
    }

    /// Keep one row per partition of the definition's dedup keys.
    pub fn deduplicate(&self, definition: &DeduplicateDefinition) -> Relation {
        let Some(node) = self.valid() else {
            return self.clone();
        };
        if !supports_all(node.dialect, definition.all_expressions())
            || !node.acceptable_names(definition.select_expressions().names())
        {
            return self.reject(
                Operation::Deduplicate,
                ValidationError::InvalidDefinition(DefinitionKind::Deduplicate),
            );
        }

        let sql = DeduplicateBuilder::new(
            node.dialect,
            definition,
            &node.sql,
            node.dataset.dataset_name(),
        )
        .get_query();
        self.derive(
            node,
            Operation::Deduplicate,
            definition.select_expressions(),
            sql,
        )
    }

    fn derive(
        &self,
        node: &ValidNode,
        operation: Operation,
        selected: &SelectList,
        sql: String,
    ) -> Relation {
        let columns: Vec<String> = selected.names().map(str::to_string).collect();
        let depth = node.depth + 1;
        tracing::debug!(
            %operation,
            columns = columns.len(),
            depth,
            "compiled relation"
        );
        Relation {
            node: Arc::new(RelationNode::Valid(ValidNode {
                dialect: node.dialect,
                dataset: Arc::clone(&node.dataset),
                columns,
                sql,
                depth,
                operation,
                parent: Arc::downgrade(&self.node),
            })),
        }
    }

    fn reject(&self, operation: Operation, error: ValidationError) -> Relation {
        tracing::debug!(%operation, %error, "rejected relation operation");
        Relation::invalid(error)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.node {
            RelationNode::Valid(node) => f.write_str(&node.sql),
            RelationNode::Invalid(err) => write!(f, "invalid relation: {err}"),
        }
    }
}
