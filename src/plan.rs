//! Serializable plan documents.
//!
//! A plan is a source table plus an ordered list of steps. Compiling it
//! builds the relation chain step by step; a rejected step yields an invalid
//! relation (not an `Err`), exactly as calling the operations directly would.
//!
//! ```json
//! {
//!   "source": { "project": "proj", "dataset": "ds", "table": "orders",
//!               "name": "orders", "columns": ["id", "status", "amount"] },
//!   "steps": [
//!     { "op": "filter", "condition": { "sql": "status = 'open'" } },
//!     { "op": "group_by",
//!       "select": [ { "name": "status", "expr": { "column": "status" } },
//!                   { "name": "total",  "expr": { "sql": "SUM(amount)" } } ],
//!       "keys": [ { "column": "status" } ] }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::PushdownConfig;
use crate::error::PushdownError;
use crate::relational::{
    DeduplicateDefinition, Expression, ExpressionFactory, FilterFunction, GroupByDefinition,
    OrderExpression, Relation, SelectList, SqlDataset,
};

/// An expression in a plan document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprSpec {
    /// A bare column reference.
    Column(String),
    /// A raw SQL fragment.
    Sql(String),
}

impl ExprSpec {
    pub fn compile(&self, factory: &ExpressionFactory) -> Expression {
        match self {
            ExprSpec::Column(name) => factory.compile(name),
            ExprSpec::Sql(sql) => factory.expression(sql),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedExprSpec {
    pub name: String,
    pub expr: ExprSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub expr: ExprSpec,
    pub function: FilterFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    /// Falls back to the config's project.
    #[serde(default)]
    pub project: Option<String>,
    /// Falls back to the config's dataset.
    #[serde(default)]
    pub dataset: Option<String>,
    pub table: String,
    /// Logical dataset name used as the derived-table alias.
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepSpec {
    SetColumn {
        name: String,
        expr: ExprSpec,
    },
    DropColumn {
        name: String,
    },
    Select {
        columns: Vec<NamedExprSpec>,
    },
    Filter {
        condition: ExprSpec,
    },
    GroupBy {
        select: Vec<NamedExprSpec>,
        #[serde(default)]
        keys: Vec<ExprSpec>,
    },
    Deduplicate {
        select: Vec<NamedExprSpec>,
        #[serde(default)]
        keys: Vec<ExprSpec>,
        #[serde(default)]
        order: Vec<OrderSpec>,
    },
}

/// Names must be unique; whether two names collide under the dialect's
/// case rules is left to the relation.
fn select_list(
    specs: &[NamedExprSpec],
    factory: &ExpressionFactory,
) -> Result<SelectList, PushdownError> {
    let mut list = SelectList::new();
    for spec in specs {
        if list.contains(&spec.name) {
            return Err(PushdownError::PlanError(format!(
                "column '{}' is listed more than once",
                spec.name
            )));
        }
        list.insert(spec.name.clone(), spec.expr.compile(factory));
    }
    Ok(list)
}

fn expressions(specs: &[ExprSpec], factory: &ExpressionFactory) -> Vec<Expression> {
    specs.iter().map(|s| s.compile(factory)).collect()
}

impl StepSpec {
    /// Apply this step to `relation`.
    ///
    /// Fails only when the step itself is malformed; an expression the
    /// relation cannot use still yields an invalid relation.
    pub fn apply(
        &self,
        relation: &Relation,
        factory: &ExpressionFactory,
    ) -> Result<Relation, PushdownError> {
        let next = match self {
            StepSpec::SetColumn { name, expr } => {
                relation.set_column(name, &expr.compile(factory))
            }
            StepSpec::DropColumn { name } => relation.drop_column(name),
            StepSpec::Select { columns } => relation.select(&select_list(columns, factory)?),
            StepSpec::Filter { condition } => relation.filter(&condition.compile(factory)),
            StepSpec::GroupBy { select, keys } => relation.group_by(&GroupByDefinition::new(
                select_list(select, factory)?,
                expressions(keys, factory),
            )),
            StepSpec::Deduplicate {
                select,
                keys,
                order,
            } => {
                let order = order
                    .iter()
                    .map(|o| OrderExpression {
                        expression: o.expr.compile(factory),
                        function: o.function,
                    })
                    .collect();
                relation.deduplicate(&DeduplicateDefinition::new(
                    select_list(select, factory)?,
                    expressions(keys, factory),
                    order,
                ))
            }
        };
        Ok(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanSpec {
    pub source: SourceSpec,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

impl PlanSpec {
    pub fn from_json(text: &str) -> Result<Self, PushdownError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, PushdownError> {
        toml::from_str(text).map_err(PushdownError::PlanToml)
    }

    /// Read a plan file. A `.toml` extension selects TOML, anything else
    /// is decoded as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PushdownError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PushdownError::PlanFile {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&text)
        } else {
            Self::from_json(&text)
        }
    }

    /// Build the base relation described by `source`.
    pub fn base_relation(&self, config: &PushdownConfig) -> Result<Relation, PushdownError> {
        let source = &self.source;
        let dialect = config.dialect;
        let project = source.project.as_ref().or(config.project.as_ref());
        let dataset = source
            .dataset
            .as_ref()
            .or(config.dataset.as_ref())
            .ok_or_else(|| {
                PushdownError::PlanError(format!(
                    "source '{}' has no dataset and none is configured",
                    source.table
                ))
            })?;
        let project = match project {
            Some(p) => p.as_str(),
            None if dialect.uses_project() => {
                return Err(PushdownError::PlanError(format!(
                    "source '{}' has no project and none is configured",
                    source.table
                )));
            }
            None => "",
        };
        Relation::from_table(
            dialect,
            project,
            dataset,
            &SqlDataset::new(source.table.clone(), source.name.clone()),
            source.columns.iter().cloned(),
        )
    }

    /// Compile every step, returning the base relation followed by one
    /// relation per step.
    pub fn compile_steps(&self, config: &PushdownConfig) -> Result<Vec<Relation>, PushdownError> {
        let factory = config.expression_factory();
        let mut current = self.base_relation(config)?;
        let mut out = Vec::with_capacity(self.steps.len() + 1);
        out.push(current.clone());
        for (index, step) in self.steps.iter().enumerate() {
            let next = step.apply(&current, &factory).map_err(|err| match err {
                PushdownError::PlanError(msg) => {
                    PushdownError::PlanError(format!("step {index}: {msg}"))
                }
                other => other,
            })?;
            if current.is_valid() && !next.is_valid() {
                if let Some(err) = next.validation_error() {
                    tracing::warn!(step = index, error = %err, "plan step rejected");
                }
            }
            out.push(next.clone());
            current = next;
        }
        Ok(out)
    }

    /// Compile the plan to its final relation.
    pub fn compile(&self, config: &PushdownConfig) -> Result<Relation, PushdownError> {
        self.compile_steps(config)?
            .pop()
            .ok_or_else(|| PushdownError::InternalError("compiled plan is empty".into()))
    }
}

/// Index of the first step whose result is invalid, if any.
///
/// `relations` is the output of [`PlanSpec::compile_steps`]; index 0 is the
/// base relation, so the step index is one less than the relation index.
pub fn first_rejected_step(relations: &[Relation]) -> Option<usize> {
    relations
        .iter()
        .position(|r| !r.is_valid())
        .map(|i| i.saturating_sub(1))
}
