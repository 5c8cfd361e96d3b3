//! Compiler configuration.
//!
//! Settings are read from a TOML file and may be overridden from the
//! environment. All keys are optional.
//!
//! ```toml
//! dialect = "bigquery"      # or "postgresql"
//! project = "analytics"     # default project for plan sources
//! dataset = "staging"       # default dataset / schema for plan sources
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PushdownError;
use crate::relational::{Dialect, ExpressionFactory};

/// Overrides `dialect`.
pub const ENV_DIALECT: &str = "PUSHDOWN_DIALECT";
/// Overrides `project`.
pub const ENV_PROJECT: &str = "PUSHDOWN_PROJECT";
/// Overrides `dataset`.
pub const ENV_DATASET: &str = "PUSHDOWN_DATASET";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushdownConfig {
    /// Target dialect for every expression and relation.
    pub dialect: Dialect,
    /// Project used when a plan source does not name one.
    pub project: Option<String>,
    /// Dataset (schema in PostgreSQL) used when a plan source does not name one.
    pub dataset: Option<String>,
}

impl PushdownConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, PushdownError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PushdownError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), dialect = %config.dialect, "loaded config");
        Ok(config)
    }

    /// Apply `PUSHDOWN_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, PushdownError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, PushdownError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dialect) = get(ENV_DIALECT) {
            self.dialect = dialect.parse()?;
        }
        if let Some(project) = get(ENV_PROJECT) {
            self.project = Some(project);
        }
        if let Some(dataset) = get(ENV_DATASET) {
            self.dataset = Some(dataset);
        }
        Ok(self)
    }

    pub fn expression_factory(&self) -> ExpressionFactory {
        ExpressionFactory::new(self.dialect)
    }
}
