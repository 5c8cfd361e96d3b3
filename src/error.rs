//! Error types for sql_pushdown.
//!
//! Two families of failure exist and they never mix:
//!
//! - [`ValidationError`]: a business-logic rejection (an unsupported
//!   expression or aggregation definition). These are never returned as
//!   `Err`; they are carried by an invalid [`Relation`](crate::Relation) so
//!   the caller can surface the message as a configuration error.
//! - [`PushdownError`]: a precondition violation or an I/O / decoding
//!   failure at the crate boundary (building a base relation, loading a
//!   config file, parsing a plan document). These are propagated via
//!   `Result<T, PushdownError>`.
//!
//! # Error Classification
//!
//! [`PushdownError::kind`] classifies errors for the CLI and for callers
//! that map failures onto their own taxonomy:
//! - **User**: bad arguments or plan documents.
//! - **Config**: unreadable or malformed configuration.
//! - **Internal**: bugs.

use std::fmt;
use std::path::PathBuf;

/// Kind of aggregation definition that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    GroupBy,
    Deduplicate,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::GroupBy => write!(f, "GroupByDefinition"),
            DefinitionKind::Deduplicate => write!(f, "DeduplicateDefinition"),
        }
    }
}

/// Rejection carried by an invalid relation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An expression was foreign to the relation's dialect or reported
    /// itself invalid.
    #[error("Unsupported or invalid expression type.")]
    UnsupportedExpression,

    /// Some expression inside a group-by or deduplicate definition failed
    /// the validity check.
    #[error("{0} contains unsupported or invalid expressions")]
    InvalidDefinition(DefinitionKind),
}

/// Primary error type for the crate boundary.
#[derive(Debug, thiserror::Error)]
pub enum PushdownError {
    // ── User errors ──────────────────────────────────────────────────────
    /// A required argument was empty, duplicated, or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A plan document was structurally valid but semantically unusable.
    #[error("plan error: {0}")]
    PlanError(String),

    /// A plan document could not be decoded from JSON.
    #[error("plan decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// A plan document could not be decoded from TOML.
    #[error("plan decode error: {0}")]
    PlanToml(toml::de::Error),

    /// A plan file could not be read.
    #[error("cannot read plan {}: {source}", path.display())]
    PlanFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// A configuration value was out of range or unrecognised.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// A configuration document could not be decoded.
    #[error("toml decode error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // ── Internal errors, should not happen ──────────────────────────────
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Classification of error kind for callers and the CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushdownErrorKind {
    User,
    Config,
    Internal,
}

impl fmt::Display for PushdownErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushdownErrorKind::User => write!(f, "USER"),
            PushdownErrorKind::Config => write!(f, "CONFIG"),
            PushdownErrorKind::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl PushdownError {
    /// Classify the error.
    pub fn kind(&self) -> PushdownErrorKind {
        match self {
            PushdownError::InvalidArgument(_)
            | PushdownError::PlanError(_)
            | PushdownError::Json(_)
            | PushdownError::PlanToml(_)
            | PushdownError::PlanFile { .. } => PushdownErrorKind::User,

            PushdownError::ConfigError(_) | PushdownError::Toml(_) | PushdownError::Io(_) => {
                PushdownErrorKind::Config
            }

            PushdownError::InternalError(_) => PushdownErrorKind::Internal,
        }
    }
}
