//! Target SQL dialects and their identifier rules.
//!
//! Every compiled expression and every relation is bound to exactly one
//! [`Dialect`]. Quoting is minimal: identifiers that are lexically plain and
//! not reserved are emitted bare, everything else is quoted and escaped.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PushdownError;

/// BigQuery reserved keywords, uppercase and sorted for binary search.
const BIGQUERY_RESERVED: &[&str] = &[
    "ALL",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASSERT_ROWS_MODIFIED",
    "AT",
    "BETWEEN",
    "BY",
    "CASE",
    "CAST",
    "COLLATE",
    "CONTAINS",
    "CREATE",
    "CROSS",
    "CUBE",
    "CURRENT",
    "DEFAULT",
    "DEFINE",
    "DESC",
    "DISTINCT",
    "ELSE",
    "END",
    "ENUM",
    "ESCAPE",
    "EXCEPT",
    "EXCLUDE",
    "EXISTS",
    "EXTRACT",
    "FALSE",
    "FETCH",
    "FOLLOWING",
    "FOR",
    "FROM",
    "FULL",
    "GROUP",
    "GROUPING",
    "GROUPS",
    "HASH",
    "HAVING",
    "IF",
    "IGNORE",
    "IN",
    "INNER",
    "INTERSECT",
    "INTERVAL",
    "INTO",
    "IS",
    "JOIN",
    "LATERAL",
    "LEFT",
    "LIKE",
    "LIMIT",
    "LOOKUP",
    "MERGE",
    "NATURAL",
    "NEW",
    "NO",
    "NOT",
    "NULL",
    "NULLS",
    "OF",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "OVER",
    "PARTITION",
    "PRECEDING",
    "PROTO",
    "QUALIFY",
    "RANGE",
    "RECURSIVE",
    "RESPECT",
    "RIGHT",
    "ROLLUP",
    "ROWS",
    "SELECT",
    "SET",
    "SOME",
    "STRUCT",
    "TABLESAMPLE",
    "THEN",
    "TO",
    "TREAT",
    "TRUE",
    "UNBOUNDED",
    "UNION",
    "UNNEST",
    "USING",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
    "WITHIN",
];

/// PostgreSQL fully reserved keywords, uppercase and sorted.
const POSTGRES_RESERVED: &[&str] = &[
    "ALL",
    "ANALYSE",
    "ANALYZE",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASYMMETRIC",
    "BOTH",
    "CASE",
    "CAST",
    "CHECK",
    "COLLATE",
    "COLUMN",
    "CONSTRAINT",
    "CREATE",
    "CURRENT_CATALOG",
    "CURRENT_DATE",
    "CURRENT_ROLE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DEFAULT",
    "DEFERRABLE",
    "DESC",
    "DISTINCT",
    "DO",
    "ELSE",
    "END",
    "EXCEPT",
    "FALSE",
    "FETCH",
    "FOR",
    "FOREIGN",
    "FROM",
    "GRANT",
    "GROUP",
    "HAVING",
    "IN",
    "INITIALLY",
    "INTERSECT",
    "INTO",
    "LATERAL",
    "LEADING",
    "LIMIT",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "NOT",
    "NULL",
    "OFFSET",
    "ON",
    "ONLY",
    "OR",
    "ORDER",
    "PLACING",
    "PRIMARY",
    "REFERENCES",
    "RETURNING",
    "SELECT",
    "SESSION_USER",
    "SOME",
    "SYMMETRIC",
    "SYSTEM_USER",
    "TABLE",
    "THEN",
    "TO",
    "TRAILING",
    "TRUE",
    "UNION",
    "UNIQUE",
    "USER",
    "USING",
    "VARIADIC",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
];

/// A target warehouse SQL dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Google BigQuery Standard SQL.
    #[default]
    BigQuery,
    /// PostgreSQL.
    #[serde(alias = "postgres")]
    PostgreSql,
}

impl Dialect {
    /// Lowercase dialect name as used in config files.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::BigQuery => "bigquery",
            Dialect::PostgreSql => "postgresql",
        }
    }

    /// Longest identifier the dialect accepts.
    ///
    /// BigQuery counts characters; PostgreSQL counts bytes (NAMEDATALEN - 1).
    pub fn max_identifier_len(self) -> usize {
        match self {
            Dialect::BigQuery => 300,
            Dialect::PostgreSql => 63,
        }
    }

    fn identifier_len(self, name: &str) -> usize {
        match self {
            Dialect::BigQuery => name.chars().count(),
            Dialect::PostgreSql => name.len(),
        }
    }

    /// Whether `name` can be used as an identifier at all (quoted if need be).
    pub fn is_legal_identifier(self, name: &str) -> bool {
        !name.is_empty()
            && self.identifier_len(name) <= self.max_identifier_len()
            && !name.chars().any(char::is_control)
    }

    /// Whether `word` is a reserved keyword in this dialect.
    pub fn is_reserved(self, word: &str) -> bool {
        let table = match self {
            Dialect::BigQuery => BIGQUERY_RESERVED,
            Dialect::PostgreSql => POSTGRES_RESERVED,
        };
        let upper = word.to_ascii_uppercase();
        table.binary_search(&upper.as_str()).is_ok()
    }

    /// Whether `name` must be quoted to be read back as the same identifier.
    pub fn needs_quoting(self, name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return true;
        };
        let plain = match self {
            Dialect::BigQuery => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            // Unquoted PostgreSQL identifiers fold to lowercase, so anything
            // with uppercase letters must be quoted to survive.
            Dialect::PostgreSql => {
                (first.is_ascii_lowercase() || first == '_')
                    && chars.all(|c| {
                        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$'
                    })
            }
        };
        !plain || self.is_reserved(name)
    }

    /// Quote an identifier only if required.
    pub fn quote_ident(self, name: &str) -> String {
        if self.needs_quoting(name) {
            self.force_quote_ident(name)
        } else {
            name.to_string()
        }
    }

    /// Quote an identifier unconditionally.
    pub fn force_quote_ident(self, name: &str) -> String {
        match self {
            Dialect::BigQuery => format!("`{}`", escape_backticked(name)),
            Dialect::PostgreSql => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Render a fully-qualified physical table reference.
    ///
    /// BigQuery renders `` `project.dataset.table` `` as one quoted path.
    /// PostgreSQL renders `schema.table` with the dataset as the schema; the
    /// project has no PostgreSQL counterpart and is ignored.
    pub fn table_reference(self, project: &str, dataset: &str, table: &str) -> String {
        match self {
            Dialect::BigQuery => format!(
                "`{}.{}.{}`",
                escape_backticked(project),
                escape_backticked(dataset),
                escape_backticked(table),
            ),
            Dialect::PostgreSql => {
                format!("{}.{}", self.quote_ident(dataset), self.quote_ident(table))
            }
        }
    }

    /// Whether table references in this dialect use the project component.
    pub fn uses_project(self) -> bool {
        matches!(self, Dialect::BigQuery)
    }

    /// Whether two identifiers name the same column.
    ///
    /// BigQuery column names are case-insensitive. PostgreSQL names that
    /// differ only by case are always emitted quoted, so they stay distinct.
    pub fn same_identifier(self, a: &str, b: &str) -> bool {
        match self {
            Dialect::BigQuery => a == b || a.to_lowercase() == b.to_lowercase(),
            Dialect::PostgreSql => a == b,
        }
    }

    /// Whether two of `names` would name the same output column.
    pub fn has_duplicate_names<'a, I>(self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<&str> = names.into_iter().collect();
        names
            .iter()
            .enumerate()
            .any(|(i, a)| names[..i].iter().any(|b| self.same_identifier(a, b)))
    }
}

fn escape_backticked(name: &str) -> String {
    name.replace('\\', "\\\\").replace('`', "\\`")
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = PushdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSql),
            other => Err(PushdownError::ConfigError(format!(
                "unknown dialect '{other}', expected 'bigquery' or 'postgresql'"
            ))),
        }
    }
}
