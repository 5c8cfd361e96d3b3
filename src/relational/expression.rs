//! Compiled SQL expressions and the dialect-bound expression factory.
//!
//! An [`Expression`] is either a native [`SqlExpression`], which only an
//! [`ExpressionFactory`] can produce and which remembers the dialect it was
//! compiled for, or a [`ForeignExpression`] handed over from some other
//! compiler. Relations accept only native expressions of their own dialect
//! that also report themselves valid (see [`supports`]).

use std::fmt;

use crate::relational::dialect::Dialect;

/// A SQL fragment compiled by an [`ExpressionFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlExpression {
    dialect: Dialect,
    sql: String,
    valid: bool,
}

impl SqlExpression {
    fn new(dialect: Dialect, sql: String, valid: bool) -> Self {
        SqlExpression {
            dialect,
            sql,
            valid,
        }
    }

    /// Dialect the fragment was compiled for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The SQL text. For an invalid expression this is the rejected input.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// An expression produced outside this crate's factories.
///
/// It may carry text and a validity flag of its own, but relations never
/// accept it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignExpression {
    origin: String,
    text: String,
    valid: bool,
}

impl ForeignExpression {
    pub fn new(origin: impl Into<String>, text: impl Into<String>, valid: bool) -> Self {
        ForeignExpression {
            origin: origin.into(),
            text: text.into(),
            valid,
        }
    }

    /// Name of the compiler that produced the expression.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// A compiled value, column, or computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Sql(SqlExpression),
    Foreign(ForeignExpression),
}

impl Expression {
    /// The expression's own validity flag.
    pub fn is_valid(&self) -> bool {
        match self {
            Expression::Sql(e) => e.is_valid(),
            Expression::Foreign(e) => e.is_valid(),
        }
    }

    /// Text to splice into a statement.
    pub fn text(&self) -> &str {
        match self {
            Expression::Sql(e) => e.sql(),
            Expression::Foreign(e) => e.text(),
        }
    }

    /// Dialect for native expressions, `None` for foreign ones.
    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            Expression::Sql(e) => Some(e.dialect()),
            Expression::Foreign(_) => None,
        }
    }
}

impl From<SqlExpression> for Expression {
    fn from(e: SqlExpression) -> Self {
        Expression::Sql(e)
    }
}

impl From<ForeignExpression> for Expression {
    fn from(e: ForeignExpression) -> Self {
        Expression::Foreign(e)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Whether `expr` may be used in a relation of `dialect`.
///
/// Dialect-boundness is checked first: a foreign expression is rejected
/// without consulting its validity flag.
pub fn supports(dialect: Dialect, expr: &Expression) -> bool {
    match expr {
        Expression::Sql(e) => e.dialect() == dialect && e.is_valid(),
        Expression::Foreign(_) => false,
    }
}

/// Whether every expression in `exprs` is supported. Vacuously true.
pub fn supports_all<'a, I>(dialect: Dialect, exprs: I) -> bool
where
    I: IntoIterator<Item = &'a Expression>,
{
    exprs.into_iter().all(|e| supports(dialect, e))
}

/// Stateless compiler of column references and SQL fragments for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpressionFactory {
    dialect: Dialect,
}

impl ExpressionFactory {
    pub const fn new(dialect: Dialect) -> Self {
        ExpressionFactory { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compile a bare column reference.
    ///
    /// The identifier is quoted only when the dialect requires it. Illegal
    /// identifiers yield an invalid expression holding the raw name.
    pub fn compile(&self, column: &str) -> Expression {
        if !self.dialect.is_legal_identifier(column) {
            tracing::debug!(dialect = %self.dialect, column, "rejected illegal identifier");
            return SqlExpression::new(self.dialect, column.to_string(), false).into();
        }
        SqlExpression::new(self.dialect, self.dialect.quote_ident(column), true).into()
    }

    /// Compile a raw SQL fragment, such as `SUM(amount)` or `status = 'open'`.
    ///
    /// The fragment is spliced verbatim, so it is scanned first: it is marked
    /// invalid when empty, when quotes or parentheses do not balance, or when
    /// it contains a top-level `;` or a comment that could swallow the rest
    /// of the generated statement.
    pub fn expression(&self, sql: &str) -> Expression {
        match fragment_problem(self.dialect, sql) {
            None => SqlExpression::new(self.dialect, sql.trim().to_string(), true).into(),
            Some(problem) => {
                tracing::debug!(dialect = %self.dialect, problem, "rejected SQL fragment");
                SqlExpression::new(self.dialect, sql.to_string(), false).into()
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
    Backtick,
}

/// Scan a fragment and describe the first structural problem, if any.
fn fragment_problem(dialect: Dialect, sql: &str) -> Option<&'static str> {
    if sql.trim().is_empty() {
        return Some("empty fragment");
    }

    let backslash_escapes = dialect == Dialect::BigQuery;
    let mut depth: usize = 0;
    let mut quote: Option<Quote> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\0' {
            return Some("NUL character");
        }

        if let Some(q) = quote {
            let close = match q {
                Quote::Single => '\'',
                Quote::Double => '"',
                Quote::Backtick => '`',
            };
            if c == '\\' && backslash_escapes {
                chars.next();
            } else if c == close {
                // Doubled delimiter is an escaped delimiter.
                if chars.peek() == Some(&close) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' => quote = Some(Quote::Single),
            '"' => quote = Some(Quote::Double),
            '`' if dialect == Dialect::BigQuery => quote = Some(Quote::Backtick),
            '`' => return Some("backtick outside BigQuery"),
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Some("unbalanced parentheses");
                }
                depth -= 1;
            }
            ';' => return Some("statement terminator"),
            '-' if chars.peek() == Some(&'-') => return Some("line comment"),
            '/' if chars.peek() == Some(&'*') => return Some("block comment"),
            '#' if dialect == Dialect::BigQuery => return Some("line comment"),
            _ => {}
        }
    }

    if quote.is_some() {
        Some("unterminated quoted text")
    } else if depth != 0 {
        Some("unbalanced parentheses")
    } else {
        None
    }
}
