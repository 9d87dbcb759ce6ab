//! Common types and traits shared across all query builders

use tracing::{debug, warn};

use crate::error::BuildError;
use crate::{Result, Value};

/// Generated SQL text and its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// Core trait for all query builders
pub trait QueryBuilder {
    /// Generate the SQL and arguments.
    ///
    /// The first successful call caches its output and later calls return
    /// the cached statement verbatim, even if the builder was changed in
    /// between. Call [`QueryBuilder::reset`] before reusing a builder.
    fn to_sql(&mut self) -> Result<Statement>;

    /// The error captured while configuring, if any
    fn error(&self) -> Option<&BuildError>;

    /// Return to a pristine state, keeping only the dialect
    fn reset(&mut self);
}

/// Configuration state of a builder: still being configured, or failed
/// with the first error that was captured.
#[derive(Debug, Clone)]
pub(crate) enum Stage<S> {
    Configuring(S),
    Failed(BuildError),
}

impl<S: Default> Default for Stage<S> {
    fn default() -> Self {
        Stage::Configuring(S::default())
    }
}

impl<S> Stage<S> {
    /// Apply a configuration step. Once failed, steps are ignored so the
    /// first error wins.
    pub(crate) fn apply<F>(&mut self, step: F)
    where
        F: FnOnce(&mut S) -> std::result::Result<(), BuildError>,
    {
        if let Stage::Configuring(state) = self {
            if let Err(err) = step(state) {
                self.fail(err);
            }
        }
    }

    pub(crate) fn fail(&mut self, err: BuildError) {
        if let Stage::Configuring(_) = self {
            warn!(error = %err, "builder captured error");
            *self = Stage::Failed(err);
        }
    }

    pub(crate) fn state(&self) -> std::result::Result<&S, BuildError> {
        match self {
            Stage::Configuring(state) => Ok(state),
            Stage::Failed(err) => Err(err.clone()),
        }
    }

    pub(crate) fn error(&self) -> Option<&BuildError> {
        match self {
            Stage::Configuring(_) => None,
            Stage::Failed(err) => Some(err),
        }
    }
}

/// Shared `to_sql` flow: return the cached statement, or render once and
/// cache it. A render error is captured so later calls report it again.
pub(crate) fn compile<S, F>(
    stage: &mut Stage<S>,
    cache: &mut Option<Statement>,
    kind: &'static str,
    render: F,
) -> Result<Statement>
where
    F: FnOnce(&S) -> std::result::Result<Statement, BuildError>,
{
    if let Some(stmt) = cache {
        return Ok(stmt.clone());
    }

    let rendered = stage.state().and_then(render);
    match rendered {
        Ok(stmt) => {
            debug!(kind, sql = %stmt.sql, args = stmt.args.len(), "generated statement");
            *cache = Some(stmt.clone());
            Ok(stmt)
        }
        Err(err) => {
            stage.fail(err.clone());
            Err(err.into())
        }
    }
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Render `column DIRECTION` for an order-by entry
pub(crate) fn order_term(column: &str, direction: SortDirection) -> String {
    format!("{column} {direction}")
}

/// Trait to convert various types into columns
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl IntoColumns for &[&str] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

// For tuples
impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

/// Trait to convert various types into an ordered list of bound values
pub trait IntoValues {
    fn into_values(self) -> Vec<Value>;
}

impl IntoValues for () {
    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T> IntoValues for Vec<T>
where
    T: Into<Value>,
{
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T, const N: usize> IntoValues for [T; N]
where
    T: Into<Value>,
{
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

macro_rules! impl_into_values_for_tuple {
    ($($name:ident),+) => {
        impl<$($name),+> IntoValues for ($($name,)+)
        where
            $($name: Into<Value>,)+
        {
            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_values_for_tuple!(A);
impl_into_values_for_tuple!(A, B);
impl_into_values_for_tuple!(A, B, C);
impl_into_values_for_tuple!(A, B, C, D);
impl_into_values_for_tuple!(A, B, C, D, E);
impl_into_values_for_tuple!(A, B, C, D, E, F);
