//! Raw SQL passthrough

use std::sync::Arc;

use super::common::{compile, IntoValues, QueryBuilder, Stage, Statement};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::BuildError;
use crate::Result;

/// A hand-written statement and its arguments.
///
/// The text is passed through unchanged; only the placeholder count is
/// checked against the arguments.
#[derive(Debug, Clone)]
pub struct RawBuilder {
    dialect: Arc<dyn Dialect>,
    stage: Stage<Option<Condition>>,
    compiled: Option<Statement>,
}

impl RawBuilder {
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            stage: Stage::default(),
            compiled: None,
        }
    }

    /// Set the statement text and arguments, replacing any earlier text
    pub fn sql<V: IntoValues>(&mut self, text: &str, args: V) -> &mut Self {
        let holder = self.dialect.holder();
        let args = args.into_values();
        self.stage.apply(|s| {
            *s = Some(Condition::new(text, args, holder)?);
            Ok(())
        });
        self
    }
}

impl QueryBuilder for RawBuilder {
    fn to_sql(&mut self) -> Result<Statement> {
        compile(&mut self.stage, &mut self.compiled, "raw", |s| match s {
            Some(raw) => Ok(Statement::new(raw.text.clone(), raw.values.clone())),
            None => Err(BuildError::configuration("no SQL text given")),
        })
    }

    fn error(&self) -> Option<&BuildError> {
        self.stage.error()
    }

    fn reset(&mut self) {
        self.stage = Stage::default();
        self.compiled = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::MySql;
    use crate::Value;

    #[test]
    fn test_raw_passthrough() {
        let mut raw = RawBuilder::new(Arc::new(MySql));
        raw.sql("SELECT * FROM t WHERE a = ? AND b = '?'", (1,));
        let stmt = raw.to_sql().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE a = ? AND b = '?'");
        assert_eq!(stmt.args, vec![Value::I32(1)]);
    }

    #[test]
    fn test_raw_placeholder_mismatch() {
        let mut raw = RawBuilder::new(Arc::new(MySql));
        raw.sql("UPDATE t SET a = ?", ());
        assert!(matches!(raw.error(), Some(BuildError::Composition { .. })));
        assert!(raw.to_sql().is_err());
    }

    #[test]
    fn test_raw_without_text() {
        let mut raw = RawBuilder::new(Arc::new(MySql));
        assert!(raw.to_sql().unwrap_err().to_string().contains("no SQL text"));
    }
}
