//! WHERE / HAVING condition composition

use crate::dialect::count_holders;
use crate::error::BuildError;
use crate::Value;

/// A boolean SQL fragment and the values for its placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub text: String,
    pub values: Vec<Value>,
}

impl Condition {
    /// Build a condition, checking that `text` has one placeholder per value
    pub fn new(
        text: impl Into<String>,
        values: Vec<Value>,
        holder: char,
    ) -> Result<Self, BuildError> {
        let text = text.into();
        let holders = count_holders(&text, holder);
        if holders != values.len() {
            return Err(BuildError::composition(format!(
                "condition '{}' has {} placeholders but {} values",
                text,
                holders,
                values.len()
            )));
        }
        Ok(Self { text, values })
    }

    /// `col in(?,?,?)`, or `col not in(?,?,?)` when `negate` is set
    pub fn in_list(
        column: &str,
        values: Vec<Value>,
        negate: bool,
        holder: char,
    ) -> Result<Self, BuildError> {
        if values.is_empty() {
            return Err(BuildError::composition(format!(
                "IN list for column '{column}' requires at least one value"
            )));
        }
        let mut text = String::with_capacity(column.len() + 8 + values.len() * 2);
        text.push_str(column);
        text.push_str(if negate { " not in(" } else { " in(" });
        for i in 0..values.len() {
            if i > 0 {
                text.push(',');
            }
            text.push(holder);
        }
        text.push(')');
        Ok(Self { text, values })
    }
}

/// Ordered, AND-joined list of conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    conds: Vec<Condition>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conds.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.conds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conds.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conds.iter()
    }

    pub fn clear(&mut self) {
        self.conds.clear();
    }

    /// Append ` <keyword> (c1) AND (c2)` to `sql` and the values to `args`.
    /// Nothing is written when there are no conditions.
    pub fn render(&self, keyword: &str, sql: &mut String, args: &mut Vec<Value>) {
        if self.conds.is_empty() {
            return;
        }
        sql.push(' ');
        sql.push_str(keyword);
        sql.push(' ');
        for (i, cond) in self.conds.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND (");
            } else {
                sql.push('(');
            }
            sql.push_str(&cond.text);
            sql.push(')');
            args.extend(cond.values.iter().cloned());
        }
    }
}

/// Render ` <keyword> a, b, c`; nothing when `items` is empty
pub(crate) fn render_list(keyword: &str, items: &[String], sql: &mut String) {
    if items.is_empty() {
        return;
    }
    sql.push(' ');
    sql.push_str(keyword);
    sql.push(' ');
    sql.push_str(&items.join(", "));
}
