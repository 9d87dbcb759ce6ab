//! SQL dialects and their placeholder conventions

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use crate::builder::LockMode;
use crate::{Error, Result};

/// A database family's parameter convention and the syntax that differs
/// between families.
///
/// Every dialect shipped here uses a single fixed placeholder symbol that is
/// repeated for each bound argument. Dialects that need numbered placeholders
/// (`$1`, `$2`, ...) would have to render per-index, which the builders do
/// not support.
pub trait Dialect: Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// The placeholder symbol for a bound argument
    fn holder(&self) -> char;

    /// Text between an insert's VALUES and its update list on a key
    /// conflict, or `None` when the dialect has no upsert
    fn upsert_clause(&self) -> Option<&'static str> {
        None
    }

    /// Expression reading `column` from the row that hit the conflict
    fn incoming(&self, column: &str) -> String {
        format!("VALUES({column})")
    }

    /// Suffix taking a row lock, or `None` when the dialect cannot take it
    fn lock_clause(&self, mode: LockMode) -> Option<&'static str> {
        match mode {
            LockMode::None => Some(""),
            LockMode::Share | LockMode::Update => None,
        }
    }
}

/// MySQL and MariaDB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn holder(&self) -> char {
        '?'
    }

    fn upsert_clause(&self) -> Option<&'static str> {
        Some(" ON DUPLICATE KEY UPDATE ")
    }

    fn lock_clause(&self, mode: LockMode) -> Option<&'static str> {
        match mode {
            LockMode::None => Some(""),
            LockMode::Share => Some(" LOCK IN SHARE MODE"),
            LockMode::Update => Some(" FOR UPDATE"),
        }
    }
}

/// SQLite
///
/// Upserts render as `ON CONFLICT DO UPDATE SET`, which needs SQLite 3.35
/// or later. Row locks are not available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn holder(&self) -> char {
        '?'
    }

    fn upsert_clause(&self) -> Option<&'static str> {
        Some(" ON CONFLICT DO UPDATE SET ")
    }

    fn incoming(&self, column: &str) -> String {
        format!("excluded.{column}")
    }
}

impl Display for dyn Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Pick the dialect matching a connection URL's scheme
///
/// # Examples
/// ```
/// use quarry_core::dialect::dialect_for_url;
///
/// let dialect = dialect_for_url("mysql://root@localhost/app").unwrap();
/// assert_eq!(dialect.name(), "mysql");
/// ```
pub fn dialect_for_url(url: &str) -> Result<Arc<dyn Dialect>> {
    let scheme = url.split(':').next().unwrap_or_default();
    match scheme.to_ascii_lowercase().as_str() {
        "mysql" | "mariadb" => Ok(Arc::new(MySql)),
        "sqlite" => Ok(Arc::new(Sqlite)),
        _ => Err(Error::configuration(format!(
            "no dialect for connection url scheme '{scheme}'"
        ))),
    }
}

/// Count placeholder symbols in a SQL fragment.
///
/// Quoted literals and comments are skipped. Inside a literal a backslash
/// escapes the next character, as MySQL reads it by default.
pub(crate) fn count_holders(text: &str, holder: char) -> usize {
    let mut count = 0;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                while let Some(inner) = chars.next() {
                    if inner == '\\' && c != '`' {
                        chars.next();
                    } else if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            _ if c == holder => count += 1,
            _ => {}
        }
    }
    count
}
