//! Mapping records to columns and row values
//!
//! A record type can be mapped two ways:
//!
//! - implement [`Record`] by hand, listing columns once per type and values
//!   per instance, or
//! - derive `serde::Serialize` and let [`reflect`] / [`reflect_many`] walk
//!   the fields. Field names become column names; `#[serde(rename = "...")]`
//!   overrides a column name and `#[serde(skip)]` leaves a field out.
//!
//! Both produce a [`Mapping`]: a table name, an ordered column list, and one
//! row of values per record aligned with that list.

use heck::ToSnakeCase;
use serde::Serialize;

use crate::error::BuildError;
use crate::Value;

/// Columns and rows derived from one or more records
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Mapping {
    /// Keep only `wanted` columns, in the order given.
    ///
    /// Every wanted column has to exist in the mapping.
    pub fn project(&self, wanted: &[String]) -> Result<Mapping, BuildError> {
        let mut positions = Vec::with_capacity(wanted.len());
        for column in wanted {
            let pos = self
                .columns
                .iter()
                .position(|c| c == column)
                .ok_or_else(|| {
                    BuildError::mapping(format!("can not find column {column} in records"))
                })?;
            positions.push(pos);
        }

        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
            .collect();

        Ok(Mapping {
            table: self.table.clone(),
            columns: wanted.to_vec(),
            rows,
        })
    }
}

/// Explicit column/value mapping for a record type
///
/// # Examples
/// ```
/// use quarry_core::{Record, Value};
///
/// struct Account {
///     id: i64,
///     email: String,
/// }
///
/// impl Record for Account {
///     fn columns() -> Vec<&'static str> {
///         vec!["id", "email"]
///     }
///
///     fn values(&self) -> Vec<Value> {
///         vec![self.id.into(), self.email.as_str().into()]
///     }
/// }
///
/// assert_eq!(Account::table_name(), "account");
/// ```
pub trait Record {
    /// Table the record belongs to; defaults to the snake_case type name
    fn table_name() -> String
    where
        Self: Sized,
    {
        table_name_of::<Self>()
    }

    /// Column names, in the same order as [`Record::values`]
    fn columns() -> Vec<&'static str>
    where
        Self: Sized;

    /// This instance's values, aligned with [`Record::columns`]
    fn values(&self) -> Vec<Value>;
}

/// Map records that implement [`Record`]
pub fn map_records<R: Record>(records: &[R]) -> Result<Mapping, BuildError> {
    let columns: Vec<String> = R::columns().into_iter().map(String::from).collect();
    if columns.is_empty() {
        return Err(BuildError::mapping(format!(
            "record type {} has no columns",
            R::table_name()
        )));
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let values = record.values();
        if values.len() != columns.len() {
            return Err(BuildError::mapping(format!(
                "record of {} has {} values for {} columns",
                R::table_name(),
                values.len(),
                columns.len()
            )));
        }
        rows.push(values);
    }

    Ok(Mapping {
        table: R::table_name(),
        columns,
        rows,
    })
}

/// Map a single serializable record
pub fn reflect<T>(record: &T) -> Result<Mapping, BuildError>
where
    T: Serialize + ?Sized,
{
    let (columns, values) = fields_of(record, type_label::<T>())?;
    Ok(Mapping {
        table: table_name_of::<T>(),
        columns,
        rows: vec![values],
    })
}

/// Map a homogeneous sequence of serializable records.
///
/// The column list comes from the first record; every other record must
/// produce the same columns.
pub fn reflect_many<T>(records: &[T]) -> Result<Mapping, BuildError>
where
    T: Serialize,
{
    let Some(first) = records.first() else {
        return Err(BuildError::mapping(format!(
            "no {} records to map",
            type_label::<T>()
        )));
    };

    let (columns, first_values) = fields_of(first, type_label::<T>())?;
    let mut rows = Vec::with_capacity(records.len());
    rows.push(first_values);

    for (i, record) in records.iter().enumerate().skip(1) {
        let (cols, values) = fields_of(record, type_label::<T>())?;
        if cols != columns {
            return Err(BuildError::mapping(format!(
                "record {i} of {} has columns {:?}, expected {:?}",
                type_label::<T>(),
                cols,
                columns
            )));
        }
        rows.push(values);
    }

    Ok(Mapping {
        table: table_name_of::<T>(),
        columns,
        rows,
    })
}

fn fields_of<T>(record: &T, label: &str) -> Result<(Vec<String>, Vec<Value>), BuildError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_value(record)
        .map_err(|e| BuildError::mapping(format!("can not serialize {label}: {e}")))?;

    let serde_json::Value::Object(fields) = json else {
        return Err(BuildError::mapping(format!(
            "{label} is not a struct, can not derive columns"
        )));
    };

    let mut columns = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        columns.push(name);
        values.push(Value::from_json(value));
    }
    Ok((columns, values))
}

/// Bare type name without module path or generics, e.g. `UserProfile`.
/// References and `Box`/`Rc`/`Arc` wrappers are looked through.
fn type_label<T: ?Sized>() -> &'static str {
    let mut name = std::any::type_name::<T>();
    loop {
        name = name.trim_start_matches('&').trim_start_matches("mut ");
        let (head, inner) = match name.split_once('<') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        let short = head.rsplit("::").next().unwrap_or(head);
        match (short, inner) {
            ("Box" | "Rc" | "Arc", Some(rest)) => {
                name = rest.strip_suffix('>').unwrap_or(rest);
            }
            _ => return short,
        }
    }
}

/// Table name inferred from the type name: `UserProfile` -> `user_profile`
pub fn table_name_of<T: ?Sized>() -> String {
    type_label::<T>().to_snake_case()
}
