//! Materialized result rows and the row-mapping trait.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, SqlType, Value};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::Type;

/// One result-set row: ordered column names plus their values.
///
/// Rows decoded from the same result set share one column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record from parallel column/value lists.
    pub fn new(columns: impl Into<Arc<[String]>>, values: Vec<Value>) -> OrmResult<Self> {
        let columns = columns.into();
        if columns.len() != values.len() {
            return Err(OrmError::invalid_argument(format!(
                "Record: columns({}) != values({})",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(c, v)| (c.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of a column. Exact match wins; otherwise ASCII case is ignored,
    /// since PostgreSQL folds unquoted identifiers to lower case.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))
    }

    /// Get a cell by column name; an absent column is a decode error.
    pub fn get(&self, column: &str) -> OrmResult<&Value> {
        self.index_of(column)
            .map(|idx| &self.values[idx])
            .ok_or_else(|| OrmError::decode(column, "column not present in result row"))
    }

    /// Get a cell by position.
    pub fn get_at(&self, idx: usize) -> OrmResult<&Value> {
        self.values.get(idx).ok_or_else(|| {
            OrmError::decode(
                format!("#{idx}"),
                format!("row has only {} columns", self.values.len()),
            )
        })
    }

    /// Get a cell converted to a Rust type.
    pub fn get_as<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self.get(column)?.clone();
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    pub fn is_null(&self, column: &str) -> OrmResult<bool> {
        Ok(self.get(column)?.is_null())
    }

    /// Sub-record of the columns named `<prefix><name>`, renamed to `<name>`.
    pub(crate) fn project(&self, prefix: &str) -> Record {
        let (columns, values): (Vec<String>, Vec<Value>) = self
            .columns
            .iter()
            .zip(&self.values)
            .filter_map(|(c, v)| c.strip_prefix(prefix).map(|name| (name.to_string(), v.clone())))
            .unzip();
        Record {
            columns: columns.into(),
            values,
        }
    }

    /// Decode a driver row.
    pub fn from_pg_row(row: &Row) -> OrmResult<Self> {
        let columns: Arc<[String]> = row.columns().iter().map(|c| c.name().to_string()).collect();
        Self::decode_with(columns, row)
    }

    /// Decode a full result set, sharing the column list between rows.
    pub fn from_pg_rows(rows: &[Row]) -> OrmResult<Vec<Self>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first.columns().iter().map(|c| c.name().to_string()).collect();
        rows.iter()
            .map(|row| Self::decode_with(columns.clone(), row))
            .collect()
    }

    fn decode_with(columns: Arc<[String]>, row: &Row) -> OrmResult<Self> {
        let values = row
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| decode_cell(row, idx, col.name(), col.type_()))
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Self { columns, values })
    }
}

fn decode_cell(row: &Row, idx: usize, name: &str, ty: &Type) -> OrmResult<Value> {
    let err = |e: tokio_postgres::Error| OrmError::decode(name, e.to_string());
    let Some(sql_type) = SqlType::from_pg(ty) else {
        return Err(OrmError::decode(name, format!("unsupported column type {ty}")));
    };
    let value = match sql_type {
        SqlType::Text => row.try_get::<_, Option<String>>(idx).map_err(err)?.into(),
        SqlType::SmallInt => row.try_get::<_, Option<i16>>(idx).map_err(err)?.into(),
        SqlType::Integer => row.try_get::<_, Option<i32>>(idx).map_err(err)?.into(),
        SqlType::BigInt => row.try_get::<_, Option<i64>>(idx).map_err(err)?.into(),
        SqlType::Real => row.try_get::<_, Option<f32>>(idx).map_err(err)?.into(),
        SqlType::Double => row.try_get::<_, Option<f64>>(idx).map_err(err)?.into(),
        SqlType::Boolean => row.try_get::<_, Option<bool>>(idx).map_err(err)?.into(),
        SqlType::Timestamp if *ty == Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(err)?
            .map(|ts| ts.and_utc())
            .into(),
        SqlType::Timestamp => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(err)?
            .into(),
        SqlType::Date => row.try_get::<_, Option<chrono::NaiveDate>>(idx).map_err(err)?.into(),
        SqlType::Uuid => row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(err)?.into(),
        SqlType::Json => row.try_get::<_, Option<serde_json::Value>>(idx).map_err(err)?.into(),
        SqlType::Bytes => row.try_get::<_, Option<Vec<u8>>>(idx).map_err(err)?.into(),
    };
    Ok(value)
}

/// Converts one result-set row into one `T`.
pub trait RowMapper<T> {
    fn map_row(&self, row: &Record) -> OrmResult<T>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&Record) -> OrmResult<T>,
{
    fn map_row(&self, row: &Record) -> OrmResult<T> {
        self(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_row() -> Record {
        Record::from_pairs([
            ("id", Value::from("t1")),
            ("name", Value::from("Tag1")),
            ("reference_id", Value::Null),
        ])
    }

    #[test]
    fn get_by_name() {
        let row = tag_row();
        assert_eq!(row.get("name").unwrap(), &Value::from("Tag1"));
        assert_eq!(row.get_as::<String>("id").unwrap(), "t1");
        assert!(row.is_null("reference_id").unwrap());
    }

    #[test]
    fn get_ignores_ascii_case() {
        let row = tag_row();
        assert_eq!(row.get("NAME").unwrap(), &Value::from("Tag1"));
    }

    #[test]
    fn absent_column_is_decode_error() {
        let err = tag_row().get("missing").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "missing"));
    }

    #[test]
    fn get_as_reports_the_column_on_type_mismatch() {
        let err = tag_row().get_as::<i64>("name").unwrap_err();
        assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "name"));
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let columns: Vec<String> = vec!["a".into(), "b".into()];
        assert!(Record::new(columns, vec![Value::Null]).is_err());
    }

    #[test]
    fn project_strips_prefix() {
        let row = Record::from_pairs([
            ("id", Value::from("e1")),
            ("a0.event_id", Value::from("e1")),
            ("a0.property_key", Value::from("api")),
        ]);
        let child = row.project("a0.");
        assert_eq!(child.columns(), ["event_id", "property_key"]);
        assert_eq!(child.get_as::<String>("property_key").unwrap(), "api");
    }

    #[test]
    fn closures_are_row_mappers() {
        let mapper = |row: &Record| row.get_as::<String>("id");
        assert_eq!(mapper.map_row(&tag_row()).unwrap(), "t1");
    }
}
