//! Dynamically typed SQL values.
//!
//! [`Value`] is the currency between entity bindings and the driver: bindings
//! read entity fields into `Value`s for bound parameters, and result-set cells
//! are decoded into `Value`s before a binding writes them back into fields.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, Utc};
use std::error::Error;
use std::hash::{Hash, Hasher};
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

/// Declared SQL type of a bound column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Text,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Boolean,
    Timestamp,
    Date,
    Uuid,
    Json,
    Bytes,
}

impl SqlType {
    /// Map a PostgreSQL column type onto the closest `SqlType`.
    ///
    /// Returns `None` for types relmap does not decode.
    pub fn from_pg(ty: &Type) -> Option<Self> {
        let sql_type = match *ty {
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => Self::Text,
            Type::INT2 => Self::SmallInt,
            Type::INT4 => Self::Integer,
            Type::INT8 => Self::BigInt,
            Type::FLOAT4 => Self::Real,
            Type::FLOAT8 => Self::Double,
            Type::BOOL => Self::Boolean,
            Type::TIMESTAMP | Type::TIMESTAMPTZ => Self::Timestamp,
            Type::DATE => Self::Date,
            Type::UUID => Self::Uuid,
            Type::JSON | Type::JSONB => Self::Json,
            Type::BYTEA => Self::Bytes,
            _ => return None,
        };
        Some(sql_type)
    }
}

/// A single SQL cell or bound parameter.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The `SqlType` this value carries, `None` for `Null`.
    pub fn sql_type(&self) -> Option<SqlType> {
        let sql_type = match self {
            Value::Null => return None,
            Value::Text(_) => SqlType::Text,
            Value::SmallInt(_) => SqlType::SmallInt,
            Value::Integer(_) => SqlType::Integer,
            Value::BigInt(_) => SqlType::BigInt,
            Value::Real(_) => SqlType::Real,
            Value::Double(_) => SqlType::Double,
            Value::Boolean(_) => SqlType::Boolean,
            Value::Timestamp(_) => SqlType::Timestamp,
            Value::Date(_) => SqlType::Date,
            Value::Uuid(_) => SqlType::Uuid,
            Value::Json(_) => SqlType::Json,
            Value::Bytes(_) => SqlType::Bytes,
        };
        Some(sql_type)
    }

    /// Convert this value to the declared column type.
    ///
    /// Integers and floats convert within their family (narrowing fails when
    /// the value does not fit); text converts to `Uuid`/`Json` by parsing, and
    /// `Uuid`/`Json` render back to text. `Null` stays `Null`.
    pub fn coerce(self, target: SqlType) -> Result<Value, String> {
        if self.sql_type().is_none_or(|t| t == target) {
            return Ok(self);
        }
        let converted = match (self, target) {
            (Value::SmallInt(v), SqlType::Integer) => Value::Integer(v.into()),
            (Value::SmallInt(v), SqlType::BigInt) => Value::BigInt(v.into()),
            (Value::Integer(v), SqlType::SmallInt) => {
                Value::SmallInt(i16::try_from(v).map_err(|e| e.to_string())?)
            }
            (Value::Integer(v), SqlType::BigInt) => Value::BigInt(v.into()),
            (Value::BigInt(v), SqlType::SmallInt) => {
                Value::SmallInt(i16::try_from(v).map_err(|e| e.to_string())?)
            }
            (Value::BigInt(v), SqlType::Integer) => {
                Value::Integer(i32::try_from(v).map_err(|e| e.to_string())?)
            }
            (Value::SmallInt(v), SqlType::Double) => Value::Double(v.into()),
            (Value::Integer(v), SqlType::Double) => Value::Double(v.into()),
            (Value::BigInt(v), SqlType::Double) => Value::Double(v as f64),
            (Value::Real(v), SqlType::Double) => Value::Double(v.into()),
            (Value::Double(v), SqlType::Real) => Value::Real(v as f32),
            (Value::Text(v), SqlType::Uuid) => {
                Value::Uuid(Uuid::parse_str(&v).map_err(|e| e.to_string())?)
            }
            (Value::Text(v), SqlType::Json) => {
                Value::Json(serde_json::from_str(&v).map_err(|e| e.to_string())?)
            }
            (Value::Uuid(v), SqlType::Text) => Value::Text(v.to_string()),
            (Value::Json(v), SqlType::Text) => Value::Text(v.to_string()),
            (Value::Timestamp(v), SqlType::Date) => Value::Date(v.date_naive()),
            (other, target) => {
                return Err(format!("cannot convert {other:?} to {target:?}"));
            }
        };
        Ok(converted)
    }
}

// Floats compare by bit pattern and JSON by its canonical text so that values
// can serve as collation keys.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::SmallInt(a), Value::SmallInt(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Text(v) => v.hash(state),
            Value::SmallInt(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::Real(v) => v.to_bits().hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Boolean(v) => v.hash(state),
            Value::Timestamp(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::Uuid(v) => v.hash(state),
            Value::Json(v) => v.to_string().hash(state),
            Value::Bytes(v) => v.hash(state),
        }
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Text(v) => v.to_sql(ty, out),
            Value::SmallInt(v) => v.to_sql(ty, out),
            Value::Integer(v) => v.to_sql(ty, out),
            Value::BigInt(v) => v.to_sql(ty, out),
            Value::Real(v) => v.to_sql(ty, out),
            Value::Double(v) => v.to_sql(ty, out),
            Value::Boolean(v) => v.to_sql(ty, out),
            Value::Timestamp(v) if *ty == Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    // Type checking is delegated to the wrapped value.
    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::SmallInt(v) => v.to_sql_checked(ty, out),
            Value::Integer(v) => v.to_sql_checked(ty, out),
            Value::BigInt(v) => v.to_sql_checked(ty, out),
            Value::Real(v) => v.to_sql_checked(ty, out),
            Value::Double(v) => v.to_sql_checked(ty, out),
            Value::Boolean(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) if *ty == Type::TIMESTAMP => v.naive_utc().to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value! {
    String => Text,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    bool => Boolean,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    Uuid => Uuid,
    serde_json::Value => Json,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Extract a Rust field value out of a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, String> {
                    match value.coerce(SqlType::$variant)? {
                        Value::$variant(v) => Ok(v),
                        Value::Null => Err("unexpected NULL".to_string()),
                        other => Err(format!("expected {}, got {other:?}", stringify!($variant))),
                    }
                }
            }
        )*
    };
}

impl_from_value! {
    String => Text,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    bool => Boolean,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    Uuid => Uuid,
    serde_json::Value => Json,
    Vec<u8> => Bytes,
}
