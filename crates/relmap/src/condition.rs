//! Query condition types for dynamic queries.
//!
//! This module provides [`Op`] (operator) and [`Condition`] primitives for building
//! the predicates of search queries with various comparison operators.

use crate::Ident;
use crate::error::{OrmError, OrmResult};
use crate::ident::IntoIdent;
use crate::sql::Sql;
use crate::value::Value;

/// Query operator for building conditions.
///
/// # Example
/// ```ignore
/// use relmap::Op;
///
/// Op::eq("API")
/// Op::gte(100)
/// Op::lower_like("%gateway%")  // lower(column) LIKE lower(pattern)
/// Op::<i32>::is_null()
/// Op::in_list(vec!["t1", "t2"])
/// Op::between(10, 20)
/// ```
#[derive(Debug, Clone)]
pub enum Op<T> {
    /// Equal: column = value
    Eq(T),
    /// Not equal: column != value
    Ne(T),
    /// Greater than: column > value
    Gt(T),
    /// Greater than or equal: column >= value
    Gte(T),
    /// Less than: column < value
    Lt(T),
    /// Less than or equal: column <= value
    Lte(T),
    /// LIKE pattern match
    Like(T),
    /// Case-insensitive LIKE (PostgreSQL ILIKE)
    Ilike(T),
    /// Case-insensitive LIKE: lower(column) LIKE lower(value)
    LowerLike(T),
    /// NOT LIKE pattern match
    NotLike(T),
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
    /// IN (list)
    In(Vec<T>),
    /// NOT IN (list)
    NotIn(Vec<T>),
    /// BETWEEN a AND b
    Between(T, T),
}

impl<T> Op<T> {
    pub fn eq(val: T) -> Self {
        Op::Eq(val)
    }

    pub fn ne(val: T) -> Self {
        Op::Ne(val)
    }

    pub fn gt(val: T) -> Self {
        Op::Gt(val)
    }

    pub fn gte(val: T) -> Self {
        Op::Gte(val)
    }

    pub fn lt(val: T) -> Self {
        Op::Lt(val)
    }

    pub fn lte(val: T) -> Self {
        Op::Lte(val)
    }

    pub fn like(val: T) -> Self {
        Op::Like(val)
    }

    pub fn ilike(val: T) -> Self {
        Op::Ilike(val)
    }

    pub fn lower_like(val: T) -> Self {
        Op::LowerLike(val)
    }

    pub fn not_like(val: T) -> Self {
        Op::NotLike(val)
    }

    pub fn is_null() -> Self {
        Op::IsNull
    }

    pub fn is_not_null() -> Self {
        Op::IsNotNull
    }

    pub fn in_list(vals: Vec<T>) -> Self {
        Op::In(vals)
    }

    pub fn not_in(vals: Vec<T>) -> Self {
        Op::NotIn(vals)
    }

    pub fn between(from: T, to: T) -> Self {
        Op::Between(from, to)
    }
}

#[derive(Debug, Clone)]
enum ConditionValue {
    Single(Value),
    Pair(Value, Value),
    List(Vec<Value>),
    None,
}

#[derive(Debug, Clone)]
enum ConditionInner {
    /// Raw SQL condition (escape hatch). Never interpolate caller input here.
    Raw(String),
    Expr {
        column: Ident,
        operator: &'static str,
        value: ConditionValue,
    },
    /// `lower(column) LIKE lower($n)`
    LowerLike { column: Ident, pattern: Value },
    /// `(a, b) IN (($1, $2), ($3, $4))`, used to look up composite keys.
    TupleIn {
        columns: Vec<Ident>,
        rows: Vec<Vec<Value>>,
    },
}

/// A single predicate over one column, rendered with bound parameters.
#[derive(Debug, Clone)]
pub struct Condition(ConditionInner);

impl Condition {
    /// Create a new structured condition from a column identifier and operator.
    ///
    /// Empty `IN`/`NOT IN` lists are refused with [`OrmError::InvalidArgument`].
    pub fn new<I, T>(column: I, op: Op<T>) -> OrmResult<Self>
    where
        I: IntoIdent,
        T: Into<Value>,
    {
        let column = column.into_ident()?;
        let single = |v: T| ConditionValue::Single(v.into());
        let (operator, value) = match op {
            Op::Eq(v) => ("=", single(v)),
            Op::Ne(v) => ("!=", single(v)),
            Op::Gt(v) => (">", single(v)),
            Op::Gte(v) => (">=", single(v)),
            Op::Lt(v) => ("<", single(v)),
            Op::Lte(v) => ("<=", single(v)),
            Op::Like(v) => ("LIKE", single(v)),
            Op::Ilike(v) => ("ILIKE", single(v)),
            Op::NotLike(v) => ("NOT LIKE", single(v)),
            Op::LowerLike(v) => {
                return Ok(Condition(ConditionInner::LowerLike {
                    column,
                    pattern: v.into(),
                }));
            }
            Op::IsNull => ("IS NULL", ConditionValue::None),
            Op::IsNotNull => ("IS NOT NULL", ConditionValue::None),
            Op::In(vals) => ("IN", list(&column, vals)?),
            Op::NotIn(vals) => ("NOT IN", list(&column, vals)?),
            Op::Between(from, to) => ("BETWEEN", ConditionValue::Pair(from.into(), to.into())),
        };

        Ok(Condition(ConditionInner::Expr {
            column,
            operator,
            value,
        }))
    }

    /// Create a raw SQL condition.
    ///
    /// The text is appended verbatim; only use it with trusted, static SQL.
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition(ConditionInner::Raw(sql.into()))
    }

    // ==================== Convenience constructors ====================

    /// column = value
    pub fn eq<I: IntoIdent, T: Into<Value>>(column: I, value: T) -> OrmResult<Self> {
        Self::new(column, Op::Eq(value))
    }

    /// column != value
    pub fn ne<I: IntoIdent, T: Into<Value>>(column: I, value: T) -> OrmResult<Self> {
        Self::new(column, Op::Ne(value))
    }

    /// column > value
    pub fn gt<I: IntoIdent, T: Into<Value>>(column: I, value: T) -> OrmResult<Self> {
        Self::new(column, Op::Gt(value))
    }

    /// column >= value
    pub fn gte<I: IntoIdent, T: Into<Value>>(column: I, value: T) -> OrmResult<Self> {
        Self::new(column, Op::Gte(value))
    }

    /// column < value
    pub fn lt<I: IntoIdent, T: Into<Value>>(column: I, value: T) -> OrmResult<Self> {
        Self::new(column, Op::Lt(value))
    }

    /// column <= value
    pub fn lte<I: IntoIdent, T: Into<Value>>(column: I, value: T) -> OrmResult<Self> {
        Self::new(column, Op::Lte(value))
    }

    /// column LIKE pattern
    pub fn like<I: IntoIdent, T: Into<Value>>(column: I, pattern: T) -> OrmResult<Self> {
        Self::new(column, Op::Like(pattern))
    }

    /// column ILIKE pattern
    pub fn ilike<I: IntoIdent, T: Into<Value>>(column: I, pattern: T) -> OrmResult<Self> {
        Self::new(column, Op::Ilike(pattern))
    }

    /// lower(column) LIKE lower(pattern)
    pub fn lower_like<I: IntoIdent, T: Into<Value>>(column: I, pattern: T) -> OrmResult<Self> {
        Self::new(column, Op::LowerLike(pattern))
    }

    /// column IS NULL
    pub fn is_null<I: IntoIdent>(column: I) -> OrmResult<Self> {
        Self::new::<I, Value>(column, Op::IsNull)
    }

    /// column IS NOT NULL
    pub fn is_not_null<I: IntoIdent>(column: I) -> OrmResult<Self> {
        Self::new::<I, Value>(column, Op::IsNotNull)
    }

    /// column IN (values...)
    pub fn in_list<I: IntoIdent, T: Into<Value>>(column: I, values: Vec<T>) -> OrmResult<Self> {
        Self::new(column, Op::In(values))
    }

    /// column NOT IN (values...)
    pub fn not_in<I: IntoIdent, T: Into<Value>>(column: I, values: Vec<T>) -> OrmResult<Self> {
        Self::new(column, Op::NotIn(values))
    }

    /// column BETWEEN from AND to
    pub fn between<I: IntoIdent, T: Into<Value>>(column: I, from: T, to: T) -> OrmResult<Self> {
        Self::new(column, Op::Between(from, to))
    }

    /// (columns...) IN ((values...), ...)
    ///
    /// Every row must have one value per column and at least one row is required.
    pub fn tuple_in<I: IntoIdent>(columns: Vec<I>, rows: Vec<Vec<Value>>) -> OrmResult<Self> {
        let columns = columns
            .into_iter()
            .map(IntoIdent::into_ident)
            .collect::<OrmResult<Vec<_>>>()?;
        if columns.is_empty() || rows.is_empty() {
            return Err(OrmError::invalid_argument(
                "tuple IN needs at least one column and one row",
            ));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(OrmError::invalid_argument(format!(
                "tuple IN row has {} value(s), expected {}",
                bad.len(),
                columns.len()
            )));
        }
        Ok(Condition(ConditionInner::TupleIn { columns, rows }))
    }

    /// Append this condition into a [`Sql`] builder.
    pub fn append_to_sql(&self, sql: &mut Sql) {
        match &self.0 {
            ConditionInner::Raw(s) => {
                sql.push(s);
            }
            ConditionInner::LowerLike { column, pattern } => {
                sql.push("lower(");
                sql.push_ident_ref(column);
                sql.push(") LIKE lower(");
                sql.push_bind(pattern.clone());
                sql.push(")");
            }
            ConditionInner::TupleIn { columns, rows } => {
                sql.push("(");
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        sql.push(", ");
                    }
                    sql.push_ident_ref(col);
                }
                sql.push(") IN (");
                for (r, row) in rows.iter().enumerate() {
                    sql.push(if r == 0 { "(" } else { ", (" });
                    for (i, v) in row.iter().enumerate() {
                        if i > 0 {
                            sql.push(", ");
                        }
                        sql.push_bind(v.clone());
                    }
                    sql.push(")");
                }
                sql.push(")");
            }
            ConditionInner::Expr {
                column,
                operator,
                value,
            } => {
                sql.push_ident_ref(column);
                sql.push(" ");
                sql.push(operator);
                match value {
                    ConditionValue::Single(v) => {
                        sql.push(" ");
                        sql.push_bind(v.clone());
                    }
                    ConditionValue::Pair(a, b) => {
                        sql.push(" ");
                        sql.push_bind(a.clone());
                        sql.push(" AND ");
                        sql.push_bind(b.clone());
                    }
                    ConditionValue::List(vals) => {
                        sql.push(" (");
                        for (i, v) in vals.iter().enumerate() {
                            if i > 0 {
                                sql.push(", ");
                            }
                            sql.push_bind(v.clone());
                        }
                        sql.push(")");
                    }
                    ConditionValue::None => {}
                }
            }
        }
    }
}

fn list<T: Into<Value>>(column: &Ident, vals: Vec<T>) -> OrmResult<ConditionValue> {
    if vals.is_empty() {
        return Err(OrmError::invalid_argument(format!(
            "IN list for column {} must contain at least one value",
            column.to_sql()
        )));
    }
    Ok(ConditionValue::List(
        vals.into_iter().map(Into::into).collect(),
    ))
}
