//! Dynamic WHERE/ORDER BY assembly for search-style queries.
//!
//! [`Predicates`] collects [`Condition`]s in call order and renders them with
//! ` WHERE ` before the first and ` AND ` before every following one. Search
//! filters implement [`Criteria`] and push their conditions in a fixed
//! declaration order, so the rendered SQL text is stable for a given filter.

use crate::condition::Condition;
use crate::error::OrmResult;
use crate::ident::{Ident, IntoIdent};
use crate::sql::Sql;
use serde::{Deserialize, Serialize};

/// An ordered conjunction of conditions.
#[derive(Debug, Clone, Default)]
pub struct Predicates {
    conditions: Vec<Condition>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition.
    pub fn and(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    /// Append a condition only when `value` is present.
    ///
    /// ```ignore
    /// preds.and_opt(criteria.from, |from| Condition::gte("created_at", from))?;
    /// ```
    pub fn and_opt<V, F>(&mut self, value: Option<V>, build: F) -> OrmResult<&mut Self>
    where
        F: FnOnce(V) -> OrmResult<Condition>,
    {
        if let Some(v) = value {
            self.conditions.push(build(v)?);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE c1 AND c2 ...` to `sql`; appends nothing when empty.
    pub fn append_to_sql(&self, sql: &mut Sql) {
        for (i, condition) in self.conditions.iter().enumerate() {
            sql.push(if i == 0 { " WHERE " } else { " AND " });
            condition.append_to_sql(sql);
        }
    }

    /// Render into a standalone fragment.
    pub fn to_sql(&self) -> Sql {
        let mut sql = Sql::empty();
        self.append_to_sql(&mut sql);
        sql
    }
}

/// A caller-defined, optional filter object.
///
/// Implementations push their conditions in the same order on every call.
pub trait Criteria {
    fn append_predicates(&self, predicates: &mut Predicates) -> OrmResult<()>;

    fn to_predicates(&self) -> OrmResult<Predicates> {
        let mut predicates = Predicates::new();
        self.append_predicates(&mut predicates)?;
        Ok(predicates)
    }
}

impl Criteria for Predicates {
    fn append_predicates(&self, predicates: &mut Predicates) -> OrmResult<()> {
        predicates.conditions.extend(self.conditions.iter().cloned());
        Ok(())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A requested sort: one field, an optional direction (ascending when absent)
/// and an optional case-insensitive flag that sorts by `lower(field)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sortable {
    pub field: String,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl Sortable {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: Some(Order::Asc),
            case_insensitive: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: Some(Order::Desc),
            case_insensitive: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn direction(&self) -> Order {
        self.order.unwrap_or_default()
    }

    /// Append ` ORDER BY <field> ASC|DESC`, optionally qualified by a table alias.
    ///
    /// The field must be a plain or dotted identifier; reserved words are quoted.
    pub fn append_to_sql(&self, sql: &mut Sql, qualifier: Option<&str>) -> OrmResult<()> {
        let field = self.field.as_str().into_ident()?;
        let ident = match qualifier {
            Some(alias) => Ident::parse(&format!("{alias}.{}", self.field))?,
            None => field,
        };
        sql.push(" ORDER BY ");
        if self.case_insensitive {
            sql.push("lower(");
            sql.push_ident_ref(&ident);
            sql.push(")");
        } else {
            sql.push_ident_ref(&ident);
        }
        sql.push(" ");
        sql.push(self.direction().as_sql());
        Ok(())
    }
}
