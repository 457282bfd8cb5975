//! Column bindings between an entity type and a table.
//!
//! An [`EntityBinding`] is declared once per entity type and then shared
//! (usually behind an `Arc`) by every repository that needs it. It owns the
//! ordered column list, the key columns and the SQL generated from them.
//!
//! ```ignore
//! use relmap::{EntityBinding, SqlType};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Tag {
//!     id: String,
//!     name: String,
//!     reference_id: Option<String>,
//! }
//!
//! let binding = EntityBinding::<Tag>::builder("tags", &["id"])
//!     .column("id", SqlType::Text, |t| t.id.clone(), |t, v| t.id = v)
//!     .column("name", SqlType::Text, |t| t.name.clone(), |t, v| t.name = v)
//!     .column("reference_id", SqlType::Text, |t| t.reference_id.clone(), |t, v| {
//!         t.reference_id = v
//!     })
//!     .build()?;
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::row::{Record, RowMapper};
use crate::statement::{self, GeneratedSql, Statement, StatementKind};
use crate::value::{FromValue, SqlType, Value};
use std::fmt;

type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<(), String> + Send + Sync>;

/// One bound column: its name, declared type and field accessors.
pub struct ColumnBinding<T> {
    name: String,
    ident: Ident,
    sql_type: SqlType,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> ColumnBinding<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub(crate) fn ident(&self) -> &Ident {
        &self.ident
    }

    /// Read the field from `entity`, coerced to the declared column type.
    pub fn read(&self, entity: &T) -> OrmResult<Value> {
        (self.get)(entity)
            .coerce(self.sql_type)
            .map_err(|message| OrmError::decode(&self.name, message))
    }

    /// Write a result cell into the field of `entity`.
    pub fn write(&self, entity: &mut T, value: Value) -> OrmResult<()> {
        let value = value
            .coerce(self.sql_type)
            .map_err(|message| OrmError::decode(&self.name, message))?;
        (self.set)(entity, value).map_err(|message| OrmError::decode(&self.name, message))
    }
}

impl<T> fmt::Debug for ColumnBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnBinding")
            .field("name", &self.name)
            .field("sql_type", &self.sql_type)
            .finish()
    }
}

/// Immutable mapping between `T` and one table.
pub struct EntityBinding<T> {
    table: String,
    columns: Vec<ColumnBinding<T>>,
    key_indices: Vec<usize>,
    sql: GeneratedSql,
}

impl<T> fmt::Debug for EntityBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBinding")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("key_columns", &self.key_columns().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: Default + 'static> EntityBinding<T> {
    /// Start declaring a binding for `table` keyed by `key_columns` (in key order).
    pub fn builder(table: impl Into<String>, key_columns: &[&str]) -> EntityBindingBuilder<T> {
        EntityBindingBuilder {
            table: table.into(),
            key_columns: key_columns.iter().map(|k| k.to_string()).collect(),
            columns: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> EntityBinding<T> {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnBinding<T>] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    pub(crate) fn column_idents(&self) -> Vec<Ident> {
        self.columns.iter().map(|c| c.ident().clone()).collect()
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &str> {
        self.key_indices.iter().map(|&i| self.columns[i].name())
    }

    pub fn key_len(&self) -> usize {
        self.key_indices.len()
    }

    /// Whether `UPDATE ... SET` assigns the key columns, which happens only
    /// when every column is a key column.
    pub fn updates_key_columns(&self) -> bool {
        self.key_indices.len() == self.columns.len()
    }

    // ==================== Cached SQL ====================

    pub fn sql(&self, kind: StatementKind) -> &str {
        self.sql.get(kind)
    }

    pub fn select_all_sql(&self) -> &str {
        self.sql.get(StatementKind::SelectAll)
    }

    pub fn select_by_id_sql(&self) -> &str {
        self.sql.get(StatementKind::SelectById)
    }

    pub fn insert_sql(&self) -> &str {
        self.sql.get(StatementKind::Insert)
    }

    pub fn update_by_key_sql(&self) -> &str {
        self.sql.get(StatementKind::UpdateByKey)
    }

    pub fn delete_by_key_sql(&self) -> &str {
        self.sql.get(StatementKind::DeleteByKey)
    }

    pub fn count_sql(&self) -> &str {
        self.sql.get(StatementKind::Count)
    }

    // ==================== Parameter binding ====================

    /// Field values of `entity` in column order.
    pub fn bind_parameters(&self, entity: &T) -> OrmResult<Vec<Value>> {
        self.columns.iter().map(|c| c.read(entity)).collect()
    }

    /// Key field values of `entity` in key order.
    pub fn key_values(&self, entity: &T) -> OrmResult<Vec<Value>> {
        self.key_indices
            .iter()
            .map(|&i| self.columns[i].read(entity))
            .collect()
    }

    pub fn insert_statement(&self, entity: &T) -> OrmResult<Statement> {
        Ok(Statement::new(
            StatementKind::Insert,
            self.insert_sql(),
            self.bind_parameters(entity)?,
        ))
    }

    /// UPDATE addressed by explicit key values, which need not match the
    /// entity's own key fields.
    pub fn update_by_key_statement(
        &self,
        entity: &T,
        key_values: &[Value],
    ) -> OrmResult<Statement> {
        let keys = self.coerce_keys(key_values)?;
        let mut params = statement::update_columns(self.columns.len(), &self.key_indices)
            .into_iter()
            .map(|i| self.columns[i].read(entity))
            .collect::<OrmResult<Vec<_>>>()?;
        params.extend(keys);
        Ok(Statement::new(
            StatementKind::UpdateByKey,
            self.update_by_key_sql(),
            params,
        ))
    }

    pub fn select_by_id_statement(&self, key_values: &[Value]) -> OrmResult<Statement> {
        Ok(Statement::new(
            StatementKind::SelectById,
            self.select_by_id_sql(),
            self.coerce_keys(key_values)?,
        ))
    }

    pub fn delete_by_key_statement(&self, key_values: &[Value]) -> OrmResult<Statement> {
        Ok(Statement::new(
            StatementKind::DeleteByKey,
            self.delete_by_key_sql(),
            self.coerce_keys(key_values)?,
        ))
    }

    /// Check the arity of `key_values` and coerce each to its key column type.
    pub(crate) fn coerce_keys(&self, key_values: &[Value]) -> OrmResult<Vec<Value>> {
        if key_values.len() != self.key_indices.len() {
            return Err(OrmError::invalid_argument(format!(
                "{}: expected {} key value(s), got {}",
                self.table,
                self.key_indices.len(),
                key_values.len()
            )));
        }
        self.key_indices
            .iter()
            .zip(key_values)
            .map(|(&i, v)| {
                let col = &self.columns[i];
                if v.is_null() {
                    return Err(OrmError::invalid_argument(format!(
                        "{}: key column {} cannot be NULL",
                        self.table, col.name
                    )));
                }
                v.clone()
                    .coerce(col.sql_type)
                    .map_err(|message| {
                        OrmError::invalid_argument(format!("{}: {message}", col.name))
                    })
            })
            .collect()
    }
}

impl<T: Default> EntityBinding<T> {
    /// Build one entity from a result row.
    ///
    /// Every bound column must be present in the row.
    pub fn map_row(&self, row: &Record) -> OrmResult<T> {
        let mut entity = T::default();
        for col in &self.columns {
            let value = row.get(&col.name)?.clone();
            col.write(&mut entity, value)?;
        }
        Ok(entity)
    }
}

impl<T: Default> RowMapper<T> for EntityBinding<T> {
    fn map_row(&self, row: &Record) -> OrmResult<T> {
        EntityBinding::map_row(self, row)
    }
}

/// Collects column declarations; errors are reported by [`build`](Self::build).
pub struct EntityBindingBuilder<T> {
    table: String,
    key_columns: Vec<String>,
    columns: Vec<ColumnBinding<T>>,
    errors: Vec<String>,
}

impl<T: Default + 'static> EntityBindingBuilder<T> {
    /// Bind column `name` to a field through a typed getter/setter pair.
    pub fn column<F, G, S>(mut self, name: &str, sql_type: SqlType, get: G, set: S) -> Self
    where
        F: Into<Value> + FromValue,
        G: Fn(&T) -> F + Send + Sync + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let ident = match Ident::parse(name) {
            Ok(ident) if !ident.is_qualified() => ident,
            Ok(_) => {
                self.errors
                    .push(format!("column {name:?} must not be qualified"));
                return self;
            }
            Err(e) => {
                self.errors.push(format!("column {name:?}: {e}"));
                return self;
            }
        };
        self.columns.push(ColumnBinding {
            name: name.to_string(),
            ident,
            sql_type,
            get: Box::new(move |entity| get(entity).into()),
            set: Box::new(move |entity, value| {
                set(entity, F::from_value(value)?);
                Ok(())
            }),
        });
        self
    }

    /// Validate the declarations and render the statement cache.
    pub fn build(self) -> OrmResult<EntityBinding<T>> {
        let table = &self.table;
        let fail = |msg: String| Err(OrmError::configuration(format!("{table}: {msg}")));

        if let Some(first) = self.errors.into_iter().next() {
            return fail(first);
        }
        let table_ident = match Ident::parse(table) {
            Ok(ident) => ident,
            Err(e) => return fail(format!("invalid table name: {e}")),
        };
        if self.columns.is_empty() {
            return fail("at least one column must be bound".to_string());
        }
        if self.key_columns.is_empty() {
            return fail("at least one key column is required".to_string());
        }
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&col.name))
            {
                return fail(format!("column {} is bound twice", col.name));
            }
        }

        let mut key_indices = Vec::with_capacity(self.key_columns.len());
        for key in &self.key_columns {
            match self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(key)) {
                Some(idx) if key_indices.contains(&idx) => {
                    return fail(format!("key column {key} is declared twice"));
                }
                Some(idx) => key_indices.push(idx),
                None => return fail(format!("key column {key} is not a bound column")),
            }
        }

        let idents: Vec<Ident> = self.columns.iter().map(|c| c.ident.clone()).collect();
        let sql = GeneratedSql::generate(&table_ident, &idents, &key_indices);

        tracing::debug!(
            target: "relmap.repo",
            table = %self.table,
            columns = self.columns.len(),
            keys = key_indices.len(),
            "entity binding built"
        );

        Ok(EntityBinding {
            table: self.table,
            columns: self.columns,
            key_indices,
            sql,
        })
    }
}
