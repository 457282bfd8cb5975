//! Child tables owned by a parent entity (scopes, domain restrictions, group links).

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::row::Record;
use crate::statement::{aliased_column_list, column_list};
use crate::value::Value;
use std::fmt;
use std::fmt::Write;

type Extract<T> = Box<dyn Fn(&T) -> Vec<Vec<Value>> + Send + Sync>;
type Attach<T> = Box<dyn Fn(&mut T, &Record) -> OrmResult<()> + Send + Sync>;

/// A child table whose rows are written and read together with the parent.
///
/// The child table references the parent through `parent_columns`, which line
/// up with the parent's key columns. `extract` turns the parent into one value
/// tuple (matching `value_columns`) per child row; `attach` receives each
/// child row, exposed under the child's own column names.
///
/// A repository with one association reads back every child row, repeats
/// included. With several associations the joins multiply, so a child tuple
/// repeated within one association is attached only once.
pub struct Association<T> {
    table: String,
    table_ident: Ident,
    parent_columns: Vec<Ident>,
    value_columns: Vec<Ident>,
    parent_names: Vec<String>,
    value_names: Vec<String>,
    extract: Extract<T>,
    attach: Attach<T>,
    delete_sql: String,
    insert_sql: String,
}

impl<T> fmt::Debug for Association<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("table", &self.table)
            .field("parent_columns", &self.parent_names)
            .field("value_columns", &self.value_names)
            .finish()
    }
}

impl<T> Association<T> {
    /// Declare a child table.
    ///
    /// ```ignore
    /// let tags = Association::new(
    ///     config.table_name("api_tags"),
    ///     &["api_id"],
    ///     &["tag"],
    ///     |api: &Api| api.tags.iter().map(|t| vec![Value::from(t)]).collect(),
    ///     |api, row| {
    ///         api.tags.push(row.get_as("tag")?);
    ///         Ok(())
    ///     },
    /// )?;
    /// ```
    pub fn new<E, A>(
        table: impl Into<String>,
        parent_columns: &[&str],
        value_columns: &[&str],
        extract: E,
        attach: A,
    ) -> OrmResult<Self>
    where
        E: Fn(&T) -> Vec<Vec<Value>> + Send + Sync + 'static,
        A: Fn(&mut T, &Record) -> OrmResult<()> + Send + Sync + 'static,
    {
        let table = table.into();
        let config_err = |msg: String| OrmError::configuration(format!("{table}: {msg}"));

        let table_ident = Ident::parse(&table).map_err(|e| config_err(e.to_string()))?;
        if parent_columns.is_empty() {
            return Err(config_err("association needs parent key columns".into()));
        }
        if value_columns.is_empty() {
            return Err(config_err("association needs value columns".into()));
        }
        let parse = |names: &[&str]| -> OrmResult<Vec<Ident>> {
            names
                .iter()
                .map(|n| match Ident::parse(n) {
                    Ok(ident) if !ident.is_qualified() => Ok(ident),
                    Ok(_) => Err(config_err(format!("column {n:?} must not be qualified"))),
                    Err(e) => Err(config_err(format!("column {n:?}: {e}"))),
                })
                .collect()
        };
        let parent_idents = parse(parent_columns)?;
        let value_idents = parse(value_columns)?;
        let all: Vec<&str> = parent_columns.iter().chain(value_columns).copied().collect();
        for (i, name) in all.iter().enumerate() {
            if all[..i].iter().any(|n| n.eq_ignore_ascii_case(name)) {
                return Err(config_err(format!("column {name} is declared twice")));
            }
        }

        let table_sql = table_ident.to_sql();
        let mut delete_sql = format!("DELETE FROM {table_sql}");
        for (i, col) in parent_idents.iter().enumerate() {
            delete_sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            let _ = write!(delete_sql, "{} = ${}", col.to_sql(), i + 1);
        }

        let mut columns = parent_idents.clone();
        columns.extend(value_idents.iter().cloned());
        let mut insert_sql = format!(
            "INSERT INTO {table_sql} ({}) VALUES (",
            column_list(&columns, None)
        );
        for i in 1..=columns.len() {
            if i > 1 {
                insert_sql.push_str(", ");
            }
            let _ = write!(insert_sql, "${i}");
        }
        insert_sql.push(')');

        Ok(Self {
            table_ident,
            parent_columns: parent_idents,
            value_columns: value_idents,
            parent_names: parent_columns.iter().map(|c| c.to_string()).collect(),
            value_names: value_columns.iter().map(|c| c.to_string()).collect(),
            extract: Box::new(extract),
            attach: Box::new(attach),
            delete_sql,
            insert_sql,
            table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn parent_len(&self) -> usize {
        self.parent_columns.len()
    }

    /// `DELETE FROM <child> WHERE <parent cols> = $n ...`
    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// Single-row `INSERT` executed once per child row in a batch.
    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// One parameter set per child row: the parent key followed by the values.
    pub(crate) fn insert_params(
        &self,
        parent: &T,
        parent_key: &[Value],
    ) -> OrmResult<Vec<Vec<Value>>> {
        (self.extract)(parent)
            .into_iter()
            .map(|values| {
                if values.len() != self.value_columns.len() {
                    return Err(OrmError::invalid_argument(format!(
                        "{}: child row has {} value(s), expected {}",
                        self.table,
                        values.len(),
                        self.value_columns.len()
                    )));
                }
                let mut params = parent_key.to_vec();
                params.extend(values);
                Ok(params)
            })
            .collect()
    }

    /// `LEFT JOIN <child> <alias> ON <alias>.ref = <parent>.key AND ...`
    pub(crate) fn join_sql(&self, alias: &str, parent: &str, parent_keys: &[Ident]) -> String {
        let mut out = format!(" LEFT JOIN {} {alias} ON ", self.table_ident.to_sql());
        for (i, (child, key)) in self.parent_columns.iter().zip(parent_keys).enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            let _ = write!(out, "{alias}.{} = {parent}.{}", child.to_sql(), key.to_sql());
        }
        out
    }

    /// The association's columns, renamed `<alias>.<column>` in the result.
    pub(crate) fn select_sql(&self, alias: &str) -> String {
        let mut columns = self.parent_columns.clone();
        columns.extend(self.value_columns.iter().cloned());
        aliased_column_list(&columns, alias)
    }

    /// Child row carried by a joined row, or `None` when the LEFT JOIN found
    /// nothing (first referencing column is NULL).
    pub(crate) fn child_of(
        &self,
        row: &Record,
        alias: &str,
    ) -> OrmResult<Option<(Vec<Value>, Record)>> {
        let child = row.project(&format!("{alias}."));
        if child.get(&self.parent_names[0])?.is_null() {
            return Ok(None);
        }
        let values = self
            .value_names
            .iter()
            .map(|c| child.get(c).cloned())
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(Some((values, child)))
    }

    pub(crate) fn attach(&self, parent: &mut T, child: &Record) -> OrmResult<()> {
        (self.attach)(parent, child)
    }
}
