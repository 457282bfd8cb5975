//! SQL text generated from an entity binding.
//!
//! Every statement an [`EntityBinding`](crate::EntityBinding) needs is rendered
//! once when the binding is built. Rendering is a pure function of the table
//! and column identifiers, so the same binding always yields the same text.

use crate::ident::Ident;
use crate::value::Value;
use std::fmt::Write;

/// The statement shapes derived from a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    SelectAll,
    SelectById,
    Insert,
    UpdateByKey,
    DeleteByKey,
    Count,
}

/// Generated SQL plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub(crate) fn new(kind: StatementKind, sql: &str, params: Vec<Value>) -> Self {
        Self {
            kind,
            sql: sql.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GeneratedSql {
    select_all: String,
    select_by_id: String,
    insert: String,
    update_by_key: String,
    delete_by_key: String,
    count: String,
}

impl GeneratedSql {
    /// `keys` are positions into `columns`, in key order.
    pub(crate) fn generate(table: &Ident, columns: &[Ident], keys: &[usize]) -> Self {
        let table = table.to_sql();
        let select_all = format!("SELECT {} FROM {table}", column_list(columns, None));

        let mut select_by_id = select_all.clone();
        push_key_filter(&mut select_by_id, columns, keys, 1);

        let mut insert = format!("INSERT INTO {table} ({}) VALUES (", column_list(columns, None));
        for i in 1..=columns.len() {
            if i > 1 {
                insert.push_str(", ");
            }
            let _ = write!(insert, "${i}");
        }
        insert.push(')');

        let set_columns = update_columns(columns.len(), keys);
        let mut update_by_key = format!("UPDATE {table} SET ");
        for (n, &idx) in set_columns.iter().enumerate() {
            if n > 0 {
                update_by_key.push_str(", ");
            }
            let _ = write!(update_by_key, "{} = ${}", columns[idx].to_sql(), n + 1);
        }
        push_key_filter(&mut update_by_key, columns, keys, set_columns.len() + 1);

        let mut delete_by_key = format!("DELETE FROM {table}");
        push_key_filter(&mut delete_by_key, columns, keys, 1);

        Self {
            select_all,
            select_by_id,
            insert,
            update_by_key,
            delete_by_key,
            count: format!("SELECT COUNT(*) FROM {table}"),
        }
    }

    pub(crate) fn get(&self, kind: StatementKind) -> &str {
        match kind {
            StatementKind::SelectAll => &self.select_all,
            StatementKind::SelectById => &self.select_by_id,
            StatementKind::Insert => &self.insert,
            StatementKind::UpdateByKey => &self.update_by_key,
            StatementKind::DeleteByKey => &self.delete_by_key,
            StatementKind::Count => &self.count,
        }
    }
}

/// Positions of the columns assigned by `UPDATE ... SET`: every non-key
/// column, or the key columns themselves when nothing else is bound.
pub(crate) fn update_columns(column_count: usize, keys: &[usize]) -> Vec<usize> {
    let non_keys: Vec<usize> = (0..column_count).filter(|i| !keys.contains(i)).collect();
    if non_keys.is_empty() {
        keys.to_vec()
    } else {
        non_keys
    }
}

/// `a, b, c`, or `p.a, p.b, p.c` with a qualifier.
pub(crate) fn column_list(columns: &[Ident], qualifier: Option<&str>) -> String {
    let mut out = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        if let Some(q) = qualifier {
            out.push_str(q);
            out.push('.');
        }
        out.push_str(&col.to_sql());
    }
    out
}

/// `a0.x AS "a0.x", a0.y AS "a0.y"`: association columns under
/// alias-prefixed result names so they cannot collide with parent columns.
pub(crate) fn aliased_column_list(columns: &[Ident], alias: &str) -> String {
    let mut out = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let name = col.to_sql();
        let bare = name.trim_matches('"');
        let _ = write!(out, "{alias}.{name} AS \"{alias}.{bare}\"");
    }
    out
}

/// ` WHERE k1 = $n AND k2 = $n+1 ...`
fn push_key_filter(out: &mut String, columns: &[Ident], keys: &[usize], first_param: usize) {
    for (n, &idx) in keys.iter().enumerate() {
        out.push_str(if n == 0 { " WHERE " } else { " AND " });
        let _ = write!(out, "{} = ${}", columns[idx].to_sql(), first_param + n);
    }
}
