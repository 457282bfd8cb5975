//! Dynamic SQL builder.
//!
//! `Sql` composes SQL dynamically without manually tracking placeholder
//! indices: raw fragments and bound values are kept apart and `$1, $2, ...`
//! are assigned when the statement is rendered.
//!
//! # Example
//!
//! ```ignore
//! use relmap::sql;
//!
//! let mut q = sql("SELECT id, name FROM tags WHERE 1=1");
//! if let Some(kind) = reference_type {
//!     q.push(" AND reference_type = ").push_bind(kind);
//! }
//! q.push(" ORDER BY name");
//!
//! let rows = q.fetch_all(&conn).await?;
//! ```

mod builder;


pub use builder::Sql;

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}
