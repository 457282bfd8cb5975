//! # relmap
//!
//! A small relational mapping layer for PostgreSQL.
//!
//! ## Features
//!
//! - **Declared bindings**: an [`EntityBinding`] names a table, its ordered
//!   columns and its key columns, and generates the CRUD statements once
//! - **Explicit SQL**: hand-written queries go through [`Sql`] / [`sql()`] with
//!   numbered `$n` placeholders
//! - **Generic repository**: [`Repository`] implements find/create/update/delete,
//!   criteria search and paging for any bound entity, child tables included
//! - **Collation**: [`CollatingRowMapper`] folds one-to-many join rows into aggregates
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use relmap::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Tag {
//!     id: String,
//!     name: String,
//! }
//!
//! let config = RelmapConfig::from_env()?;
//! let binding = EntityBinding::<Tag>::builder(config.table_name("tags"), &["id"])
//!     .column("id", SqlType::Text, |t| t.id.clone(), |t, v| t.id = v)
//!     .column("name", SqlType::Text, |t| t.name.clone(), |t, v| t.name = v)
//!     .build()?;
//! let tags: Repository<Tag, String> = Repository::new(Arc::new(binding));
//!
//! let pool = config.create_pool()?;
//! let client = pool.get().await?;
//! let created = tags.create(&client, &Tag { id: "t1".into(), name: "Beta".into() }).await?;
//! let page = tags.find_all_page(&client, Some(&PageRequest::new(0, 10))).await?;
//! ```
//!
//! ## Logging
//!
//! Events are emitted with `tracing` on two targets: `relmap.repo` for
//! repository operations (failures at `error`) and `relmap.sql` for every
//! statement sent (at `debug`).

pub mod binding;
pub mod client;
pub mod collate;
pub mod condition;
pub mod config;
pub mod criteria;
pub mod error;
pub mod ident;
pub mod page;
pub mod prelude;
pub mod repository;
pub mod row;
pub mod sql;
pub mod statement;
pub mod transaction;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

pub use binding::{ColumnBinding, EntityBinding, EntityBindingBuilder};
pub use client::GenericClient;
pub use collate::{CollatingRowMapper, CollationKey};
pub use condition::{Condition, Op};
pub use config::RelmapConfig;
pub use criteria::{Criteria, Order, Predicates, Sortable};
pub use error::{OrmError, OrmResult};
pub use ident::{Ident, IntoIdent, escape_reserved_word, is_reserved_word};
pub use page::{Page, PageRequest, slice};
pub use repository::{Association, EntityKey, Repository};
pub use row::{Record, RowMapper};
pub use sql::{Sql, sql};
pub use statement::{Statement, StatementKind};
pub use value::{FromValue, SqlType, Value};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
