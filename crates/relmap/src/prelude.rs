//! Convenient imports for typical `relmap` usage.
//!
//! ```ignore
//! use relmap::prelude::*;
//! ```

pub use crate::{
    Association, Condition, Criteria, EntityBinding, EntityKey, GenericClient, Order, OrmError,
    OrmResult, Page, PageRequest, Predicates, Record, RelmapConfig, Repository, RowMapper, Sortable,
    Sql, SqlType, Value, sql,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
