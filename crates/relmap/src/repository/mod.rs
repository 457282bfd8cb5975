//! Generic CRUD repository composed from an [`EntityBinding`] and optional
//! [`Association`]s.
//!
//! Every public operation logs its table and key (or criteria) on the
//! `relmap.repo` target, and wraps execution faults in
//! [`OrmError::Persistence`] after logging them at `error` level.
//! `Configuration`, `InvalidArgument` and `NotFound` pass through unchanged.
//!
//! Composite writes (parent plus association rows) are not atomic on their
//! own; run them inside a caller-managed transaction when that matters.

mod association;
mod key;
mod pageable;
mod search;

pub use association::Association;
pub use key::EntityKey;

use crate::binding::EntityBinding;
use crate::client::GenericClient;
use crate::collate::CollatingRowMapper;
use crate::condition::Condition;
use crate::criteria::{Predicates, Sortable};
use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use crate::row::Record;
use crate::sql::Sql;
use crate::statement::column_list;
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Child tuples already attached to one aggregate, per association.
type ChildSet = HashSet<Vec<Value>>;

/// Alias of the parent subquery in association joins.
const PARENT_ALIAS: &str = "p";

/// Row window pushed down as `LIMIT/OFFSET`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    limit: Option<i64>,
    offset: i64,
}

/// CRUD operations for `T`, addressed by keys of type `K`.
pub struct Repository<T, K> {
    binding: Arc<EntityBinding<T>>,
    associations: Vec<Association<T>>,
    _key: PhantomData<fn(&K)>,
}

impl<T, K> fmt::Debug for Repository<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("binding", &self.binding)
            .field("associations", &self.associations)
            .finish()
    }
}

impl<T, K> Repository<T, K>
where
    T: Default + Send + Sync,
    K: EntityKey,
{
    pub fn new(binding: Arc<EntityBinding<T>>) -> Self {
        Self {
            binding,
            associations: Vec::new(),
            _key: PhantomData,
        }
    }

    /// Attach a child table. Its parent columns must match the key arity.
    pub fn with_association(mut self, association: Association<T>) -> OrmResult<Self> {
        if association.parent_len() != self.binding.key_len() {
            return Err(OrmError::configuration(format!(
                "{}: association {} references {} column(s), key has {}",
                self.binding.table(),
                association.table(),
                association.parent_len(),
                self.binding.key_len()
            )));
        }
        self.associations.push(association);
        Ok(self)
    }

    pub fn binding(&self) -> &EntityBinding<T> {
        &self.binding
    }

    pub fn associations(&self) -> &[Association<T>] {
        &self.associations
    }

    // ==================== Reads ====================

    /// Load one entity; absence is `Ok(None)`.
    pub async fn find_by_id(&self, conn: &impl GenericClient, id: &K) -> OrmResult<Option<T>> {
        let key = id.key_values();
        tracing::debug!(
            target: "relmap.repo",
            table = self.binding.table(),
            ?key,
            "find_by_id"
        );
        self.find_by_key(conn, &key)
            .await
            .map_err(|e| self.fail("find_by_id", &key, e))
    }

    /// Load every entity, unique by key in first-seen order.
    pub async fn find_all(&self, conn: &impl GenericClient) -> OrmResult<Vec<T>> {
        tracing::debug!(target: "relmap.repo", table = self.binding.table(), "find_all");
        let result = async {
            let all = self.load(conn, &Predicates::new(), None, None).await?;
            self.unique_by_key(all)
        }
        .await;
        result.map_err(|e| self.fail("find_all", &"*", e))
    }

    /// Load the entities with the given keys; an empty slice returns an empty
    /// list without a query.
    pub async fn find_by_ids(&self, conn: &impl GenericClient, ids: &[K]) -> OrmResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<Vec<Value>> = ids.iter().map(EntityKey::key_values).collect();
        tracing::debug!(
            target: "relmap.repo",
            table = self.binding.table(),
            count = keys.len(),
            "find_by_ids"
        );
        let result = async {
            let predicates = self.keys_predicate(&keys)?;
            self.load(conn, &predicates, None, None).await
        }
        .await;
        result.map_err(|e| self.fail("find_by_ids", &keys, e))
    }

    pub async fn exists(&self, conn: &impl GenericClient, id: &K) -> OrmResult<bool> {
        let key = id.key_values();
        tracing::debug!(target: "relmap.repo", table = self.binding.table(), ?key, "exists");
        let result = async {
            let mut q = Sql::new(self.binding.count_sql());
            self.key_predicate(&key)?.append_to_sql(&mut q);
            let count = q.fetch_scalar(conn).await?;
            Ok(count_of(count)? > 0)
        }
        .await;
        result.map_err(|e| self.fail("exists", &key, e))
    }

    // ==================== Writes ====================

    /// Insert `entity` and its association rows, then return the row as stored.
    pub async fn create(&self, conn: &impl GenericClient, entity: &T) -> OrmResult<T> {
        let key = self
            .binding
            .key_values(entity)
            .map_err(|e| self.fail("create", &"<entity key>", e))?;
        tracing::debug!(target: "relmap.repo", table = self.binding.table(), ?key, "create");
        let result = async {
            let stmt = self.binding.insert_statement(entity)?;
            self.run(conn, &stmt.sql, &stmt.params).await?;
            for association in &self.associations {
                self.insert_children(conn, association, entity, &key).await?;
            }
            self.reread(conn, &key).await
        }
        .await;
        result.map_err(|e| self.fail("create", &key, e))
    }

    /// Update the row addressed by the entity's own key.
    ///
    /// Fails with `NotFound` when no row has that key.
    pub async fn update(&self, conn: &impl GenericClient, entity: &T) -> OrmResult<T> {
        let key = self
            .binding
            .key_values(entity)
            .map_err(|e| self.fail("update", &"<entity key>", e))?;
        self.update_with_key(conn, entity, key).await
    }

    /// [`update`](Self::update) for callers holding an optional entity;
    /// `None` is an `InvalidArgument`.
    pub async fn update_opt(&self, conn: &impl GenericClient, entity: Option<&T>) -> OrmResult<T> {
        match entity {
            Some(entity) => self.update(conn, entity).await,
            None => Err(OrmError::invalid_argument(format!(
                "{}: cannot update a missing entity",
                self.binding.table()
            ))),
        }
    }

    /// Update the row addressed by `id`, which may differ from the entity's key fields.
    pub async fn update_by_key(
        &self,
        conn: &impl GenericClient,
        entity: &T,
        id: &K,
    ) -> OrmResult<T> {
        self.update_with_key(conn, entity, id.key_values()).await
    }

    /// Delete associations, then the row. Deleting a missing key is a no-op;
    /// returns the number of parent rows removed.
    pub async fn delete(&self, conn: &impl GenericClient, id: &K) -> OrmResult<u64> {
        let key = id.key_values();
        tracing::debug!(target: "relmap.repo", table = self.binding.table(), ?key, "delete");
        let result = async {
            let stmt = self.binding.delete_by_key_statement(&key)?;
            for association in &self.associations {
                self.run(conn, association.delete_sql(), &stmt.params).await?;
            }
            self.run(conn, &stmt.sql, &stmt.params).await
        }
        .await;
        result.map_err(|e| self.fail("delete", &key, e))
    }

    // ==================== Internals ====================

    async fn update_with_key(
        &self,
        conn: &impl GenericClient,
        entity: &T,
        key: Vec<Value>,
    ) -> OrmResult<T> {
        tracing::debug!(target: "relmap.repo", table = self.binding.table(), ?key, "update");
        let result = async {
            let stmt = self.binding.update_by_key_statement(entity, &key)?;
            let affected = self.run(conn, &stmt.sql, &stmt.params).await?;
            if affected == 0 {
                return Err(OrmError::not_found(format!(
                    "{} {key:?}",
                    self.binding.table()
                )));
            }
            // Children still reference the addressed key; the row may now live
            // under a new one when the key columns themselves were assigned.
            let old_key = self.binding.coerce_keys(&key)?;
            let new_key = if self.binding.updates_key_columns() {
                self.binding.key_values(entity)?
            } else {
                old_key.clone()
            };
            for association in &self.associations {
                self.run(conn, association.delete_sql(), &old_key).await?;
                self.insert_children(conn, association, entity, &new_key).await?;
            }
            self.reread(conn, &new_key).await
        }
        .await;
        result.map_err(|e| self.fail("update", &key, e))
    }

    async fn find_by_key(&self, conn: &impl GenericClient, key: &[Value]) -> OrmResult<Option<T>> {
        if self.associations.is_empty() {
            let stmt = self.binding.select_by_id_statement(key)?;
            let rows = self.query(conn, &stmt.sql, &stmt.params).await?;
            return rows.first().map(|row| self.binding.map_row(row)).transpose();
        }
        let predicates = self.key_predicate(key)?;
        let mut found = self.load(conn, &predicates, None, None).await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Re-read after a write. No isolation is added: a concurrent writer may
    /// be observed.
    async fn reread(&self, conn: &impl GenericClient, key: &[Value]) -> OrmResult<T> {
        self.find_by_key(conn, key).await?.ok_or_else(|| {
            OrmError::not_found(format!(
                "{} {key:?} vanished after write",
                self.binding.table()
            ))
        })
    }

    async fn insert_children(
        &self,
        conn: &impl GenericClient,
        association: &Association<T>,
        entity: &T,
        key: &[Value],
    ) -> OrmResult<u64> {
        let param_sets = association.insert_params(entity, key)?;
        if param_sets.is_empty() {
            return Ok(0);
        }
        tracing::debug!(
            target: "relmap.sql",
            batch = param_sets.len(),
            sql = association.insert_sql(),
        );
        conn.execute_batch(association.insert_sql(), &param_sets).await
    }

    /// Select parents matching `predicates`, with associations folded in.
    pub(crate) async fn load(
        &self,
        conn: &impl GenericClient,
        predicates: &Predicates,
        sort: Option<&Sortable>,
        window: Option<Window>,
    ) -> OrmResult<Vec<T>> {
        let mut parent = Sql::new(self.binding.select_all_sql());
        predicates.append_to_sql(&mut parent);
        if let Some(sort) = sort {
            sort.append_to_sql(&mut parent, None)?;
        }
        if let Some(window) = window {
            match window.limit {
                Some(limit) => {
                    parent.limit_offset(limit, window.offset);
                }
                None if window.offset > 0 => {
                    parent.push(" OFFSET ").push_bind(window.offset);
                }
                None => {}
            }
        }

        if self.associations.is_empty() {
            let (sql, params) = parent.into_parts();
            let rows = self.query(conn, &sql, &params).await?;
            return rows.iter().map(|row| self.binding.map_row(row)).collect();
        }

        let columns = self.binding.column_idents();
        let keys: Vec<Ident> = self
            .binding
            .key_columns()
            .map(Ident::parse)
            .collect::<OrmResult<_>>()?;
        let mut select = format!("SELECT {}", column_list(&columns, Some(PARENT_ALIAS)));
        let mut joins = String::new();
        for (i, association) in self.associations.iter().enumerate() {
            let alias = format!("a{i}");
            select.push_str(", ");
            select.push_str(&association.select_sql(&alias));
            joins.push_str(&association.join_sql(&alias, PARENT_ALIAS, &keys));
        }

        let mut q = Sql::new(select);
        q.push(" FROM (");
        q.push_sql(parent);
        q.push(") ");
        q.push(PARENT_ALIAS);
        q.push(&joins);
        if let Some(sort) = sort {
            sort.append_to_sql(&mut q, Some(PARENT_ALIAS))?;
        }

        let (sql, params) = q.into_parts();
        let rows = self.query(conn, &sql, &params).await?;
        self.collate(&rows)
    }

    /// Fold joined rows into one entity per parent key.
    ///
    /// With a single association every joined row carries exactly one child
    /// row, repeats included. With several, the join multiplies their rows, so
    /// each distinct child tuple is attached once.
    fn collate(&self, rows: &[Record]) -> OrmResult<Vec<T>> {
        let keys: Vec<&str> = self.binding.key_columns().collect();
        let n = self.associations.len();
        let dedupe = n > 1;
        let binding = &self.binding;
        let mapper = |row: &Record| -> OrmResult<(T, Vec<ChildSet>)> {
            Ok((binding.map_row(row)?, vec![HashSet::new(); n]))
        };
        let associations = &self.associations;
        let adder = |(parent, seen): &mut (T, Vec<ChildSet>), row: &Record| -> OrmResult<()> {
            for (i, association) in associations.iter().enumerate() {
                let alias = format!("a{i}");
                if let Some((values, child)) = association.child_of(row, &alias)? {
                    if !dedupe || seen[i].insert(values) {
                        association.attach(parent, &child)?;
                    }
                }
            }
            Ok(())
        };
        let mut collator = CollatingRowMapper::new(&keys, mapper, adder);
        collator.process_rows(rows)?;
        Ok(collator.into_rows().into_iter().map(|(t, _)| t).collect())
    }

    fn unique_by_key(&self, entities: Vec<T>) -> OrmResult<Vec<T>> {
        let mut seen = HashSet::with_capacity(entities.len());
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            if seen.insert(self.binding.key_values(&entity)?) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    fn key_predicate(&self, key: &[Value]) -> OrmResult<Predicates> {
        let key = self.binding.coerce_keys(key)?;
        let mut predicates = Predicates::new();
        for (column, value) in self.binding.key_columns().zip(key) {
            predicates.and(Condition::eq(column, value)?);
        }
        Ok(predicates)
    }

    fn keys_predicate(&self, keys: &[Vec<Value>]) -> OrmResult<Predicates> {
        let keys = keys
            .iter()
            .map(|k| self.binding.coerce_keys(k))
            .collect::<OrmResult<Vec<_>>>()?;
        let columns: Vec<&str> = self.binding.key_columns().collect();
        let condition = if let [column] = columns.as_slice() {
            Condition::in_list(*column, keys.into_iter().flatten().collect::<Vec<Value>>())?
        } else {
            Condition::tuple_in(columns, keys)?
        };
        let mut predicates = Predicates::new();
        predicates.and(condition);
        Ok(predicates)
    }

    async fn query(
        &self,
        conn: &impl GenericClient,
        sql: &str,
        params: &[Value],
    ) -> OrmResult<Vec<Record>> {
        tracing::debug!(target: "relmap.sql", param_count = params.len(), sql);
        conn.query(sql, params).await
    }

    async fn run(&self, conn: &impl GenericClient, sql: &str, params: &[Value]) -> OrmResult<u64> {
        tracing::debug!(target: "relmap.sql", param_count = params.len(), sql);
        conn.execute(sql, params).await
    }

    fn fail(&self, operation: &str, key: &dyn fmt::Debug, error: OrmError) -> OrmError {
        let wrapped = error.into_persistence(format!("{operation} {}", self.binding.table()));
        if wrapped.is_persistence() {
            tracing::error!(
                target: "relmap.repo",
                table = self.binding.table(),
                operation,
                key = ?key,
                error = ?wrapped,
                "repository operation failed"
            );
        }
        wrapped
    }
}

fn count_of(value: Value) -> OrmResult<i64> {
    match value {
        Value::BigInt(n) => Ok(n),
        Value::Integer(n) => Ok(n.into()),
        Value::Null => Ok(0),
        other => Err(OrmError::decode("count", format!("expected integer, got {other:?}"))),
    }
}
