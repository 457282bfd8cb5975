use super::{EntityKey, Repository};
use crate::client::GenericClient;
use crate::collate::CollatingRowMapper;
use crate::criteria::{Criteria, Sortable};
use crate::error::OrmResult;
use crate::row::Record;
use crate::sql::Sql;

impl<T, K> Repository<T, K>
where
    T: Default + Send + Sync,
    K: EntityKey,
{
    /// Every entity matching `criteria`, optionally sorted, associations included.
    pub async fn search(
        &self,
        conn: &impl GenericClient,
        criteria: &impl Criteria,
        sort: Option<&Sortable>,
    ) -> OrmResult<Vec<T>> {
        tracing::debug!(target: "relmap.repo", table = self.binding.table(), ?sort, "search");
        let result = async {
            let predicates = criteria.to_predicates()?;
            self.load(conn, &predicates, sort, None).await
        }
        .await;
        result.map_err(|e| self.fail("search", &sort, e))
    }

    /// Run a hand-written join and fold its rows into entities.
    ///
    /// Each row is mapped through the entity binding the first time its
    /// `key_columns` values are seen; `child_adder` runs for every row.
    pub async fn query_collated<F>(
        &self,
        conn: &impl GenericClient,
        query: &Sql,
        key_columns: &[&str],
        child_adder: F,
    ) -> OrmResult<Vec<T>>
    where
        F: FnMut(&mut T, &Record) -> OrmResult<()>,
    {
        tracing::debug!(
            target: "relmap.repo",
            table = self.binding.table(),
            tag = query.tag_name(),
            "query_collated"
        );
        let result = async {
            let rows = query.fetch_all(conn).await?;
            let binding = &self.binding;
            let mapper = |row: &Record| binding.map_row(row);
            let mut collator = CollatingRowMapper::new(key_columns, mapper, child_adder);
            collator.process_rows(&rows)?;
            Ok(collator.into_rows())
        }
        .await;
        result.map_err(|e| self.fail("query_collated", &key_columns, e))
    }
}
