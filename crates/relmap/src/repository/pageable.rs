use super::{EntityKey, Repository, Window, count_of};
use crate::client::GenericClient;
use crate::criteria::{Criteria, Sortable};
use crate::error::{OrmError, OrmResult};
use crate::page::{self, Page, PageRequest};
use crate::sql::Sql;

impl<T, K> Repository<T, K>
where
    T: Default + Send + Sync,
    K: EntityKey,
{
    /// Load every entity, then cut the requested page out of the list.
    ///
    /// `total_elements` is the full row count. Without a request the whole
    /// list is returned as page 0.
    pub async fn find_all_page(
        &self,
        conn: &impl GenericClient,
        request: Option<&PageRequest>,
    ) -> OrmResult<Page<T>> {
        let all = self.find_all(conn).await?;
        Ok(page::slice(request, all))
    }

    /// Filter by `criteria`, sort, and fetch one page with `LIMIT/OFFSET`.
    ///
    /// The total comes from a separate `COUNT(*)` over the same predicates, so
    /// a concurrent writer can make it disagree with the page content.
    pub async fn search_page(
        &self,
        conn: &impl GenericClient,
        criteria: &impl Criteria,
        sort: Option<&Sortable>,
        request: &PageRequest,
    ) -> OrmResult<Page<T>> {
        tracing::debug!(
            target: "relmap.repo",
            table = self.binding.table(),
            page_number = request.page_number,
            page_size = request.page_size,
            "search_page"
        );
        let result = async {
            let predicates = criteria.to_predicates()?;
            let mut count = Sql::new(self.binding.count_sql());
            predicates.append_to_sql(&mut count);
            let total = count_of(count.fetch_scalar(conn).await?)?;

            let window = Window {
                limit: request.limit().map(to_i64).transpose()?,
                offset: to_i64(request.offset())?,
            };
            let content = self.load(conn, &predicates, sort, Some(window)).await?;
            Ok(Page::new(
                content,
                request.page_number,
                u64::try_from(total).unwrap_or_default(),
            ))
        }
        .await;
        result.map_err(|e| self.fail("search_page", request, e))
    }
}

fn to_i64(n: usize) -> OrmResult<i64> {
    i64::try_from(n)
        .map_err(|_| OrmError::invalid_argument(format!("page window {n} is out of range")))
}
