//! Generic client trait for unified database access.

use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::value::Value;
use futures_util::future::try_join_all;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// The execution context every repository runs against.
///
/// Implemented for connections, transactions and pooled clients, so repository
/// operations compose inside a caller-managed transaction. Acquiring and
/// releasing the underlying connection is the caller's responsibility.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<u64>> + Send;

    /// First column of the first row; `Value::Null` when no row comes back.
    fn query_scalar(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Value>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            match rows.first() {
                Some(row) => Ok(row.get_at(0)?.clone()),
                None => Ok(Value::Null),
            }
        }
    }

    /// Execute one statement once per parameter set and return the total
    /// number of affected rows.
    ///
    /// The default implementation runs the executions one after another.
    fn execute_batch(
        &self,
        sql: &str,
        param_sets: &[Vec<Value>],
    ) -> impl Future<Output = OrmResult<u64>> + Send {
        async move {
            let mut affected = 0;
            for params in param_sets {
                affected += self.execute(sql, params).await?;
            }
            Ok(affected)
        }
    }
}

fn as_params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// Implements [`GenericClient`] for a tokio-postgres connection type.
///
/// The batch prepares the statement once and pipelines every execution.
macro_rules! impl_pg_client {
    ($ty:ty, $($conn:ident)::+) => {
        impl GenericClient for $ty {
            async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
                let rows = $($conn)::+::query(self, sql, &as_params(params))
                    .await
                    .map_err(OrmError::from_db_error)?;
                Record::from_pg_rows(&rows)
            }

            async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
                $($conn)::+::execute(self, sql, &as_params(params))
                    .await
                    .map_err(OrmError::from_db_error)
            }

            async fn execute_batch(&self, sql: &str, param_sets: &[Vec<Value>]) -> OrmResult<u64> {
                if param_sets.is_empty() {
                    return Ok(0);
                }
                let stmt = $($conn)::+::prepare(self, sql)
                    .await
                    .map_err(OrmError::from_db_error)?;
                let bound: Vec<Vec<&(dyn ToSql + Sync)>> =
                    param_sets.iter().map(|p| as_params(p)).collect();
                let executions = bound.iter().map(|p| $($conn)::+::execute(self, &stmt, p));
                let counts = try_join_all(executions)
                    .await
                    .map_err(OrmError::from_db_error)?;
                Ok(counts.into_iter().sum())
            }
        }
    };
}

impl_pg_client!(tokio_postgres::Client, tokio_postgres::Client);
impl_pg_client!(tokio_postgres::Transaction<'_>, tokio_postgres::Transaction);

/// Delegates to the tokio-postgres client or transaction a pooled type derefs to.
#[cfg(feature = "pool")]
macro_rules! impl_deref_client {
    ($ty:ty) => {
        impl GenericClient for $ty {
            async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
                GenericClient::query(&**self, sql, params).await
            }

            async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
                GenericClient::execute(&**self, sql, params).await
            }

            async fn execute_batch(&self, sql: &str, param_sets: &[Vec<Value>]) -> OrmResult<u64> {
                GenericClient::execute_batch(&**self, sql, param_sets).await
            }
        }
    };
}

#[cfg(feature = "pool")]
impl_deref_client!(deadpool_postgres::ClientWrapper);
#[cfg(feature = "pool")]
impl_deref_client!(deadpool_postgres::Client);
#[cfg(feature = "pool")]
impl_deref_client!(deadpool_postgres::Transaction<'_>);

impl<C: GenericClient> GenericClient for &C {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Record>> {
        (**self).query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        (**self).execute(sql, params).await
    }

    async fn query_scalar(&self, sql: &str, params: &[Value]) -> OrmResult<Value> {
        (**self).query_scalar(sql, params).await
    }

    async fn execute_batch(&self, sql: &str, param_sets: &[Vec<Value>]) -> OrmResult<u64> {
        (**self).execute_batch(sql, param_sets).await
    }
}
