//! Transaction helpers.
//!
//! Repository operations accept any [`GenericClient`](crate::GenericClient),
//! including `tokio_postgres::Transaction` and `deadpool_postgres::Transaction`.
//! Composite writes (a parent row plus its association rows) are only atomic
//! when the caller runs them inside a transaction, e.g. with [`transaction!`].
//!
//! # Example
//!
//! ```ignore
//! use relmap::OrmResult;
//! use tokio_postgres::NoTls;
//!
//! # async fn demo(apis: &relmap::Repository<Api, String>, api: Api) -> OrmResult<()> {
//! let (mut client, connection) = tokio_postgres::connect("postgres://...", NoTls).await?;
//! tokio::spawn(async move { let _ = connection.await; });
//!
//! relmap::transaction!(&mut client, tx, {
//!     apis.update(&tx, &api).await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `relmap::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::OrmError::from_db_error)?;

        let __relmap_tx_body_result = async { $body }.await;
        match __relmap_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::OrmError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
