use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::ApiResult;

pub mod mutation;
pub mod query;

/// Opens a transaction that takes SQLite's write lock up front.
///
/// Transactions that read before they write must start this way: a deferred
/// transaction that later upgrades to a writer fails with `SQLITE_BUSY`
/// instead of waiting for the busy timeout.
pub(crate) async fn begin_write(pool: &SqlitePool) -> ApiResult<Transaction<'static, Sqlite>> {
  pool.begin_with("BEGIN IMMEDIATE").await.map_err(Into::into)
}
