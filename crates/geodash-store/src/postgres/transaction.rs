//! Scoped transaction guard: acquire-on-entry, release-on-all-exits (spec §9 "scoped
//! resources"). Commit/rollback errors surface as `TransactionError`; dropping without an
//! explicit call rolls back (sqlx's own `Drop` behaviour on an uncommitted transaction).

use geodash_core::error::{GeodashError, Result};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use std::time::Duration;
use tokio::time::timeout;

pub struct Transaction<'a> {
    inner: Option<SqlxTransaction<'a, Postgres>>,
    timeout_duration: Duration,
}

impl<'a> Transaction<'a> {
    fn new(tx: SqlxTransaction<'a, Postgres>, timeout_duration: Duration) -> Self {
        Self { inner: Some(tx), timeout_duration }
    }

    pub fn inner_mut(&mut self) -> Result<&mut SqlxTransaction<'a, Postgres>> {
        self.inner
            .as_mut()
            .ok_or_else(|| GeodashError::TransactionError("transaction already completed".to_string()))
    }

    pub async fn commit(mut self) -> Result<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| GeodashError::TransactionError("transaction already completed".to_string()))?;

        match timeout(self.timeout_duration, tx.commit()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(GeodashError::TransactionError(format!("commit failed: {e}"))),
            Err(_) => Err(GeodashError::TransactionError(format!(
                "commit timed out after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }

    pub async fn rollback(mut self) -> Result<()> {
        let tx = self
            .inner
            .take()
            .ok_or_else(|| GeodashError::TransactionError("transaction already completed".to_string()))?;

        match timeout(self.timeout_duration, tx.rollback()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(GeodashError::TransactionError(format!("rollback failed: {e}"))),
            Err(_) => Err(GeodashError::TransactionError(format!(
                "rollback timed out after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }
}

/// Creates transactions with a shared default timeout.
pub struct TransactionManager {
    pool: PgPool,
    default_timeout: Duration,
}

impl TransactionManager {
    pub fn new(pool: PgPool, default_timeout: Duration) -> Self {
        Self { pool, default_timeout }
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_>> {
        self.begin_transaction_with_timeout(self.default_timeout).await
    }

    pub async fn begin_transaction_with_timeout(&self, timeout_duration: Duration) -> Result<Transaction<'_>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GeodashError::ConnectionError(format!("failed to begin transaction: {e}")))?;
        Ok(Transaction::new(tx, timeout_duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manager_holds_configured_timeout() {
        let pool = PgPool::connect_lazy("postgresql://localhost/test").unwrap();
        let manager = TransactionManager::new(pool, Duration::from_secs(15));
        assert_eq!(manager.default_timeout, Duration::from_secs(15));
    }
}
