//! Schema migrations for the network-server backend, applied via `sqlx::migrate!`.

use geodash_core::error::{GeodashError, Result};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub applied: bool,
    pub checksum: Vec<u8>,
}

pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies every migration under `migrations/` not yet recorded. Idempotent: a second call
    /// with nothing pending is a no-op (spec §8 round-trip: "`ensure_schema()` called twice is
    /// a no-op after the first").
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GeodashError::ConfigurationError(format!("migration failed: {e}")))
    }

    pub async fn check_status(&self) -> Result<Vec<MigrationStatus>> {
        let migrator = sqlx::migrate!("./migrations");

        let applied_migrations: Vec<(i64, Vec<u8>)> =
            sqlx::query_as("SELECT version, checksum FROM _sqlx_migrations ORDER BY version")
                .fetch_all(&self.pool)
                .await
                .unwrap_or_default();

        let applied_versions: std::collections::HashSet<i64> =
            applied_migrations.iter().map(|(v, _)| *v).collect();

        Ok(migrator
            .iter()
            .map(|m| MigrationStatus {
                version: m.version,
                description: m.description.to_string(),
                applied: applied_versions.contains(&m.version),
                checksum: m.checksum.to_vec(),
            })
            .collect())
    }

    pub async fn has_pending_migrations(&self) -> Result<bool> {
        let status = self.check_status().await?;
        Ok(status.iter().any(|s| !s.applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_status_carries_applied_flag() {
        let status = MigrationStatus {
            version: 1,
            description: "create city_data".to_string(),
            applied: true,
            checksum: vec![1, 2, 3],
        };
        assert_eq!(status.version, 1);
        assert!(status.applied);
    }
}
