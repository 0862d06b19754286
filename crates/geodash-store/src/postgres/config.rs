//! PostgreSQL connection and pool configuration.

use geodash_core::error::GeodashError;
use std::time::Duration;

/// PostgreSQL connection and behaviour configuration (spec §4.A: "bounded pool: min idle, max
/// in-use, acquisition timeout").
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub pool: PoolConfig,
    pub spatial_enabled: bool,
    pub fts_enabled: bool,
}

impl PostgresConfig {
    pub fn new(database_url: String) -> Result<Self, GeodashError> {
        if database_url.trim().is_empty() {
            return Err(GeodashError::ConfigurationError(
                "database.network.url cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            database_url,
            pool: PoolConfig::default(),
            spatial_enabled: true,
            fts_enabled: true,
        })
    }

    pub fn validate(&self) -> Result<(), GeodashError> {
        if self.database_url.trim().is_empty() {
            return Err(GeodashError::ConfigurationError(
                "database.network.url cannot be empty".to_string(),
            ));
        }
        self.pool.validate()
    }
}

/// Connection pool configuration. Each borrowed connection carries a last-used timestamp;
/// `sqlx` pings idle connections on reacquire and replaces on failure, matching spec §4.A.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 2,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), GeodashError> {
        if self.min_connections > self.max_connections {
            return Err(GeodashError::ConfigurationError(format!(
                "database.pool.min ({}) cannot exceed database.pool.max ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.max_connections == 0 {
            return Err(GeodashError::ConfigurationError(
                "database.pool.max must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_url() {
        assert!(PostgresConfig::new(String::new()).is_err());
    }

    #[test]
    fn pool_default_is_valid() {
        let pool = PoolConfig::default();
        assert_eq!(pool.min_connections, 2);
        assert_eq!(pool.max_connections, 10);
        assert!(pool.validate().is_ok());
    }

    #[test]
    fn pool_rejects_inverted_bounds() {
        let mut pool = PoolConfig::default();
        pool.min_connections = 20;
        pool.max_connections = 10;
        assert!(pool.validate().is_err());
    }

    #[test]
    fn pool_rejects_zero_max() {
        let mut pool = PoolConfig::default();
        pool.max_connections = 0;
        assert!(pool.validate().is_err());
    }
}
