//! Embedded persistence core for the platform.
//!
//! `PlatformStore` owns the storage engine connection and exposes every
//! repository, analytics, audit and export operation behind one typed
//! contract. The backing engine is selected purely by the configured URL:
//! `sqlite::memory:` for the in-memory engine, `sqlite://path?mode=rwc` for
//! the persisted-file engine. The store is an explicitly constructed object
//! handed to consumers; there is no ambient global handle.

mod airdrops;
mod analytics;
mod audit;
mod export;
mod settings;
mod users;
mod withdrawals;

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Typed failure taxonomy for every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has not finished initializing or has been closed. Callers
    /// may retry once a live store is available.
    #[error("store is not initialized")]
    NotInitialized,
    /// Invalid input: missing foreign key, duplicate key, out-of-range
    /// amount, malformed stored value. Never retryable.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// The engine failed to allocate or connect. Fatal at startup.
    #[error("storage engine unavailable: {0}")]
    Unavailable(String),
    /// Any other engine error, surfaced verbatim.
    #[error("storage error: {0}")]
    Unknown(DbErr),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotInitialized)
    }

    pub(crate) fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation(message.into())
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::Unavailable(err.to_string()),
            DbErr::Exec(_) | DbErr::Query(_) => {
                let message = err.to_string();
                if message.contains("constraint failed") {
                    Self::ConstraintViolation(message)
                } else {
                    Self::Unknown(err)
                }
            }
            _ => Self::Unknown(err),
        }
    }
}

pub struct PlatformStore {
    connection: DatabaseConnection,
    open: AtomicBool,
}

impl PlatformStore {
    /// Connects the configured engine and brings the schema up to date.
    /// This is the single asynchronous initialization point; a failure here
    /// is fatal and the caller must not proceed with a half-opened store.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        // Every sqlite ":memory:" connection is a distinct database, so the
        // pool must collapse to one connection for that engine.
        let in_memory = config.url.contains(":memory:");
        let max_connections = if in_memory { 1 } else { config.max_connections };
        assert!(max_connections >= 1, "Connection pool cannot be empty");
        assert!(max_connections <= 128, "Connection pool oversized");

        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(max_connections)
            .min_connections(config.min_connections.unwrap_or(1).min(max_connections))
            .sqlx_logging(true)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug)
            .acquire_timeout(Duration::from_secs(10));

        let connection = Database::connect(options)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Migrator::up(&connection, None)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        info!(
            engine = if in_memory { "memory" } else { "file" },
            "Platform store ready"
        );

        Ok(Self {
            connection,
            open: AtomicBool::new(true),
        })
    }

    /// Marks the store closed. Subsequent operations fail with
    /// `NotInitialized` instead of touching the engine; pooled connections
    /// are released when the store is dropped.
    pub fn close(&self) {
        self.open.store(false, AtomicOrdering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(AtomicOrdering::SeqCst)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.db()?.ping().await.map_err(StoreError::from)
    }

    /// Gate every operation through the lifecycle flag so calls against a
    /// closed store fail fast rather than blocking.
    pub(crate) fn db(&self) -> Result<&DatabaseConnection, StoreError> {
        if self.is_open() {
            Ok(&self.connection)
        } else {
            Err(StoreError::NotInitialized)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::PlatformStore;
    use crate::config::DatabaseConfig;

    pub(crate) async fn memory_store() -> PlatformStore {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: None,
        };
        PlatformStore::open(&config).await.expect("in-memory store opens")
    }
}

#[cfg(test)]
pub(crate) mod tests_fixtures {
    use chrono::{TimeZone, Utc};

    use crate::models::airdrop::{AirdropInput, AirdropStatus, TaskKind, TaskView};
    use crate::models::user::UserInput;

    pub(crate) fn sample_task(id: &str, points: i32) -> TaskView {
        TaskView {
            id: id.to_string(),
            kind: TaskKind::Telegram,
            title: format!("Join channel {id}"),
            description: "Join the announcement channel".to_string(),
            url: Some("https://t.me/example".to_string()),
            points,
            required: true,
        }
    }

    pub(crate) fn sample_airdrop(id: &str) -> AirdropInput {
        AirdropInput {
            id: id.to_string(),
            title: format!("Campaign {id}"),
            description: "Genesis distribution".to_string(),
            logo: "🚀".to_string(),
            reward: "500 TOKEN".to_string(),
            total_reward: "1,000,000 TOKEN".to_string(),
            participants: 0,
            max_participants: 100,
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            status: AirdropStatus::Active,
            category: "DeFi".to_string(),
            blockchain: "Ethereum".to_string(),
            tasks: vec![sample_task("t1", 50), sample_task("t2", 30)],
            requirements: vec!["Hold 0.01 ETH".to_string()],
        }
    }

    pub(crate) fn sample_user(id: &str) -> UserInput {
        UserInput {
            id: id.to_string(),
            wallet_address: Some(id.to_string()),
            telegram: None,
            twitter: None,
            discord: None,
            total_points: 0,
            is_connected: false,
            balance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::memory_store;
    use super::*;

    #[tokio::test]
    async fn closed_store_rejects_operations() {
        let store = memory_store().await;
        store.close();

        let err = store.ping().await.expect_err("closed store must error");
        assert!(matches!(err, StoreError::NotInitialized));
        assert!(err.is_retryable());

        let err = store
            .airdrop_by_id("a1")
            .await
            .expect_err("closed store must error");
        assert!(matches!(err, StoreError::NotInitialized));
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let store = memory_store().await;
        let connection = store.db().expect("store is open");
        Migrator::up(connection, None)
            .await
            .expect("re-running migrations is a no-op");
    }

    #[tokio::test]
    async fn bad_engine_url_is_unavailable() {
        let config = DatabaseConfig {
            url: "sqlite:///nonexistent-dir/for-sure/db.sqlite?mode=ro".to_string(),
            max_connections: 1,
            min_connections: None,
        };
        let err = PlatformStore::open(&config)
            .await
            .err()
            .expect("opening a read-only missing file fails");
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn constraint_errors_are_not_retryable() {
        let err = StoreError::constraint("amount exceeds balance");
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "constraint violation: amount exceeds balance"
        );
    }
}
