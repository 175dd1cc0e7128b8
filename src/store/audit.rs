//! Best-effort append-only audit trail.
//!
//! Every mutating store operation calls `record_audit` exactly once, after
//! its primary write has committed. A failed append is logged and swallowed:
//! the audit channel must never roll back or fail the mutation it describes.

use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{EntityTrait, QueryOrder, QuerySelect};
use serde_json::Value;
use tracing::warn;

use crate::entities::admin_log;
use crate::models::Page;
use crate::models::admin::AuditLogView;

use super::{PlatformStore, StoreError};

const DEFAULT_LOG_LIMIT: u64 = 50;
const MAX_LOG_LIMIT: u64 = 500;

impl PlatformStore {
    pub(crate) async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        target_type: &str,
        target_id: &str,
        details: Option<Value>,
    ) {
        let connection = match self.db() {
            Ok(connection) => connection,
            Err(_) => {
                warn!("Audit append skipped for {action} on {target_type}/{target_id}: store closed");
                return;
            }
        };

        let entry = admin_log::ActiveModel {
            id: NotSet,
            actor_id: Set(actor.to_string()),
            action: Set(action.to_string()),
            target_type: Set(target_type.to_string()),
            target_id: Set(target_id.to_string()),
            details: Set(details),
            created_at: Set(chrono::Utc::now()),
        };

        if let Err(err) = admin_log::Entity::insert(entry).exec(connection).await {
            warn!("Audit append failed for {action} on {target_type}/{target_id}: {err}");
        }
    }

    /// Audit entries, newest first. Insertion order is the only ordering
    /// guarantee the log makes.
    pub async fn list_audit_log(&self, page: &Page) -> Result<Vec<AuditLogView>, StoreError> {
        let connection = self.db()?;
        let (limit, offset) = page.resolve(DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT);

        let rows = admin_log::Entity::find()
            .order_by_desc(admin_log::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(connection)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| AuditLogView {
                id: row.id,
                actor_id: row.actor_id,
                action: row.action,
                target_type: row.target_type,
                target_id: row.target_id,
                details: row.details,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{
        ConnectionTrait, DatabaseBackend, EntityTrait, PaginatorTrait, Statement,
    };

    use crate::entities::admin_log;
    use crate::models::Page;
    use crate::store::test_support::memory_store;
    use crate::store::tests_fixtures::sample_airdrop;

    #[tokio::test]
    async fn each_mutation_appends_exactly_one_entry() {
        let store = memory_store().await;
        let connection = store.db().expect("store is open");

        store
            .upsert_airdrop("ops", &sample_airdrop("a1"))
            .await
            .expect("upsert succeeds");
        assert_eq!(
            admin_log::Entity::find().count(connection).await.unwrap(),
            1
        );

        store
            .delete_airdrop("ops", "a1")
            .await
            .expect("delete succeeds");
        assert_eq!(
            admin_log::Entity::find().count(connection).await.unwrap(),
            2
        );

        let entries = store.list_audit_log(&Page::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].action, "delete_airdrop");
        assert_eq!(entries[1].action, "upsert_airdrop");
        assert_eq!(entries[1].actor_id, "ops");
        assert_eq!(entries[1].target_type, "airdrop");
        assert_eq!(entries[1].target_id, "a1");
    }

    #[tokio::test]
    async fn audit_failure_never_blocks_the_mutation() {
        let store = memory_store().await;
        let connection = store.db().expect("store is open");
        connection
            .execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                "DROP TABLE admin_logs",
            ))
            .await
            .expect("table dropped");

        store
            .upsert_airdrop("ops", &sample_airdrop("a1"))
            .await
            .expect("mutation survives a broken audit channel");
        let found = store.airdrop_by_id("a1").await.unwrap();
        assert!(found.is_some(), "primary write committed");
    }
}
