//! Global configuration rows, upsert-only.
//!
//! Platform parameters are read from here at use time rather than from the
//! process configuration file, so operators can adjust them live.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};
use serde_json::json;

use crate::entities::setting;
use crate::models::admin::SettingView;

use super::{PlatformStore, StoreError};

/// Points-per-USDC conversion rate.
pub const EXCHANGE_RATE_KEY: &str = "points_to_usdc_rate";
/// Smallest withdrawable point amount.
pub const MIN_WITHDRAWAL_KEY: &str = "min_withdrawal";

impl PlatformStore {
    pub async fn setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let connection = self.db()?;
        Ok(setting::Entity::find_by_id(key)
            .one(connection)
            .await?
            .map(|row| row.value))
    }

    pub async fn all_settings(&self) -> Result<Vec<SettingView>, StoreError> {
        let connection = self.db()?;
        let rows = setting::Entity::find()
            .order_by_asc(setting::Column::Key)
            .all(connection)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| SettingView {
                key: row.key,
                value: row.value,
                updated_at: row.updated_at,
            })
            .collect())
    }

    pub async fn put_setting(
        &self,
        actor: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if key.trim().is_empty() {
            return Err(StoreError::constraint("setting key must not be empty"));
        }
        let connection = self.db()?;

        let model = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };
        setting::Entity::insert(model)
            .on_conflict(
                OnConflict::column(setting::Column::Key)
                    .update_columns([setting::Column::Value, setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(connection)
            .await?;

        self.record_audit(actor, "put_setting", "setting", key, Some(json!({ "value": value })))
            .await;
        Ok(())
    }

    /// Points-per-USDC rate; misconfiguration is an input error, not a crash.
    pub async fn exchange_rate(&self) -> Result<i64, StoreError> {
        let rate = numeric_setting(self.db()?, EXCHANGE_RATE_KEY).await?;
        if rate <= 0 {
            return Err(StoreError::constraint(format!(
                "setting {EXCHANGE_RATE_KEY} must be positive, got {rate}"
            )));
        }
        Ok(rate)
    }

    pub async fn min_withdrawal(&self) -> Result<i64, StoreError> {
        let minimum = numeric_setting(self.db()?, MIN_WITHDRAWAL_KEY).await?;
        if minimum < 0 {
            return Err(StoreError::constraint(format!(
                "setting {MIN_WITHDRAWAL_KEY} must be non-negative, got {minimum}"
            )));
        }
        Ok(minimum)
    }
}

/// Reads a numeric setting on any connection, including an open transaction.
pub(crate) async fn numeric_setting<C: ConnectionTrait>(
    connection: &C,
    key: &str,
) -> Result<i64, StoreError> {
    let row = setting::Entity::find_by_id(key)
        .one(connection)
        .await?
        .ok_or_else(|| StoreError::constraint(format!("setting {key} is not configured")))?;
    row.value
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::constraint(format!("setting {key} is not numeric: {}", row.value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::memory_store;

    #[tokio::test]
    async fn defaults_are_seeded() {
        let store = memory_store().await;
        assert_eq!(store.exchange_rate().await.unwrap(), 100);
        assert_eq!(store.min_withdrawal().await.unwrap(), 100);
        assert_eq!(
            store.setting("maintenance_mode").await.unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(store.setting("no_such_key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_setting_upserts() {
        let store = memory_store().await;
        store
            .put_setting("ops", "points_to_usdc_rate", "250")
            .await
            .unwrap();
        assert_eq!(store.exchange_rate().await.unwrap(), 250);

        store.put_setting("ops", "theme", "dark").await.unwrap();
        assert_eq!(store.setting("theme").await.unwrap().as_deref(), Some("dark"));

        let all = store.all_settings().await.unwrap();
        assert!(all.windows(2).all(|pair| pair[0].key <= pair[1].key));
    }

    #[tokio::test]
    async fn non_numeric_rate_is_a_constraint_violation() {
        let store = memory_store().await;
        store
            .put_setting("ops", "points_to_usdc_rate", "lots")
            .await
            .unwrap();
        let err = store.exchange_rate().await.expect_err("must reject");
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn empty_key_rejected() {
        let store = memory_store().await;
        let err = store
            .put_setting("ops", "  ", "x")
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }
}
