//! Withdrawal repository.
//!
//! Point deduction and withdrawal creation commit in a single transaction;
//! a request can never debit a user without leaving a matching row.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::entities::{user, withdrawal};
use crate::models::Page;
use crate::models::withdrawal::{
    WithdrawalFilter, WithdrawalRequest, WithdrawalResolution, WithdrawalStatus, WithdrawalView,
    usdc_value,
};

use super::settings::{EXCHANGE_RATE_KEY, MIN_WITHDRAWAL_KEY, numeric_setting};
use super::{PlatformStore, StoreError};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

impl PlatformStore {
    /// Validates and books a payout request. The amount is debited from the
    /// user and the pending row created atomically; the points-per-USDC
    /// rate is snapshotted into the row at this moment.
    pub async fn request_withdrawal(
        &self,
        actor: &str,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalView, StoreError> {
        if request.amount <= 0 {
            return Err(StoreError::constraint("amount must be positive"));
        }
        let connection = self.db()?;
        let now = Utc::now();

        let txn = connection.begin().await?;
        let user = user::Entity::find_by_id(&request.user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                StoreError::constraint(format!("unknown user {}", request.user_id))
            })?;

        let rate = numeric_setting(&txn, EXCHANGE_RATE_KEY).await?;
        let rate = i32::try_from(rate)
            .ok()
            .filter(|rate| *rate > 0)
            .ok_or_else(|| {
                StoreError::constraint(format!(
                    "setting {EXCHANGE_RATE_KEY} out of range: {rate}"
                ))
            })?;
        let minimum = numeric_setting(&txn, MIN_WITHDRAWAL_KEY).await?;
        if i64::from(request.amount) < minimum {
            return Err(StoreError::constraint(format!(
                "amount {} is below the minimum withdrawal of {minimum}",
                request.amount
            )));
        }
        if request.amount > user.total_points {
            return Err(StoreError::constraint(format!(
                "amount {} exceeds the user's {} points",
                request.amount, user.total_points
            )));
        }

        let id = Uuid::new_v4().to_string();
        let row = withdrawal::ActiveModel {
            id: Set(id.clone()),
            user_id: Set(request.user_id.clone()),
            amount: Set(request.amount),
            exchange_rate: Set(rate),
            status: Set(WithdrawalStatus::Pending.as_str().to_string()),
            tx_hash: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        withdrawal::Entity::insert(row).exec(&txn).await?;

        let remaining = user.total_points - request.amount;
        let mut active = user.into_active_model();
        active.total_points = Set(remaining);
        active.last_active = Set(now);
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;

        self.record_audit(
            actor,
            "request_withdrawal",
            "withdrawal",
            &id,
            Some(json!({ "user_id": request.user_id, "amount": request.amount })),
        )
        .await;

        let stored = withdrawal::Entity::find_by_id(&id)
            .one(connection)
            .await?
            .ok_or_else(|| StoreError::constraint("booked withdrawal vanished"))?;
        withdrawal_view(stored)
    }

    /// Requests matching the filter, newest first.
    pub async fn list_withdrawals(
        &self,
        filter: &WithdrawalFilter,
        page: &Page,
    ) -> Result<Vec<WithdrawalView>, StoreError> {
        let connection = self.db()?;
        let (limit, offset) = page.resolve(DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

        let mut select = withdrawal::Entity::find();
        if let Some(user_id) = &filter.user_id {
            select = select.filter(withdrawal::Column::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            select = select.filter(withdrawal::Column::Status.eq(status.as_str()));
        }

        select
            .order_by_desc(withdrawal::Column::CreatedAt)
            .order_by_desc(withdrawal::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(connection)
            .await?
            .into_iter()
            .map(withdrawal_view)
            .collect()
    }

    pub async fn withdrawal_by_id(&self, id: &str) -> Result<Option<WithdrawalView>, StoreError> {
        let connection = self.db()?;
        match withdrawal::Entity::find_by_id(id).one(connection).await? {
            Some(row) => Ok(Some(withdrawal_view(row)?)),
            None => Ok(None),
        }
    }

    /// Moves a pending request to its terminal state. Amount and rate are
    /// immutable; failed withdrawals do not refund points (points only move
    /// through task completion and withdrawal requests).
    pub async fn resolve_withdrawal(
        &self,
        actor: &str,
        id: &str,
        resolution: &WithdrawalResolution,
    ) -> Result<bool, StoreError> {
        if resolution.status == WithdrawalStatus::Pending {
            return Err(StoreError::constraint(
                "a withdrawal resolves to completed or failed",
            ));
        }
        let connection = self.db()?;

        let Some(current) = withdrawal::Entity::find_by_id(id).one(connection).await? else {
            return Ok(false);
        };
        if current.status != WithdrawalStatus::Pending.as_str() {
            return Err(StoreError::constraint(format!(
                "withdrawal {id} is already {}",
                current.status
            )));
        }

        let mut active = current.into_active_model();
        active.status = Set(resolution.status.as_str().to_string());
        if let Some(tx_hash) = &resolution.tx_hash {
            active.tx_hash = Set(Some(tx_hash.clone()));
        }
        active.updated_at = Set(Utc::now());
        active.update(connection).await?;

        self.record_audit(
            actor,
            "resolve_withdrawal",
            "withdrawal",
            id,
            Some(json!({
                "status": resolution.status.as_str(),
                "tx_hash": resolution.tx_hash,
            })),
        )
        .await;
        Ok(true)
    }

    pub async fn delete_withdrawal(&self, actor: &str, id: &str) -> Result<bool, StoreError> {
        let connection = self.db()?;
        let result = withdrawal::Entity::delete_by_id(id).exec(connection).await?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        self.record_audit(actor, "delete_withdrawal", "withdrawal", id, None)
            .await;
        Ok(true)
    }
}

fn withdrawal_view(row: withdrawal::Model) -> Result<WithdrawalView, StoreError> {
    let status = WithdrawalStatus::parse(&row.status).ok_or_else(|| {
        StoreError::constraint(format!("stored status {} is not recognized", row.status))
    })?;
    Ok(WithdrawalView {
        usdc_amount: usdc_value(row.amount, row.exchange_rate),
        id: row.id,
        user_id: row.user_id,
        amount: row.amount,
        exchange_rate: row.exchange_rate,
        status,
        tx_hash: row.tx_hash,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PlatformStore;
    use crate::store::test_support::memory_store;
    use crate::store::tests_fixtures::{sample_airdrop, sample_user};

    async fn store_with_credited_user(points_minimum: &str) -> PlatformStore {
        let store = memory_store().await;
        store
            .put_setting("ops", "min_withdrawal", points_minimum)
            .await
            .unwrap();
        store.upsert_airdrop("ops", &sample_airdrop("a1")).await.unwrap();
        store.upsert_user("ops", &sample_user("u1")).await.unwrap();
        store.complete_task("u1", "u1", "a1", "t1").await.unwrap();
        store
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_mutation() {
        let store = store_with_credited_user("10").await;

        let err = store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 100,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let view = store.user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(view.total_points, 50, "rejection must not touch points");
        let pending = store
            .list_withdrawals(&WithdrawalFilter::default(), &Page::default())
            .await
            .unwrap();
        assert!(pending.is_empty(), "no withdrawal row was booked");
    }

    #[tokio::test]
    async fn exact_balance_withdrawal_books_pending() {
        let store = store_with_credited_user("10").await;

        let view = store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 50,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.status, WithdrawalStatus::Pending);
        assert_eq!(view.amount, 50);
        assert_eq!(view.exchange_rate, 100);
        assert_eq!(view.usdc_amount, 0.5);

        let user = store.user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.total_points, 0, "amount debited atomically");
    }

    #[tokio::test]
    async fn minimum_is_enforced_from_settings() {
        let store = store_with_credited_user("100").await;
        let err = store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 50,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
        assert!(err.to_string().contains("minimum"));
    }

    #[tokio::test]
    async fn unknown_user_rejected() {
        let store = memory_store().await;
        let err = store
            .request_withdrawal(
                "ghost",
                &WithdrawalRequest {
                    user_id: "ghost".to_string(),
                    amount: 500,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn resolution_transitions_are_terminal() {
        let store = store_with_credited_user("10").await;
        let booked = store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 50,
                },
            )
            .await
            .unwrap();

        let err = store
            .resolve_withdrawal(
                "ops",
                &booked.id,
                &WithdrawalResolution {
                    status: WithdrawalStatus::Pending,
                    tx_hash: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let matched = store
            .resolve_withdrawal(
                "ops",
                &booked.id,
                &WithdrawalResolution {
                    status: WithdrawalStatus::Completed,
                    tx_hash: Some("0xdead".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(matched);

        let view = store.withdrawal_by_id(&booked.id).await.unwrap().unwrap();
        assert_eq!(view.status, WithdrawalStatus::Completed);
        assert_eq!(view.tx_hash.as_deref(), Some("0xdead"));
        assert_eq!(view.amount, 50, "amount never mutates");

        let err = store
            .resolve_withdrawal(
                "ops",
                &booked.id,
                &WithdrawalResolution {
                    status: WithdrawalStatus::Failed,
                    tx_hash: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let matched = store
            .resolve_withdrawal(
                "ops",
                "missing",
                &WithdrawalResolution {
                    status: WithdrawalStatus::Failed,
                    tx_hash: None,
                },
            )
            .await
            .unwrap();
        assert!(!matched);
    }

    #[tokio::test]
    async fn failed_resolution_does_not_refund() {
        let store = store_with_credited_user("10").await;
        let booked = store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 30,
                },
            )
            .await
            .unwrap();

        store
            .resolve_withdrawal(
                "ops",
                &booked.id,
                &WithdrawalResolution {
                    status: WithdrawalStatus::Failed,
                    tx_hash: None,
                },
            )
            .await
            .unwrap();

        let user = store.user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.total_points, 20, "no refund on failure");
    }

    #[tokio::test]
    async fn list_filters_by_user_and_status() {
        let store = store_with_credited_user("1").await;
        let first = store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 20,
                },
            )
            .await
            .unwrap();
        store
            .request_withdrawal(
                "u1",
                &WithdrawalRequest {
                    user_id: "u1".to_string(),
                    amount: 10,
                },
            )
            .await
            .unwrap();
        store
            .resolve_withdrawal(
                "ops",
                &first.id,
                &WithdrawalResolution {
                    status: WithdrawalStatus::Completed,
                    tx_hash: None,
                },
            )
            .await
            .unwrap();

        let all = store
            .list_withdrawals(
                &WithdrawalFilter {
                    user_id: Some("u1".to_string()),
                    ..Default::default()
                },
                &Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let pending = store
            .list_withdrawals(
                &WithdrawalFilter {
                    status: Some(WithdrawalStatus::Pending),
                    ..Default::default()
                },
                &Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].amount, 10);

        assert!(store.delete_withdrawal("ops", &first.id).await.unwrap());
        assert!(!store.delete_withdrawal("ops", &first.id).await.unwrap());
    }
}
