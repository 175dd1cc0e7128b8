//! User repository: admin edits, wallet connection events and task credits.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde_json::json;

use crate::entities::{airdrop_task, task_completion, user, withdrawal};
use crate::models::Page;
use crate::models::user::{CompletedTaskMap, UserFilter, UserInput, UserPatch, UserView, WalletConnection};

use super::{PlatformStore, StoreError};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

impl PlatformStore {
    /// Inserts or replaces a user's scalar fields. Credited completions are
    /// owned by `complete_task` and survive a replace; join time survives
    /// as well.
    pub async fn upsert_user(&self, actor: &str, input: &UserInput) -> Result<(), StoreError> {
        if input.id.trim().is_empty() {
            return Err(StoreError::constraint("user id must not be empty"));
        }
        if input.total_points < 0 {
            return Err(StoreError::constraint("total points must be non-negative"));
        }
        let connection = self.db()?;
        let now = Utc::now();

        let model = user::ActiveModel {
            id: Set(input.id.clone()),
            wallet_address: Set(input.wallet_address.clone()),
            telegram: Set(input.telegram.clone()),
            twitter: Set(input.twitter.clone()),
            discord: Set(input.discord.clone()),
            total_points: Set(input.total_points),
            is_connected: Set(input.is_connected),
            balance: Set(input.balance.clone()),
            joined_at: Set(now),
            last_active: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user::Entity::insert(model)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::WalletAddress,
                        user::Column::Telegram,
                        user::Column::Twitter,
                        user::Column::Discord,
                        user::Column::TotalPoints,
                        user::Column::IsConnected,
                        user::Column::Balance,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(connection)
            .await?;

        self.record_audit(
            actor,
            "upsert_user",
            "user",
            &input.id,
            Some(json!({ "total_points": input.total_points })),
        )
        .await;
        Ok(())
    }

    /// Users matching the filter, leaderboard order: points descending,
    /// then most recently active.
    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: &Page,
    ) -> Result<Vec<UserView>, StoreError> {
        let connection = self.db()?;
        let (limit, offset) = page.resolve(DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);

        let mut select = user::Entity::find();
        if let Some(connected) = filter.connected {
            select = select.filter(user::Column::IsConnected.eq(connected));
        }
        if let Some(min_points) = filter.min_points {
            select = select.filter(user::Column::TotalPoints.gte(min_points));
        }

        let rows = select
            .order_by_desc(user::Column::TotalPoints)
            .order_by_desc(user::Column::LastActive)
            .limit(limit)
            .offset(offset)
            .all(connection)
            .await?;

        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        let mut completed = completions_for(connection, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let map = completed.remove(&row.id).unwrap_or_default();
                user_view(row, map)
            })
            .collect())
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<UserView>, StoreError> {
        let connection = self.db()?;
        let Some(row) = user::Entity::find_by_id(id).one(connection).await? else {
            return Ok(None);
        };
        let mut completed = completions_for(connection, std::slice::from_ref(&row.id)).await?;
        let map = completed.remove(&row.id).unwrap_or_default();
        Ok(Some(user_view(row, map)))
    }

    /// Applies a partial update. Returns whether a user matched.
    pub async fn update_user(
        &self,
        actor: &str,
        id: &str,
        patch: &UserPatch,
    ) -> Result<bool, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::constraint("patch contains no fields"));
        }
        if let Some(points) = patch.total_points {
            if points < 0 {
                return Err(StoreError::constraint("total points must be non-negative"));
            }
        }
        let connection = self.db()?;

        let Some(current) = user::Entity::find_by_id(id).one(connection).await? else {
            return Ok(false);
        };

        let mut active = current.into_active_model();
        if let Some(wallet_address) = &patch.wallet_address {
            active.wallet_address = Set(Some(wallet_address.clone()));
        }
        if let Some(telegram) = &patch.telegram {
            active.telegram = Set(Some(telegram.clone()));
        }
        if let Some(twitter) = &patch.twitter {
            active.twitter = Set(Some(twitter.clone()));
        }
        if let Some(discord) = &patch.discord {
            active.discord = Set(Some(discord.clone()));
        }
        if let Some(total_points) = patch.total_points {
            active.total_points = Set(total_points);
        }
        if let Some(is_connected) = patch.is_connected {
            active.is_connected = Set(is_connected);
        }
        if let Some(balance) = &patch.balance {
            active.balance = Set(Some(balance.clone()));
        }
        active.updated_at = Set(Utc::now());
        active.update(connection).await?;

        let details = serde_json::to_value(patch).ok();
        self.record_audit(actor, "update_user", "user", id, details).await;
        Ok(true)
    }

    /// Removes a user along with their completions and withdrawals.
    pub async fn delete_user(&self, actor: &str, id: &str) -> Result<bool, StoreError> {
        let connection = self.db()?;
        let txn = connection.begin().await?;

        task_completion::Entity::delete_many()
            .filter(task_completion::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        withdrawal::Entity::delete_many()
            .filter(withdrawal::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        let result = user::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }
        self.record_audit(actor, "delete_user", "user", id, None).await;
        Ok(true)
    }

    /// Handles a connect event from the external wallet provider. The first
    /// connection creates the user, keyed by wallet address.
    pub async fn connect_wallet(
        &self,
        event: &WalletConnection,
    ) -> Result<UserView, StoreError> {
        if event.address.trim().is_empty() {
            return Err(StoreError::constraint("wallet address must not be empty"));
        }
        let connection = self.db()?;
        let now = Utc::now();

        let txn = connection.begin().await?;
        match user::Entity::find_by_id(&event.address).one(&txn).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.wallet_address = Set(Some(event.address.clone()));
                active.is_connected = Set(true);
                active.balance = Set(event.balance.clone());
                active.last_active = Set(now);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                let model = user::ActiveModel {
                    id: Set(event.address.clone()),
                    wallet_address: Set(Some(event.address.clone())),
                    telegram: Set(None),
                    twitter: Set(None),
                    discord: Set(None),
                    total_points: Set(0),
                    is_connected: Set(true),
                    balance: Set(event.balance.clone()),
                    joined_at: Set(now),
                    last_active: Set(now),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                user::Entity::insert(model).exec(&txn).await?;
            }
        }
        txn.commit().await?;

        self.record_audit(
            &event.address,
            "connect_wallet",
            "user",
            &event.address,
            Some(json!({ "chain_id": event.chain_id })),
        )
        .await;

        self.user_by_id(&event.address)
            .await?
            .ok_or_else(|| StoreError::constraint("connected user vanished"))
    }

    pub async fn disconnect_wallet(&self, address: &str) -> Result<bool, StoreError> {
        let connection = self.db()?;
        let Some(existing) = user::Entity::find_by_id(address).one(connection).await? else {
            return Ok(false);
        };

        let mut active = existing.into_active_model();
        active.is_connected = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(connection).await?;

        self.record_audit(address, "disconnect_wallet", "user", address, None)
            .await;
        Ok(true)
    }

    /// Credits a task's points to a user. Completing the same
    /// (user, airdrop, task) triple again is a no-op returning the
    /// unchanged total. Returns the user's total points after the call.
    pub async fn complete_task(
        &self,
        actor: &str,
        user_id: &str,
        airdrop_id: &str,
        task_id: &str,
    ) -> Result<i32, StoreError> {
        let connection = self.db()?;
        let now = Utc::now();

        let txn = connection.begin().await?;
        let user = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| StoreError::constraint(format!("unknown user {user_id}")))?;
        let task = airdrop_task::Entity::find_by_id((airdrop_id.to_string(), task_id.to_string()))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                StoreError::constraint(format!("unknown task {task_id} in airdrop {airdrop_id}"))
            })?;

        let already_credited = task_completion::Entity::find_by_id((
            user_id.to_string(),
            airdrop_id.to_string(),
            task_id.to_string(),
        ))
        .one(&txn)
        .await?
        .is_some();
        if already_credited {
            txn.rollback().await?;
            return Ok(user.total_points);
        }

        let completion = task_completion::ActiveModel {
            user_id: Set(user_id.to_string()),
            airdrop_id: Set(airdrop_id.to_string()),
            task_id: Set(task_id.to_string()),
            points: Set(task.points),
            completed_at: Set(now),
        };
        task_completion::Entity::insert(completion).exec(&txn).await?;

        let new_total = user.total_points + task.points;
        let mut active = user.into_active_model();
        active.total_points = Set(new_total);
        active.last_active = Set(now);
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;

        self.record_audit(
            actor,
            "complete_task",
            "user",
            user_id,
            Some(json!({
                "airdrop_id": airdrop_id,
                "task_id": task_id,
                "points": task.points,
            })),
        )
        .await;
        Ok(new_total)
    }
}

/// Loads the airdrop -> task-ids map for a batch of users in one query.
async fn completions_for<C: ConnectionTrait>(
    connection: &C,
    user_ids: &[String],
) -> Result<HashMap<String, CompletedTaskMap>, StoreError> {
    let mut result: HashMap<String, CompletedTaskMap> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(result);
    }
    let rows = task_completion::Entity::find()
        .filter(task_completion::Column::UserId.is_in(user_ids.iter().cloned()))
        .order_by_asc(task_completion::Column::CompletedAt)
        .order_by_asc(task_completion::Column::TaskId)
        .all(connection)
        .await?;
    for row in rows {
        result
            .entry(row.user_id)
            .or_default()
            .entry(row.airdrop_id)
            .or_default()
            .push(row.task_id);
    }
    Ok(result)
}

fn user_view(row: user::Model, completed_tasks: CompletedTaskMap) -> UserView {
    UserView {
        id: row.id,
        wallet_address: row.wallet_address,
        telegram: row.telegram,
        twitter: row.twitter,
        discord: row.discord,
        completed_tasks,
        total_points: row.total_points,
        is_connected: row.is_connected,
        balance: row.balance,
        joined_at: row.joined_at,
        last_active: row.last_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::memory_store;
    use crate::store::tests_fixtures::{sample_airdrop, sample_user};

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = memory_store().await;
        let mut input = sample_user("u1");
        input.telegram = Some("@u1".to_string());
        input.total_points = 10;
        store.upsert_user("ops", &input).await.unwrap();

        let view = store.user_by_id("u1").await.unwrap().expect("user exists");
        assert_eq!(view.id, "u1");
        assert_eq!(view.telegram.as_deref(), Some("@u1"));
        assert_eq!(view.total_points, 10);
        assert!(view.completed_tasks.is_empty());
        assert!(store.user_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn negative_points_rejected() {
        let store = memory_store().await;
        let mut input = sample_user("u1");
        input.total_points = -5;
        let err = store.upsert_user("ops", &input).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        store.upsert_user("ops", &sample_user("u1")).await.unwrap();
        let patch = UserPatch {
            total_points: Some(-1),
            ..Default::default()
        };
        let err = store.update_user("ops", "u1", &patch).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn leaderboard_ordering_and_filters() {
        let store = memory_store().await;
        let mut low = sample_user("low");
        low.total_points = 10;
        store.upsert_user("ops", &low).await.unwrap();
        let mut high = sample_user("high");
        high.total_points = 90;
        high.is_connected = true;
        store.upsert_user("ops", &high).await.unwrap();

        let all = store
            .list_users(&UserFilter::default(), &Page::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "high", "points descending");

        let connected = store
            .list_users(
                &UserFilter {
                    connected: Some(true),
                    ..Default::default()
                },
                &Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].id, "high");

        let big = store
            .list_users(
                &UserFilter {
                    min_points: Some(50),
                    ..Default::default()
                },
                &Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].id, "high");
    }

    #[tokio::test]
    async fn task_completion_credits_exactly_once() {
        let store = memory_store().await;
        store.upsert_airdrop("ops", &sample_airdrop("a1")).await.unwrap();
        store.upsert_user("ops", &sample_user("u1")).await.unwrap();

        let total = store.complete_task("u1", "u1", "a1", "t1").await.unwrap();
        assert_eq!(total, 50);

        // Re-completion is a no-op.
        let total = store.complete_task("u1", "u1", "a1", "t1").await.unwrap();
        assert_eq!(total, 50);
        let view = store.user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(view.total_points, 50);

        let total = store.complete_task("u1", "u1", "a1", "t2").await.unwrap();
        assert_eq!(total, 80);

        let view = store.user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(
            view.completed_tasks.get("a1").map(Vec::as_slice),
            Some(["t1".to_string(), "t2".to_string()].as_slice())
        );
    }

    #[tokio::test]
    async fn completion_requires_known_user_and_task() {
        let store = memory_store().await;
        store.upsert_airdrop("ops", &sample_airdrop("a1")).await.unwrap();
        store.upsert_user("ops", &sample_user("u1")).await.unwrap();

        let err = store
            .complete_task("u1", "ghost", "a1", "t1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let err = store
            .complete_task("u1", "u1", "a1", "t404")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));

        let view = store.user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(view.total_points, 0, "failed credits leave points alone");
    }

    #[tokio::test]
    async fn wallet_connect_creates_then_updates() {
        let store = memory_store().await;
        let event = WalletConnection {
            address: "0xabc".to_string(),
            balance: Some("1.5 ETH".to_string()),
            chain_id: Some(1),
        };

        let view = store.connect_wallet(&event).await.unwrap();
        assert_eq!(view.id, "0xabc");
        assert!(view.is_connected);
        assert_eq!(view.balance.as_deref(), Some("1.5 ETH"));

        let updated = WalletConnection {
            balance: Some("2.0 ETH".to_string()),
            ..event.clone()
        };
        let view = store.connect_wallet(&updated).await.unwrap();
        assert_eq!(view.balance.as_deref(), Some("2.0 ETH"));

        assert!(store.disconnect_wallet("0xabc").await.unwrap());
        let view = store.user_by_id("0xabc").await.unwrap().unwrap();
        assert!(!view.is_connected);
        assert!(!store.disconnect_wallet("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn delete_user_sweeps_owned_rows() {
        let store = memory_store().await;
        store.upsert_airdrop("ops", &sample_airdrop("a1")).await.unwrap();
        store.upsert_user("ops", &sample_user("u1")).await.unwrap();
        store.complete_task("u1", "u1", "a1", "t1").await.unwrap();

        assert!(store.delete_user("ops", "u1").await.unwrap());
        assert!(store.user_by_id("u1").await.unwrap().is_none());
        assert!(!store.delete_user("ops", "u1").await.unwrap());

        // The campaign is untouched.
        assert!(store.airdrop_by_id("a1").await.unwrap().is_some());
    }
}
