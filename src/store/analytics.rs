//! Platform-wide aggregates.
//!
//! Computed with COUNT/SUM directly against the engine on every call and
//! never cached: a snapshot must reflect all mutations that committed
//! before it.

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};

use crate::entities::{airdrop, user, withdrawal};
use crate::models::admin::AnalyticsSnapshot;
use crate::models::airdrop::AirdropStatus;
use crate::models::withdrawal::WithdrawalStatus;

use super::{PlatformStore, StoreError};

impl PlatformStore {
    pub async fn analytics(&self) -> Result<AnalyticsSnapshot, StoreError> {
        let connection = self.db()?;

        let total_airdrops = airdrop::Entity::find().count(connection).await?;
        let active_airdrops = airdrop::Entity::find()
            .filter(airdrop::Column::Status.eq(AirdropStatus::Active.as_str()))
            .count(connection)
            .await?;
        let total_users = user::Entity::find().count(connection).await?;
        let connected_users = user::Entity::find()
            .filter(user::Column::IsConnected.eq(true))
            .count(connection)
            .await?;
        let total_points = user::Entity::find()
            .select_only()
            .column_as(user::Column::TotalPoints.sum(), "total_points")
            .into_tuple::<Option<i64>>()
            .one(connection)
            .await?
            .flatten()
            .unwrap_or(0);
        let total_withdrawals = withdrawal::Entity::find().count(connection).await?;
        let pending_withdrawals = withdrawal::Entity::find()
            .filter(withdrawal::Column::Status.eq(WithdrawalStatus::Pending.as_str()))
            .count(connection)
            .await?;

        let rate = self.exchange_rate().await?;
        let total_rewards_distributed_usd =
            (total_points as f64 / rate as f64 * 100.0).round() / 100.0;

        Ok(AnalyticsSnapshot {
            total_airdrops,
            active_airdrops,
            total_users,
            connected_users,
            total_points,
            total_withdrawals,
            pending_withdrawals,
            total_rewards_distributed_usd,
        })
    }
}
