//! Airdrop campaign entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "airdrops")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_type = "String(StringLen::N(500))")]
    pub title: String,
    pub description: String,
    /// Short emoji or icon reference rendered by the front end
    #[sea_orm(column_type = "String(StringLen::N(16))")]
    pub logo: String,
    /// Per-participant reward, display string (e.g. "500 TOKEN")
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub reward: String,
    /// Campaign-wide reward pool, display string
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub total_reward: String,
    pub participants: i32,
    pub max_participants: i32,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    /// One of "upcoming", "active", "completed"
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub status: String,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub category: String,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub blockchain: String,
    /// JSON array of display strings, validated on read
    pub requirements: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::airdrop_task::Entity")]
    AirdropTask,
}

impl Related<super::airdrop_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AirdropTask.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
