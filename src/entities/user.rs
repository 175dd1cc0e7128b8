//! Platform user entity, keyed by wallet address (or "guest").

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_address: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    pub telegram: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    pub twitter: Option<String>,
    #[sea_orm(column_type = "String(StringLen::N(100))", nullable)]
    pub discord: Option<String>,
    pub total_points: i32,
    pub is_connected: bool,
    /// Wallet balance as reported by the provider, display string
    #[sea_orm(column_type = "String(StringLen::N(50))", nullable)]
    pub balance: Option<String>,
    pub joined_at: DateTimeUtc,
    pub last_active: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::task_completion::Entity")]
    TaskCompletion,
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawal,
}

impl Related<super::task_completion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TaskCompletion.def()
    }
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
