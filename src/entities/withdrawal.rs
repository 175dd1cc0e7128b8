//! Withdrawal request entity.
//!
//! Amount and exchange rate are immutable after creation; the USDC value is
//! derived at presentation time and never stored as a float.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "String(StringLen::N(64))")]
    pub id: String,
    pub user_id: String,
    /// Points debited from the user at request time
    pub amount: i32,
    /// Points-per-USDC snapshot taken when the request was created
    pub exchange_rate: i32,
    /// One of "pending", "completed", "failed"
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub status: String,
    pub tx_hash: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
