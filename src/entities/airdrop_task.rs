use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "airdrop_tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub airdrop_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub task_id: String,
    /// Index within the campaign's ordered task list
    pub position: i32,
    /// One of "telegram", "twitter", "discord", "website", "wallet"
    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub kind: String,
    #[sea_orm(column_type = "String(StringLen::N(500))")]
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub points: i32,
    pub required: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::airdrop::Entity",
        from = "Column::AirdropId",
        to = "super::airdrop::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Airdrop,
}

impl Related<super::airdrop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Airdrop.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
