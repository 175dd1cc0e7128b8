use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Credited task completion. The composite key makes re-completion of the
/// same (user, airdrop, task) triple a structural no-op. The airdrop id is
/// deliberately not a foreign key: deleting a campaign must not claw back
/// points already credited to users.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "task_completions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub airdrop_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub task_id: String,
    /// Point value captured at completion time
    pub points: i32,
    pub completed_at: DateTimeUtc,
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
