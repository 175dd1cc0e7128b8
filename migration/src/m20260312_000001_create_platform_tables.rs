use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Airdrop campaigns. Status and category are free strings validated
        // at the store boundary; sqlite has no native enum type.
        manager
            .create_table(
                Table::create()
                    .table(Airdrops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Airdrops::Id)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Airdrops::Title).string_len(500).not_null())
                    .col(ColumnDef::new(Airdrops::Description).text().not_null())
                    .col(ColumnDef::new(Airdrops::Logo).string_len(16).not_null())
                    .col(ColumnDef::new(Airdrops::Reward).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Airdrops::TotalReward)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Airdrops::Participants)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Airdrops::MaxParticipants)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Airdrops::StartDate).timestamp().not_null())
                    .col(ColumnDef::new(Airdrops::EndDate).timestamp().not_null())
                    .col(
                        ColumnDef::new(Airdrops::Status)
                            .string_len(32)
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(
                        ColumnDef::new(Airdrops::Category)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Airdrops::Blockchain)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Airdrops::Requirements).json().not_null())
                    .col(
                        ColumnDef::new(Airdrops::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Airdrops::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_airdrops_status_created")
                    .table(Airdrops::Table)
                    .col(Airdrops::Status)
                    .col(Airdrops::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Tasks are an ordered child table rather than a JSON blob so that
        // points and kinds stay typed and queryable.
        manager
            .create_table(
                Table::create()
                    .table(AirdropTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AirdropTasks::AirdropId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AirdropTasks::TaskId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AirdropTasks::Position).integer().not_null())
                    .col(ColumnDef::new(AirdropTasks::Kind).string_len(32).not_null())
                    .col(
                        ColumnDef::new(AirdropTasks::Title)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AirdropTasks::Description).text().not_null())
                    .col(ColumnDef::new(AirdropTasks::Url).string_len(2048).null())
                    .col(ColumnDef::new(AirdropTasks::Points).integer().not_null())
                    .col(ColumnDef::new(AirdropTasks::Required).boolean().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_airdrop_tasks")
                            .col(AirdropTasks::AirdropId)
                            .col(AirdropTasks::TaskId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_airdrop_tasks_airdrop")
                            .from(AirdropTasks::Table, AirdropTasks::AirdropId)
                            .to(Airdrops::Table, Airdrops::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_airdrop_tasks_position")
                    .table(AirdropTasks::Table)
                    .col(AirdropTasks::AirdropId)
                    .col(AirdropTasks::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::WalletAddress).string_len(255).null())
                    .col(ColumnDef::new(Users::Telegram).string_len(100).null())
                    .col(ColumnDef::new(Users::Twitter).string_len(100).null())
                    .col(ColumnDef::new(Users::Discord).string_len(100).null())
                    .col(
                        ColumnDef::new(Users::TotalPoints)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::IsConnected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::Balance).string_len(50).null())
                    .col(ColumnDef::new(Users::JoinedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::LastActive).timestamp().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_wallet")
                    .table(Users::Table)
                    .col(Users::WalletAddress)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_points_active")
                    .table(Users::Table)
                    .col(Users::TotalPoints)
                    .col(Users::LastActive)
                    .to_owned(),
            )
            .await?;

        // One row per credited (user, airdrop, task) triple. The composite
        // primary key is what makes task re-completion a structural no-op.
        manager
            .create_table(
                Table::create()
                    .table(TaskCompletions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskCompletions::UserId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskCompletions::AirdropId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TaskCompletions::TaskId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaskCompletions::Points).integer().not_null())
                    .col(
                        ColumnDef::new(TaskCompletions::CompletedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_task_completions")
                            .col(TaskCompletions::UserId)
                            .col(TaskCompletions::AirdropId)
                            .col(TaskCompletions::TaskId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_completions_user")
                            .from(TaskCompletions::Table, TaskCompletions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_completions_airdrop")
                    .table(TaskCompletions::Table)
                    .col(TaskCompletions::AirdropId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Withdrawals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Withdrawals::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::UserId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Withdrawals::Amount).integer().not_null())
                    .col(
                        ColumnDef::new(Withdrawals::ExchangeRate)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Withdrawals::TxHash).string_len(255).null())
                    .col(
                        ColumnDef::new(Withdrawals::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Withdrawals::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawals_user")
                            .from(Withdrawals::Table, Withdrawals::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_withdrawals_user")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_withdrawals_status_created")
                    .table(Withdrawals::Table)
                    .col(Withdrawals::Status)
                    .col(Withdrawals::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Withdrawals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskCompletions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AirdropTasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Airdrops::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Airdrops {
    Table,
    Id,
    Title,
    Description,
    Logo,
    Reward,
    TotalReward,
    Participants,
    MaxParticipants,
    StartDate,
    EndDate,
    Status,
    Category,
    Blockchain,
    Requirements,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AirdropTasks {
    Table,
    AirdropId,
    TaskId,
    Position,
    Kind,
    Title,
    Description,
    Url,
    Points,
    Required,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    WalletAddress,
    Telegram,
    Twitter,
    Discord,
    TotalPoints,
    IsConnected,
    Balance,
    JoinedAt,
    LastActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TaskCompletions {
    Table,
    UserId,
    AirdropId,
    TaskId,
    Points,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Withdrawals {
    Table,
    Id,
    UserId,
    Amount,
    ExchangeRate,
    Status,
    TxHash,
    CreatedAt,
    UpdatedAt,
}
