use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only audit trail. Rows are never updated or deleted.
        manager
            .create_table(
                Table::create()
                    .table(AdminLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AdminLogs::ActorId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdminLogs::Action).string_len(255).not_null())
                    .col(
                        ColumnDef::new(AdminLogs::TargetType)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdminLogs::TargetId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdminLogs::Details).json().null())
                    .col(
                        ColumnDef::new(AdminLogs::CreatedAt)
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
                    .name("idx_admin_logs_actor")
                    .table(AdminLogs::Table)
                    .col(AdminLogs::ActorId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_admin_logs_action")
                    .table(AdminLogs::Table)
                    .col(AdminLogs::Action)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_admin_logs_created")
                    .table(AdminLogs::Table)
                    .col(AdminLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdminLogs {
    Table,
    Id,
    ActorId,
    Action,
    TargetType,
    TargetId,
    Details,
    CreatedAt,
}
