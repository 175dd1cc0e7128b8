use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{Expr, Query};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Seeded platform parameters. Runtime configuration lives in this table
/// rather than the TOML file so operators can change it without a restart.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("points_to_usdc_rate", "100"),
    ("min_withdrawal", "100"),
    ("platform_fee", "0"),
    ("max_daily_withdrawals", "10"),
    ("maintenance_mode", "false"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .col(
                        ColumnDef::new(Settings::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        for (key, value) in DEFAULT_SETTINGS {
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(Settings::Table)
                        .columns([Settings::Key, Settings::Value])
                        .values_panic([(*key).into(), (*value).into()])
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
    UpdatedAt,
}
