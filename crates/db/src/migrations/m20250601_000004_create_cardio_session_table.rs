//! Create cardio_session table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CardioSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CardioSession::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CardioSession::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(CardioSession::CardioType).string_len(64).not_null())
                    .col(
                        ColumnDef::new(CardioSession::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CardioSession::DistanceKm).double())
                    .col(ColumnDef::new(CardioSession::CaloriesBurned).integer())
                    .col(
                        ColumnDef::new(CardioSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cardio_session_user")
                            .from(CardioSession::Table, CardioSession::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cardio_session_user_created_at")
                    .table(CardioSession::Table)
                    .col(CardioSession::UserId)
                    .col(CardioSession::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CardioSession::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CardioSession {
    Table,
    Id,
    UserId,
    CardioType,
    DurationMinutes,
    DistanceKm,
    CaloriesBurned,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
