//! Create workout_session table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WorkoutSession::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkoutSession::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WorkoutSession::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(WorkoutSession::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WorkoutSession::TotalLoadKg)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(WorkoutSession::Completed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WorkoutSession::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workout_session_user")
                            .from(WorkoutSession::Table, WorkoutSession::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, created_at) - recent sessions per user
        manager
            .create_index(
                Index::create()
                    .name("idx_workout_session_user_created_at")
                    .table(WorkoutSession::Table)
                    .col(WorkoutSession::UserId)
                    .col(WorkoutSession::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkoutSession::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WorkoutSession {
    Table,
    Id,
    UserId,
    DurationMinutes,
    TotalLoadKg,
    Completed,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
