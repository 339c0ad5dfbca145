//! Create reaction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reaction::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reaction::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Reaction::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Reaction::TargetId).string_len(32).not_null())
                    .col(ColumnDef::new(Reaction::TargetType).string_len(16).not_null())
                    .col(ColumnDef::new(Reaction::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Reaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reaction_user")
                            .from(Reaction::Table, Reaction::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, target_id, target_type) - one reaction per user per target
        manager
            .create_index(
                Index::create()
                    .name("idx_reaction_user_target")
                    .table(Reaction::Table)
                    .col(Reaction::UserId)
                    .col(Reaction::TargetId)
                    .col(Reaction::TargetType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: target_id (for tallies)
        manager
            .create_index(
                Index::create()
                    .name("idx_reaction_target_id")
                    .table(Reaction::Table)
                    .col(Reaction::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Reaction {
    Table,
    Id,
    UserId,
    TargetId,
    TargetType,
    Kind,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
