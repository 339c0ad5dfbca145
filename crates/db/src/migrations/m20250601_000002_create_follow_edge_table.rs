//! Create follow_edge table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FollowEdge::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FollowEdge::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FollowEdge::FollowerId).string_len(32).not_null())
                    .col(ColumnDef::new(FollowEdge::FollowingId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(FollowEdge::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(FollowEdge::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follow_edge_follower")
                            .from(FollowEdge::Table, FollowEdge::FollowerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follow_edge_following")
                            .from(FollowEdge::Table, FollowEdge::FollowingId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (follower_id, following_id) - at most one edge per ordered pair
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_edge_follower_following")
                    .table(FollowEdge::Table)
                    .col(FollowEdge::FollowerId)
                    .col(FollowEdge::FollowingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (following_id, status) - inbound pending requests and the badge count
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_edge_following_status")
                    .table(FollowEdge::Table)
                    .col(FollowEdge::FollowingId)
                    .col(FollowEdge::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FollowEdge::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FollowEdge {
    Table,
    Id,
    FollowerId,
    FollowingId,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
