//! Database integration tests.
//!
//! These run the real migrations against an in-memory SQLite database and
//! check the constraints the services rely on.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use pulse_common::AppError;
use pulse_db::{
    conflict_aware,
    entities::{FollowEdge, FollowStatus, ReactionKind, TargetType, follow_edge, reaction, user},
    migrate,
    migrations::Migrator,
};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Set,
};
use sea_orm_migration::MigratorTrait;

async fn connect() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    migrate(&db).await.unwrap();
    db
}

async fn insert_user(db: &DatabaseConnection, id: &str) -> user::Model {
    user::ActiveModel {
        id: Set(id.to_string()),
        name: Set(None),
        token: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .unwrap()
}

fn edge(id: &str, follower: &str, following: &str) -> follow_edge::ActiveModel {
    follow_edge::ActiveModel {
        id: Set(id.to_string()),
        follower_id: Set(follower.to_string()),
        following_id: Set(following.to_string()),
        status: Set(FollowStatus::Pending),
        created_at: Set(Utc::now().into()),
    }
}

fn praise(id: &str, user_id: &str, target_id: &str) -> reaction::ActiveModel {
    reaction::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        target_id: Set(target_id.to_string()),
        target_type: Set(TargetType::Workout),
        kind: Set(ReactionKind::Praise),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
async fn test_migrations_apply_once() {
    let db = connect().await;

    // Second run is a no-op
    migrate(&db).await.unwrap();

    let pending = Migrator::get_pending_migrations(&db).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_follow_edge_pair_is_unique() {
    let db = connect().await;
    insert_user(&db, "alice").await;
    insert_user(&db, "bob").await;

    edge("e1", "alice", "bob").insert(&db).await.unwrap();
    let err = edge("e2", "alice", "bob").insert(&db).await.unwrap_err();
    assert!(matches!(conflict_aware(err), AppError::Conflict(_)));

    // The reverse direction is a different pair
    edge("e3", "bob", "alice").insert(&db).await.unwrap();
    assert_eq!(FollowEdge::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_reaction_key_is_unique() {
    let db = connect().await;
    insert_user(&db, "alice").await;

    praise("r1", "alice", "w1").insert(&db).await.unwrap();
    let err = praise("r2", "alice", "w1").insert(&db).await.unwrap_err();

    assert!(matches!(conflict_aware(err), AppError::Conflict(_)));
}

#[tokio::test]
async fn test_down_then_up_restores_schema() {
    let db = connect().await;

    Migrator::down(&db, None).await.unwrap();
    assert_eq!(Migrator::get_pending_migrations(&db).await.unwrap().len(), 5);

    Migrator::up(&db, None).await.unwrap();
    insert_user(&db, "alice").await;
    insert_user(&db, "bob").await;
    edge("e1", "alice", "bob").insert(&db).await.unwrap();
    assert_eq!(FollowEdge::find().count(&db).await.unwrap(), 1);
}
