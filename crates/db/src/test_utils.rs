//! Test utilities for database operations.
//!
//! Provides an in-memory SQLite database with the real migrations applied,
//! plus seed helpers for the rows the social layer only reads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{cardio_session, user, workout_session};
use crate::migrations::Migrator;

/// A migrated in-memory test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Open a fresh in-memory SQLite database and run all migrations.
    ///
    /// The pool is pinned to a single connection so every query sees the
    /// same in-memory database.
    pub async fn sqlite() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Shared handle to the connection, as repositories expect it.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Insert a user.
    pub async fn seed_user(&self, id: &str, name: Option<&str>) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.map(str::to_string)),
            token: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a user that can authenticate with `token`.
    pub async fn seed_user_with_token(
        &self,
        id: &str,
        name: Option<&str>,
        token: &str,
    ) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.map(str::to_string)),
            token: Set(Some(token.to_string())),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a workout session.
    pub async fn seed_workout(
        &self,
        id: &str,
        user_id: &str,
        completed: bool,
        at: DateTime<Utc>,
    ) -> Result<workout_session::Model, DbErr> {
        workout_session::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            duration_minutes: Set(45),
            total_load_kg: Set(3200.0),
            completed: Set(completed),
            created_at: Set(at.into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a cardio session.
    pub async fn seed_cardio(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<cardio_session::Model, DbErr> {
        cardio_session::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            cardio_type: Set("running".to_string()),
            duration_minutes: Set(30),
            distance_km: Set(Some(5.0)),
            calories_burned: Set(Some(320)),
            created_at: Set(at.into()),
        }
        .insert(self.conn.as_ref())
        .await
    }
}
