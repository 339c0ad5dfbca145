//! Activity repository (read-only access to workout and cardio sessions).

use std::sync::Arc;

use crate::entities::{CardioSession, WorkoutSession, cardio_session, workout_session};
use pulse_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Activity repository for database operations.
#[derive(Clone)]
pub struct ActivityRepository {
    db: Arc<DatabaseConnection>,
}

impl ActivityRepository {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Most recent completed workouts of any of `user_ids`, newest first.
    ///
    /// `limit` caps the whole result, not each user.
    pub async fn find_recent_workouts(
        &self,
        user_ids: &[String],
        limit: u64,
    ) -> AppResult<Vec<workout_session::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        WorkoutSession::find()
            .filter(workout_session::Column::UserId.is_in(user_ids.iter().map(String::as_str)))
            .filter(workout_session::Column::Completed.eq(true))
            .order_by_desc(workout_session::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent cardio sessions of any of `user_ids`, newest first.
    pub async fn find_recent_cardio(
        &self,
        user_ids: &[String],
        limit: u64,
    ) -> AppResult<Vec<cardio_session::Model>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        CardioSession::find()
            .filter(cardio_session::Column::UserId.is_in(user_ids.iter().map(String::as_str)))
            .order_by_desc(cardio_session::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
