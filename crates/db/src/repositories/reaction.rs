//! Reaction repository.

use std::sync::Arc;

use crate::entities::{Reaction, TargetType, reaction};
use pulse_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, sea_query::OnConflict,
};

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's reaction on one target.
    pub async fn find_by_key(
        &self,
        user_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::TargetId.eq(target_id))
            .filter(reaction::Column::TargetType.eq(target_type))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a reaction, replacing the kind of an existing one for the same
    /// `(user_id, target_id, target_type)`.
    pub async fn upsert(&self, model: reaction::ActiveModel) -> AppResult<()> {
        Reaction::insert(model)
            .on_conflict(
                OnConflict::columns([
                    reaction::Column::UserId,
                    reaction::Column::TargetId,
                    reaction::Column::TargetType,
                ])
                .update_columns([reaction::Column::Kind, reaction::Column::CreatedAt])
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a user's reaction on one target. Returns the number of rows removed.
    pub async fn delete_by_key(
        &self,
        user_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> AppResult<u64> {
        Reaction::delete_many()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::TargetId.eq(target_id))
            .filter(reaction::Column::TargetType.eq(target_type))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All reactions on any of `target_ids` of one target type.
    pub async fn find_by_targets(
        &self,
        target_type: TargetType,
        target_ids: &[String],
    ) -> AppResult<Vec<reaction::Model>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        Reaction::find()
            .filter(reaction::Column::TargetType.eq(target_type))
            .filter(reaction::Column::TargetId.is_in(target_ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A user's own reactions on any of `target_ids` of one target type.
    pub async fn find_by_user_and_targets(
        &self,
        user_id: &str,
        target_type: TargetType,
        target_ids: &[String],
    ) -> AppResult<Vec<reaction::Model>> {
        if target_ids.is_empty() {
            return Ok(vec![]);
        }

        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::TargetType.eq(target_type))
            .filter(reaction::Column::TargetId.is_in(target_ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
