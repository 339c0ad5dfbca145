//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use pulse_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by bearer token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all users with the given IDs. Unknown IDs are skipped.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List users other than `user_id`, ordered by name.
    pub async fn list_except(&self, user_id: &str, limit: u64) -> AppResult<Vec<user::Model>> {
        User::find()
            .filter(user::Column::Id.ne(user_id))
            .order_by_asc(user::Column::Name)
            .order_by_asc(user::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_user(id: &str, name: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.map(str::to_string),
            token: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_token_found() {
        let user = create_test_user("u1", Some("Alice Smith"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_token("tok-u1").await.unwrap();

        assert_eq!(result, Some(user));
    }

    #[tokio::test]
    async fn test_find_by_token_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_token("nope").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        // No query results appended: any query would fail.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_list_except() {
        let u2 = create_test_user("u2", Some("Bob"));
        let u3 = create_test_user("u3", None);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[u2, u3]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.list_except("u1", 100).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|u| u.id != "u1"));
    }
}
