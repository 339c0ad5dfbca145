//! Follow edge repository.

use std::sync::Arc;

use crate::conflict_aware;
use crate::entities::{FollowEdge, FollowStatus, follow_edge};
use chrono::Utc;
use pulse_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

/// Follow edge repository for database operations.
#[derive(Clone)]
pub struct FollowEdgeRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowEdgeRepository {
    /// Create a new follow edge repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an edge by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<follow_edge::Model>> {
        FollowEdge::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the edge for an ordered pair.
    pub async fn find_by_pair(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> AppResult<Option<follow_edge::Model>> {
        FollowEdge::find()
            .filter(follow_edge::Column::FollowerId.eq(follower_id))
            .filter(follow_edge::Column::FollowingId.eq(following_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new edge.
    ///
    /// A second edge for the same ordered pair fails with
    /// [`AppError::Conflict`].
    pub async fn create(&self, model: follow_edge::ActiveModel) -> AppResult<follow_edge::Model> {
        model.insert(self.db.as_ref()).await.map_err(conflict_aware)
    }

    /// Accept a pending edge and make the relationship mutual.
    ///
    /// Flips `edge` to accepted (only if it is still pending) and upserts the
    /// reciprocal edge as accepted, in one transaction. Returns `false`
    /// without writing anything when the edge was no longer pending.
    pub async fn accept_mutual(
        &self,
        edge: &follow_edge::Model,
        reciprocal_id: String,
    ) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let flipped = FollowEdge::update_many()
            .col_expr(
                follow_edge::Column::Status,
                Expr::value(FollowStatus::Accepted),
            )
            .filter(follow_edge::Column::Id.eq(edge.id.as_str()))
            .filter(follow_edge::Column::Status.eq(FollowStatus::Pending))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if flipped.rows_affected == 0 {
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Ok(false);
        }

        let reciprocal = follow_edge::ActiveModel {
            id: Set(reciprocal_id),
            follower_id: Set(edge.following_id.clone()),
            following_id: Set(edge.follower_id.clone()),
            status: Set(FollowStatus::Accepted),
            created_at: Set(Utc::now().into()),
        };

        let upserted = FollowEdge::insert(reciprocal)
            .on_conflict(
                OnConflict::columns([
                    follow_edge::Column::FollowerId,
                    follow_edge::Column::FollowingId,
                ])
                .update_column(follow_edge::Column::Status)
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await;

        if let Err(e) = upserted {
            // The flip above must not land without the reciprocal edge.
            txn.rollback()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            return Err(AppError::Database(e.to_string()));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    /// Delete an edge by ID. Returns the number of rows removed.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        FollowEdge::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an edge only while it is still pending.
    pub async fn delete_pending(&self, id: &str) -> AppResult<u64> {
        FollowEdge::delete_many()
            .filter(follow_edge::Column::Id.eq(id))
            .filter(follow_edge::Column::Status.eq(FollowStatus::Pending))
            .exec(self.db.as_ref())
            .await
            .map(|res| res.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accepted edges where `user_id` is the follower.
    pub async fn find_accepted_following(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<follow_edge::Model>> {
        FollowEdge::find()
            .filter(follow_edge::Column::FollowerId.eq(user_id))
            .filter(follow_edge::Column::Status.eq(FollowStatus::Accepted))
            .order_by_desc(follow_edge::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending edges addressed to `user_id`, newest first.
    pub async fn find_pending_inbound(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<follow_edge::Model>> {
        FollowEdge::find()
            .filter(follow_edge::Column::FollowingId.eq(user_id))
            .filter(follow_edge::Column::Status.eq(FollowStatus::Pending))
            .order_by_desc(follow_edge::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count pending edges addressed to `user_id`.
    pub async fn count_pending_inbound(&self, user_id: &str) -> AppResult<u64> {
        FollowEdge::find()
            .filter(follow_edge::Column::FollowingId.eq(user_id))
            .filter(follow_edge::Column::Status.eq(FollowStatus::Pending))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All edges where `user_id` is the follower, in any status.
    pub async fn find_outbound(&self, user_id: &str) -> AppResult<Vec<follow_edge::Model>> {
        FollowEdge::find()
            .filter(follow_edge::Column::FollowerId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestDatabase;
    use sea_orm::{ConnectionTrait, DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_edge(
        id: &str,
        follower_id: &str,
        following_id: &str,
        status: FollowStatus,
    ) -> follow_edge::Model {
        follow_edge::Model {
            id: id.to_string(),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            status,
            created_at: Utc::now().into(),
        }
    }

    fn new_edge(id: &str, follower_id: &str, following_id: &str) -> follow_edge::ActiveModel {
        follow_edge::ActiveModel {
            id: Set(id.to_string()),
            follower_id: Set(follower_id.to_string()),
            following_id: Set(following_id.to_string()),
            status: Set(FollowStatus::Pending),
            created_at: Set(Utc::now().into()),
        }
    }

    #[tokio::test]
    async fn test_find_by_pair_found() {
        let edge = create_test_edge("e1", "user1", "user2", FollowStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[edge.clone()]])
                .into_connection(),
        );

        let repo = FollowEdgeRepository::new(db);
        let result = repo.find_by_pair("user1", "user2").await.unwrap();

        assert_eq!(result, Some(edge));
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follow_edge::Model>::new()])
                .into_connection(),
        );

        let repo = FollowEdgeRepository::new(db);
        let result = repo.find_by_id("missing").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_pending_reports_rows() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = FollowEdgeRepository::new(db);
        let removed = repo.delete_pending("e1").await.unwrap();

        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_find_pending_inbound() {
        let e1 = create_test_edge("e1", "user2", "user1", FollowStatus::Pending);
        let e2 = create_test_edge("e2", "user3", "user1", FollowStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[e1, e2]])
                .into_connection(),
        );

        let repo = FollowEdgeRepository::new(db);
        let result = repo.find_pending_inbound("user1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(follow_edge::Model::is_pending));
    }

    #[tokio::test]
    async fn test_accept_mutual_not_pending_writes_nothing() {
        let edge = create_test_edge("e1", "user1", "user2", FollowStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = FollowEdgeRepository::new(db);
        let accepted = repo.accept_mutual(&edge, "e2".to_string()).await.unwrap();

        assert!(!accepted);
    }

    #[tokio::test]
    async fn test_create_duplicate_pair_is_conflict() {
        let db = TestDatabase::sqlite().await.unwrap();
        db.seed_user("user1", None).await.unwrap();
        db.seed_user("user2", None).await.unwrap();

        let repo = FollowEdgeRepository::new(db.connection());
        repo.create(new_edge("e1", "user1", "user2")).await.unwrap();

        let err = repo.create(new_edge("e2", "user1", "user2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_mutual_upserts_reciprocal() {
        let db = TestDatabase::sqlite().await.unwrap();
        db.seed_user("user1", None).await.unwrap();
        db.seed_user("user2", None).await.unwrap();

        let repo = FollowEdgeRepository::new(db.connection());
        let edge = repo.create(new_edge("e1", "user1", "user2")).await.unwrap();
        // A stale pending request in the other direction gets promoted.
        repo.create(new_edge("e0", "user2", "user1")).await.unwrap();

        assert!(repo.accept_mutual(&edge, "e2".to_string()).await.unwrap());

        let forward = repo.find_by_pair("user1", "user2").await.unwrap().unwrap();
        let reverse = repo.find_by_pair("user2", "user1").await.unwrap().unwrap();
        assert_eq!(forward.status, FollowStatus::Accepted);
        assert_eq!(reverse.status, FollowStatus::Accepted);
        assert_eq!(reverse.id, "e0");

        // Second accept finds nothing pending.
        assert!(!repo.accept_mutual(&edge, "e3".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_accept_mutual_failed_reciprocal_keeps_request_pending() {
        let db = TestDatabase::sqlite().await.unwrap();
        db.seed_user("user1", None).await.unwrap();
        db.seed_user("user2", None).await.unwrap();

        let repo = FollowEdgeRepository::new(db.connection());
        let edge = repo.create(new_edge("e1", "user1", "user2")).await.unwrap();
        db.conn
            .execute_unprepared(
                "CREATE TRIGGER reject_reciprocal BEFORE INSERT ON follow_edge \
                 WHEN NEW.follower_id = 'user2' \
                 BEGIN SELECT RAISE(ABORT, 'reciprocal rejected'); END",
            )
            .await
            .unwrap();

        let err = repo.accept_mutual(&edge, "e2".to_string()).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        let forward = repo.find_by_pair("user1", "user2").await.unwrap().unwrap();
        assert_eq!(forward.status, FollowStatus::Pending);
        assert!(repo.find_by_pair("user2", "user1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_pending_inbound() {
        let db = TestDatabase::sqlite().await.unwrap();
        db.seed_user("user1", None).await.unwrap();
        db.seed_user("user2", None).await.unwrap();
        db.seed_user("user3", None).await.unwrap();

        let repo = FollowEdgeRepository::new(db.connection());
        repo.create(new_edge("e1", "user2", "user1")).await.unwrap();
        repo.create(new_edge("e2", "user3", "user1")).await.unwrap();
        repo.create(new_edge("e3", "user1", "user2")).await.unwrap();

        assert_eq!(repo.count_pending_inbound("user1").await.unwrap(), 2);
        assert_eq!(repo.count_pending_inbound("user2").await.unwrap(), 1);
        assert_eq!(repo.count_pending_inbound("user3").await.unwrap(), 0);
    }
}
