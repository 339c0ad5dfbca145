//! Follow graph service.
//!
//! Per ordered pair of users the edge moves `NONE -> PENDING -> ACCEPTED`,
//! back to `NONE` through decline, cancel, or unfollow. Accepting a request
//! also makes the reverse edge accepted, so the relationship is mutual.

use std::collections::HashMap;

use crate::services::pending_counter::PendingRequestCounter;
use chrono::Utc;
use pulse_common::{AppError, AppResult, IdGenerator, validate_id};
use pulse_db::{
    entities::{FollowStatus, follow_edge},
    repositories::FollowEdgeRepository,
};
use sea_orm::Set;
use tracing::{debug, info, warn};

/// Follow graph service for business logic.
#[derive(Clone)]
pub struct FollowGraphService {
    edge_repo: FollowEdgeRepository,
    pending: PendingRequestCounter,
    id_gen: IdGenerator,
}

impl FollowGraphService {
    /// Create a new follow graph service.
    #[must_use]
    pub fn new(edge_repo: FollowEdgeRepository) -> Self {
        Self {
            pending: PendingRequestCounter::new(edge_repo.clone()),
            edge_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// The badge counter this service keeps up to date.
    #[must_use]
    pub const fn pending_counter(&self) -> &PendingRequestCounter {
        &self.pending
    }

    /// Ask to follow a user. Creates a pending edge.
    pub async fn request_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> AppResult<follow_edge::Model> {
        validate_id("followerId", follower_id)?;
        validate_id("followingId", following_id)?;

        if follower_id == following_id {
            return Err(AppError::SelfFollow);
        }

        if self
            .edge_repo
            .find_by_pair(follower_id, following_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Follow request already exists".to_string(),
            ));
        }

        let model = follow_edge::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            following_id: Set(following_id.to_string()),
            status: Set(FollowStatus::Pending),
            created_at: Set(Utc::now().into()),
        };

        // The unique (follower_id, following_id) index rejects a racing
        // duplicate with a Conflict as well.
        let edge = self.edge_repo.create(model).await?;

        info!(
            edge_id = %edge.id,
            follower_id = %follower_id,
            following_id = %following_id,
            "Follow requested"
        );

        self.refresh_after(following_id).await;

        Ok(edge)
    }

    /// Accept a pending request addressed to `caller_id`.
    ///
    /// The request and the reciprocal edge become accepted atomically.
    pub async fn accept_request(
        &self,
        caller_id: &str,
        edge_id: &str,
    ) -> AppResult<follow_edge::Model> {
        validate_id("userId", caller_id)?;
        validate_id("edgeId", edge_id)?;

        let edge = self
            .edge_repo
            .find_by_id(edge_id)
            .await?
            .ok_or_else(|| AppError::InvalidState("Follow request not found".to_string()))?;

        if edge.following_id != caller_id {
            return Err(AppError::InvalidState(
                "Only the recipient can accept a follow request".to_string(),
            ));
        }

        if !edge.is_pending() {
            return Err(AppError::InvalidState(
                "Follow request is not pending".to_string(),
            ));
        }

        if !self
            .edge_repo
            .accept_mutual(&edge, self.id_gen.generate())
            .await?
        {
            return Err(AppError::InvalidState(
                "Follow request is not pending".to_string(),
            ));
        }

        info!(
            edge_id = %edge.id,
            follower_id = %edge.follower_id,
            following_id = %edge.following_id,
            "Follow request accepted"
        );

        // The reciprocal upsert may have promoted a pending request the
        // caller had sent, which was inbound for the requester.
        self.refresh_after(caller_id).await;
        self.refresh_after(&edge.follower_id).await;

        Ok(follow_edge::Model {
            status: FollowStatus::Accepted,
            ..edge
        })
    }

    /// Decline a pending request addressed to `caller_id`.
    ///
    /// Declining a request that no longer exists succeeds.
    pub async fn decline_request(&self, caller_id: &str, edge_id: &str) -> AppResult<()> {
        validate_id("userId", caller_id)?;
        validate_id("edgeId", edge_id)?;

        if let Some(edge) = self.edge_repo.find_by_id(edge_id).await? {
            if edge.following_id != caller_id {
                return Err(AppError::InvalidState(
                    "Only the recipient can decline a follow request".to_string(),
                ));
            }
            if !edge.is_pending() {
                return Err(AppError::InvalidState(
                    "Follow request is not pending".to_string(),
                ));
            }

            let removed = self.edge_repo.delete_pending(edge_id).await?;
            info!(
                edge_id = %edge_id,
                follower_id = %edge.follower_id,
                following_id = %edge.following_id,
                removed,
                "Follow request declined"
            );
        } else {
            debug!(edge_id = %edge_id, "Decline of a missing follow request");
        }

        self.refresh_after(caller_id).await;

        Ok(())
    }

    /// Withdraw a pending request sent by `caller_id`.
    pub async fn cancel_request(&self, caller_id: &str, edge_id: &str) -> AppResult<()> {
        validate_id("userId", caller_id)?;
        validate_id("edgeId", edge_id)?;

        let Some(edge) = self.edge_repo.find_by_id(edge_id).await? else {
            debug!(edge_id = %edge_id, "Cancel of a missing follow request");
            return Ok(());
        };

        if edge.follower_id != caller_id {
            return Err(AppError::InvalidState(
                "Only the requester can cancel a follow request".to_string(),
            ));
        }
        if !edge.is_pending() {
            return Err(AppError::InvalidState(
                "Follow request is not pending".to_string(),
            ));
        }

        self.edge_repo.delete_pending(edge_id).await?;
        info!(
            edge_id = %edge_id,
            follower_id = %edge.follower_id,
            following_id = %edge.following_id,
            "Follow request cancelled"
        );

        self.refresh_after(&edge.following_id).await;

        Ok(())
    }

    /// Stop following. Removes only the caller's directional edge.
    pub async fn unfollow(&self, caller_id: &str, edge_id: &str) -> AppResult<()> {
        validate_id("userId", caller_id)?;
        validate_id("edgeId", edge_id)?;

        let Some(edge) = self.edge_repo.find_by_id(edge_id).await? else {
            debug!(edge_id = %edge_id, "Unfollow of a missing edge");
            return Ok(());
        };

        if edge.follower_id != caller_id {
            return Err(AppError::InvalidState(
                "Only the follower can unfollow".to_string(),
            ));
        }
        if edge.is_pending() {
            return Err(AppError::InvalidState(
                "Follow request is still pending".to_string(),
            ));
        }

        self.edge_repo.delete(edge_id).await?;
        info!(
            edge_id = %edge_id,
            follower_id = %edge.follower_id,
            following_id = %edge.following_id,
            "Unfollowed"
        );

        Ok(())
    }

    /// IDs of the users `user_id` follows with an accepted edge.
    pub async fn accepted_following(&self, user_id: &str) -> AppResult<Vec<String>> {
        Ok(self
            .following_edges(user_id)
            .await?
            .into_iter()
            .map(|edge| edge.following_id)
            .collect())
    }

    /// Accepted edges where `user_id` is the follower.
    pub async fn following_edges(&self, user_id: &str) -> AppResult<Vec<follow_edge::Model>> {
        validate_id("userId", user_id)?;
        self.edge_repo.find_accepted_following(user_id).await
    }

    /// Pending requests addressed to `user_id`, newest first.
    pub async fn pending_inbound(&self, user_id: &str) -> AppResult<Vec<follow_edge::Model>> {
        validate_id("userId", user_id)?;
        self.edge_repo.find_pending_inbound(user_id).await
    }

    /// `user_id`'s outbound edges keyed by the followed user.
    pub async fn outbound_edges(
        &self,
        user_id: &str,
    ) -> AppResult<HashMap<String, follow_edge::Model>> {
        validate_id("userId", user_id)?;
        Ok(self
            .edge_repo
            .find_outbound(user_id)
            .await?
            .into_iter()
            .map(|edge| (edge.following_id.clone(), edge))
            .collect())
    }

    /// Status of each of `user_id`'s outbound edges, keyed by the followed user.
    pub async fn outbound_statuses(&self, user_id: &str) -> AppResult<HashMap<String, FollowStatus>> {
        Ok(self
            .outbound_edges(user_id)
            .await?
            .into_iter()
            .map(|(following_id, edge)| (following_id, edge.status))
            .collect())
    }

    /// The edge from `follower_id` to `following_id`, if any.
    pub async fn edge_between(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> AppResult<Option<follow_edge::Model>> {
        validate_id("followerId", follower_id)?;
        validate_id("followingId", following_id)?;
        self.edge_repo.find_by_pair(follower_id, following_id).await
    }

    /// Recount `user_id`'s pending requests and publish the new value.
    pub async fn refresh_pending(&self, user_id: &str) -> AppResult<u64> {
        self.pending.refresh(user_id).await
    }

    async fn refresh_after(&self, user_id: &str) {
        if let Err(e) = self.pending.refresh(user_id).await {
            warn!(error = %e, user_id = %user_id, "Failed to refresh pending request count");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maplit::hashmap;
    use pulse_db::test_utils::TestDatabase;

    async fn setup() -> (TestDatabase, FollowGraphService) {
        let db = TestDatabase::sqlite().await.unwrap();
        for (id, name) in [("alice", "Alice A"), ("bob", "Bob B"), ("carol", "Carol C")] {
            db.seed_user(id, Some(name)).await.unwrap();
        }
        let service = FollowGraphService::new(FollowEdgeRepository::new(db.connection()));
        (db, service)
    }

    async fn status(service: &FollowGraphService, from: &str, to: &str) -> Option<FollowStatus> {
        service
            .edge_between(from, to)
            .await
            .unwrap()
            .map(|edge| edge.status)
    }

    #[tokio::test]
    async fn test_request_follow_creates_pending_edge() {
        let (_db, service) = setup().await;

        let edge = service.request_follow("alice", "bob").await.unwrap();

        assert_eq!(edge.status, FollowStatus::Pending);
        assert_eq!(edge.follower_id, "alice");
        assert_eq!(edge.following_id, "bob");
        assert_eq!(status(&service, "bob", "alice").await, None);
    }

    #[tokio::test]
    async fn test_request_follow_self_rejected() {
        let (_db, service) = setup().await;

        let err = service.request_follow("alice", "alice").await.unwrap_err();

        assert!(matches!(err, AppError::SelfFollow));
        assert_eq!(status(&service, "alice", "alice").await, None);
    }

    #[tokio::test]
    async fn test_request_follow_invalid_id_rejected() {
        let (_db, service) = setup().await;

        let err = service.request_follow("alice", "bob; drop").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_request_follow_duplicate_is_conflict() {
        let (_db, service) = setup().await;
        service.request_follow("alice", "bob").await.unwrap();

        let err = service.request_follow("alice", "bob").await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_requests_leave_one_edge() {
        let (_db, service) = setup().await;

        let (first, second) = tokio::join!(
            service.request_follow("alice", "bob"),
            service.request_follow("alice", "bob"),
        );

        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);
        let failure = first.err().or(second.err()).unwrap();
        assert!(matches!(failure, AppError::Conflict(_)));
        assert_eq!(service.pending_inbound("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_accept_makes_follow_mutual() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();

        let accepted = service.accept_request("bob", &edge.id).await.unwrap();

        assert_eq!(accepted.status, FollowStatus::Accepted);
        assert_eq!(status(&service, "alice", "bob").await, Some(FollowStatus::Accepted));
        assert_eq!(status(&service, "bob", "alice").await, Some(FollowStatus::Accepted));
    }

    #[tokio::test]
    async fn test_accept_as_requester_is_invalid_state() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();

        let err = service.accept_request("alice", &edge.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(status(&service, "alice", "bob").await, Some(FollowStatus::Pending));
        assert_eq!(status(&service, "bob", "alice").await, None);
    }

    #[tokio::test]
    async fn test_accept_twice_is_invalid_state() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();
        service.accept_request("bob", &edge.id).await.unwrap();

        let err = service.accept_request("bob", &edge.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(status(&service, "alice", "bob").await, Some(FollowStatus::Accepted));
    }

    #[tokio::test]
    async fn test_accept_missing_is_invalid_state() {
        let (_db, service) = setup().await;

        let err = service.accept_request("bob", "missing").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_decline_removes_pending_edge() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();

        service.decline_request("bob", &edge.id).await.unwrap();

        assert_eq!(status(&service, "alice", "bob").await, None);
        assert_eq!(status(&service, "bob", "alice").await, None);
    }

    #[tokio::test]
    async fn test_decline_vanished_edge_is_ok() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();
        service.decline_request("bob", &edge.id).await.unwrap();

        service.decline_request("bob", &edge.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_decline_by_other_user_is_invalid_state() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();

        let err = service.decline_request("carol", &edge.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(status(&service, "alice", "bob").await, Some(FollowStatus::Pending));
    }

    #[tokio::test]
    async fn test_cancel_request() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();

        let err = service.cancel_request("bob", &edge.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        service.cancel_request("alice", &edge.id).await.unwrap();
        assert_eq!(status(&service, "alice", "bob").await, None);
    }

    #[tokio::test]
    async fn test_unfollow_keeps_reverse_edge() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();
        service.accept_request("bob", &edge.id).await.unwrap();

        service.unfollow("alice", &edge.id).await.unwrap();

        assert_eq!(status(&service, "alice", "bob").await, None);
        assert_eq!(status(&service, "bob", "alice").await, Some(FollowStatus::Accepted));
    }

    #[tokio::test]
    async fn test_unfollow_pending_is_invalid_state() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();

        let err = service.unfollow("alice", &edge.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unfollow_missing_is_ok() {
        let (_db, service) = setup().await;

        service.unfollow("alice", "missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_count_follows_workflow() {
        let (_db, service) = setup().await;
        let counter = service.pending_counter();

        let first = service.request_follow("alice", "carol").await.unwrap();
        assert_eq!(counter.pending_count("carol").await.unwrap(), 1);
        service.accept_request("carol", &first.id).await.unwrap();
        assert_eq!(counter.pending_count("carol").await.unwrap(), 0);

        let second = service.request_follow("bob", "carol").await.unwrap();
        assert_eq!(counter.pending_count("carol").await.unwrap(), 1);
        service.decline_request("carol", &second.id).await.unwrap();
        assert_eq!(counter.pending_count("carol").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_badge_subscriber_sees_updates() {
        let (_db, service) = setup().await;
        let mut badge = service.pending_counter().subscribe("bob").await.unwrap();
        assert_eq!(*badge.borrow_and_update(), 0);

        let edge = service.request_follow("alice", "bob").await.unwrap();
        assert_eq!(*badge.borrow_and_update(), 1);

        service.accept_request("bob", &edge.id).await.unwrap();
        assert_eq!(*badge.borrow_and_update(), 0);
    }

    #[tokio::test]
    async fn test_accept_clears_requester_badge_for_crossed_requests() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();
        service.request_follow("bob", "alice").await.unwrap();
        let mut alice_badge = service.pending_counter().subscribe("alice").await.unwrap();
        assert_eq!(*alice_badge.borrow_and_update(), 1);

        service.accept_request("bob", &edge.id).await.unwrap();

        assert_eq!(status(&service, "bob", "alice").await, Some(FollowStatus::Accepted));
        assert_eq!(
            service.pending_counter().pending_count("alice").await.unwrap(),
            0
        );
        assert_eq!(*alice_badge.borrow_and_update(), 0);
    }

    #[tokio::test]
    async fn test_outbound_statuses() {
        let (_db, service) = setup().await;
        let edge = service.request_follow("alice", "bob").await.unwrap();
        service.accept_request("bob", &edge.id).await.unwrap();
        service.request_follow("alice", "carol").await.unwrap();

        let statuses = service.outbound_statuses("alice").await.unwrap();

        assert_eq!(
            statuses,
            hashmap! {
                "bob".to_string() => FollowStatus::Accepted,
                "carol".to_string() => FollowStatus::Pending,
            }
        );
        assert_eq!(service.accepted_following("alice").await.unwrap(), ["bob"]);
    }
}
