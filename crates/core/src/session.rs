//! Per-user community session.
//!
//! Holds what one signed-in user currently sees (feed, explore page,
//! requests, following) and applies their actions to both the store and the
//! cached views. Every load takes a [`LoadTicket`]; a result whose ticket is
//! no longer current is dropped instead of overwriting a newer view.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::services::{
    ActivityFeedService, Candidate, DirectoryService, FeedItem, FollowGraphService,
    ReactionLedgerService, RelationEntry, RelationshipStatus,
};
use pulse_common::{AppError, AppResult, config::SocialConfig, validate_id};
use pulse_db::entities::{ReactionKind, follow_edge};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

/// The views a session can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityView {
    Feed,
    Explore,
    Requests,
    Following,
}

/// Permission to commit the result of one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    view: CommunityView,
    generation: u64,
}

impl LoadTicket {
    /// The view being loaded.
    #[must_use]
    pub const fn view(&self) -> CommunityView {
        self.view
    }
}

/// Freshly loaded content for one view.
#[derive(Debug, Clone)]
pub enum ViewData {
    Feed(Vec<FeedItem>),
    Explore(Vec<Candidate>),
    Requests(Vec<RelationEntry>),
    Following(Vec<RelationEntry>),
}

#[derive(Debug)]
struct SessionState {
    generation: u64,
    active: CommunityView,
    feed: Vec<FeedItem>,
    candidates: Vec<Candidate>,
    requests: Vec<RelationEntry>,
    following: Vec<RelationEntry>,
}

/// One signed-in user's view of the community.
pub struct CommunitySession {
    user_id: String,
    graph: FollowGraphService,
    feed: ActivityFeedService,
    ledger: ReactionLedgerService,
    directory: DirectoryService,
    feed_window: u64,
    directory_limit: u64,
    badge: watch::Receiver<u64>,
    state: Mutex<SessionState>,
}

impl CommunitySession {
    /// Open a session for `user_id` and subscribe to their pending badge.
    pub async fn open(
        user_id: &str,
        graph: FollowGraphService,
        feed: ActivityFeedService,
        ledger: ReactionLedgerService,
        directory: DirectoryService,
        social: &SocialConfig,
    ) -> AppResult<Self> {
        validate_id("userId", user_id)?;
        let badge = graph.pending_counter().subscribe(user_id).await?;

        Ok(Self {
            user_id: user_id.to_string(),
            graph,
            feed,
            ledger,
            directory,
            feed_window: social.feed_window,
            directory_limit: social.directory_limit,
            badge,
            state: Mutex::new(SessionState {
                generation: 0,
                active: CommunityView::Feed,
                feed: Vec::new(),
                candidates: Vec::new(),
                requests: Vec::new(),
                following: Vec::new(),
            }),
        })
    }

    /// The signed-in user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The view the user switched to last.
    #[must_use]
    pub fn active_view(&self) -> CommunityView {
        self.lock().active
    }

    /// Live pending request count for the badge.
    #[must_use]
    pub fn pending_badge(&self) -> watch::Receiver<u64> {
        self.badge.clone()
    }

    /// Switch to `view` and invalidate every load still in flight.
    pub fn begin_load(&self, view: CommunityView) -> LoadTicket {
        let mut state = self.lock();
        state.generation += 1;
        state.active = view;
        LoadTicket {
            view,
            generation: state.generation,
        }
    }

    /// Store loaded data if `ticket` is still current. Returns whether it was
    /// stored.
    pub fn commit(&self, ticket: LoadTicket, data: ViewData) -> bool {
        let mut state = self.lock();
        if ticket.generation != state.generation {
            debug!(
                user_id = %self.user_id,
                view = ?ticket.view,
                "Discarding stale view load"
            );
            return false;
        }

        match data {
            ViewData::Feed(items) => state.feed = items,
            ViewData::Explore(candidates) => state.candidates = candidates,
            ViewData::Requests(entries) => state.requests = entries,
            ViewData::Following(entries) => state.following = entries,
        }
        true
    }

    /// Switch to `view` and load it. Returns `false` when another view was
    /// requested before this one finished loading.
    pub async fn load(&self, view: CommunityView) -> AppResult<bool> {
        let ticket = self.begin_load(view);
        let data = self.fetch(view).await?;
        Ok(self.commit(ticket, data))
    }

    async fn fetch(&self, view: CommunityView) -> AppResult<ViewData> {
        Ok(match view {
            CommunityView::Feed => {
                ViewData::Feed(self.feed.build_feed(&self.user_id, self.feed_window).await?)
            }
            CommunityView::Explore => ViewData::Explore(
                self.directory
                    .list_candidates(&self.user_id, None, self.directory_limit)
                    .await?,
            ),
            CommunityView::Requests => {
                let entries = self.directory.incoming_requests(&self.user_id).await?;
                if let Err(e) = self.graph.refresh_pending(&self.user_id).await {
                    warn!(error = %e, user_id = %self.user_id, "Failed to refresh pending badge");
                }
                ViewData::Requests(entries)
            }
            CommunityView::Following => {
                ViewData::Following(self.directory.following(&self.user_id).await?)
            }
        })
    }

    /// Cached feed.
    #[must_use]
    pub fn feed_items(&self) -> Vec<FeedItem> {
        self.lock().feed.clone()
    }

    /// Cached explore page.
    #[must_use]
    pub fn candidates(&self) -> Vec<Candidate> {
        self.lock().candidates.clone()
    }

    /// Cached incoming requests.
    #[must_use]
    pub fn requests(&self) -> Vec<RelationEntry> {
        self.lock().requests.clone()
    }

    /// Cached following list.
    #[must_use]
    pub fn following(&self) -> Vec<RelationEntry> {
        self.lock().following.clone()
    }

    /// Explore page narrowed to names containing `query`.
    #[must_use]
    pub fn filtered_candidates(&self, query: &str) -> Vec<Candidate> {
        DirectoryService::filter_by_name(&self.lock().candidates, query)
    }

    /// Toggle a reaction on a cached feed item.
    ///
    /// The tally changes immediately and rolls back to the last confirmed
    /// state if the write fails.
    pub async fn toggle_reaction(
        &self,
        item_id: &str,
        kind: ReactionKind,
    ) -> AppResult<Option<ReactionKind>> {
        let (target_type, confirmed) = {
            let mut state = self.lock();
            let item = state
                .feed
                .iter_mut()
                .find(|i| i.activity.id == item_id)
                .ok_or_else(|| AppError::NotFound("Feed item not loaded".to_string()))?;

            let previous = item.my_reaction;
            let next = if previous == Some(kind) {
                None
            } else {
                Some(kind)
            };
            let confirmed = (item.reactions.clone(), previous);
            item.reactions.apply_toggle(previous, next);
            item.my_reaction = next;

            (item.activity.detail.target_type(), confirmed)
        };

        let result = self
            .ledger
            .toggle_reaction(&self.user_id, item_id, target_type, kind)
            .await;

        let mut state = self.lock();
        let item = state.feed.iter_mut().find(|i| i.activity.id == item_id);
        match result {
            Ok(mine) => {
                if let Some(item) = item {
                    item.my_reaction = mine;
                }
                Ok(mine)
            }
            Err(e) => {
                warn!(error = %e, item_id = %item_id, "Reaction write failed, reverting");
                if let Some(item) = item {
                    (item.reactions, item.my_reaction) = confirmed;
                }
                Err(e)
            }
        }
    }

    /// Send a follow request and mark the candidate as pending.
    pub async fn request_follow(&self, target_id: &str) -> AppResult<follow_edge::Model> {
        let edge = self.graph.request_follow(&self.user_id, target_id).await?;

        let mut state = self.lock();
        if let Some(candidate) = state
            .candidates
            .iter_mut()
            .find(|c| c.user_id == target_id)
        {
            candidate.status = RelationshipStatus::Pending;
            candidate.edge_id = Some(edge.id.clone());
        }

        Ok(edge)
    }

    /// Withdraw a sent request.
    pub async fn cancel_request(&self, edge_id: &str) -> AppResult<()> {
        self.graph.cancel_request(&self.user_id, edge_id).await?;
        self.clear_candidate_edge(edge_id);
        Ok(())
    }

    /// Accept an incoming request and drop it from the requests list.
    pub async fn accept(&self, edge_id: &str) -> AppResult<()> {
        self.graph.accept_request(&self.user_id, edge_id).await?;
        self.lock().requests.retain(|r| r.edge_id != edge_id);
        Ok(())
    }

    /// Decline an incoming request and drop it from the requests list.
    pub async fn decline(&self, edge_id: &str) -> AppResult<()> {
        self.graph.decline_request(&self.user_id, edge_id).await?;
        self.lock().requests.retain(|r| r.edge_id != edge_id);
        Ok(())
    }

    /// Unfollow and drop the row from the following list.
    pub async fn unfollow(&self, edge_id: &str) -> AppResult<()> {
        self.graph.unfollow(&self.user_id, edge_id).await?;
        self.lock().following.retain(|f| f.edge_id != edge_id);
        self.clear_candidate_edge(edge_id);
        Ok(())
    }

    fn clear_candidate_edge(&self, edge_id: &str) {
        let mut state = self.lock();
        if let Some(candidate) = state
            .candidates
            .iter_mut()
            .find(|c| c.edge_id.as_deref() == Some(edge_id))
        {
            candidate.status = RelationshipStatus::None;
            candidate.edge_id = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pulse_db::repositories::{
        ActivityRepository, FollowEdgeRepository, ReactionRepository, UserRepository,
    };
    use pulse_db::test_utils::TestDatabase;
    use sea_orm::ConnectionTrait;

    struct Fixture {
        db: TestDatabase,
        graph: FollowGraphService,
        feed: ActivityFeedService,
        ledger: ReactionLedgerService,
        directory: DirectoryService,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = TestDatabase::sqlite().await.unwrap();
            db.seed_user("alice", Some("Alice Archer")).await.unwrap();
            db.seed_user("bob", Some("Bob Baker")).await.unwrap();
            db.seed_user("carol", Some("Carol Cook")).await.unwrap();

            let conn = db.connection();
            let graph = FollowGraphService::new(FollowEdgeRepository::new(conn.clone()));
            let ledger = ReactionLedgerService::new(ReactionRepository::new(conn.clone()));
            let feed = ActivityFeedService::new(
                graph.clone(),
                UserRepository::new(conn.clone()),
                ActivityRepository::new(conn.clone()),
                ledger.clone(),
                "User",
            );
            let directory = DirectoryService::new(UserRepository::new(conn), graph.clone(), "User");

            Self {
                db,
                graph,
                feed,
                ledger,
                directory,
            }
        }

        async fn session(&self, user_id: &str) -> CommunitySession {
            CommunitySession::open(
                user_id,
                self.graph.clone(),
                self.feed.clone(),
                self.ledger.clone(),
                self.directory.clone(),
                &SocialConfig::default(),
            )
            .await
            .unwrap()
        }

        async fn follow(&self, from: &str, to: &str) {
            let edge = self.graph.request_follow(from, to).await.unwrap();
            self.graph.accept_request(to, &edge.id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_stale_ticket_cannot_overwrite_newer_view() {
        let fx = Fixture::new().await;
        let session = fx.session("alice").await;

        let stale = session.begin_load(CommunityView::Requests);
        let current = session.begin_load(CommunityView::Explore);

        let late = vec![RelationEntry {
            edge_id: "e1".to_string(),
            user_id: "bob".to_string(),
            name: "Bob".to_string(),
        }];
        assert!(!session.commit(stale, ViewData::Requests(late)));
        assert!(session.requests().is_empty());

        assert!(session.commit(current, ViewData::Explore(vec![])));
        assert_eq!(session.active_view(), CommunityView::Explore);
    }

    #[tokio::test]
    async fn test_load_explore_and_request_follow() {
        let fx = Fixture::new().await;
        let session = fx.session("alice").await;

        assert!(session.load(CommunityView::Explore).await.unwrap());
        assert_eq!(session.candidates().len(), 2);

        session.request_follow("bob").await.unwrap();

        let bob = session
            .candidates()
            .into_iter()
            .find(|c| c.user_id == "bob")
            .unwrap();
        assert_eq!(bob.status, RelationshipStatus::Pending);
        assert_eq!(session.filtered_candidates("BAK").len(), 1);
        assert_eq!(session.filtered_candidates("").len(), 2);
    }

    #[tokio::test]
    async fn test_requests_view_and_badge() {
        let fx = Fixture::new().await;
        let session = fx.session("bob").await;
        let badge = session.pending_badge();
        assert_eq!(*badge.borrow(), 0);

        fx.graph.request_follow("alice", "bob").await.unwrap();
        fx.graph.request_follow("carol", "bob").await.unwrap();
        assert_eq!(*badge.borrow(), 2);

        session.load(CommunityView::Requests).await.unwrap();
        let requests = session.requests();
        assert_eq!(requests.len(), 2);

        session.accept(&requests[0].edge_id).await.unwrap();
        session.decline(&requests[1].edge_id).await.unwrap();

        assert!(session.requests().is_empty());
        assert_eq!(*badge.borrow(), 0);
    }

    #[tokio::test]
    async fn test_unfollow_updates_following_view() {
        let fx = Fixture::new().await;
        fx.follow("alice", "bob").await;
        let session = fx.session("alice").await;

        session.load(CommunityView::Following).await.unwrap();
        let following = session.following();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].name, "Bob");

        session.unfollow(&following[0].edge_id).await.unwrap();

        assert!(session.following().is_empty());
        assert!(fx.graph.edge_between("bob", "alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_toggle_reaction_updates_tally_optimistically() {
        let fx = Fixture::new().await;
        fx.db
            .seed_workout("w1", "bob", true, Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap())
            .await
            .unwrap();
        fx.follow("alice", "bob").await;
        let session = fx.session("alice").await;
        session.load(CommunityView::Feed).await.unwrap();

        let mine = session.toggle_reaction("w1", ReactionKind::Praise).await.unwrap();
        assert_eq!(mine, Some(ReactionKind::Praise));
        let mine = session.toggle_reaction("w1", ReactionKind::Fire).await.unwrap();
        assert_eq!(mine, Some(ReactionKind::Fire));

        let item = &session.feed_items()[0];
        assert_eq!(item.reactions.get(ReactionKind::Praise), 0);
        assert_eq!(item.reactions.get(ReactionKind::Fire), 1);
        assert_eq!(item.my_reaction, Some(ReactionKind::Fire));
    }

    #[tokio::test]
    async fn test_failed_reaction_write_reverts() {
        let fx = Fixture::new().await;
        fx.db
            .seed_workout("w1", "bob", true, Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap())
            .await
            .unwrap();
        fx.follow("alice", "bob").await;
        let session = fx.session("alice").await;
        session.load(CommunityView::Feed).await.unwrap();
        let before = session.feed_items()[0].clone();

        fx.db
            .conn
            .execute_unprepared("DROP TABLE reaction")
            .await
            .unwrap();

        let err = session
            .toggle_reaction("w1", ReactionKind::Praise)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(session.feed_items()[0], before);
    }

    #[tokio::test]
    async fn test_toggle_reaction_on_unloaded_item() {
        let fx = Fixture::new().await;
        let session = fx.session("alice").await;

        let err = session
            .toggle_reaction("w404", ReactionKind::Praise)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
