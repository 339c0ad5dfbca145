//! Activity feed service.
//!
//! Builds a recency-ordered feed of the workouts and cardio sessions of the
//! users someone follows, joined with actor names and reaction tallies.

use std::collections::HashMap;

use crate::first_name;
use crate::services::follow_graph::FollowGraphService;
use crate::services::reaction_ledger::{ReactionLedgerService, ReactionTally};
use chrono::{DateTime, Utc};
use pulse_common::{AppResult, validate_id};
use pulse_db::{
    entities::{ReactionKind, TargetType, cardio_session, workout_session},
    repositories::{ActivityRepository, UserRepository},
};
use serde::Serialize;
use tracing::debug;

/// Kind-specific part of an activity record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "activityType", rename_all = "lowercase")]
pub enum ActivityDetail {
    #[serde(rename_all = "camelCase")]
    Workout {
        duration_minutes: i32,
        total_load_kg: f64,
    },
    #[serde(rename_all = "camelCase")]
    Cardio {
        cardio_type: String,
        duration_minutes: i32,
        distance_km: Option<f64>,
        calories_burned: Option<i32>,
    },
}

impl ActivityDetail {
    /// The reaction target type for this kind of record.
    #[must_use]
    pub const fn target_type(&self) -> TargetType {
        match self {
            Self::Workout { .. } => TargetType::Workout,
            Self::Cardio { .. } => TargetType::Cardio,
        }
    }
}

/// One activity record, whatever its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: ActivityDetail,
}

impl From<workout_session::Model> for ActivityItem {
    fn from(m: workout_session::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            created_at: m.created_at.with_timezone(&Utc),
            detail: ActivityDetail::Workout {
                duration_minutes: m.duration_minutes,
                total_load_kg: m.total_load_kg,
            },
        }
    }
}

impl From<cardio_session::Model> for ActivityItem {
    fn from(m: cardio_session::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            created_at: m.created_at.with_timezone(&Utc),
            detail: ActivityDetail::Cardio {
                cardio_type: m.cardio_type,
                duration_minutes: m.duration_minutes,
                distance_km: m.distance_km,
                calories_burned: m.calories_burned,
            },
        }
    }
}

/// An activity joined with what the feed shows next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    #[serde(flatten)]
    pub activity: ActivityItem,
    pub actor_name: String,
    pub reactions: ReactionTally,
    pub my_reaction: Option<ReactionKind>,
}

/// Activity feed service for business logic.
#[derive(Clone)]
pub struct ActivityFeedService {
    graph: FollowGraphService,
    user_repo: UserRepository,
    activity_repo: ActivityRepository,
    ledger: ReactionLedgerService,
    placeholder_name: String,
}

impl ActivityFeedService {
    /// Create a new activity feed service.
    #[must_use]
    pub fn new(
        graph: FollowGraphService,
        user_repo: UserRepository,
        activity_repo: ActivityRepository,
        ledger: ReactionLedgerService,
        placeholder_name: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            user_repo,
            activity_repo,
            ledger,
            placeholder_name: placeholder_name.into(),
        }
    }

    /// Build `user_id`'s feed, newest first.
    ///
    /// At most `kind_window` workouts and `kind_window` cardio sessions are
    /// read across the whole followed set, so one very active user can
    /// crowd out the others.
    pub async fn build_feed(&self, user_id: &str, kind_window: u64) -> AppResult<Vec<FeedItem>> {
        validate_id("userId", user_id)?;

        let following = self.graph.accepted_following(user_id).await?;
        if following.is_empty() {
            debug!(user_id = %user_id, "Feed skipped: not following anyone");
            return Ok(vec![]);
        }

        let (users, workouts, cardio) = tokio::try_join!(
            self.user_repo.find_by_ids(&following),
            self.activity_repo.find_recent_workouts(&following, kind_window),
            self.activity_repo.find_recent_cardio(&following, kind_window),
        )?;

        let activities = merge_by_recency(
            workouts.into_iter().map(ActivityItem::from),
            cardio.into_iter().map(ActivityItem::from),
        );
        if activities.is_empty() {
            return Ok(vec![]);
        }

        let ids_of = |target_type: TargetType| -> Vec<String> {
            activities
                .iter()
                .filter(|a| a.detail.target_type() == target_type)
                .map(|a| a.id.clone())
                .collect()
        };
        let workout_ids = ids_of(TargetType::Workout);
        let cardio_ids = ids_of(TargetType::Cardio);

        let (mut workout_tallies, mut cardio_tallies, my_workouts, my_cardio) = tokio::try_join!(
            self.ledger.tally(TargetType::Workout, &workout_ids),
            self.ledger.tally(TargetType::Cardio, &cardio_ids),
            self.ledger
                .reactions_by_user(user_id, TargetType::Workout, &workout_ids),
            self.ledger
                .reactions_by_user(user_id, TargetType::Cardio, &cardio_ids),
        )?;

        let names: HashMap<String, String> = users
            .into_iter()
            .map(|u| {
                let name = first_name(u.name.as_deref(), &self.placeholder_name);
                (u.id, name)
            })
            .collect();

        Ok(activities
            .into_iter()
            .map(|activity| {
                let (tallies, mine) = match activity.detail.target_type() {
                    TargetType::Workout => (&mut workout_tallies, &my_workouts),
                    TargetType::Cardio => (&mut cardio_tallies, &my_cardio),
                };
                FeedItem {
                    actor_name: names
                        .get(&activity.user_id)
                        .cloned()
                        .unwrap_or_else(|| self.placeholder_name.clone()),
                    reactions: tallies.remove(&activity.id).unwrap_or_default(),
                    my_reaction: mine.get(&activity.id).copied(),
                    activity,
                }
            })
            .collect())
    }
}

/// Merge two activity streams into one, newest first.
fn merge_by_recency(
    workouts: impl Iterator<Item = ActivityItem>,
    cardio: impl Iterator<Item = ActivityItem>,
) -> Vec<ActivityItem> {
    let mut merged: Vec<ActivityItem> = workouts.chain(cardio).collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}
