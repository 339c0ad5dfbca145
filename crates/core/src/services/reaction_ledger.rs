//! Reaction ledger service.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use pulse_common::{AppResult, IdGenerator, validate_id};
use pulse_db::{
    entities::{ReactionKind, TargetType, reaction},
    repositories::ReactionRepository,
};
use sea_orm::{Iterable, Set};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Per-target reaction counts. Every kind is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionTally(BTreeMap<ReactionKind, u64>);

impl Default for ReactionTally {
    fn default() -> Self {
        Self(ReactionKind::iter().map(|kind| (kind, 0)).collect())
    }
}

impl ReactionTally {
    /// Count for one kind.
    #[must_use]
    pub fn get(&self, kind: ReactionKind) -> u64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    /// Sum over all kinds.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Count one more reaction of `kind`.
    pub fn record(&mut self, kind: ReactionKind) {
        *self.0.entry(kind).or_insert(0) += 1;
    }

    /// Apply a user's reaction change from `previous` to `next`.
    ///
    /// The previous kind loses one (never below zero), the next kind gains
    /// one.
    pub fn apply_toggle(&mut self, previous: Option<ReactionKind>, next: Option<ReactionKind>) {
        if previous == next {
            return;
        }
        if let Some(kind) = previous {
            let count = self.0.entry(kind).or_insert(0);
            *count = count.saturating_sub(1);
        }
        if let Some(kind) = next {
            self.record(kind);
        }
    }
}

/// Reaction ledger service for business logic.
#[derive(Clone)]
pub struct ReactionLedgerService {
    reaction_repo: ReactionRepository,
    id_gen: IdGenerator,
}

impl ReactionLedgerService {
    /// Create a new reaction ledger service.
    #[must_use]
    pub const fn new(reaction_repo: ReactionRepository) -> Self {
        Self {
            reaction_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Toggle `kind` on a target.
    ///
    /// Repeating the current kind removes it; any other kind replaces it.
    /// Returns the user's reaction after the call.
    pub async fn toggle_reaction(
        &self,
        user_id: &str,
        target_id: &str,
        target_type: TargetType,
        kind: ReactionKind,
    ) -> AppResult<Option<ReactionKind>> {
        validate_id("userId", user_id)?;
        validate_id("targetId", target_id)?;

        let current = self.current_reaction(user_id, target_id, target_type).await?;

        if current == Some(kind) {
            self.reaction_repo
                .delete_by_key(user_id, target_id, target_type)
                .await?;
            info!(user_id = %user_id, target_id = %target_id, ?kind, "Reaction removed");
            return Ok(None);
        }

        let model = reaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            target_id: Set(target_id.to_string()),
            target_type: Set(target_type),
            kind: Set(kind),
            created_at: Set(Utc::now().into()),
        };
        self.reaction_repo.upsert(model).await?;
        info!(
            user_id = %user_id,
            target_id = %target_id,
            previous = ?current,
            ?kind,
            "Reaction set"
        );

        Ok(Some(kind))
    }

    /// The user's reaction on one target, if any.
    pub async fn current_reaction(
        &self,
        user_id: &str,
        target_id: &str,
        target_type: TargetType,
    ) -> AppResult<Option<ReactionKind>> {
        Ok(self
            .reaction_repo
            .find_by_key(user_id, target_id, target_type)
            .await?
            .map(|r| r.kind))
    }

    /// Tallies for each of `target_ids` of one target type. Targets without
    /// reactions get an all-zero tally.
    ///
    /// Scoped to `target_type` so a workout and a cardio session sharing an
    /// id never pool their counts.
    pub async fn tally(
        &self,
        target_type: TargetType,
        target_ids: &[String],
    ) -> AppResult<HashMap<String, ReactionTally>> {
        for id in target_ids {
            validate_id("targetId", id)?;
        }

        let mut tallies: HashMap<String, ReactionTally> = target_ids
            .iter()
            .map(|id| (id.clone(), ReactionTally::default()))
            .collect();

        for r in self
            .reaction_repo
            .find_by_targets(target_type, target_ids)
            .await?
        {
            tallies.entry(r.target_id).or_default().record(r.kind);
        }

        Ok(tallies)
    }

    /// The user's own reaction on each of `target_ids` (of `target_type`)
    /// that has one.
    pub async fn reactions_by_user(
        &self,
        user_id: &str,
        target_type: TargetType,
        target_ids: &[String],
    ) -> AppResult<HashMap<String, ReactionKind>> {
        validate_id("userId", user_id)?;

        Ok(self
            .reaction_repo
            .find_by_user_and_targets(user_id, target_type, target_ids)
            .await?
            .into_iter()
            .map(|r| (r.target_id, r.kind))
            .collect())
    }
}
