//! User directory service.

use std::collections::HashMap;

use crate::first_name;
use crate::services::follow_graph::FollowGraphService;
use pulse_common::{AppResult, validate_id};
use pulse_db::{
    entities::{FollowStatus, follow_edge, user},
    repositories::UserRepository,
};
use serde::Serialize;

/// How the viewer relates to a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    None,
    Pending,
    Accepted,
}

impl From<FollowStatus> for RelationshipStatus {
    fn from(status: FollowStatus) -> Self {
        match status {
            FollowStatus::Pending => Self::Pending,
            FollowStatus::Accepted => Self::Accepted,
        }
    }
}

/// A user the viewer could follow, with the viewer's current edge to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub user_id: String,
    pub name: String,
    pub status: RelationshipStatus,
    /// The viewer's outbound edge, when one exists
    pub edge_id: Option<String>,
}

/// One row of the requests or following lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEntry {
    pub edge_id: String,
    /// The other side of the edge
    pub user_id: String,
    pub name: String,
}

/// User directory service for business logic.
#[derive(Clone)]
pub struct DirectoryService {
    user_repo: UserRepository,
    graph: FollowGraphService,
    placeholder_name: String,
}

impl DirectoryService {
    /// Create a new directory service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        graph: FollowGraphService,
        placeholder_name: impl Into<String>,
    ) -> Self {
        Self {
            user_repo,
            graph,
            placeholder_name: placeholder_name.into(),
        }
    }

    /// Users other than `user_id`, ordered by name and annotated with
    /// `user_id`'s relationship to each.
    pub async fn list_candidates(
        &self,
        user_id: &str,
        name_filter: Option<&str>,
        limit: u64,
    ) -> AppResult<Vec<Candidate>> {
        validate_id("userId", user_id)?;

        let (users, outbound) = tokio::try_join!(
            self.user_repo.list_except(user_id, limit),
            self.graph.outbound_edges(user_id),
        )?;

        let candidates: Vec<Candidate> = users
            .into_iter()
            .map(|u| {
                let edge = outbound.get(&u.id);
                Candidate {
                    name: u
                        .name
                        .unwrap_or_else(|| self.placeholder_name.clone()),
                    status: edge.map_or(RelationshipStatus::None, |e| e.status.into()),
                    edge_id: edge.map(|e| e.id.clone()),
                    user_id: u.id,
                }
            })
            .collect();

        Ok(match name_filter {
            Some(query) => Self::filter_by_name(&candidates, query),
            None => candidates,
        })
    }

    /// Case-insensitive substring filter over an already fetched page.
    #[must_use]
    pub fn filter_by_name(candidates: &[Candidate], query: &str) -> Vec<Candidate> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return candidates.to_vec();
        }

        candidates
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    /// Pending requests addressed to `user_id`, with the requesters' names.
    pub async fn incoming_requests(&self, user_id: &str) -> AppResult<Vec<RelationEntry>> {
        let edges = self.graph.pending_inbound(user_id).await?;
        self.named(edges, |edge| &edge.follower_id).await
    }

    /// Users `user_id` follows, with their names.
    pub async fn following(&self, user_id: &str) -> AppResult<Vec<RelationEntry>> {
        let edges = self.graph.following_edges(user_id).await?;
        self.named(edges, |edge| &edge.following_id).await
    }

    async fn named(
        &self,
        edges: Vec<follow_edge::Model>,
        other: impl Fn(&follow_edge::Model) -> &String,
    ) -> AppResult<Vec<RelationEntry>> {
        let ids: Vec<String> = edges.iter().map(|e| other(e).clone()).collect();
        let names = self.first_names(&ids).await?;

        Ok(edges
            .iter()
            .map(|edge| {
                let user_id = other(edge).clone();
                RelationEntry {
                    edge_id: edge.id.clone(),
                    name: names
                        .get(&user_id)
                        .cloned()
                        .unwrap_or_else(|| self.placeholder_name.clone()),
                    user_id,
                }
            })
            .collect())
    }

    /// First names of `ids`, keyed by user ID.
    async fn first_names(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        Ok(self
            .user_repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|user::Model { id, name, .. }| {
                (id, first_name(name.as_deref(), &self.placeholder_name))
            })
            .collect())
    }
}
