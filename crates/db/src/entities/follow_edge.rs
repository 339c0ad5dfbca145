//! Follow edge entity (directed follow relationship with request status).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a follow edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    /// Awaiting the recipient's decision.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted by the recipient.
    #[sea_orm(string_value = "accepted")]
    Accepted,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow_edge")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who follows (or asked to)
    pub follower_id: String,

    /// The user being followed
    pub following_id: String,

    pub status: FollowStatus,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the edge is still awaiting a decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == FollowStatus::Pending
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FollowerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Follower,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::FollowingId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Following,
}

impl ActiveModelBehavior for ActiveModel {}
