//! Reaction entity (one reaction per user per activity record).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The fixed set of reactions a user can leave on an activity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    /// Congratulations.
    #[sea_orm(string_value = "praise")]
    Praise,
    /// Crushed it.
    #[sea_orm(string_value = "fire")]
    Fire,
    /// Keep going.
    #[sea_orm(string_value = "encouragement")]
    Encouragement,
}

/// Kind of activity record a reaction points at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// A `workout_session` row.
    #[sea_orm(string_value = "workout")]
    Workout,
    /// A `cardio_session` row.
    #[sea_orm(string_value = "cardio")]
    Cardio,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user who reacted
    pub user_id: String,

    /// The activity record being reacted to (no foreign key: two target tables)
    pub target_id: String,

    pub target_type: TargetType,

    pub kind: ReactionKind,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
