//! User entity (identity/profile collaborator).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Display name (may be absent)
    #[sea_orm(nullable)]
    pub name: Option<String>,

    /// Bearer token for the HTTP surface
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workout_session::Entity")]
    WorkoutSessions,

    #[sea_orm(has_many = "super::cardio_session::Entity")]
    CardioSessions,
}

impl Related<super::workout_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkoutSessions.def()
    }
}

impl Related<super::cardio_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CardioSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
