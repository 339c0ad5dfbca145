//! Database entities.

#![allow(missing_docs)]

pub mod cardio_session;
pub mod follow_edge;
pub mod reaction;
pub mod user;
pub mod workout_session;

pub use cardio_session::Entity as CardioSession;
pub use follow_edge::{Entity as FollowEdge, FollowStatus};
pub use reaction::{Entity as Reaction, ReactionKind, TargetType};
pub use user::Entity as User;
pub use workout_session::Entity as WorkoutSession;
