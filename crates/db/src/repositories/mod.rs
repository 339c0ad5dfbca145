//! Database repositories.

mod activity;
mod follow_edge;
mod reaction;
mod user;

pub use activity::ActivityRepository;
pub use follow_edge::FollowEdgeRepository;
pub use reaction::ReactionRepository;
pub use user::UserRepository;
