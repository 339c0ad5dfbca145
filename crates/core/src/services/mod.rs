//! Business logic services.

#![allow(missing_docs)]

pub mod activity_feed;
pub mod directory;
pub mod follow_graph;
pub mod pending_counter;
pub mod reaction_ledger;

pub use activity_feed::{ActivityDetail, ActivityFeedService, ActivityItem, FeedItem};
pub use directory::{Candidate, DirectoryService, RelationEntry, RelationshipStatus};
pub use follow_graph::FollowGraphService;
pub use pending_counter::PendingRequestCounter;
pub use reaction_ledger::{ReactionLedgerService, ReactionTally};
