//! Core business logic for pulse: the follow graph, activity feed,
//! reaction ledger, pending-request badge, user directory, and the
//! per-user community session built on top of them.

pub mod services;
pub mod session;

pub use services::*;
pub use session::{CommunitySession, CommunityView, LoadTicket, ViewData};

/// First word of a display name, or `placeholder` when the name is absent
/// or blank.
#[must_use]
pub fn first_name(name: Option<&str>, placeholder: &str) -> String {
    name.and_then(|n| n.split_whitespace().next())
        .unwrap_or(placeholder)
        .to_string()
}
