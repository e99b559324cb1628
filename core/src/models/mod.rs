//! In-memory domain models owned by the entity slices.
//!
//! These are the shapes the UI reads. Conversion from the wire DTOs lives
//! here too, so the slices stay focused on the optimistic-update protocol.

pub mod action;
pub mod goal;
pub mod post;
pub mod user;

pub use action::{ActionDraft, ActionItem, ActionKind, ActionPatch, CompletedAction, CompletedKind};
pub use goal::{Category, Goal, GoalDraft, GoalPatch, GoalStatus, Milestone};
pub use post::{Comment, Post, PostDraft, PostKind, Visibility};
pub use user::AuthUser;

use uuid::Uuid;

/// Prefix for client-assigned identifiers that have not yet been confirmed by
/// the server. Server ids never start with this, so reconciliation can key a
/// pure replace on the temporary id without colliding.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Mint a fresh temporary identifier for an optimistic insert.
pub fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

/// True if `id` was minted locally and is still awaiting reconciliation.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_unique_and_recognizable() {
        let a = temp_id();
        let b = temp_id();
        assert_ne!(a, b);
        assert!(is_temp_id(&a));
        assert!(!is_temp_id("goal-123"));
    }
}
