//! # Optimistic Mutation Protocol
//!
//! One reusable Propose → Commit → Reconcile/Rollback routine shared by every
//! slice, so the protocol invariants hold uniformly instead of being
//! re-derived per slice:
//!
//! - Propose applies the new local state immediately and returns an exact
//!   undo closure; the UI never waits on the network to see it.
//! - While the commit is outstanding, the entity key is held in the pending
//!   registry: a second Propose on the same key is rejected as a no-op.
//! - Reconcile replaces the optimistic record with the server-confirmed one,
//!   keyed by the proposal (never a blind append).
//! - Rollback runs the undo closure, restoring the exact pre-Propose state,
//!   then records the error on the slice.
//!
//! Per entity instance the lifecycle is
//! `Idle → Pending → {Committed | RolledBack} → Idle`.

use log::debug;
use std::future::Future;

use crate::error::BackendError;
use crate::store::{AppState, PendingKeys, StateCell};

/// Exact-undo closure captured by a Propose.
pub type Undo = Box<dyn FnOnce(&mut AppState) + Send>;

/// Result of one optimistic mutation.
#[derive(Debug)]
#[must_use]
pub enum MutationOutcome {
    /// The server confirmed the optimistic state.
    Committed,
    /// The commit failed; the pre-Propose state was restored exactly and the
    /// error recorded on the slice.
    RolledBack(BackendError),
    /// The input was rejected before any state change.
    Rejected(BackendError),
    /// A mutation for the same entity key is still in flight; nothing
    /// happened.
    Skipped,
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed)
    }
}

/// Releases the pending key even if the commit future is dropped mid-flight
/// (timeout or caller cancellation).
struct PendingGuard<'a> {
    pending: &'a PendingKeys,
    key: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.release(self.key);
    }
}

/// Run one mutation through the shared protocol.
///
/// `propose` mutates the state synchronously and returns its undo; `commit`
/// is the single facade call representing the operation; `reconcile` merges
/// the server-confirmed value; `on_error` records the failure on the slice
/// (it runs after the undo, inside the same atomic transition).
pub(crate) async fn mutate<T, P, R, E, Fut>(
    state: &StateCell,
    pending: &PendingKeys,
    key: &str,
    propose: P,
    commit: Fut,
    reconcile: R,
    on_error: E,
) -> MutationOutcome
where
    P: FnOnce(&mut AppState) -> Undo,
    Fut: Future<Output = Result<T, BackendError>>,
    R: FnOnce(&mut AppState, T),
    E: FnOnce(&mut AppState, &BackendError),
{
    if !pending.try_acquire(key) {
        debug!("mutation on '{key}' skipped: already pending");
        return MutationOutcome::Skipped;
    }
    let _guard = PendingGuard { pending, key };

    let undo = state.update(propose);

    match commit.await {
        Ok(confirmed) => {
            state.update(|s| reconcile(s, confirmed));
            MutationOutcome::Committed
        }
        Err(error) => {
            state.update(|s| {
                undo(s);
                on_error(s, &error);
            });
            MutationOutcome::RolledBack(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Goal};

    fn goal(id: &str, title: &str) -> Goal {
        Goal {
            id: id.to_string(),
            title: title.to_string(),
            metric: "m".into(),
            deadline: "2025-12-31".into(),
            why: None,
            category: Category::Other,
            color: Goal::DEFAULT_COLOR.into(),
            milestones: Vec::new(),
        }
    }

    #[tokio::test]
    async fn commit_path_reconciles_by_key_without_duplicates() {
        let state = StateCell::new();
        let pending = PendingKeys::default();

        let outcome = mutate(
            &state,
            &pending,
            "goal:temp-1",
            |s| {
                s.goals.goals.insert(0, goal("temp-1", "Run 5K"));
                Box::new(|s: &mut AppState| s.goals.goals.retain(|g| g.id != "temp-1"))
            },
            async { Ok::<_, BackendError>("goal-9".to_string()) },
            |s, confirmed_id| {
                if let Some(g) = s.goals.goals.iter_mut().find(|g| g.id == "temp-1") {
                    g.id = confirmed_id;
                }
            },
            |s, e| s.goals.error = Some(e.to_string()),
        )
        .await;

        assert!(outcome.is_committed());
        let goals = state.read(|s| s.goals.goals.clone());
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].id, "goal-9");
        assert!(state.read(|s| s.goals.error.is_none()));
        assert!(!pending.is_pending("goal:temp-1"));
    }

    #[tokio::test]
    async fn failure_restores_pre_propose_state_exactly() {
        let state = StateCell::new();
        let pending = PendingKeys::default();
        state.update(|s| {
            s.goals.goals = vec![goal("g1", "Meditate"), goal("g2", "Run 5K")];
        });
        let before = state.read(|s| s.clone());

        let outcome = mutate(
            &state,
            &pending,
            "goal:g2",
            |s| {
                let prior = s.goals.goals[1].clone();
                s.goals.goals[1].title = "Run 10K".into();
                Box::new(move |s: &mut AppState| s.goals.goals[1] = prior)
            },
            async { Err::<(), _>(BackendError::Remote("rejected".into())) },
            |_, _| {},
            |s, e| s.goals.error = Some(e.to_string()),
        )
        .await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(BackendError::Remote(_))));
        let after = state.read(|s| s.clone());
        assert_eq!(after.goals.goals, before.goals.goals);
        assert_eq!(after.goals.error.as_deref(), Some("rejected"));
        assert!(!pending.is_pending("goal:g2"));
    }

    #[tokio::test]
    async fn second_propose_on_pending_key_is_a_no_op() {
        let state = StateCell::new();
        let pending = PendingKeys::default();
        assert!(pending.try_acquire("action:a1"));

        let outcome = mutate(
            &state,
            &pending,
            "action:a1",
            |_| Box::new(|_: &mut AppState| {}),
            async { Ok::<_, BackendError>(()) },
            |_, _| {},
            |_, _| {},
        )
        .await;

        assert!(matches!(outcome, MutationOutcome::Skipped));
        // The original holder still owns the key.
        assert!(pending.is_pending("action:a1"));
    }
}
