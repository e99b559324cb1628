//! # Store Module
//!
//! The store composes the four entity slices over one shared state container.
//! The container is the single shared mutable resource: every transition goes
//! through [`StateCell::update`] (one atomic state change per call, the lock
//! is never held across an await) and bumps a revision channel the UI
//! subscribes to for re-renders.
//!
//! The store is an explicit context object created once at process start via
//! [`Store::new`]; there is no module-level global.

pub mod auth;
pub mod daily;
pub mod goals;
pub mod optimistic;
pub mod social;

pub use auth::AuthSlice;
pub use daily::DailySlice;
pub use goals::GoalsSlice;
pub use optimistic::MutationOutcome;
pub use social::SocialSlice;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::backend::Backend;
use crate::models::{ActionItem, AuthUser, CompletedAction, Goal, Post};
use crate::session::SessionStore;

/// Auth slice state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<AuthUser>,
    pub token: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Goals slice state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalsState {
    pub goals: Vec<Goal>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Daily-actions slice state. `completed_actions` is the append-only
/// completion history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyState {
    pub actions: Vec<ActionItem>,
    pub completed_actions: Vec<CompletedAction>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Social slice state: two independently scoped feeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialState {
    pub circle_feed: Vec<Post>,
    pub follow_feed: Vec<Post>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The merged application state the UI renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub auth: AuthState,
    pub goals: GoalsState,
    pub daily: DailyState,
    pub social: SocialState,
}

/// Shared state container with one atomic set operation and a revision
/// channel for reactive subscribers.
pub struct StateCell {
    state: Mutex<AppState>,
    revision: watch::Sender<u64>,
}

impl StateCell {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        StateCell { state: Mutex::new(AppState::default()), revision }
    }

    /// Apply one state transition atomically and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let result = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut state)
        };
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        result
    }

    /// Read from the current state without transitioning it.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Subscribe to revision bumps. Receivers wake on every transition.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of entity keys with a mutation in flight. A second Propose on a
/// pending key is rejected so optimistic states never interleave per entity;
/// different keys proceed concurrently.
#[derive(Default)]
pub struct PendingKeys {
    keys: Mutex<HashSet<String>>,
}

impl PendingKeys {
    /// Try to claim `key`. Returns false if a mutation on it is in flight.
    pub fn try_acquire(&self, key: &str) -> bool {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).insert(key.to_string())
    }

    pub fn release(&self, key: &str) {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).contains(key)
    }
}

/// The application store: one instance per process, owning the slices.
#[derive(Clone)]
pub struct Store {
    state: Arc<StateCell>,
    auth: AuthSlice,
    goals: GoalsSlice,
    daily: DailySlice,
    social: SocialSlice,
}

impl Store {
    /// Factory: wire the slices over one state cell, one pending registry and
    /// one backend facade. Called once when the UI tree's root is built.
    pub fn new(backend: Backend, session: Arc<dyn SessionStore>) -> Self {
        let state = Arc::new(StateCell::new());
        let pending = Arc::new(PendingKeys::default());
        let backend = Arc::new(backend);
        Store {
            auth: AuthSlice::new(state.clone(), backend.clone(), session),
            goals: GoalsSlice::new(state.clone(), pending.clone(), backend.clone()),
            daily: DailySlice::new(state.clone(), pending.clone(), backend.clone()),
            social: SocialSlice::new(state.clone(), pending.clone(), backend),
            state,
        }
    }

    pub fn auth(&self) -> &AuthSlice {
        &self.auth
    }

    pub fn goals(&self) -> &GoalsSlice {
        &self.goals
    }

    pub fn daily(&self) -> &DailySlice {
        &self.daily
    }

    pub fn social(&self) -> &SocialSlice {
        &self.social
    }

    /// Snapshot of the whole state, for rendering and for the metrics
    /// calculators.
    pub fn snapshot(&self) -> AppState {
        self.state.read(|s| s.clone())
    }

    /// Revision channel; the UI re-renders whenever it ticks.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.subscribe()
    }

    /// Overall consistency percentage over the current state.
    pub fn overall_consistency(&self) -> u8 {
        self.state.read(|s| {
            crate::metrics::overall_consistency(
                &s.daily.actions,
                &s.daily.completed_actions,
                chrono::Utc::now().date_naive(),
            )
        })
    }

    /// Gamified score over the current state.
    pub fn total_score(&self) -> u32 {
        self.state.read(|s| crate::metrics::total_score(&s.daily.actions, &s.goals.goals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockAdapter;
    use crate::error::BackendError;
    use crate::models::{ActionDraft, GoalDraft};
    use crate::session::MemorySessionStore;
    use std::time::Duration;

    fn store_with_mock() -> (Store, Arc<MockAdapter>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mock = Arc::new(MockAdapter::new());
        let backend = Backend::with_adapter(mock.clone(), Duration::from_secs(5));
        let store = Store::new(backend, Arc::new(MemorySessionStore::new()));
        (store, mock)
    }

    #[test]
    fn update_bumps_revision_once_per_transition() {
        let cell = StateCell::new();
        let rx = cell.subscribe();
        let before = *rx.borrow();
        cell.update(|s| s.goals.loading = true);
        cell.update(|s| s.goals.loading = false);
        assert_eq!(*rx.borrow(), before + 2);
    }

    #[test]
    fn pending_keys_serialize_per_entity() {
        let pending = PendingKeys::default();
        assert!(pending.try_acquire("action:a1"));
        assert!(!pending.try_acquire("action:a1"));
        // A different entity is unaffected.
        assert!(pending.try_acquire("action:a2"));
        pending.release("action:a1");
        assert!(pending.try_acquire("action:a1"));
    }

    #[tokio::test]
    async fn mutations_on_different_entities_proceed_while_one_is_pending() {
        let (store, mock) = store_with_mock();
        assert!(store
            .daily()
            .add_action(ActionDraft { title: "Stretch".into(), ..Default::default() })
            .await
            .is_committed());
        assert!(store
            .daily()
            .add_action(ActionDraft { title: "Read".into(), ..Default::default() })
            .await
            .is_committed());
        let ids: Vec<String> = store.daily().actions().iter().map(|a| a.id.clone()).collect();

        let hold = mock.install_hold();
        let slice = store.daily().clone();
        let held_id = ids[0].clone();
        let held = tokio::spawn(async move { slice.toggle_action(&held_id).await });
        hold.entered.notified().await;
        mock.clear_hold();

        // A different action commits while the first is still in flight.
        assert!(store.daily().toggle_action(&ids[1]).await.is_committed());

        hold.release.notify_one();
        assert!(held.await.unwrap().is_committed());
        assert!(store.daily().actions().iter().all(|a| a.done));
    }

    #[tokio::test]
    async fn rollback_on_one_entity_leaves_a_concurrent_commit_intact() {
        let (store, mock) = store_with_mock();
        assert!(store
            .goals()
            .add_goal(GoalDraft {
                title: "Run 5K".into(),
                metric: "3x/week".into(),
                deadline: "2025-12-31".into(),
                ..Default::default()
            })
            .await
            .is_committed());
        assert!(store
            .daily()
            .add_action(ActionDraft { title: "Stretch".into(), ..Default::default() })
            .await
            .is_committed());
        let action_id = store.daily().actions()[0].id.clone();

        // The goal delete fails while the toggle succeeds.
        mock.fail_next(BackendError::Network("offline".into()));
        let goal_id = store.goals().goals()[0].id.clone();
        let (deleted, toggled) = tokio::join!(
            store.goals().delete_goal(&goal_id),
            store.daily().toggle_action(&action_id),
        );

        assert!(matches!(deleted, MutationOutcome::RolledBack(_)));
        assert!(toggled.is_committed());
        assert_eq!(store.goals().goals().len(), 1);
        assert!(store.daily().actions()[0].done);
    }

    #[tokio::test]
    async fn derived_metrics_read_the_live_snapshot() {
        let (store, _mock) = store_with_mock();
        assert!(store
            .goals()
            .add_goal(GoalDraft {
                title: "Run 5K".into(),
                metric: "3x/week".into(),
                deadline: "2025-12-31".into(),
                ..Default::default()
            })
            .await
            .is_committed());
        assert!(store
            .daily()
            .add_action(ActionDraft { title: "Stretch".into(), ..Default::default() })
            .await
            .is_committed());
        let action_id = store.daily().actions()[0].id.clone();
        assert!(store.daily().toggle_action(&action_id).await.is_committed());

        // 1 completion today of 1 action; 10 + 5 + 100 points.
        assert_eq!(store.overall_consistency(), 100);
        assert_eq!(store.total_score(), 115);
    }

    #[tokio::test]
    async fn fresh_user_starts_from_zero() {
        let (store, _mock) = store_with_mock();
        store.goals().fetch_goals().await;
        store.daily().fetch_daily_actions().await;
        store.social().fetch_feeds().await;

        let snapshot = store.snapshot();
        assert!(snapshot.goals.goals.is_empty());
        assert!(snapshot.daily.actions.is_empty());
        assert!(snapshot.social.circle_feed.is_empty());
        assert_eq!(store.overall_consistency(), 0);
        assert_eq!(store.total_score(), 0);
    }

    #[tokio::test]
    async fn completing_a_streak_extends_it_and_logs_history() {
        let (store, mock) = store_with_mock();
        mock.actions.lock().unwrap().push(shared::ActionDto {
            id: "a1".into(),
            title: "Run".into(),
            goal_id: None,
            goal_title: None,
            kind: None,
            frequency: None,
            time: None,
            streak: 6,
            done: false,
        });
        store.daily().fetch_daily_actions().await;

        assert!(store.daily().toggle_action("a1").await.is_committed());
        let action = &store.daily().actions()[0];
        assert!(action.done);
        assert_eq!(action.streak, 7);

        store.daily().add_completed_action(crate::models::CompletedAction {
            id: "c1".into(),
            action_id: "a1".into(),
            title: action.title.clone(),
            goal_id: None,
            goal_title: None,
            completed_at: chrono::Utc::now(),
            is_private: false,
            streak: action.streak,
            kind: crate::models::CompletedKind::Check,
            media_url: None,
            category: None,
        });
        let history = store.daily().completed_actions();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].streak, 7);
    }
}
