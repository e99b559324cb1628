//! # Goals Slice
//!
//! Long-term goals with milestones. Creates, edits and deletes go through the
//! optimistic protocol keyed by `goal:{id}`; milestone edits are local-only
//! (no server round trip) and therefore plain atomic transitions.

use log::info;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::models::{temp_id, Goal, GoalDraft, GoalPatch, Milestone};
use crate::store::optimistic::{mutate, MutationOutcome};
use crate::store::{AppState, PendingKeys, StateCell};

#[derive(Clone)]
pub struct GoalsSlice {
    state: Arc<StateCell>,
    pending: Arc<PendingKeys>,
    backend: Arc<Backend>,
}

impl GoalsSlice {
    pub(crate) fn new(
        state: Arc<StateCell>,
        pending: Arc<PendingKeys>,
        backend: Arc<Backend>,
    ) -> Self {
        GoalsSlice { state, pending, backend }
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.state.read(|s| s.goals.goals.clone())
    }

    pub fn loading(&self) -> bool {
        self.state.read(|s| s.goals.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.state.read(|s| s.goals.error.clone())
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.goals.error = None);
    }

    /// Full refresh from the server. On failure the stale list is kept and
    /// the error recorded; a refresh never destroys data the user can see.
    pub async fn fetch_goals(&self) {
        self.state.update(|s| {
            s.goals.loading = true;
            s.goals.error = None;
        });
        match self.backend.get_goals().await {
            Ok(dtos) => self.state.update(|s| {
                s.goals.goals = dtos.into_iter().map(Goal::from_dto).collect();
                s.goals.loading = false;
            }),
            Err(e) => self.state.update(|s| {
                s.goals.loading = false;
                s.goals.error = Some(e.to_string());
            }),
        }
    }

    /// Optimistically add a goal at the head of the list. The provisional
    /// record carries a temp id until the server-assigned one replaces it.
    pub async fn add_goal(&self, draft: GoalDraft) -> MutationOutcome {
        if let Err(e) = validate_draft(&draft) {
            self.state.update(|s| s.goals.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        let provisional_id = temp_id();
        let provisional = Goal {
            id: provisional_id.clone(),
            title: draft.title.clone(),
            metric: draft.metric.clone(),
            deadline: draft.deadline.clone(),
            why: draft.why.clone(),
            category: draft.category.unwrap_or(crate::models::Category::Other),
            color: draft.color.clone().unwrap_or_else(|| Goal::DEFAULT_COLOR.to_string()),
            milestones: Vec::new(),
        };
        let key = format!("goal:{provisional_id}");
        let undo_id = provisional_id.clone();
        let reconcile_id = provisional_id.clone();
        let outcome = mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                s.goals.goals.insert(0, provisional);
                Box::new(move |s: &mut AppState| s.goals.goals.retain(|g| g.id != undo_id))
            },
            self.backend.create_goal(draft.to_request()),
            move |s, dto| {
                if let Some(goal) = s.goals.goals.iter_mut().find(|g| g.id == reconcile_id) {
                    goal.merge_dto(dto);
                }
            },
            |s, e| s.goals.error = Some(e.to_string()),
        )
        .await;
        if outcome.is_committed() {
            info!("goal created");
        }
        outcome
    }

    /// Optimistically apply a partial edit to the goal with `id`.
    pub async fn update_goal(&self, id: &str, patch: GoalPatch) -> MutationOutcome {
        if let Err(e) = validate_patch(&patch) {
            self.state.update(|s| s.goals.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        if !self.state.read(|s| s.goals.goals.iter().any(|g| g.id == id)) {
            let e = BackendError::Validation(format!("unknown goal {id}"));
            self.state.update(|s| s.goals.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        let key = format!("goal:{id}");
        let request = patch.to_request();
        let propose_id = id.to_string();
        let reconcile_id = id.to_string();
        mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                let prior = s
                    .goals
                    .goals
                    .iter()
                    .find(|g| g.id == propose_id)
                    .cloned();
                if let Some(goal) = s.goals.goals.iter_mut().find(|g| g.id == propose_id) {
                    patch.apply(goal);
                }
                Box::new(move |s: &mut AppState| {
                    if let Some(prior) = prior {
                        if let Some(goal) = s.goals.goals.iter_mut().find(|g| g.id == prior.id) {
                            *goal = prior;
                        }
                    }
                })
            },
            self.backend.update_goal(id, request),
            move |s: &mut AppState, dto| {
                if let Some(goal) = s.goals.goals.iter_mut().find(|g| g.id == reconcile_id) {
                    goal.merge_dto(dto);
                }
            },
            |s, e| s.goals.error = Some(e.to_string()),
        )
        .await
    }

    /// Optimistically remove the goal with `id`. Rollback reinserts it at its
    /// original index so ordering survives a failed delete.
    pub async fn delete_goal(&self, id: &str) -> MutationOutcome {
        let key = format!("goal:{id}");
        let propose_id = id.to_string();
        mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                let index = s.goals.goals.iter().position(|g| g.id == propose_id);
                let removed = index.map(|i| s.goals.goals.remove(i));
                Box::new(move |s: &mut AppState| {
                    if let (Some(index), Some(goal)) = (index, removed) {
                        let at = index.min(s.goals.goals.len());
                        s.goals.goals.insert(at, goal);
                    }
                })
            },
            self.backend.delete_goal(id),
            |_, _| {},
            |s, e| s.goals.error = Some(e.to_string()),
        )
        .await
    }

    /// Replace the milestone list of a goal. Milestones live only in client
    /// state, so this is a plain local transition.
    pub fn update_goal_milestones(&self, goal_id: &str, milestones: Vec<Milestone>) {
        self.state.update(|s| {
            if let Some(goal) = s.goals.goals.iter_mut().find(|g| g.id == goal_id) {
                goal.milestones = milestones;
            }
        });
    }

    /// Flip one milestone's completed flag. Local-only, like the list edit.
    pub fn toggle_milestone_complete(&self, goal_id: &str, milestone_id: &str) {
        self.state.update(|s| {
            if let Some(goal) = s.goals.goals.iter_mut().find(|g| g.id == goal_id) {
                if let Some(m) = goal.milestones.iter_mut().find(|m| m.id == milestone_id) {
                    m.completed = !m.completed;
                }
            }
        });
    }
}

fn validate_draft(draft: &GoalDraft) -> Result<(), BackendError> {
    if draft.title.trim().is_empty() {
        return Err(BackendError::Validation("goal title must not be empty".into()));
    }
    if draft.metric.trim().is_empty() {
        return Err(BackendError::Validation("goal metric must not be empty".into()));
    }
    if draft.deadline.trim().is_empty() {
        return Err(BackendError::Validation("goal deadline must not be empty".into()));
    }
    Ok(())
}

fn validate_patch(patch: &GoalPatch) -> Result<(), BackendError> {
    if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
        return Err(BackendError::Validation("goal title must not be empty".into()));
    }
    if matches!(&patch.metric, Some(m) if m.trim().is_empty()) {
        return Err(BackendError::Validation("goal metric must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockAdapter;
    use crate::models::{is_temp_id, Category};
    use crate::session::MemorySessionStore;
    use crate::store::Store;
    use std::time::Duration;

    fn store_with_mock() -> (Store, Arc<MockAdapter>) {
        let mock = Arc::new(MockAdapter::new());
        let backend = Backend::with_adapter(mock.clone(), Duration::from_secs(5));
        let store = Store::new(backend, Arc::new(MemorySessionStore::new()));
        (store, mock)
    }

    fn draft(title: &str) -> GoalDraft {
        GoalDraft {
            title: title.to_string(),
            metric: "3x per week".to_string(),
            deadline: "2025-12-31".to_string(),
            category: Some(Category::Fitness),
            color: None,
            why: None,
        }
    }

    #[tokio::test]
    async fn add_goal_replaces_temp_id_with_server_id() {
        let (store, mock) = store_with_mock();
        let hold = mock.install_hold();

        let slice = store.goals().clone();
        let task = tokio::spawn(async move { slice.add_goal(draft("Run 5K")).await });

        // While the commit is in flight the provisional record is visible.
        hold.entered.notified().await;
        let provisional = store.goals().goals();
        assert_eq!(provisional.len(), 1);
        assert!(is_temp_id(&provisional[0].id));
        assert_eq!(provisional[0].title, "Run 5K");

        hold.release.notify_one();
        assert!(task.await.unwrap().is_committed());

        let confirmed = store.goals().goals();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, "goal-1");
        assert_eq!(confirmed[0].title, "Run 5K");
    }

    #[tokio::test]
    async fn add_goal_rollback_removes_provisional_record() {
        let (store, mock) = store_with_mock();
        mock.fail_next(BackendError::Network("offline".into()));

        let outcome = store.goals().add_goal(draft("Run 5K")).await;
        assert!(matches!(outcome, MutationOutcome::RolledBack(BackendError::Network(_))));
        assert!(store.goals().goals().is_empty());
        assert!(store.goals().error().is_some());
    }

    #[tokio::test]
    async fn add_goal_rejects_empty_title_before_any_state_change() {
        let (store, mock) = store_with_mock();
        let outcome = store.goals().add_goal(draft("   ")).await;
        assert!(matches!(outcome, MutationOutcome::Rejected(BackendError::Validation(_))));
        assert!(store.goals().goals().is_empty());
        assert!(mock.call_names().is_empty());
    }

    #[tokio::test]
    async fn update_goal_rolls_back_to_exact_prior_fields() {
        let (store, mock) = store_with_mock();
        assert!(store.goals().add_goal(draft("Run 5K")).await.is_committed());

        mock.fail_next(BackendError::Remote("rejected".into()));
        let patch = GoalPatch { title: Some("Run 10K".into()), ..Default::default() };
        let outcome = store.goals().update_goal("goal-1", patch).await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        let goals = store.goals().goals();
        assert_eq!(goals[0].title, "Run 5K");
        assert_eq!(store.goals().error().as_deref(), Some("rejected"));
    }

    #[tokio::test]
    async fn delete_goal_rollback_reinserts_at_original_index() {
        let (store, mock) = store_with_mock();
        assert!(store.goals().add_goal(draft("First")).await.is_committed());
        assert!(store.goals().add_goal(draft("Second")).await.is_committed());
        assert!(store.goals().add_goal(draft("Third")).await.is_committed());
        let before: Vec<String> =
            store.goals().goals().iter().map(|g| g.title.clone()).collect();

        mock.fail_next(BackendError::Network("offline".into()));
        let middle_id = store.goals().goals()[1].id.clone();
        let outcome = store.goals().delete_goal(&middle_id).await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        let after: Vec<String> = store.goals().goals().iter().map(|g| g.title.clone()).collect();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn second_mutation_on_pending_goal_is_skipped() {
        let (store, mock) = store_with_mock();
        assert!(store.goals().add_goal(draft("Run 5K")).await.is_committed());

        let hold = mock.install_hold();
        let slice = store.goals().clone();
        let first = tokio::spawn(async move {
            slice
                .update_goal("goal-1", GoalPatch { title: Some("Run 10K".into()), ..Default::default() })
                .await
        });
        hold.entered.notified().await;

        let second = store
            .goals()
            .update_goal("goal-1", GoalPatch { title: Some("Run 21K".into()), ..Default::default() })
            .await;
        assert!(matches!(second, MutationOutcome::Skipped));

        hold.release.notify_one();
        assert!(first.await.unwrap().is_committed());
        assert_eq!(store.goals().goals()[0].title, "Run 10K");
    }

    #[tokio::test]
    async fn milestone_edits_are_local_only() {
        let (store, mock) = store_with_mock();
        assert!(store.goals().add_goal(draft("Run 5K")).await.is_committed());
        let calls_before = mock.call_names().len();

        store.goals().update_goal_milestones(
            "goal-1",
            vec![Milestone {
                id: "m1".into(),
                title: "First parkrun".into(),
                target_date: "2025-09-01".into(),
                target_value: None,
                unit: None,
                completed: false,
                order: 1,
            }],
        );
        store.goals().toggle_milestone_complete("goal-1", "m1");

        let goals = store.goals().goals();
        assert!(goals[0].milestones[0].completed);
        assert_eq!(mock.call_names().len(), calls_before);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_stale_goals() {
        let (store, mock) = store_with_mock();
        assert!(store.goals().add_goal(draft("Run 5K")).await.is_committed());

        mock.fail_next(BackendError::Network("offline".into()));
        store.goals().fetch_goals().await;

        assert_eq!(store.goals().goals().len(), 1);
        assert!(store.goals().error().is_some());
        assert!(!store.goals().loading());
    }
}
