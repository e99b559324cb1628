//! # Daily Slice
//!
//! Today's actions and the append-only completion history. The toggle is the
//! hot path of the whole protocol: completing bumps the streak optimistically
//! and confirms through the dedicated completion endpoint, un-completing
//! reverses both through a plain patch. Both directions share the
//! `action:{id}` key so a double-tap cannot interleave.

use log::info;
use shared::UpdateActionRequest;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::models::{temp_id, ActionDraft, ActionItem, ActionKind, ActionPatch, CompletedAction};
use crate::store::optimistic::{mutate, MutationOutcome};
use crate::store::{AppState, PendingKeys, StateCell};

#[derive(Clone)]
pub struct DailySlice {
    state: Arc<StateCell>,
    pending: Arc<PendingKeys>,
    backend: Arc<Backend>,
}

impl DailySlice {
    pub(crate) fn new(
        state: Arc<StateCell>,
        pending: Arc<PendingKeys>,
        backend: Arc<Backend>,
    ) -> Self {
        DailySlice { state, pending, backend }
    }

    pub fn actions(&self) -> Vec<ActionItem> {
        self.state.read(|s| s.daily.actions.clone())
    }

    pub fn completed_actions(&self) -> Vec<CompletedAction> {
        self.state.read(|s| s.daily.completed_actions.clone())
    }

    pub fn loading(&self) -> bool {
        self.state.read(|s| s.daily.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.state.read(|s| s.daily.error.clone())
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.daily.error = None);
    }

    /// Full refresh of today's actions. Stale data survives a failed fetch.
    pub async fn fetch_daily_actions(&self) {
        self.state.update(|s| {
            s.daily.loading = true;
            s.daily.error = None;
        });
        match self.backend.get_daily_actions().await {
            Ok(dtos) => self.state.update(|s| {
                s.daily.actions = dtos.into_iter().map(ActionItem::from_dto).collect();
                s.daily.loading = false;
            }),
            Err(e) => self.state.update(|s| {
                s.daily.loading = false;
                s.daily.error = Some(e.to_string());
            }),
        }
    }

    /// Optimistically append a new action to today's list.
    pub async fn add_action(&self, draft: ActionDraft) -> MutationOutcome {
        if draft.title.trim().is_empty() {
            let e = BackendError::Validation("action title must not be empty".into());
            self.state.update(|s| s.daily.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        let provisional_id = temp_id();
        let provisional = ActionItem {
            id: provisional_id.clone(),
            title: draft.title.clone(),
            goal_id: draft.goal_id.clone(),
            goal_title: draft.goal_title.clone(),
            kind: draft.kind.unwrap_or(ActionKind::Commitment),
            frequency: draft.frequency.clone(),
            time: draft.time.clone(),
            streak: 0,
            done: false,
        };
        let key = format!("action:{provisional_id}");
        let undo_id = provisional_id.clone();
        let reconcile_id = provisional_id.clone();
        mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                s.daily.actions.push(provisional);
                Box::new(move |s: &mut AppState| s.daily.actions.retain(|a| a.id != undo_id))
            },
            self.backend.create_action(draft.to_request()),
            move |s, dto| {
                if let Some(action) = s.daily.actions.iter_mut().find(|a| a.id == reconcile_id) {
                    action.merge_dto(dto);
                }
            },
            |s, e| s.daily.error = Some(e.to_string()),
        )
        .await
    }

    /// Optimistically apply a partial edit to the action with `id`.
    pub async fn update_action(&self, id: &str, patch: ActionPatch) -> MutationOutcome {
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            let e = BackendError::Validation("action title must not be empty".into());
            self.state.update(|s| s.daily.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        let key = format!("action:{id}");
        let request = patch.to_request();
        let propose_id = id.to_string();
        let reconcile_id = id.to_string();
        mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                let prior = s.daily.actions.iter().find(|a| a.id == propose_id).cloned();
                if let Some(action) = s.daily.actions.iter_mut().find(|a| a.id == propose_id) {
                    patch.apply(action);
                }
                Box::new(move |s: &mut AppState| {
                    if let Some(prior) = prior {
                        if let Some(action) =
                            s.daily.actions.iter_mut().find(|a| a.id == prior.id)
                        {
                            *action = prior;
                        }
                    }
                })
            },
            self.backend.update_action(id, request),
            move |s: &mut AppState, dto| {
                if let Some(action) = s.daily.actions.iter_mut().find(|a| a.id == reconcile_id) {
                    action.merge_dto(dto);
                }
            },
            |s, e| s.daily.error = Some(e.to_string()),
        )
        .await
    }

    /// Optimistically remove the action with `id`, reinserting at the original
    /// index on rollback.
    pub async fn delete_action(&self, id: &str) -> MutationOutcome {
        let key = format!("action:{id}");
        let propose_id = id.to_string();
        mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                let index = s.daily.actions.iter().position(|a| a.id == propose_id);
                let removed = index.map(|i| s.daily.actions.remove(i));
                Box::new(move |s: &mut AppState| {
                    if let (Some(index), Some(action)) = (index, removed) {
                        let at = index.min(s.daily.actions.len());
                        s.daily.actions.insert(at, action);
                    }
                })
            },
            self.backend.delete_action(id),
            |_, _| {},
            |s, e| s.daily.error = Some(e.to_string()),
        )
        .await
    }

    /// Flip the done state of the action with `id`.
    ///
    /// Completing bumps the streak and confirms through the completion
    /// endpoint. Un-completing is a real server operation too, a patch that
    /// clears the flag and takes the streak back down, so local state and the
    /// server never drift apart on an accidental tap.
    pub async fn toggle_action(&self, id: &str) -> MutationOutcome {
        let current = self.state.read(|s| {
            s.daily
                .actions
                .iter()
                .find(|a| a.id == id)
                .map(|a| (a.done, a.streak))
        });
        let Some((done, streak)) = current else {
            let e = BackendError::Validation(format!("unknown action {id}"));
            self.state.update(|s| s.daily.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        };

        let key = format!("action:{id}");
        let propose_id = id.to_string();
        let reconcile_id = id.to_string();
        let propose = move |s: &mut AppState| {
            let prior = s.daily.actions.iter().find(|a| a.id == propose_id).cloned();
            if let Some(action) = s.daily.actions.iter_mut().find(|a| a.id == propose_id) {
                if action.done {
                    action.done = false;
                    action.streak = action.streak.saturating_sub(1);
                } else {
                    action.done = true;
                    action.streak += 1;
                }
            }
            Box::new(move |s: &mut AppState| {
                if let Some(prior) = prior {
                    if let Some(action) = s.daily.actions.iter_mut().find(|a| a.id == prior.id) {
                        *action = prior;
                    }
                }
            }) as Box<dyn FnOnce(&mut AppState) + Send>
        };
        let reconcile = move |s: &mut AppState, dto| {
            if let Some(action) = s.daily.actions.iter_mut().find(|a| a.id == reconcile_id) {
                action.merge_dto(dto);
            }
        };
        let on_error = |s: &mut AppState, e: &BackendError| s.daily.error = Some(e.to_string());

        let outcome = if done {
            let patch = UpdateActionRequest {
                title: None,
                goal_id: None,
                frequency: None,
                time: None,
                done: Some(false),
                streak: Some(streak.saturating_sub(1)),
            };
            mutate(
                &self.state,
                &self.pending,
                &key,
                propose,
                self.backend.update_action(id, patch),
                reconcile,
                on_error,
            )
            .await
        } else {
            mutate(
                &self.state,
                &self.pending,
                &key,
                propose,
                self.backend.complete_action(id),
                reconcile,
                on_error,
            )
            .await
        };
        if outcome.is_committed() {
            info!("action {} {}", id, if done { "un-completed" } else { "completed" });
        }
        outcome
    }

    /// Record a completion event in the local history. The history is
    /// append-only and never mutated by later edits to the source action.
    pub fn add_completed_action(&self, record: CompletedAction) {
        self.state.update(|s| s.daily.completed_actions.push(record));
    }

    /// Start a fresh day: clear every done flag, touch nothing else. Streaks
    /// and the completion history are left exactly as they were.
    pub fn roll_over_day(&self) {
        self.state.update(|s| {
            for action in &mut s.daily.actions {
                action.done = false;
            }
        });
        info!("day rolled over");
    }
}
