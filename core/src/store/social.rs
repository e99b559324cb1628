//! # Social Slice
//!
//! The two feeds (circle and follow) and the reactions on them. Both feeds
//! refresh concurrently and fail independently; a dead follow feed never
//! blanks a healthy circle feed. Reactions are per-emoji toggles keyed by
//! `post:{id}:react:{emoji}`, so reacting with two different emojis on the
//! same post can proceed concurrently while a double-tap on one emoji cannot.

use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::BackendError;
use crate::models::{temp_id, Comment, Post, PostDraft, Visibility};
use crate::store::optimistic::{mutate, MutationOutcome};
use crate::store::{AppState, PendingKeys, StateCell};

#[derive(Clone)]
pub struct SocialSlice {
    state: Arc<StateCell>,
    pending: Arc<PendingKeys>,
    backend: Arc<Backend>,
}

/// A post can appear in both feeds, so every edit walks both lists.
fn for_post(s: &mut AppState, post_id: &str, mut f: impl FnMut(&mut Post)) {
    for feed in [&mut s.social.circle_feed, &mut s.social.follow_feed] {
        if let Some(post) = feed.iter_mut().find(|p| p.id == post_id) {
            f(post);
        }
    }
}

fn find_post(s: &AppState, post_id: &str) -> Option<Post> {
    s.social
        .circle_feed
        .iter()
        .chain(s.social.follow_feed.iter())
        .find(|p| p.id == post_id)
        .cloned()
}

impl SocialSlice {
    pub(crate) fn new(
        state: Arc<StateCell>,
        pending: Arc<PendingKeys>,
        backend: Arc<Backend>,
    ) -> Self {
        SocialSlice { state, pending, backend }
    }

    pub fn circle_feed(&self) -> Vec<Post> {
        self.state.read(|s| s.social.circle_feed.clone())
    }

    pub fn follow_feed(&self) -> Vec<Post> {
        self.state.read(|s| s.social.follow_feed.clone())
    }

    pub fn loading(&self) -> bool {
        self.state.read(|s| s.social.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.state.read(|s| s.social.error.clone())
    }

    pub fn clear_error(&self) {
        self.state.update(|s| s.social.error = None);
    }

    /// Refresh both feeds concurrently. Each leg replaces its own list on
    /// success; a failed leg keeps its stale posts and records the error.
    pub async fn fetch_feeds(&self) {
        self.state.update(|s| {
            s.social.loading = true;
            s.social.error = None;
        });
        let current_user = self.state.read(|s| s.auth.user.as_ref().map(|u| u.id.clone()));

        let (circle, follow) = tokio::join!(
            self.backend.get_feed(Visibility::Circle),
            self.backend.get_feed(Visibility::Follow),
        );

        self.state.update(|s| {
            let uid = current_user.as_deref();
            match circle {
                Ok(dtos) => {
                    s.social.circle_feed =
                        dtos.into_iter().map(|d| Post::from_dto(d, uid)).collect();
                }
                Err(e) => s.social.error = Some(e.to_string()),
            }
            match follow {
                Ok(dtos) => {
                    s.social.follow_feed =
                        dtos.into_iter().map(|d| Post::from_dto(d, uid)).collect();
                }
                // An unsupported follow feed is an empty feed, not a failure.
                Err(BackendError::Unsupported(_)) => s.social.follow_feed = Vec::new(),
                Err(e) => s.social.error = Some(e.to_string()),
            }
            s.social.loading = false;
        });
    }

    /// Toggle the current user's reaction with `emoji` on `post_id`.
    pub async fn react(&self, post_id: &str, emoji: &str) -> MutationOutcome {
        if self.state.read(|s| find_post(s, post_id)).is_none() {
            let e = BackendError::Validation(format!("unknown post {post_id}"));
            self.state.update(|s| s.social.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        let key = format!("post:{post_id}:react:{emoji}");
        let propose_post = post_id.to_string();
        let propose_emoji = emoji.to_string();
        mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                // Exact prior snapshots, one per feed the post appears in.
                let prior_circle = s
                    .social
                    .circle_feed
                    .iter()
                    .find(|p| p.id == propose_post)
                    .cloned();
                let prior_follow = s
                    .social
                    .follow_feed
                    .iter()
                    .find(|p| p.id == propose_post)
                    .cloned();
                for_post(s, &propose_post, |post| {
                    // Each (post, emoji) pair toggles independently of the
                    // user's other reactions on the same post.
                    if post.user_reactions.remove(&propose_emoji) {
                        match post.reactions.get_mut(&propose_emoji) {
                            Some(count) if *count > 1 => *count -= 1,
                            _ => {
                                post.reactions.remove(&propose_emoji);
                            }
                        }
                    } else {
                        *post.reactions.entry(propose_emoji.clone()).or_insert(0) += 1;
                        post.user_reactions.insert(propose_emoji.clone());
                    }
                });
                Box::new(move |s: &mut AppState| {
                    if let Some(prior) = prior_circle {
                        if let Some(post) =
                            s.social.circle_feed.iter_mut().find(|p| p.id == prior.id)
                        {
                            *post = prior;
                        }
                    }
                    if let Some(prior) = prior_follow {
                        if let Some(post) =
                            s.social.follow_feed.iter_mut().find(|p| p.id == prior.id)
                        {
                            *post = prior;
                        }
                    }
                })
            },
            self.backend.react_to_post(post_id, emoji),
            // The server stores the toggle; the optimistic counts stand.
            |_, _| {},
            |s, e| s.social.error = Some(e.to_string()),
        )
        .await
    }

    /// Optimistically publish a post at the head of the feed its visibility
    /// selects. A failed commit removes the provisional post outright; there
    /// is no earlier state to merge it back into.
    pub async fn add_post(&self, draft: PostDraft) -> MutationOutcome {
        if draft.content.trim().is_empty() && draft.media_url.is_none() {
            let e = BackendError::Validation("post needs content or media".into());
            self.state.update(|s| s.social.error = Some(e.to_string()));
            return MutationOutcome::Rejected(e);
        }
        let (user_name, user_id, avatar) = self.state.read(|s| {
            let user = s.auth.user.as_ref();
            (
                user.map(|u| u.name.clone()).unwrap_or_else(|| "You".to_string()),
                user.map(|u| u.id.clone()),
                user.and_then(|u| u.avatar.clone()),
            )
        });
        let provisional_id = temp_id();
        let provisional = Post {
            id: provisional_id.clone(),
            user: user_name,
            avatar,
            kind: draft.kind,
            visibility: draft.visibility,
            content: draft.content.clone(),
            timestamp: chrono::Utc::now(),
            reactions: Default::default(),
            user_reactions: Default::default(),
            comments: Vec::new(),
            media_url: draft.media_url.clone(),
            action_title: draft.action_title.clone(),
            goal_title: draft.goal_title.clone(),
            goal_color: draft.goal_color.clone(),
            streak: draft.streak,
        };
        let scope = draft.visibility;
        let key = format!("post:{provisional_id}");
        let undo_id = provisional_id.clone();
        let reconcile_id = provisional_id.clone();
        let outcome = mutate(
            &self.state,
            &self.pending,
            &key,
            move |s| {
                let feed = match scope {
                    Visibility::Circle => &mut s.social.circle_feed,
                    Visibility::Follow => &mut s.social.follow_feed,
                };
                feed.insert(0, provisional);
                Box::new(move |s: &mut AppState| {
                    let feed = match scope {
                        Visibility::Circle => &mut s.social.circle_feed,
                        Visibility::Follow => &mut s.social.follow_feed,
                    };
                    feed.retain(|p| p.id != undo_id);
                })
            },
            self.backend.create_post(draft.to_request()),
            move |s, dto| {
                let confirmed = Post::from_dto(dto, user_id.as_deref());
                let feed = match scope {
                    Visibility::Circle => &mut s.social.circle_feed,
                    Visibility::Follow => &mut s.social.follow_feed,
                };
                if let Some(post) = feed.iter_mut().find(|p| p.id == reconcile_id) {
                    // The provisional timestamp and confirmed id both matter;
                    // the server copy wins wholesale.
                    *post = confirmed;
                }
            },
            |s, e| s.social.error = Some(e.to_string()),
        )
        .await;
        if outcome.is_committed() {
            info!("post published to {} feed", scope.as_str());
        }
        outcome
    }

    /// Attach a comment locally. Comments have no remote persistence yet, so
    /// this is a plain transition with a client-generated id.
    pub fn add_comment(&self, post_id: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let user = self
            .state
            .read(|s| s.auth.user.as_ref().map(|u| u.name.clone()))
            .unwrap_or_else(|| "You".to_string());
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            user,
            text: text.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.state.update(|s| {
            for_post(s, post_id, |post| post.comments.push(comment.clone()));
        });
    }

    /// Remote comment loading is not wired up yet; the local list stands.
    pub async fn load_comments(&self, _post_id: &str) {}
}
