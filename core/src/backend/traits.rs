//! # Backend Adapter Trait
//!
//! This module defines the capability contract both remote backends (the
//! hosted data platform and the custom REST API) implement identically, so
//! the slices never branch on backend identity.
//!
//! Every operation is a single logical transaction against the remote store:
//! an insert returns the created row in the same call, never an insert
//! followed by a separate fetch that could be left dangling on failure.
//! Adapters own all wire-shape translation; callers see the `shared` DTOs
//! and a classified [`BackendError`] on failure.

use async_trait::async_trait;
use shared::{
    ActionDto, AuthPayload, CircleDto, CreateActionRequest, CreateGoalRequest, CreatePostRequest,
    GoalDto, PostDto, UpdateActionRequest, UpdateGoalRequest, UserDto,
};

use crate::error::BackendError;
use crate::models::Visibility;

/// Contract implemented by each concrete backend driver.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    // --- auth ---

    async fn sign_up(&self, email: &str, password: &str, name: &str)
        -> Result<AuthPayload, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    async fn get_profile(&self) -> Result<UserDto, BackendError>;

    /// Install or clear the session token used for authenticated calls.
    /// Called on sign-in, on session restore from durable storage, and on
    /// logout. Synchronous: adapters keep the token in memory.
    fn set_session_token(&self, token: Option<String>);

    // --- goals ---

    async fn get_goals(&self) -> Result<Vec<GoalDto>, BackendError>;

    async fn create_goal(&self, req: CreateGoalRequest) -> Result<GoalDto, BackendError>;

    async fn update_goal(&self, id: &str, patch: UpdateGoalRequest)
        -> Result<GoalDto, BackendError>;

    async fn delete_goal(&self, id: &str) -> Result<(), BackendError>;

    // --- daily actions ---

    /// List the caller's daily actions. The server scopes completion flags
    /// to the current day.
    async fn get_daily_actions(&self) -> Result<Vec<ActionDto>, BackendError>;

    async fn create_action(&self, req: CreateActionRequest) -> Result<ActionDto, BackendError>;

    async fn update_action(&self, id: &str, patch: UpdateActionRequest)
        -> Result<ActionDto, BackendError>;

    async fn delete_action(&self, id: &str) -> Result<(), BackendError>;

    /// Mark an action complete for today and bump its streak, atomically on
    /// the server. Returns the updated row.
    async fn complete_action(&self, id: &str) -> Result<ActionDto, BackendError>;

    // --- social feed ---

    async fn get_feed(&self, scope: Visibility) -> Result<Vec<PostDto>, BackendError>;

    async fn create_post(&self, req: CreatePostRequest) -> Result<PostDto, BackendError>;

    /// Toggle the calling user's reaction `(post, emoji)`. The server decides
    /// add-vs-remove from its own state, so retries cannot double-count.
    async fn react_to_post(&self, post_id: &str, emoji: &str) -> Result<(), BackendError>;

    // --- relationships ---
    //
    // Not every backend serves these; drivers without the capability return
    // `BackendError::Unsupported` instead of panicking, so the facade can
    // surface one uniform error shape.

    async fn create_circle(&self, name: &str, description: Option<&str>)
        -> Result<CircleDto, BackendError>;

    async fn join_circle(&self, invite_code: &str) -> Result<CircleDto, BackendError>;

    async fn get_my_circle(&self) -> Result<Option<CircleDto>, BackendError>;

    async fn get_circle_members(&self, circle_id: &str) -> Result<Vec<UserDto>, BackendError>;

    async fn follow_user(&self, user_id: &str) -> Result<(), BackendError>;

    async fn unfollow_user(&self, user_id: &str) -> Result<(), BackendError>;

    async fn get_following(&self) -> Result<Vec<UserDto>, BackendError>;

    async fn get_followers(&self) -> Result<Vec<UserDto>, BackendError>;
}
