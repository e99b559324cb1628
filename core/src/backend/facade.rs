//! # Backend Facade
//!
//! One `Backend` per store, wrapping exactly one adapter chosen from
//! [`BackendConfig`]. This is the single point where failures become data:
//! every call runs under a bounded timeout, and every error that crosses this
//! boundary is already classified as a [`BackendError`], so slices decide
//! retry-vs-fatal from the kind, never from backend identity.

use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shared::{
    ActionDto, AuthPayload, CircleDto, CreateActionRequest, CreateGoalRequest, CreatePostRequest,
    GoalDto, PostDto, UpdateActionRequest, UpdateGoalRequest, UserDto,
};

use crate::backend::traits::BackendAdapter;
use crate::backend::{BackendConfig, BackendKind, HostedAdapter, RestAdapter};
use crate::error::BackendError;
use crate::models::Visibility;

#[derive(Clone)]
pub struct Backend {
    adapter: Arc<dyn BackendAdapter>,
    timeout: Duration,
}

impl Backend {
    /// Build the facade from static configuration, constructing the one
    /// concrete adapter the deployment uses. A hosted config without an API
    /// key is rejected here instead of failing every later call with an
    /// opaque remote auth error.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let adapter: Arc<dyn BackendAdapter> = match config.kind {
            BackendKind::Rest => Arc::new(RestAdapter::new(config.base_url.clone())),
            BackendKind::Hosted => {
                let api_key = config
                    .api_key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        BackendError::Validation(
                            "hosted backend requires an api key".to_string(),
                        )
                    })?;
                Arc::new(HostedAdapter::new(config.base_url.clone(), api_key))
            }
        };
        Ok(Backend { adapter, timeout: config.request_timeout })
    }

    /// Wrap an already-constructed adapter. Used by tests to install a
    /// scripted double.
    pub fn with_adapter(adapter: Arc<dyn BackendAdapter>, timeout: Duration) -> Self {
        Backend { adapter, timeout }
    }

    /// Install or clear the session token on the underlying adapter.
    pub fn set_session_token(&self, token: Option<String>) {
        self.adapter.set_session_token(token);
    }

    /// Run one adapter call under the configured timeout. A hung call is
    /// failed with `Timeout` so no entity stays `Pending` forever.
    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        debug!("backend call: {op}");
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("backend call {op} failed: {e}");
                Err(e)
            }
            Err(_) => {
                warn!("backend call {op} timed out after {:?}", self.timeout);
                Err(BackendError::Timeout(self.timeout))
            }
        }
    }

    // --- auth ---

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, BackendError> {
        self.call("sign_up", self.adapter.sign_up(email, password, name)).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, BackendError> {
        self.call("sign_in", self.adapter.sign_in(email, password)).await
    }

    pub async fn sign_out(&self) -> Result<(), BackendError> {
        self.call("sign_out", self.adapter.sign_out()).await
    }

    pub async fn get_profile(&self) -> Result<UserDto, BackendError> {
        self.call("get_profile", self.adapter.get_profile()).await
    }

    // --- goals ---

    pub async fn get_goals(&self) -> Result<Vec<GoalDto>, BackendError> {
        self.call("get_goals", self.adapter.get_goals()).await
    }

    pub async fn create_goal(&self, req: CreateGoalRequest) -> Result<GoalDto, BackendError> {
        self.call("create_goal", self.adapter.create_goal(req)).await
    }

    pub async fn update_goal(
        &self,
        id: &str,
        patch: UpdateGoalRequest,
    ) -> Result<GoalDto, BackendError> {
        self.call("update_goal", self.adapter.update_goal(id, patch)).await
    }

    pub async fn delete_goal(&self, id: &str) -> Result<(), BackendError> {
        self.call("delete_goal", self.adapter.delete_goal(id)).await
    }

    // --- daily actions ---

    pub async fn get_daily_actions(&self) -> Result<Vec<ActionDto>, BackendError> {
        self.call("get_daily_actions", self.adapter.get_daily_actions()).await
    }

    pub async fn create_action(&self, req: CreateActionRequest) -> Result<ActionDto, BackendError> {
        self.call("create_action", self.adapter.create_action(req)).await
    }

    pub async fn update_action(
        &self,
        id: &str,
        patch: UpdateActionRequest,
    ) -> Result<ActionDto, BackendError> {
        self.call("update_action", self.adapter.update_action(id, patch)).await
    }

    pub async fn delete_action(&self, id: &str) -> Result<(), BackendError> {
        self.call("delete_action", self.adapter.delete_action(id)).await
    }

    pub async fn complete_action(&self, id: &str) -> Result<ActionDto, BackendError> {
        self.call("complete_action", self.adapter.complete_action(id)).await
    }

    // --- social feed ---

    pub async fn get_feed(&self, scope: Visibility) -> Result<Vec<PostDto>, BackendError> {
        self.call("get_feed", self.adapter.get_feed(scope)).await
    }

    pub async fn create_post(&self, req: CreatePostRequest) -> Result<PostDto, BackendError> {
        self.call("create_post", self.adapter.create_post(req)).await
    }

    pub async fn react_to_post(&self, post_id: &str, emoji: &str) -> Result<(), BackendError> {
        self.call("react_to_post", self.adapter.react_to_post(post_id, emoji)).await
    }

    // --- relationships ---

    pub async fn create_circle(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CircleDto, BackendError> {
        self.call("create_circle", self.adapter.create_circle(name, description)).await
    }

    pub async fn join_circle(&self, invite_code: &str) -> Result<CircleDto, BackendError> {
        self.call("join_circle", self.adapter.join_circle(invite_code)).await
    }

    pub async fn get_my_circle(&self) -> Result<Option<CircleDto>, BackendError> {
        self.call("get_my_circle", self.adapter.get_my_circle()).await
    }

    pub async fn get_circle_members(&self, circle_id: &str) -> Result<Vec<UserDto>, BackendError> {
        self.call("get_circle_members", self.adapter.get_circle_members(circle_id)).await
    }

    pub async fn follow_user(&self, user_id: &str) -> Result<(), BackendError> {
        self.call("follow_user", self.adapter.follow_user(user_id)).await
    }

    pub async fn unfollow_user(&self, user_id: &str) -> Result<(), BackendError> {
        self.call("unfollow_user", self.adapter.unfollow_user(user_id)).await
    }

    pub async fn get_following(&self) -> Result<Vec<UserDto>, BackendError> {
        self.call("get_following", self.adapter.get_following()).await
    }

    pub async fn get_followers(&self) -> Result<Vec<UserDto>, BackendError> {
        self.call("get_followers", self.adapter.get_followers()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_config_without_api_key_is_rejected_at_construction() {
        let config = BackendConfig {
            kind: BackendKind::Hosted,
            base_url: "https://data.example.com".to_string(),
            api_key: None,
            request_timeout: BackendConfig::DEFAULT_TIMEOUT,
        };
        assert!(matches!(
            Backend::from_config(&config),
            Err(BackendError::Validation(_))
        ));

        let empty_key = BackendConfig { api_key: Some(String::new()), ..config };
        assert!(matches!(
            Backend::from_config(&empty_key),
            Err(BackendError::Validation(_))
        ));
    }

    #[test]
    fn rest_config_needs_no_api_key() {
        let config = BackendConfig::rest("https://api.example.com");
        assert!(Backend::from_config(&config).is_ok());
    }
}
