//! # REST Adapter
//!
//! Driver for the custom JSON-over-HTTP API. Every endpoint wraps its payload
//! in the [`ApiEnvelope`] shape; this adapter unwraps it and maps HTTP and
//! envelope failures onto the shared error taxonomy. The bearer token handed
//! out at sign-in is held here and attached to every authenticated request.
//!
//! The circle/follow relationship operations are not served by this backend;
//! they return [`BackendError::Unsupported`] so callers get the same soft
//! error shape from both drivers.

use async_trait::async_trait;
use log::debug;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Mutex;

use shared::{
    ActionDto, ApiEnvelope, AuthPayload, CircleDto, CreateActionRequest, CreateGoalRequest,
    CreatePostRequest, GoalDto, PostDto, SignInRequest, SignUpRequest, UpdateActionRequest,
    UpdateGoalRequest, UserDto,
};

use crate::backend::traits::BackendAdapter;
use crate::error::BackendError;
use crate::models::Visibility;

pub struct RestAdapter {
    client: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl RestAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        RestAdapter {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self.token.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn store_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Send a request and unwrap the envelope into its payload.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Failed endpoints still try to speak the envelope shape; fall
            // back to the raw body when they don't.
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.error)
                .unwrap_or_else(|| {
                    if body.is_empty() { status.to_string() } else { body }
                });
            return Err(BackendError::from_status(status.as_u16(), message));
        }
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| BackendError::Network(format!("failed to parse response: {e}")))?;
        if !envelope.success {
            return Err(BackendError::Remote(
                envelope.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| BackendError::Remote("response missing data".to_string()))
    }

    /// Send a request where only envelope success matters, not a payload.
    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        let envelope: ApiEnvelope<serde_json::Value> = {
            let response = self.authorize(builder).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                    .ok()
                    .and_then(|env| env.error)
                    .unwrap_or_else(|| {
                        if body.is_empty() { status.to_string() } else { body }
                    });
                return Err(BackendError::from_status(status.as_u16(), message));
            }
            response
                .json()
                .await
                .map_err(|e| BackendError::Network(format!("failed to parse response: {e}")))?
        };
        if !envelope.success {
            return Err(BackendError::Remote(
                envelope.error.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for RestAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, BackendError> {
        let req = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        let payload: AuthPayload =
            self.send(self.client.post(self.url("/api/auth/register")).json(&req)).await?;
        self.store_token(Some(payload.token.clone()));
        Ok(payload)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, BackendError> {
        let req = SignInRequest { email: email.to_string(), password: password.to_string() };
        let payload: AuthPayload =
            self.send(self.client.post(self.url("/api/auth/login")).json(&req)).await?;
        self.store_token(Some(payload.token.clone()));
        Ok(payload)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = self.send_unit(self.client.post(self.url("/api/auth/logout"))).await;
        // The local token is gone either way.
        self.store_token(None);
        result
    }

    async fn get_profile(&self) -> Result<UserDto, BackendError> {
        self.send(self.client.get(self.url("/api/profile"))).await
    }

    fn set_session_token(&self, token: Option<String>) {
        debug!("rest adapter token {}", if token.is_some() { "installed" } else { "cleared" });
        self.store_token(token);
    }

    async fn get_goals(&self) -> Result<Vec<GoalDto>, BackendError> {
        self.send(self.client.get(self.url("/api/goals"))).await
    }

    async fn create_goal(&self, req: CreateGoalRequest) -> Result<GoalDto, BackendError> {
        self.send(self.client.post(self.url("/api/goals")).json(&req)).await
    }

    async fn update_goal(
        &self,
        id: &str,
        patch: UpdateGoalRequest,
    ) -> Result<GoalDto, BackendError> {
        self.send(self.client.put(self.url(&format!("/api/goals/{id}"))).json(&patch)).await
    }

    async fn delete_goal(&self, id: &str) -> Result<(), BackendError> {
        self.send_unit(self.client.delete(self.url(&format!("/api/goals/{id}")))).await
    }

    async fn get_daily_actions(&self) -> Result<Vec<ActionDto>, BackendError> {
        self.send(self.client.get(self.url("/api/actions"))).await
    }

    async fn create_action(&self, req: CreateActionRequest) -> Result<ActionDto, BackendError> {
        self.send(self.client.post(self.url("/api/actions")).json(&req)).await
    }

    async fn update_action(
        &self,
        id: &str,
        patch: UpdateActionRequest,
    ) -> Result<ActionDto, BackendError> {
        self.send(self.client.put(self.url(&format!("/api/actions/{id}"))).json(&patch)).await
    }

    async fn delete_action(&self, id: &str) -> Result<(), BackendError> {
        self.send_unit(self.client.delete(self.url(&format!("/api/actions/{id}")))).await
    }

    async fn complete_action(&self, id: &str) -> Result<ActionDto, BackendError> {
        self.send(self.client.post(self.url(&format!("/api/actions/{id}/complete")))).await
    }

    async fn get_feed(&self, scope: Visibility) -> Result<Vec<PostDto>, BackendError> {
        self.send(
            self.client.get(self.url("/api/feed")).query(&[("scope", scope.as_str())]),
        )
        .await
    }

    async fn create_post(&self, req: CreatePostRequest) -> Result<PostDto, BackendError> {
        self.send(self.client.post(self.url("/api/posts")).json(&req)).await
    }

    async fn react_to_post(&self, post_id: &str, emoji: &str) -> Result<(), BackendError> {
        self.send_unit(
            self.client
                .post(self.url(&format!("/api/posts/{post_id}/react")))
                .json(&json!({ "emoji": emoji })),
        )
        .await
    }

    async fn create_circle(
        &self,
        _name: &str,
        _description: Option<&str>,
    ) -> Result<CircleDto, BackendError> {
        Err(BackendError::Unsupported("circles"))
    }

    async fn join_circle(&self, _invite_code: &str) -> Result<CircleDto, BackendError> {
        Err(BackendError::Unsupported("circles"))
    }

    async fn get_my_circle(&self) -> Result<Option<CircleDto>, BackendError> {
        Err(BackendError::Unsupported("circles"))
    }

    async fn get_circle_members(&self, _circle_id: &str) -> Result<Vec<UserDto>, BackendError> {
        Err(BackendError::Unsupported("circles"))
    }

    async fn follow_user(&self, _user_id: &str) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("following"))
    }

    async fn unfollow_user(&self, _user_id: &str) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("following"))
    }

    async fn get_following(&self) -> Result<Vec<UserDto>, BackendError> {
        Err(BackendError::Unsupported("following"))
    }

    async fn get_followers(&self) -> Result<Vec<UserDto>, BackendError> {
        Err(BackendError::Unsupported("following"))
    }
}
