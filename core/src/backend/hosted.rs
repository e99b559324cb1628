//! # Hosted Platform Adapter
//!
//! Driver for the hosted data platform, which exposes auth under `/auth/v1`
//! and tables/RPC under `/rest/v1` in PostgREST style. Rows come back in
//! snake_case; this adapter owns the translation into the `shared` wire
//! types so nothing platform-specific leaks upward.
//!
//! Writes ask for `Prefer: return=representation`, making every insert and
//! update a single logical transaction that returns the stored row; a
//! failure can never leave a created row behind with no confirmed identity.
//! Multi-row mutations (complete-action, reaction toggles, circle joins) go
//! through server-side RPC for the same reason.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;

use shared::{
    ActionDto, AuthPayload, CircleDto, CreateActionRequest, CreateGoalRequest, CreatePostRequest,
    GoalDto, MilestoneDto, PostDto, ReactionDto, UpdateActionRequest, UpdateGoalRequest, UserDto,
};

use crate::backend::traits::BackendAdapter;
use crate::error::BackendError;
use crate::models::Visibility;

pub struct HostedAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    token: Mutex<Option<String>>,
}

// --- platform wire rows (snake_case) ---

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    user: Option<PlatformUser>,
}

#[derive(Debug, Deserialize)]
struct PlatformUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: PlatformUserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformUserMetadata {
    name: Option<String>,
    avatar_url: Option<String>,
}

impl PlatformUser {
    fn into_dto(self) -> UserDto {
        let email = self.email.unwrap_or_default();
        let name = self
            .user_metadata
            .name
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        UserDto { id: self.id, email, name, avatar: self.user_metadata.avatar_url }
    }
}

#[derive(Debug, Deserialize)]
struct MilestoneRow {
    id: String,
    title: String,
    target_date: String,
    target_value: Option<f64>,
    unit: Option<String>,
    completed: bool,
    #[serde(rename = "position")]
    order: u32,
}

#[derive(Debug, Deserialize)]
struct GoalRow {
    id: String,
    title: String,
    metric: String,
    deadline: String,
    why: Option<String>,
    category: Option<String>,
    color: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    milestones: Option<Vec<MilestoneRow>>,
}

impl From<GoalRow> for GoalDto {
    fn from(row: GoalRow) -> Self {
        GoalDto {
            id: row.id,
            title: row.title,
            metric: row.metric,
            deadline: row.deadline,
            why: row.why,
            category: row.category,
            color: row.color,
            milestones: row.milestones.map(|ms| {
                ms.into_iter()
                    .map(|m| MilestoneDto {
                        id: m.id,
                        title: m.title,
                        target_date: m.target_date,
                        target_value: m.target_value,
                        unit: m.unit,
                        completed: m.completed,
                        order: m.order,
                    })
                    .collect()
            }),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ActionRow {
    id: String,
    title: String,
    goal_id: Option<String>,
    goal_title: Option<String>,
    kind: Option<String>,
    frequency: Option<String>,
    time_of_day: Option<String>,
    #[serde(default)]
    streak: u32,
    #[serde(default)]
    done: bool,
}

impl From<ActionRow> for ActionDto {
    fn from(row: ActionRow) -> Self {
        ActionDto {
            id: row.id,
            title: row.title,
            goal_id: row.goal_id,
            goal_title: row.goal_title,
            kind: row.kind,
            frequency: row.frequency,
            time: row.time_of_day,
            streak: row.streak,
            done: row.done,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReactionRow {
    emoji: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct PostRow {
    id: String,
    user_id: Option<String>,
    user_name: Option<String>,
    avatar_url: Option<String>,
    post_type: String,
    visibility: String,
    #[serde(default)]
    content: String,
    created_at: String,
    media_url: Option<String>,
    action_title: Option<String>,
    goal_title: Option<String>,
    goal_color: Option<String>,
    streak: Option<u32>,
    #[serde(default)]
    reactions: Vec<ReactionRow>,
}

impl From<PostRow> for PostDto {
    fn from(row: PostRow) -> Self {
        let user = row.user_id.map(|id| UserDto {
            id,
            email: String::new(),
            name: row.user_name.unwrap_or_else(|| "Anonymous".to_string()),
            avatar: row.avatar_url,
        });
        PostDto {
            id: row.id,
            user,
            kind: row.post_type,
            visibility: row.visibility,
            content: row.content,
            created_at: row.created_at,
            media_url: row.media_url,
            action_title: row.action_title,
            goal_title: row.goal_title,
            goal_color: row.goal_color,
            streak: row.streak,
            reactions: row
                .reactions
                .into_iter()
                .map(|r| ReactionDto { emoji: r.emoji, user_id: r.user_id })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CircleRow {
    id: String,
    name: String,
    description: Option<String>,
    invite_code: Option<String>,
}

impl From<CircleRow> for CircleDto {
    fn from(row: CircleRow) -> Self {
        CircleDto {
            id: row.id,
            name: row.name,
            description: row.description,
            invite_code: row.invite_code,
        }
    }
}

/// Error body the platform returns (`message` or `error_description`).
#[derive(Debug, Deserialize)]
struct PlatformError {
    message: Option<String>,
    error_description: Option<String>,
}

impl HostedAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HostedAdapter {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            token: Mutex::new(None),
        }
    }

    fn store_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", value);
        }
        let token = self.token.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(token) = token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert("Authorization", value);
            }
        }
        headers
    }

    fn rest(&self, table_or_rpc: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table_or_rpc)
    }

    fn auth(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.headers(self.headers()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PlatformError>(&body)
                .ok()
                .and_then(|e| e.message.or(e.error_description))
                .unwrap_or_else(|| {
                    if body.is_empty() { status.to_string() } else { body }
                });
            return Err(BackendError::from_status(status.as_u16(), message));
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::Network(format!("failed to parse response: {e}")))
    }

    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), BackendError> {
        let response = builder.headers(self.headers()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PlatformError>(&body)
                .ok()
                .and_then(|e| e.message.or(e.error_description))
                .unwrap_or_else(|| {
                    if body.is_empty() { status.to_string() } else { body }
                });
            return Err(BackendError::from_status(status.as_u16(), message));
        }
        Ok(())
    }

    /// Insert one row and return its stored representation in the same call.
    async fn insert_returning<T: DeserializeOwned>(
        &self,
        table: &str,
        body: serde_json::Value,
    ) -> Result<T, BackendError> {
        let rows: Vec<T> = self
            .send(
                self.client
                    .post(self.rest(table))
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Remote(format!("insert into {table} returned no row")))
    }

    async fn patch_returning<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        body: serde_json::Value,
    ) -> Result<T, BackendError> {
        let url = format!("{}?id=eq.{}", self.rest(table), id);
        let rows: Vec<T> = self
            .send(self.client.patch(url).header("Prefer", "return=representation").json(&body))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Remote(format!("no {table} row with id {id}")))
    }

    fn token_to_payload(&self, response: TokenResponse) -> Result<AuthPayload, BackendError> {
        let token = response
            .access_token
            .ok_or_else(|| BackendError::Auth("no session returned".to_string()))?;
        let user = response
            .user
            .ok_or_else(|| BackendError::Auth("no user returned".to_string()))?
            .into_dto();
        self.store_token(Some(token.clone()));
        Ok(AuthPayload { user, token })
    }
}

#[async_trait]
impl BackendAdapter for HostedAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, BackendError> {
        let body = json!({ "email": email, "password": password, "data": { "name": name } });
        let response: TokenResponse =
            self.send(self.client.post(self.auth("signup")).json(&body)).await?;
        if response.access_token.is_some() {
            return self.token_to_payload(response);
        }
        // Account created without a session (e.g. confirmation settings);
        // sign in immediately so the caller still gets a token.
        debug!("signup returned no session, attempting immediate sign-in");
        self.sign_in(email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, BackendError> {
        let body = json!({ "email": email, "password": password });
        let response: TokenResponse = self
            .send(self.client.post(self.auth("token?grant_type=password")).json(&body))
            .await?;
        self.token_to_payload(response)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let result = self.send_unit(self.client.post(self.auth("logout"))).await;
        self.store_token(None);
        result
    }

    async fn get_profile(&self) -> Result<UserDto, BackendError> {
        let user: PlatformUser = self.send(self.client.get(self.auth("user"))).await?;
        Ok(user.into_dto())
    }

    fn set_session_token(&self, token: Option<String>) {
        debug!("hosted adapter token {}", if token.is_some() { "installed" } else { "cleared" });
        self.store_token(token);
    }

    async fn get_goals(&self) -> Result<Vec<GoalDto>, BackendError> {
        let url = format!(
            "{}?select=*,milestones(*)&order=created_at.desc",
            self.rest("goals")
        );
        let rows: Vec<GoalRow> = self.send(self.client.get(url)).await?;
        Ok(rows.into_iter().map(GoalDto::from).collect())
    }

    async fn create_goal(&self, req: CreateGoalRequest) -> Result<GoalDto, BackendError> {
        let body = json!({
            "title": req.title,
            "metric": req.metric,
            "deadline": req.deadline,
            "category": req.category,
            "color": req.color,
            "why": req.why,
        });
        let row: GoalRow = self.insert_returning("goals", body).await?;
        Ok(row.into())
    }

    async fn update_goal(
        &self,
        id: &str,
        patch: UpdateGoalRequest,
    ) -> Result<GoalDto, BackendError> {
        let mut body = serde_json::Map::new();
        if let Some(title) = patch.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(metric) = patch.metric {
            body.insert("metric".into(), json!(metric));
        }
        if let Some(deadline) = patch.deadline {
            body.insert("deadline".into(), json!(deadline));
        }
        if let Some(category) = patch.category {
            body.insert("category".into(), json!(category));
        }
        if let Some(color) = patch.color {
            body.insert("color".into(), json!(color));
        }
        if let Some(why) = patch.why {
            body.insert("why".into(), json!(why));
        }
        let row: GoalRow = self.patch_returning("goals", id, serde_json::Value::Object(body)).await?;
        Ok(row.into())
    }

    async fn delete_goal(&self, id: &str) -> Result<(), BackendError> {
        let url = format!("{}?id=eq.{}", self.rest("goals"), id);
        self.send_unit(self.client.delete(url)).await
    }

    async fn get_daily_actions(&self) -> Result<Vec<ActionDto>, BackendError> {
        // The view scopes `done` to the caller's current day.
        let rows: Vec<ActionRow> =
            self.send(self.client.get(format!("{}?select=*", self.rest("daily_actions_today")))).await?;
        Ok(rows.into_iter().map(ActionDto::from).collect())
    }

    async fn create_action(&self, req: CreateActionRequest) -> Result<ActionDto, BackendError> {
        let body = json!({
            "title": req.title,
            "goal_id": req.goal_id,
            "kind": req.kind,
            "frequency": req.frequency,
            "time_of_day": req.time,
        });
        let row: ActionRow = self.insert_returning("daily_actions", body).await?;
        Ok(row.into())
    }

    async fn update_action(
        &self,
        id: &str,
        patch: UpdateActionRequest,
    ) -> Result<ActionDto, BackendError> {
        let mut body = serde_json::Map::new();
        if let Some(title) = patch.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(goal_id) = patch.goal_id {
            body.insert("goal_id".into(), json!(goal_id));
        }
        if let Some(frequency) = patch.frequency {
            body.insert("frequency".into(), json!(frequency));
        }
        if let Some(time) = patch.time {
            body.insert("time_of_day".into(), json!(time));
        }
        if let Some(done) = patch.done {
            body.insert("done".into(), json!(done));
        }
        if let Some(streak) = patch.streak {
            body.insert("streak".into(), json!(streak));
        }
        let row: ActionRow =
            self.patch_returning("daily_actions", id, serde_json::Value::Object(body)).await?;
        Ok(row.into())
    }

    async fn delete_action(&self, id: &str) -> Result<(), BackendError> {
        let url = format!("{}?id=eq.{}", self.rest("daily_actions"), id);
        self.send_unit(self.client.delete(url)).await
    }

    async fn complete_action(&self, id: &str) -> Result<ActionDto, BackendError> {
        // Server-side function marks done and bumps the streak in one
        // transaction, returning the updated row.
        let row: ActionRow = self
            .send(self.client.post(self.rest("rpc/complete_action")).json(&json!({ "action_id": id })))
            .await?;
        Ok(row.into())
    }

    async fn get_feed(&self, scope: Visibility) -> Result<Vec<PostDto>, BackendError> {
        let rows: Vec<PostRow> = self
            .send(
                self.client
                    .post(self.rest("rpc/get_feed"))
                    .json(&json!({ "scope": scope.as_str() })),
            )
            .await?;
        Ok(rows.into_iter().map(PostDto::from).collect())
    }

    async fn create_post(&self, req: CreatePostRequest) -> Result<PostDto, BackendError> {
        let body = json!({
            "post_type": req.kind,
            "visibility": req.visibility,
            "content": req.content,
            "media_url": req.media_url,
            "action_title": req.action_title,
            "goal_title": req.goal_title,
            "goal_color": req.goal_color,
            "streak": req.streak,
        });
        let row: PostRow = self.insert_returning("posts", body).await?;
        Ok(row.into())
    }

    async fn react_to_post(&self, post_id: &str, emoji: &str) -> Result<(), BackendError> {
        // Toggle server-side so a retried call cannot double-insert.
        self.send_unit(
            self.client
                .post(self.rest("rpc/toggle_reaction"))
                .json(&json!({ "post_id": post_id, "emoji": emoji })),
        )
        .await
    }

    async fn create_circle(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CircleDto, BackendError> {
        let row: CircleRow = self
            .insert_returning("circles", json!({ "name": name, "description": description }))
            .await?;
        Ok(row.into())
    }

    async fn join_circle(&self, invite_code: &str) -> Result<CircleDto, BackendError> {
        let row: CircleRow = self
            .send(
                self.client
                    .post(self.rest("rpc/join_circle_with_code"))
                    .json(&json!({ "invite_code": invite_code })),
            )
            .await?;
        Ok(row.into())
    }

    async fn get_my_circle(&self) -> Result<Option<CircleDto>, BackendError> {
        let rows: Vec<CircleRow> =
            self.send(self.client.post(self.rest("rpc/get_my_circle")).json(&json!({}))).await?;
        Ok(rows.into_iter().next().map(CircleDto::from))
    }

    async fn get_circle_members(&self, circle_id: &str) -> Result<Vec<UserDto>, BackendError> {
        let rows: Vec<PlatformUser> = self
            .send(
                self.client
                    .post(self.rest("rpc/get_circle_members"))
                    .json(&json!({ "circle_id": circle_id })),
            )
            .await?;
        Ok(rows.into_iter().map(PlatformUser::into_dto).collect())
    }

    async fn follow_user(&self, user_id: &str) -> Result<(), BackendError> {
        self.send_unit(
            self.client.post(self.rest("follows")).json(&json!({ "following_id": user_id })),
        )
        .await
    }

    async fn unfollow_user(&self, user_id: &str) -> Result<(), BackendError> {
        let url = format!("{}?following_id=eq.{}", self.rest("follows"), user_id);
        self.send_unit(self.client.delete(url)).await
    }

    async fn get_following(&self) -> Result<Vec<UserDto>, BackendError> {
        let rows: Vec<PlatformUser> =
            self.send(self.client.post(self.rest("rpc/get_following")).json(&json!({}))).await?;
        Ok(rows.into_iter().map(PlatformUser::into_dto).collect())
    }

    async fn get_followers(&self) -> Result<Vec<UserDto>, BackendError> {
        let rows: Vec<PlatformUser> =
            self.send(self.client.post(self.rest("rpc/get_followers")).json(&json!({}))).await?;
        Ok(rows.into_iter().map(PlatformUser::into_dto).collect())
    }
}
