//! Scripted in-memory adapter used as the test double for the facade and the
//! slices. Failures are queued ahead of time; a hold barrier lets a test keep
//! a call in flight while it observes the optimistic state.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use shared::{
    ActionDto, AuthPayload, CircleDto, CreateActionRequest, CreateGoalRequest, CreatePostRequest,
    GoalDto, PostDto, UpdateActionRequest, UpdateGoalRequest, UserDto,
};

use crate::backend::traits::BackendAdapter;
use crate::error::BackendError;
use crate::models::Visibility;

/// Pair of signals for holding one call in flight: the adapter notifies
/// `entered` when the call arrives, then waits for `release`.
#[derive(Clone)]
pub(crate) struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Hold {
    pub fn new() -> Self {
        Hold { entered: Arc::new(Notify::new()), release: Arc::new(Notify::new()) }
    }
}

#[derive(Default)]
pub(crate) struct MockAdapter {
    /// Errors handed out to upcoming calls, front first.
    pub next_errors: Mutex<VecDeque<BackendError>>,
    /// When set, every call parks on the barrier after passing the error
    /// check, until the test releases it.
    pub hold: Mutex<Option<Hold>>,
    pub goals: Mutex<Vec<GoalDto>>,
    pub actions: Mutex<Vec<ActionDto>>,
    pub posts: Mutex<Vec<PostDto>>,
    pub session_token: Mutex<Option<String>>,
    /// Operation names in call order, for asserting what went over the wire.
    pub calls: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: BackendError) {
        self.next_errors.lock().unwrap().push_back(error);
    }

    pub fn install_hold(&self) -> Hold {
        let hold = Hold::new();
        *self.hold.lock().unwrap() = Some(hold.clone());
        hold
    }

    pub fn clear_hold(&self) {
        *self.hold.lock().unwrap() = None;
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn enter(&self, op: &str) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(op.to_string());
        if let Some(error) = self.next_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        let hold = self.hold.lock().unwrap().clone();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        Ok(())
    }

    fn user() -> UserDto {
        UserDto {
            id: "user-1".into(),
            email: "ada@example.com".into(),
            name: "Ada".into(),
            avatar: None,
        }
    }
}

#[async_trait]
impl BackendAdapter for MockAdapter {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        name: &str,
    ) -> Result<AuthPayload, BackendError> {
        self.enter("sign_up").await?;
        let user = UserDto {
            id: self.fresh_id("user"),
            email: email.to_string(),
            name: name.to_string(),
            avatar: None,
        };
        Ok(AuthPayload { user, token: "token-signup".into() })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthPayload, BackendError> {
        self.enter("sign_in").await?;
        let mut user = Self::user();
        user.email = email.to_string();
        Ok(AuthPayload { user, token: "token-login".into() })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.enter("sign_out").await
    }

    async fn get_profile(&self) -> Result<UserDto, BackendError> {
        self.enter("get_profile").await?;
        Ok(Self::user())
    }

    fn set_session_token(&self, token: Option<String>) {
        *self.session_token.lock().unwrap() = token;
    }

    async fn get_goals(&self) -> Result<Vec<GoalDto>, BackendError> {
        self.enter("get_goals").await?;
        Ok(self.goals.lock().unwrap().clone())
    }

    async fn create_goal(&self, req: CreateGoalRequest) -> Result<GoalDto, BackendError> {
        self.enter("create_goal").await?;
        let dto = GoalDto {
            id: self.fresh_id("goal"),
            title: req.title,
            metric: req.metric,
            deadline: req.deadline,
            why: req.why,
            category: req.category,
            color: req.color,
            milestones: None,
            created_at: Some("2025-06-01T00:00:00Z".into()),
        };
        self.goals.lock().unwrap().push(dto.clone());
        Ok(dto)
    }

    async fn update_goal(
        &self,
        id: &str,
        patch: UpdateGoalRequest,
    ) -> Result<GoalDto, BackendError> {
        self.enter("update_goal").await?;
        let mut goals = self.goals.lock().unwrap();
        let goal = goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| BackendError::Remote(format!("no goal {id}")))?;
        if let Some(title) = patch.title {
            goal.title = title;
        }
        if let Some(metric) = patch.metric {
            goal.metric = metric;
        }
        if let Some(deadline) = patch.deadline {
            goal.deadline = deadline;
        }
        if let Some(category) = patch.category {
            goal.category = Some(category);
        }
        if let Some(color) = patch.color {
            goal.color = Some(color);
        }
        if let Some(why) = patch.why {
            goal.why = Some(why);
        }
        Ok(goal.clone())
    }

    async fn delete_goal(&self, id: &str) -> Result<(), BackendError> {
        self.enter("delete_goal").await?;
        self.goals.lock().unwrap().retain(|g| g.id != id);
        Ok(())
    }

    async fn get_daily_actions(&self) -> Result<Vec<ActionDto>, BackendError> {
        self.enter("get_daily_actions").await?;
        Ok(self.actions.lock().unwrap().clone())
    }

    async fn create_action(&self, req: CreateActionRequest) -> Result<ActionDto, BackendError> {
        self.enter("create_action").await?;
        let dto = ActionDto {
            id: self.fresh_id("action"),
            title: req.title,
            goal_id: req.goal_id,
            goal_title: None,
            kind: req.kind,
            frequency: req.frequency,
            time: req.time,
            streak: 0,
            done: false,
        };
        self.actions.lock().unwrap().push(dto.clone());
        Ok(dto)
    }

    async fn update_action(
        &self,
        id: &str,
        patch: UpdateActionRequest,
    ) -> Result<ActionDto, BackendError> {
        self.enter("update_action").await?;
        let mut actions = self.actions.lock().unwrap();
        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| BackendError::Remote(format!("no action {id}")))?;
        if let Some(title) = patch.title {
            action.title = title;
        }
        if let Some(goal_id) = patch.goal_id {
            action.goal_id = Some(goal_id);
        }
        if let Some(frequency) = patch.frequency {
            action.frequency = Some(frequency);
        }
        if let Some(time) = patch.time {
            action.time = Some(time);
        }
        if let Some(done) = patch.done {
            action.done = done;
        }
        if let Some(streak) = patch.streak {
            action.streak = streak;
        }
        Ok(action.clone())
    }

    async fn delete_action(&self, id: &str) -> Result<(), BackendError> {
        self.enter("delete_action").await?;
        self.actions.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn complete_action(&self, id: &str) -> Result<ActionDto, BackendError> {
        self.enter("complete_action").await?;
        let mut actions = self.actions.lock().unwrap();
        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| BackendError::Remote(format!("no action {id}")))?;
        action.done = true;
        action.streak += 1;
        Ok(action.clone())
    }

    async fn get_feed(&self, scope: Visibility) -> Result<Vec<PostDto>, BackendError> {
        self.enter("get_feed").await?;
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| Visibility::parse(&p.visibility) == scope)
            .cloned()
            .collect())
    }

    async fn create_post(&self, req: CreatePostRequest) -> Result<PostDto, BackendError> {
        self.enter("create_post").await?;
        let dto = PostDto {
            id: self.fresh_id("post"),
            user: Some(Self::user()),
            kind: req.kind,
            visibility: req.visibility,
            content: req.content,
            created_at: "2025-06-01T12:00:00Z".into(),
            media_url: req.media_url,
            action_title: req.action_title,
            goal_title: req.goal_title,
            goal_color: req.goal_color,
            streak: req.streak,
            reactions: Vec::new(),
        };
        self.posts.lock().unwrap().push(dto.clone());
        Ok(dto)
    }

    async fn react_to_post(&self, post_id: &str, emoji: &str) -> Result<(), BackendError> {
        self.enter(&format!("react_to_post:{post_id}:{emoji}")).await
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
