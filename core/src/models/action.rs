use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ActionDto, CreateActionRequest};

/// How a daily action recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// A recurring commitment, the default.
    Commitment,
    /// Tracked for performance rather than completion.
    Performance,
    /// Done once and then retired.
    OneTime,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Commitment => "commitment",
            ActionKind::Performance => "performance",
            ActionKind::OneTime => "one-time",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "performance" => ActionKind::Performance,
            "one-time" | "onetime" => ActionKind::OneTime,
            _ => ActionKind::Commitment,
        }
    }
}

/// A daily action as the UI sees it. `done` is scoped to today; the core
/// never rolls it over on its own, that is driven by an external
/// day-rollover trigger calling [`crate::store::DailySlice::roll_over_day`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: String,
    pub title: String,
    pub goal_id: Option<String>,
    pub goal_title: Option<String>,
    pub kind: ActionKind,
    pub frequency: Option<String>,
    /// Preferred time of day, e.g. "07:30".
    pub time: Option<String>,
    /// Consecutive-day completion count. Never silently reset by the core.
    pub streak: u32,
    pub done: bool,
}

impl ActionItem {
    pub fn from_dto(dto: ActionDto) -> Self {
        ActionItem {
            id: dto.id,
            title: dto.title,
            goal_id: dto.goal_id,
            goal_title: dto.goal_title,
            kind: dto.kind.as_deref().map(ActionKind::parse).unwrap_or(ActionKind::Commitment),
            frequency: dto.frequency,
            time: dto.time,
            streak: dto.streak,
            done: dto.done,
        }
    }

    /// Merge server-confirmed fields after a commit. The server is
    /// authoritative for `streak` and `done`.
    pub fn merge_dto(&mut self, dto: ActionDto) {
        self.id = dto.id;
        self.title = dto.title;
        self.goal_id = dto.goal_id;
        self.goal_title = dto.goal_title;
        if let Some(kind) = dto.kind.as_deref() {
            self.kind = ActionKind::parse(kind);
        }
        self.frequency = dto.frequency;
        self.time = dto.time;
        self.streak = dto.streak;
        self.done = dto.done;
    }
}

/// Content recorded with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletedKind {
    Check,
    Photo,
    Audio,
    Milestone,
}

/// Immutable historical record of one completion event. Append-only: the
/// denormalized fields (title, goal title, streak) are captured at completion
/// time because this entry outlives the source action's mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedAction {
    pub id: String,
    pub action_id: String,
    pub title: String,
    pub goal_id: Option<String>,
    pub goal_title: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub is_private: bool,
    /// Streak value at the moment of completion.
    pub streak: u32,
    pub kind: CompletedKind,
    pub media_url: Option<String>,
    pub category: Option<String>,
}

/// Input for creating a daily action, from the user or the onboarding flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionDraft {
    pub title: String,
    pub goal_id: Option<String>,
    pub goal_title: Option<String>,
    pub kind: Option<ActionKind>,
    pub frequency: Option<String>,
    pub time: Option<String>,
}

impl ActionDraft {
    pub(crate) fn to_request(&self) -> CreateActionRequest {
        CreateActionRequest {
            title: self.title.clone(),
            goal_id: self.goal_id.clone(),
            kind: self.kind.map(|k| k.as_str().to_string()),
            frequency: self.frequency.clone(),
            time: self.time.clone(),
        }
    }
}

/// Partial-field patch for a daily action edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionPatch {
    pub title: Option<String>,
    pub goal_id: Option<String>,
    pub frequency: Option<String>,
    pub time: Option<String>,
}

impl ActionPatch {
    pub(crate) fn apply(&self, action: &mut ActionItem) {
        if let Some(title) = &self.title {
            action.title = title.clone();
        }
        if let Some(goal_id) = &self.goal_id {
            action.goal_id = Some(goal_id.clone());
        }
        if let Some(frequency) = &self.frequency {
            action.frequency = Some(frequency.clone());
        }
        if let Some(time) = &self.time {
            action.time = Some(time.clone());
        }
    }

    pub(crate) fn to_request(&self) -> shared::UpdateActionRequest {
        shared::UpdateActionRequest {
            title: self.title.clone(),
            goal_id: self.goal_id.clone(),
            frequency: self.frequency.clone(),
            time: self.time.clone(),
            done: None,
            streak: None,
        }
    }
}
