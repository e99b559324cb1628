use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{CreatePostRequest, PostDto};
use std::collections::{BTreeMap, BTreeSet};

/// Visibility scope of a post, fixed at creation. Doubles as the feed
/// selector: each scope is an independently fetched collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Circle,
    Follow,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Circle => "circle",
            Visibility::Follow => "follow",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "follow" | "followers" => Visibility::Follow,
            _ => Visibility::Circle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostKind {
    CheckIn,
    Status,
    Photo,
    Audio,
    Goal,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::CheckIn => "checkin",
            PostKind::Status => "status",
            PostKind::Photo => "photo",
            PostKind::Audio => "audio",
            PostKind::Goal => "goal",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "checkin" | "check-in" => PostKind::CheckIn,
            "photo" => PostKind::Photo,
            "audio" => PostKind::Audio,
            "goal" => PostKind::Goal,
            _ => PostKind::Status,
        }
    }
}

/// Comment attached to a post. Currently local-only: comments are composed
/// optimistically and not yet persisted remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Feed post as the UI sees it. Reaction counts are aggregated per emoji and
/// kept non-negative; `user_reactions` holds the emojis the current user has
/// an active reaction with, so each `(post, emoji)` pair toggles on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user: String,
    pub avatar: Option<String>,
    pub kind: PostKind,
    pub visibility: Visibility,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: BTreeMap<String, u32>,
    pub user_reactions: BTreeSet<String>,
    pub comments: Vec<Comment>,
    pub media_url: Option<String>,
    // Check-in metadata, present when `kind` is `CheckIn`.
    pub action_title: Option<String>,
    pub goal_title: Option<String>,
    pub goal_color: Option<String>,
    pub streak: Option<u32>,
}

impl Post {
    /// Translate a wire post, folding the server's `(emoji, user)` reaction
    /// rows into per-emoji counts. Rows belonging to `current_user_id` also
    /// land in `user_reactions`, the set the toggle branches on.
    pub fn from_dto(dto: PostDto, current_user_id: Option<&str>) -> Self {
        let mut reactions: BTreeMap<String, u32> = BTreeMap::new();
        let mut user_reactions: BTreeSet<String> = BTreeSet::new();
        for r in &dto.reactions {
            *reactions.entry(r.emoji.clone()).or_insert(0) += 1;
            if current_user_id == Some(r.user_id.as_str()) {
                user_reactions.insert(r.emoji.clone());
            }
        }
        let timestamp = DateTime::parse_from_rfc3339(&dto.created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Post {
            id: dto.id,
            user: dto.user.as_ref().map(|u| u.name.clone()).unwrap_or_else(|| "Anonymous".to_string()),
            avatar: dto.user.and_then(|u| u.avatar),
            kind: PostKind::parse(&dto.kind),
            visibility: Visibility::parse(&dto.visibility),
            content: dto.content,
            timestamp,
            reactions,
            user_reactions,
            comments: Vec::new(),
            media_url: dto.media_url,
            action_title: dto.action_title,
            goal_title: dto.goal_title,
            goal_color: dto.goal_color,
            streak: dto.streak,
        }
    }

    /// Whether the current user has any active reaction on this post.
    pub fn user_reacted(&self) -> bool {
        !self.user_reactions.is_empty()
    }
}

/// Input for composing a post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub kind: PostKind,
    pub visibility: Visibility,
    pub content: String,
    pub media_url: Option<String>,
    pub action_title: Option<String>,
    pub goal_title: Option<String>,
    pub goal_color: Option<String>,
    pub streak: Option<u32>,
}

impl Default for PostDraft {
    fn default() -> Self {
        PostDraft {
            kind: PostKind::Status,
            visibility: Visibility::Circle,
            content: String::new(),
            media_url: None,
            action_title: None,
            goal_title: None,
            goal_color: None,
            streak: None,
        }
    }
}

impl PostDraft {
    pub(crate) fn to_request(&self) -> CreatePostRequest {
        CreatePostRequest {
            kind: self.kind.as_str().to_string(),
            visibility: self.visibility.as_str().to_string(),
            content: self.content.clone(),
            media_url: self.media_url.clone(),
            action_title: self.action_title.clone(),
            goal_title: self.goal_title.clone(),
            goal_color: self.goal_color.clone(),
            streak: self.streak,
        }
    }
}
