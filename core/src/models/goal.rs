use serde::{Deserialize, Serialize};
use shared::{CreateGoalRequest, GoalDto, MilestoneDto, UpdateGoalRequest};

/// Life area a goal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Fitness,
    Mindfulness,
    Productivity,
    Health,
    Skills,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fitness => "fitness",
            Category::Mindfulness => "mindfulness",
            Category::Productivity => "productivity",
            Category::Health => "health",
            Category::Skills => "skills",
            Category::Other => "other",
        }
    }

    /// Lenient wire parse: unknown categories land in `Other` instead of
    /// failing a whole fetch.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fitness" => Category::Fitness,
            "mindfulness" => Category::Mindfulness,
            "productivity" => Category::Productivity,
            "health" => Category::Health,
            "skills" => Category::Skills,
            _ => Category::Other,
        }
    }
}

/// Derived health of a goal, computed from its consistency percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    OnTrack,
    NeedsAttention,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    /// Target date, RFC 3339.
    pub target_date: String,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub completed: bool,
    /// Position in the goal's total order. Strictly increasing per goal.
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    /// Free-text success metric, e.g. "run 3x per week".
    pub metric: String,
    /// Deadline date, RFC 3339.
    pub deadline: String,
    pub why: Option<String>,
    pub category: Category,
    pub color: String,
    pub milestones: Vec<Milestone>,
}

impl Goal {
    pub const DEFAULT_COLOR: &'static str = "#FFD700";

    pub fn from_dto(dto: GoalDto) -> Self {
        Goal {
            id: dto.id,
            title: dto.title,
            metric: dto.metric,
            deadline: dto.deadline,
            why: dto.why,
            category: dto.category.as_deref().map(Category::parse).unwrap_or(Category::Other),
            color: dto.color.unwrap_or_else(|| Goal::DEFAULT_COLOR.to_string()),
            milestones: dto
                .milestones
                .unwrap_or_default()
                .into_iter()
                .map(Milestone::from_dto)
                .collect(),
        }
    }

    /// Merge the server-confirmed fields of `dto` into this goal, keeping
    /// purely local state (milestones are local-only when the server sends
    /// none back).
    pub fn merge_dto(&mut self, dto: GoalDto) {
        self.id = dto.id;
        self.title = dto.title;
        self.metric = dto.metric;
        self.deadline = dto.deadline;
        self.why = dto.why;
        if let Some(category) = dto.category.as_deref() {
            self.category = Category::parse(category);
        }
        if let Some(color) = dto.color {
            self.color = color;
        }
        if let Some(milestones) = dto.milestones {
            self.milestones = milestones.into_iter().map(Milestone::from_dto).collect();
        }
    }

    /// The first incomplete milestone in order, if any. At most one milestone
    /// is "next" by construction.
    pub fn next_milestone(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .filter(|m| !m.completed)
            .min_by_key(|m| m.order)
    }
}

impl Milestone {
    pub fn from_dto(dto: MilestoneDto) -> Self {
        Milestone {
            id: dto.id,
            title: dto.title,
            target_date: dto.target_date,
            target_value: dto.target_value,
            unit: dto.unit,
            completed: dto.completed,
            order: dto.order,
        }
    }
}

/// Input for creating a goal. Mirrors the goal-setting form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalDraft {
    pub title: String,
    pub metric: String,
    pub deadline: String,
    pub category: Option<Category>,
    pub color: Option<String>,
    pub why: Option<String>,
}

impl GoalDraft {
    pub(crate) fn to_request(&self) -> CreateGoalRequest {
        CreateGoalRequest {
            title: self.title.clone(),
            metric: self.metric.clone(),
            deadline: self.deadline.clone(),
            category: self.category.map(|c| c.as_str().to_string()),
            color: self.color.clone(),
            why: self.why.clone(),
        }
    }
}

/// Partial-field patch from the goal edit form. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub metric: Option<String>,
    pub deadline: Option<String>,
    pub category: Option<Category>,
    pub color: Option<String>,
    pub why: Option<String>,
}

impl GoalPatch {
    pub(crate) fn apply(&self, goal: &mut Goal) {
        if let Some(title) = &self.title {
            goal.title = title.clone();
        }
        if let Some(metric) = &self.metric {
            goal.metric = metric.clone();
        }
        if let Some(deadline) = &self.deadline {
            goal.deadline = deadline.clone();
        }
        if let Some(category) = self.category {
            goal.category = category;
        }
        if let Some(color) = &self.color {
            goal.color = color.clone();
        }
        if let Some(why) = &self.why {
            goal.why = Some(why.clone());
        }
    }

    pub(crate) fn to_request(&self) -> UpdateGoalRequest {
        UpdateGoalRequest {
            title: self.title.clone(),
            metric: self.metric.clone(),
            deadline: self.deadline.clone(),
            category: self.category.map(|c| c.as_str().to_string()),
            color: self.color.clone(),
            why: self.why.clone(),
        }
    }
}
