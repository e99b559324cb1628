//! # Derived Metrics
//!
//! Pure calculators over store snapshots: consistency percentages, goal
//! health and the gamified score. Everything here is a function of its
//! arguments; no state, no clock access (callers pass "today" in so the
//! numbers are reproducible in tests).

use chrono::NaiveDate;

use crate::models::{ActionItem, CompletedAction, Goal, GoalStatus};

/// Points per action completed today.
pub const COMPLETION_POINTS: u32 = 10;
/// Points per streak day, summed over all actions.
pub const STREAK_POINTS: u32 = 5;
/// Points per active goal.
pub const GOAL_POINTS: u32 = 100;

/// Consistency threshold for a goal to count as on track.
pub const ON_TRACK_THRESHOLD: u8 = 70;
/// Below this a goal is critical.
pub const NEEDS_ATTENTION_THRESHOLD: u8 = 40;

/// Overall consistency as a percentage in `0..=100`.
///
/// While the first completion is today (or there is none yet) this is simply
/// the share of today's actions that are done, so the number moves
/// immediately. Once history spans more than a day it is the completion
/// count over the expected count, actions times whole days elapsed since
/// the first recorded completion, rounded to the nearest point.
pub fn overall_consistency(
    actions: &[ActionItem],
    completed: &[CompletedAction],
    today: NaiveDate,
) -> u8 {
    if actions.is_empty() {
        return 0;
    }
    let first_day = completed.iter().map(|c| c.completed_at.date_naive()).min();
    let days = match first_day {
        Some(first) => (today - first).num_days().max(0),
        None => 0,
    };
    let percent = if days == 0 {
        let done_today = actions.iter().filter(|a| a.done).count();
        done_today as f64 / actions.len() as f64 * 100.0
    } else {
        let expected = actions.len() as f64 * days as f64;
        completed.len() as f64 / expected * 100.0
    };
    percent.round().min(100.0) as u8
}

/// Consistency for one goal, over the actions linked to it. A goal with no
/// linked actions inherits the overall number rather than reading as 0%.
pub fn goal_consistency(
    goal_id: &str,
    actions: &[ActionItem],
    completed: &[CompletedAction],
    today: NaiveDate,
) -> u8 {
    let linked: Vec<ActionItem> = actions
        .iter()
        .filter(|a| a.goal_id.as_deref() == Some(goal_id))
        .cloned()
        .collect();
    if linked.is_empty() {
        return overall_consistency(actions, completed, today);
    }
    let linked_completed: Vec<CompletedAction> = completed
        .iter()
        .filter(|c| c.goal_id.as_deref() == Some(goal_id))
        .cloned()
        .collect();
    overall_consistency(&linked, &linked_completed, today)
}

/// A goal's streak is the best streak among its linked actions.
pub fn goal_streak(goal_id: &str, actions: &[ActionItem]) -> u32 {
    actions
        .iter()
        .filter(|a| a.goal_id.as_deref() == Some(goal_id))
        .map(|a| a.streak)
        .max()
        .unwrap_or(0)
}

/// Health bucket from a consistency percentage.
pub fn goal_status(consistency: u8) -> GoalStatus {
    if consistency >= ON_TRACK_THRESHOLD {
        GoalStatus::OnTrack
    } else if consistency >= NEEDS_ATTENTION_THRESHOLD {
        GoalStatus::NeedsAttention
    } else {
        GoalStatus::Critical
    }
}

/// Gamified score: completions today, streak days and active goals, each at
/// their flat rate.
pub fn total_score(actions: &[ActionItem], goals: &[Goal]) -> u32 {
    let completed_today = actions.iter().filter(|a| a.done).count() as u32;
    let streak_days: u32 = actions.iter().map(|a| a.streak).sum();
    completed_today * COMPLETION_POINTS + streak_days * STREAK_POINTS + goals.len() as u32 * GOAL_POINTS
}
