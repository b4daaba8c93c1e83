use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const HABIT_COLORS: [&str; 4] = ["#22C55E", "#3B82F6", "#F97316", "#A855F7"];
pub const HABIT_ICONS: [&str; 4] = ["checkmark-circle", "flash", "heart", "sparkles"];

/// Color and icon for a new habit, picked round-robin by how many habits the
/// user already owns.
pub fn palette_for(existing_count: i64) -> (&'static str, &'static str) {
    let idx = existing_count.rem_euclid(HABIT_COLORS.len() as i64) as usize;
    (HABIT_COLORS[idx], HABIT_ICONS[idx % HABIT_ICONS.len()])
}

/// Habit as listed to clients, with streak fields derived from completions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitView {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
    pub color: String,
    pub streak: u32,
    pub completed_today: bool,
}

/// Body for creating or renaming a habit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitInput {
    #[serde(default)]
    pub title: Option<String>,
}

impl HabitInput {
    /// Trimmed title, or `None` when missing or blank
    pub fn valid_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Completion counts over rolling windows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub weekly_completions: i64,
    pub monthly_completions: i64,
    pub longest_streaks: Vec<HabitLongestStreak>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitLongestStreak {
    pub id: Uuid,
    pub longest_streak: u32,
}
