//! Mood, schedule and personality sources the minds read from.
//!
//! The real bot wires these to its mood engine and schedule generator. The
//! static implementations here are enough to run the binary and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::Mutex;

pub trait MoodSource: Send + Sync {
    /// Short description of the current mood state.
    fn mood_snapshot(&self) -> String;
    /// Mood phrased for direct inclusion in a prompt.
    fn prompt(&self) -> String;
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Up to `limit` current/recent activities, optionally prefixed with their time.
    fn current_tasks(&self, limit: usize, with_time: bool) -> String;
    /// Informational "what I'm doing now" update. Callers ignore the outcome.
    async fn push_current_activity(&self, text: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    First,
    Second,
    Third,
}

pub trait PersonalitySource: Send + Sync {
    /// `level` controls how many trait lines are included (1 = core only).
    fn personality_text(&self, perspective: Perspective, level: u8) -> String;
}

/// A mood that never changes.
#[derive(Debug, Clone)]
pub struct StaticMood {
    mood: String,
}

impl StaticMood {
    pub fn new(mood: impl Into<String>) -> Self {
        Self { mood: mood.into() }
    }
}

impl Default for StaticMood {
    fn default() -> Self {
        Self::new("平静")
    }
}

impl MoodSource for StaticMood {
    fn mood_snapshot(&self) -> String {
        self.mood.clone()
    }

    fn prompt(&self) -> String {
        format!("心情{}", self.mood)
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub at: DateTime<Local>,
    pub activity: String,
}

/// Schedule held in memory. Pushed activities become the newest entry.
#[derive(Debug, Default)]
pub struct InMemorySchedule {
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl InMemorySchedule {
    pub fn new(activities: impl IntoIterator<Item = String>) -> Self {
        let now = Local::now();
        let tasks = activities
            .into_iter()
            .map(|activity| ScheduledTask { at: now, activity })
            .collect();
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    pub fn latest_activity(&self) -> Option<String> {
        self.tasks
            .lock()
            .ok()
            .and_then(|tasks| tasks.last().map(|t| t.activity.clone()))
    }
}

#[async_trait]
impl ScheduleSource for InMemorySchedule {
    fn current_tasks(&self, limit: usize, with_time: bool) -> String {
        let Ok(tasks) = self.tasks.lock() else {
            return String::new();
        };
        let start = tasks.len().saturating_sub(limit);
        tasks[start..]
            .iter()
            .map(|t| {
                if with_time {
                    format!("{} {}", t.at.format("%H:%M"), t.activity)
                } else {
                    t.activity.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn push_current_activity(&self, text: &str) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(ScheduledTask {
                at: Local::now(),
                activity: text.to_string(),
            }),
            Err(_) => tracing::warn!("schedule lock poisoned, dropping activity update"),
        }
    }
}

/// Personality built from configured trait lines.
#[derive(Debug, Clone)]
pub struct StaticPersonality {
    nickname: String,
    traits: Vec<String>,
}

impl StaticPersonality {
    pub fn new(nickname: impl Into<String>, traits: Vec<String>) -> Self {
        Self {
            nickname: nickname.into(),
            traits,
        }
    }
}

impl PersonalitySource for StaticPersonality {
    fn personality_text(&self, perspective: Perspective, level: u8) -> String {
        let take = (level.max(1) as usize).min(self.traits.len());
        let body = self.traits[..take].join("，");
        if body.is_empty() {
            return String::new();
        }
        match perspective {
            Perspective::First => format!("我{body}"),
            Perspective::Second => format!("你{body}"),
            Perspective::Third => format!("{}{body}", self.nickname),
        }
    }
}
