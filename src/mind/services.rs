use std::sync::Arc;

use crate::services::collaborators::{MoodSource, PersonalitySource, ScheduleSource};
use crate::services::llm::TextOracle;

/// Collaborators shared by the global mind and every sub-mind.
#[derive(Clone)]
pub struct MindServices {
    /// Monologue model (global thoughts, sub-mind thoughts, summaries).
    pub thinker: Arc<dyn TextOracle>,
    /// Action planning model.
    pub planner: Arc<dyn TextOracle>,
    pub mood: Arc<dyn MoodSource>,
    pub schedule: Arc<dyn ScheduleSource>,
    pub personality: Arc<dyn PersonalitySource>,
}
