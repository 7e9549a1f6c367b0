use serde::{Deserialize, Serialize};
use std::fmt;

pub const PLACEHOLDER_GOAL: &str = "目前没有明确对话目标";
pub const PLACEHOLDER_REASONING: &str = "目前没有明确对话目标，最好思考一个对话目标";

/// The five things a sub-mind may decide to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    DirectReply,
    FetchKnowledge,
    Wait,
    Listening,
    RethinkGoal,
}

impl PlanAction {
    pub const ALL: [PlanAction; 5] = [
        PlanAction::DirectReply,
        PlanAction::FetchKnowledge,
        PlanAction::Wait,
        PlanAction::Listening,
        PlanAction::RethinkGoal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::DirectReply => "direct_reply",
            PlanAction::FetchKnowledge => "fetch_knowledge",
            PlanAction::Wait => "wait",
            PlanAction::Listening => "listening",
            PlanAction::RethinkGoal => "rethink_goal",
        }
    }

    /// Strict wire-name lookup. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == raw)
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDecision {
    pub action: PlanAction,
    pub reason: String,
}

impl PlanDecision {
    pub fn new(action: PlanAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub goal: String,
    pub reasoning: String,
}

impl Goal {
    pub fn new(goal: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// Planning input owned by a sub-mind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Last element is the active goal.
    pub goal_stack: Vec<Goal>,
    pub action_history: Vec<String>,
    // Not read by planning yet; kept so knowledge/memory fetches have a home.
    pub knowledge_list: Vec<String>,
    pub memory_list: Vec<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active goal, or the fixed placeholder pair when no goal was set.
    pub fn active_goal(&self) -> (&str, &str) {
        match self.goal_stack.last() {
            Some(g) => (g.goal.as_str(), g.reasoning.as_str()),
            None => (PLACEHOLDER_GOAL, PLACEHOLDER_REASONING),
        }
    }

    /// Record a decision taken by the owning sub-mind.
    pub fn record_decision(&mut self, decision: &PlanDecision) {
        self.action_history
            .push(format!("{}: {}", decision.action, decision.reason));
        if decision.action == PlanAction::RethinkGoal {
            self.goal_stack.pop();
        }
    }
}
