use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::observation::{ChatMessage, ObservationRegistry};
use super::services::MindServices;
use crate::planner::action_planner::ActionPlanner;
use crate::planner::types::{ConversationState, Goal, PlanDecision};
use crate::services::collaborators::Perspective;

const INITIAL_SUB_THOUGHT: &str = "";

#[derive(Debug, Clone)]
pub struct SubMindState {
    pub current_thought: String,
    pub last_active: Instant,
    /// Single-slot mailbox written by the global mind. Last write wins.
    pub inbound_global_thought: String,
    pub conversation: ConversationState,
}

/// Per-conversation thought process.
///
/// The registry owns the handle; the sub-mind's own loop holds a clone and
/// stops once the registry no longer maps its id to `instance_id`.
pub struct SubMind {
    conversation_id: String,
    instance_id: Uuid,
    seq: u64,
    state: RwLock<SubMindState>,
    observation: Mutex<ObservationRegistry>,
    planner: ActionPlanner,
    services: MindServices,
    personality_info: String,
}

impl SubMind {
    pub fn new(
        conversation_id: impl Into<String>,
        seq: u64,
        services: MindServices,
        nickname: &str,
        max_history: usize,
    ) -> Self {
        let conversation_id = conversation_id.into();
        let planner = ActionPlanner::new(
            conversation_id.clone(),
            services.planner.clone(),
            nickname,
            services.personality.as_ref(),
        );
        let personality_info = services.personality.personality_text(Perspective::Second, 2);

        Self {
            observation: Mutex::new(ObservationRegistry::new(conversation_id.clone(), max_history)),
            conversation_id,
            instance_id: Uuid::new_v4(),
            seq,
            state: RwLock::new(SubMindState {
                current_thought: INITIAL_SUB_THOUGHT.to_string(),
                last_active: Instant::now(),
                inbound_global_thought: String::new(),
                conversation: ConversationState::new(),
            }),
            planner,
            services,
            personality_info,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Creation order within the owning registry.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub async fn snapshot(&self) -> SubMindState {
        self.state.read().await.clone()
    }

    pub async fn current_thought(&self) -> String {
        self.state.read().await.current_thought.clone()
    }

    pub async fn set_current_thought(&self, thought: impl Into<String>) {
        self.state.write().await.current_thought = thought.into();
    }

    pub async fn inbound_global_thought(&self) -> String {
        self.state.read().await.inbound_global_thought.clone()
    }

    pub async fn set_inbound_global_thought(&self, thought: &str) {
        self.state.write().await.inbound_global_thought = thought.to_string();
    }

    pub async fn last_active(&self) -> Instant {
        self.state.read().await.last_active
    }

    pub async fn touch(&self) {
        self.state.write().await.last_active = Instant::now();
    }

    pub async fn push_goal(&self, goal: Goal) {
        self.state.write().await.conversation.goal_stack.push(goal);
    }

    pub async fn conversation(&self) -> ConversationState {
        self.state.read().await.conversation.clone()
    }

    /// Record an incoming message and mark the conversation active.
    pub async fn observe(&self, message: ChatMessage) {
        self.observation.lock().await.observe(message);
        self.touch().await;
    }

    pub async fn unprocessed_count(&self) -> usize {
        self.observation.lock().await.unprocessed_count()
    }

    /// One iteration of the sub-mind: refresh the local thought, then plan.
    ///
    /// Does nothing while no new messages are pending. No lock is held across
    /// an oracle call.
    pub async fn step(&self) -> Option<PlanDecision> {
        let mut working = {
            let mut observation = self.observation.lock().await;
            if observation.unprocessed_count() == 0 {
                return None;
            }
            let working = observation.clone();
            observation.clear_unprocessed();
            working
        };

        self.think(&working).await;

        let conversation = self.conversation().await;
        let decision = self.planner.plan(&mut working, &conversation).await;

        self.state
            .write()
            .await
            .conversation
            .record_decision(&decision);

        Some(decision)
    }

    async fn think(&self, observation: &ObservationRegistry) {
        let (current, inbound) = {
            let state = self.state.read().await;
            (
                state.current_thought.clone(),
                state.inbound_global_thought.clone(),
            )
        };
        let chat = observation.render_recent();
        let mood = self.services.mood.prompt();

        let mut prompt = String::new();
        prompt.push_str(&format!("{}\n", self.personality_info));
        if !inbound.is_empty() {
            prompt.push_str(&format!("你现在整体的想法是：{inbound}\n"));
        }
        if !current.is_empty() {
            prompt.push_str(&format!("刚刚你对这个聊天的想法是：{current}\n"));
        }
        prompt.push_str(&format!("群里最近的聊天内容：\n{chat}"));
        prompt.push_str(&format!("你现在{mood}。\n"));
        prompt.push_str("现在请你根据聊天内容继续思考，输出连贯的内心独白，不要分点输出，不要太长，关注新内容:");

        match self.services.thinker.generate(&prompt).await {
            Ok(generation) => {
                debug!(conversation_id = %self.conversation_id, "sub-mind thought: {}", generation.text);
                self.set_current_thought(generation.text).await;
            }
            Err(e) => {
                warn!(conversation_id = %self.conversation_id, error = %e, "sub-mind thinking failed, keeping previous thought");
            }
        }
    }
}
