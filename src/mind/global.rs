use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::registry::MindRegistry;
use crate::error::HeartflowError;
use crate::services::collaborators::Perspective;

pub const INITIAL_THOUGHT: &str = "你什么也没想";
/// Stand-in for recalled memories until a memory subsystem exists.
const RELATED_MEMORY: &str = "memory";
const SCHEDULE_WINDOW: usize = 4;

#[derive(Debug, Clone)]
pub struct GlobalMindState {
    pub current_thought: String,
    /// Append-only, oldest first.
    pub thought_history: Vec<String>,
    /// Mood phrased for prompts.
    pub mood: String,
    pub mood_snapshot: String,
    pub personality_text: String,
}

/// The single top-level thought process.
///
/// Folds every sub-mind's thought into its own monologue and pushes the result
/// back out to them.
pub struct GlobalMind {
    registry: Arc<MindRegistry>,
    state: RwLock<GlobalMindState>,
}

impl GlobalMind {
    pub fn new(registry: Arc<MindRegistry>) -> Self {
        let services = registry.services();
        let personality_text = services.personality.personality_text(Perspective::Second, u8::MAX);
        let state = GlobalMindState {
            current_thought: INITIAL_THOUGHT.to_string(),
            thought_history: Vec::new(),
            mood: services.mood.prompt(),
            mood_snapshot: services.mood.mood_snapshot(),
            personality_text,
        };
        Self {
            registry,
            state: RwLock::new(state),
        }
    }

    pub fn registry(&self) -> &Arc<MindRegistry> {
        &self.registry
    }

    pub async fn snapshot(&self) -> GlobalMindState {
        self.state.read().await.clone()
    }

    pub async fn current_thought(&self) -> String {
        self.state.read().await.current_thought.clone()
    }

    /// Replace the current thought without recording the old one.
    pub async fn set_current_thought(&self, thought: impl Into<String>) {
        self.state.write().await.current_thought = thought.into();
    }

    pub async fn thought_history(&self) -> Vec<String> {
        self.state.read().await.thought_history.clone()
    }

    /// One pass of the think loop. Returns how long to wait before the next.
    ///
    /// With no sub-minds nothing is thought and the shorter empty wait applies.
    pub async fn tick(&self) -> Duration {
        let config = self.registry.config();
        if self.registry.is_empty().await {
            info!("no sub-minds yet, waiting for one to be created");
            return config.empty_wait();
        }

        if let Err(e) = self.think_once().await {
            warn!(error = %e, "global think step failed");
        }
        config.think_interval()
    }

    /// Run the think loop until shutdown.
    pub async fn run(self: Arc<Self>) {
        let shutdown = self.registry.shutdown_token();
        info!("global mind started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let wait = self.tick().await;
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        info!("global mind stopped");
    }

    /// One full thinking step: summarise the sub-minds, continue the main
    /// monologue, then publish the new thought. Returns the new thought.
    pub async fn think_once(&self) -> Result<String, HeartflowError> {
        debug!("global mind thinking");
        let services = self.registry.services();

        let (personality_info, current_thinking_info, mood_info) = {
            let mut state = self.state.write().await;
            state.mood_snapshot = services.mood.mood_snapshot();
            state.mood = services.mood.prompt();
            (
                state.personality_text.clone(),
                state.current_thought.clone(),
                state.mood.clone(),
            )
        };

        let schedule_info = services.schedule.current_tasks(SCHEDULE_WINDOW, true);
        let sub_flows_info = self.sub_minds_summary().await;

        let mut prompt = String::new();
        prompt.push_str(&format!("你刚刚在做的事情是：{schedule_info}\n"));
        prompt.push_str(&format!("{personality_info}\n"));
        prompt.push_str(&format!("你想起来{RELATED_MEMORY}。"));
        prompt.push_str(&format!("刚刚你的主要想法是{current_thinking_info}。"));
        prompt.push_str(&format!(
            "你还有一些小想法，因为你在参加不同的群聊天，是你正在做的事情：{sub_flows_info}\n"
        ));
        prompt.push_str(&format!("你现在{mood_info}。"));
        prompt.push_str("现在你接下去继续思考，产生新的想法，但是要基于原有的主要想法，不要分点输出，");
        prompt.push_str("输出连贯的内心独白，不要太长，但是记得结合上述的消息，关注新内容:");

        let response = services.thinker.generate(&prompt).await?.text;

        {
            let mut state = self.state.write().await;
            let old = std::mem::replace(&mut state.current_thought, response.clone());
            state.thought_history.push(old);
        }
        info!("global mind state: {}", response);

        services.schedule.push_current_activity(&response).await;
        self.registry.broadcast(&response).await;

        Ok(response)
    }

    /// Concatenate the sub-minds' thoughts and fold them into one summary.
    async fn sub_minds_summary(&self) -> String {
        let mut sub_minds = String::new();
        for mind in self.registry.sub_minds().await {
            sub_minds.push_str(&mind.current_thought().await);
        }
        self.minds_summary(&sub_minds).await
    }

    async fn minds_summary(&self, minds_str: &str) -> String {
        let services = self.registry.services();
        let nickname = &self.registry.config().bot_nickname;
        let (personality_info, current_mind, mood_info) = {
            let state = self.state.read().await;
            (
                state.personality_text.clone(),
                state.current_thought.clone(),
                state.mood.clone(),
            )
        };

        let mut prompt = String::new();
        prompt.push_str(&format!("{personality_info}\n"));
        prompt.push_str(&format!("现在{nickname}的想法是：{current_mind}\n"));
        prompt.push_str(&format!(
            "现在{nickname}在qq群里进行聊天，聊天的话题如下：{minds_str}\n"
        ));
        prompt.push_str(&format!("你现在{mood_info}\n"));
        prompt.push_str(
            "现在请你总结这些聊天内容，注意关注聊天内容对原有的想法的影响，输出连贯的内心独白\n\
             不要太长，但是记得结合上述的消息，要记得你的人设，关注新内容:",
        );

        match services.thinker.generate(&prompt).await {
            Ok(generation) => generation.text,
            Err(e) => {
                warn!(error = %e, "minds summary failed, using raw sub-mind thoughts");
                minds_str.to_string()
            }
        }
    }
}
