use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::extract::extract_fields;
use super::types::{ConversationState, PlanAction, PlanDecision};
use crate::mind::observation::ObservationRegistry;
use crate::services::collaborators::{Perspective, PersonalitySource};
use crate::services::llm::TextOracle;

pub const REASON_NO_CLEAR_REASON: &str = "没有明确原因";
pub const REASON_PARSE_FAILED: &str = "JSON解析失败，选择直接回复";
pub const REASON_ORACLE_FAILED: &str = "发生错误，选择直接回复";

/// Decides the next conversational move for one conversation.
pub struct ActionPlanner {
    conversation_id: String,
    oracle: Arc<dyn TextOracle>,
    name: String,
    personality_info: String,
}

impl ActionPlanner {
    pub fn new(
        conversation_id: impl Into<String>,
        oracle: Arc<dyn TextOracle>,
        nickname: impl Into<String>,
        personality: &dyn PersonalitySource,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            oracle,
            name: nickname.into(),
            personality_info: personality.personality_text(Perspective::Second, 2),
        }
    }

    /// Plan the next action. Never fails: oracle and parse errors fold into a
    /// default decision.
    ///
    /// Pending messages in `observation` are consumed while the prompt is
    /// built, whatever the oracle later does.
    pub async fn plan(
        &self,
        observation: &mut ObservationRegistry,
        conversation: &ConversationState,
    ) -> PlanDecision {
        debug!(
            conversation_id = %self.conversation_id,
            goals = conversation.goal_stack.len(),
            "planning next action"
        );

        let prompt = self.build_prompt(observation, conversation);
        debug!(conversation_id = %self.conversation_id, "planner prompt: {}", prompt);

        let content = match self.oracle.generate(&prompt).await {
            Ok(generation) => generation.text,
            Err(e) => {
                error!(conversation_id = %self.conversation_id, "planning failed: {}", e);
                return PlanDecision::new(PlanAction::DirectReply, REASON_ORACLE_FAILED);
            }
        };
        debug!(conversation_id = %self.conversation_id, "planner raw output: {}", content);

        let decision = parse_decision(&content);
        info!(
            conversation_id = %self.conversation_id,
            action = %decision.action,
            reason = %decision.reason,
            "planned action"
        );
        decision
    }

    fn build_prompt(
        &self,
        observation: &mut ObservationRegistry,
        conversation: &ConversationState,
    ) -> String {
        let (goal, reasoning) = conversation.active_goal();

        let mut chat_history_text = String::new();
        for msg in observation.history() {
            chat_history_text.push_str(&format!("{msg}\n"));
        }

        let new_count = observation.unprocessed_count();
        if new_count > 0 {
            chat_history_text.push_str(&format!("有{new_count}条新消息：\n"));
            for msg in observation.unprocessed() {
                chat_history_text.push_str(&format!("{msg}\n"));
            }
            observation.clear_unprocessed();
        }

        let personality_text = format!("你的名字是{}，{}", self.name, self.personality_info);

        let mut action_history_text = String::from("你之前做的事情是：");
        for action in &conversation.action_history {
            action_history_text.push_str(&format!("{action}\n"));
        }

        format!(
            r#"{personality_text}。现在你在参与一场QQ聊天，请分析以下内容，根据信息决定下一步行动：

当前对话目标：{goal}
产生该对话目标的原因：{reasoning}

{action_history_text}

最近的对话记录：
{chat_history_text}

请你接下去想想要你要做什么，可以发言，可以等待，可以倾听，可以调取知识。注意不同行动类型的要求，不要重复发言：
行动类型：
fetch_knowledge: 需要调取知识，当需要专业知识或特定信息时选择
wait: 当你做出了发言,对方尚未回复时等待对方的回复
listening: 倾听对方发言，当你认为对方发言尚未结束时采用
direct_reply: 不符合上述情况，回复对方，注意不要过多或者重复发言
rethink_goal: 重新思考对话目标，当发现对话目标不合适时选择，会重新思考对话目标

请以JSON格式输出，包含以下字段：
1. action: 行动类型，注意你之前的行为
2. reason: 选择该行动的原因，注意你之前的行为（简要解释）

注意：请严格按照JSON格式输出，不要包含任何其他内容。"#
        )
    }
}

/// Turn raw model output into a decision.
///
/// Unparseable output means `direct_reply`; a parsed but unknown action means
/// `listening` with the model's reason kept.
pub fn parse_decision(content: &str) -> PlanDecision {
    let defaults = HashMap::from([
        (
            "action".to_string(),
            Value::String(PlanAction::DirectReply.as_str().to_string()),
        ),
        (
            "reason".to_string(),
            Value::String(REASON_NO_CLEAR_REASON.to_string()),
        ),
    ]);

    let extraction = extract_fields(content, &["action", "reason"], &defaults);
    if !extraction.success {
        return PlanDecision::new(PlanAction::DirectReply, REASON_PARSE_FAILED);
    }

    let raw_action = extraction.get_str("action").unwrap_or_default();
    let reason = extraction
        .get_str("reason")
        .unwrap_or_else(|| REASON_NO_CLEAR_REASON.to_string());

    let action = match PlanAction::parse(&raw_action) {
        Some(action) => action,
        None => {
            warn!("unknown action type '{}', falling back to listening", raw_action);
            PlanAction::Listening
        }
    };

    PlanDecision { action, reason }
}
