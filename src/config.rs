use std::time::Duration;

use crate::error::HeartflowError;

const DEFAULT_PERSONALITY: &str = "是一个女大学生，正在学习计算机|有时候说话不过脑子，喜欢开玩笑|对编程和动漫很感兴趣";

/// Runtime knobs for the minds. Every field has an env override.
#[derive(Debug, Clone)]
pub struct HeartflowConfig {
    /// Base URL of the llama-server style completion endpoint.
    pub llm_url: String,
    pub llm_timeout_secs: u64,
    pub max_tokens: usize,
    /// Temperature for the global and sub-mind monologue calls.
    pub think_temperature: f32,
    /// Temperature for action planning.
    pub plan_temperature: f32,
    pub bot_nickname: String,
    /// Personality trait lines, joined with spaces when rendered.
    pub personality: Vec<String>,

    pub think_interval_secs: u64,
    /// Wait between checks while no sub-mind exists.
    pub empty_wait_secs: u64,
    pub cleanup_interval_secs: u64,
    /// A sub-mind idle for longer than this is evicted.
    pub idle_timeout_secs: u64,
    pub sub_mind_interval_secs: u64,
    /// Messages kept in each observation history.
    pub max_history: usize,
    /// Capacity of the action proposal channel.
    pub proposal_capacity: usize,
}

impl Default for HeartflowConfig {
    fn default() -> Self {
        Self {
            llm_url: "http://localhost:8080".to_string(),
            llm_timeout_secs: 60,
            max_tokens: 1000,
            think_temperature: 0.6,
            plan_temperature: 0.7,
            bot_nickname: "麦麦".to_string(),
            personality: split_personality(DEFAULT_PERSONALITY),
            think_interval_secs: 300,
            empty_wait_secs: 60,
            cleanup_interval_secs: 30,
            idle_timeout_secs: 600,
            sub_mind_interval_secs: 20,
            max_history: 30,
            proposal_capacity: 100,
        }
    }
}

impl HeartflowConfig {
    /// Load configuration from `HEARTFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, HeartflowError> {
        let defaults = Self::default();

        let personality = std::env::var("HEARTFLOW_PERSONALITY")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| split_personality(&s))
            .unwrap_or(defaults.personality);

        Ok(Self {
            llm_url: env_string("HEARTFLOW_LLM_URL").unwrap_or(defaults.llm_url),
            llm_timeout_secs: env_parse("HEARTFLOW_LLM_TIMEOUT_SECS")?
                .unwrap_or(defaults.llm_timeout_secs),
            max_tokens: env_parse("HEARTFLOW_MAX_TOKENS")?.unwrap_or(defaults.max_tokens),
            think_temperature: env_parse("HEARTFLOW_THINK_TEMPERATURE")?
                .unwrap_or(defaults.think_temperature),
            plan_temperature: env_parse("HEARTFLOW_PLAN_TEMPERATURE")?
                .unwrap_or(defaults.plan_temperature),
            bot_nickname: env_string("HEARTFLOW_BOT_NICKNAME").unwrap_or(defaults.bot_nickname),
            personality,
            think_interval_secs: env_parse("HEARTFLOW_THINK_INTERVAL_SECS")?
                .unwrap_or(defaults.think_interval_secs),
            empty_wait_secs: env_parse("HEARTFLOW_EMPTY_WAIT_SECS")?
                .unwrap_or(defaults.empty_wait_secs),
            cleanup_interval_secs: env_parse("HEARTFLOW_CLEANUP_INTERVAL_SECS")?
                .unwrap_or(defaults.cleanup_interval_secs),
            idle_timeout_secs: env_parse("HEARTFLOW_IDLE_TIMEOUT_SECS")?
                .unwrap_or(defaults.idle_timeout_secs),
            sub_mind_interval_secs: env_parse("HEARTFLOW_SUB_MIND_INTERVAL_SECS")?
                .unwrap_or(defaults.sub_mind_interval_secs),
            max_history: env_parse("HEARTFLOW_MAX_HISTORY")?.unwrap_or(defaults.max_history),
            proposal_capacity: env_parse("HEARTFLOW_PROPOSAL_CAPACITY")?
                .unwrap_or(defaults.proposal_capacity),
        })
    }

    pub fn think_interval(&self) -> Duration {
        Duration::from_secs(self.think_interval_secs)
    }

    pub fn empty_wait(&self) -> Duration {
        Duration::from_secs(self.empty_wait_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sub_mind_interval(&self) -> Duration {
        Duration::from_secs(self.sub_mind_interval_secs)
    }
}

fn split_personality(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, HeartflowError> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HeartflowError::Config(format!("{key} has invalid value '{raw}'"))),
        None => Ok(None),
    }
}
