#![allow(dead_code)]

use async_trait::async_trait;
use heartflow::services::{
    Generation, InMemorySchedule, StaticMood, StaticPersonality, TextOracle,
};
use heartflow::{HeartflowConfig, HeartflowError, MindServices};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Oracle that replays queued responses and records every prompt it sees.
/// Once the queue is empty it answers with `fallback`.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    fallback: String,
}

impl ScriptedOracle {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
            fallback: "嗯".to_string(),
        })
    }

    pub fn push_ok(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextOracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<Generation, HeartflowError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(Generation::text(text)),
            Some(Err(message)) => Err(HeartflowError::Oracle(message)),
            None => Ok(Generation::text(self.fallback.clone())),
        }
    }
}

pub fn test_config() -> HeartflowConfig {
    HeartflowConfig {
        sub_mind_interval_secs: 5,
        ..HeartflowConfig::default()
    }
}

pub fn personality() -> StaticPersonality {
    StaticPersonality::new(
        "麦麦",
        vec!["是一个女大学生".to_string(), "喜欢开玩笑".to_string()],
    )
}

pub fn services(oracle: Arc<ScriptedOracle>, schedule: Arc<InMemorySchedule>) -> MindServices {
    MindServices {
        thinker: oracle.clone(),
        planner: oracle,
        mood: Arc::new(StaticMood::new("开心")),
        schedule,
        personality: Arc::new(personality()),
    }
}

/// Let spawned tasks run until `done` holds, without moving the clock.
pub async fn settle(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if done() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    done()
}
