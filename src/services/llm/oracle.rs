use async_trait::async_trait;

use crate::error::HeartflowError;

/// One completion from the model: the text plus whatever reasoning trace the
/// backend chose to expose (empty when it exposes none).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub trace: String,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            trace: String::new(),
        }
    }
}

/// The text generation oracle. Output is untrusted; callers parse defensively.
#[async_trait]
pub trait TextOracle: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, HeartflowError>;
}
