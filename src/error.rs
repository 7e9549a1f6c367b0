/// Errors surfaced by the heartflow core.
///
/// Oracle and parse failures inside the planner never reach callers; they are
/// folded into a default decision there. Everything else bubbles up to the
/// loop that issued it, which logs and carries on.
#[derive(Debug, thiserror::Error)]
pub enum HeartflowError {
    #[error("LLM error: {0}")]
    Oracle(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("heartflow is shutting down")]
    ShuttingDown,

    #[error("sub-mind {0} is no longer registered")]
    StaleReference(String),
}
