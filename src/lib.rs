//! heartflow: a simulated inner monologue for a chat bot.
//!
//! A [`GlobalMind`] keeps a running train of thought by periodically asking a
//! language model to continue it. Every active conversation gets a
//! [`SubMind`] with its own message observation and [`ActionPlanner`]; the
//! global mind folds their thoughts into its own and broadcasts the result
//! back. Idle sub-minds are evicted by the [`MindRegistry`].

pub mod config;
pub mod error;
pub mod mind;
pub mod planner;
pub mod services;

pub use config::HeartflowConfig;
pub use error::HeartflowError;
pub use mind::{
    ActionProposal, ChatMessage, GlobalMind, MindRegistry, MindServices, ObservationRegistry,
    SubMind,
};
pub use planner::{ActionPlanner, ConversationState, Goal, PlanAction, PlanDecision};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Registry plus global mind, wired together for the lifetime of the process.
pub struct Heartflow {
    registry: Arc<MindRegistry>,
    global: Arc<GlobalMind>,
}

impl Heartflow {
    /// Build the registry and global mind. The receiver yields every action
    /// proposal the sub-minds make.
    pub fn new(
        config: HeartflowConfig,
        services: MindServices,
    ) -> (Self, mpsc::Receiver<ActionProposal>) {
        let (registry, proposals) = MindRegistry::new(config, services);
        let global = Arc::new(GlobalMind::new(registry.clone()));
        (Self { registry, global }, proposals)
    }

    /// Spawn the eviction sweep and the global think loop.
    /// Both exit after [`Heartflow::shutdown`].
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.registry.clone().run_cleanup()),
            tokio::spawn(self.global.clone().run()),
        ]
    }

    pub fn registry(&self) -> &Arc<MindRegistry> {
        &self.registry
    }

    pub fn global(&self) -> &Arc<GlobalMind> {
        &self.global
    }

    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}
