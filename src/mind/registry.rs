use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::observation::ChatMessage;
use super::services::MindServices;
use super::sub_mind::SubMind;
use crate::config::HeartflowConfig;
use crate::error::HeartflowError;
use crate::planner::types::PlanDecision;

/// A decision a sub-mind wants the chat layer to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionProposal {
    pub conversation_id: String,
    pub decision: PlanDecision,
}

/// Owner of every live sub-mind.
///
/// Creation and eviction both take the map's write lock, so they never
/// interleave. Readers (aggregation, broadcast) take the read lock.
pub struct MindRegistry {
    config: HeartflowConfig,
    services: MindServices,
    sub_minds: RwLock<HashMap<String, Arc<SubMind>>>,
    next_seq: AtomicU64,
    running_loops: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    proposals: mpsc::Sender<ActionProposal>,
}

impl MindRegistry {
    pub fn new(
        config: HeartflowConfig,
        services: MindServices,
    ) -> (Arc<Self>, mpsc::Receiver<ActionProposal>) {
        let (tx, rx) = mpsc::channel(config.proposal_capacity.max(1));
        let registry = Arc::new(Self {
            config,
            services,
            sub_minds: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            running_loops: Arc::new(AtomicUsize::new(0)),
            shutdown: CancellationToken::new(),
            proposals: tx,
        });
        (registry, rx)
    }

    pub fn config(&self) -> &HeartflowConfig {
        &self.config
    }

    pub fn services(&self) -> &MindServices {
        &self.services
    }

    /// Fetch the sub-mind for `conversation_id`, creating it and starting its
    /// loop on first reference.
    pub async fn get_or_create(
        self: &Arc<Self>,
        conversation_id: &str,
    ) -> Result<Arc<SubMind>, HeartflowError> {
        if let Some(existing) = self.get(conversation_id).await {
            return Ok(existing);
        }
        if self.shutdown.is_cancelled() {
            return Err(HeartflowError::ShuttingDown);
        }

        let mut map = self.sub_minds.write().await;
        // Lost a race with another creator between the read and write lock
        if let Some(existing) = map.get(conversation_id) {
            return Ok(existing.clone());
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mind = Arc::new(SubMind::new(
            conversation_id,
            seq,
            self.services.clone(),
            &self.config.bot_nickname,
            self.config.max_history,
        ));

        self.running_loops.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(run_sub_mind(self.clone(), mind.clone()));

        map.insert(conversation_id.to_string(), mind.clone());
        info!(
            conversation_id,
            instance = %mind.instance_id(),
            "sub-mind created"
        );
        Ok(mind)
    }

    pub async fn get(&self, conversation_id: &str) -> Option<Arc<SubMind>> {
        self.sub_minds.read().await.get(conversation_id).cloned()
    }

    /// Route an incoming message to its conversation's sub-mind.
    ///
    /// The message is recorded under the map's read lock, so a sweep cannot
    /// evict the sub-mind between lookup and touch.
    pub async fn observe(
        self: &Arc<Self>,
        conversation_id: &str,
        message: ChatMessage,
    ) -> Result<Arc<SubMind>, HeartflowError> {
        loop {
            {
                let map = self.sub_minds.read().await;
                if let Some(mind) = map.get(conversation_id) {
                    mind.observe(message).await;
                    return Ok(mind.clone());
                }
            }
            self.get_or_create(conversation_id).await?;
        }
    }

    /// Ok while `instance` is still the registered sub-mind for the id.
    pub async fn ensure_current(
        &self,
        conversation_id: &str,
        instance: Uuid,
    ) -> Result<(), HeartflowError> {
        match self.sub_minds.read().await.get(conversation_id) {
            Some(mind) if mind.instance_id() == instance => Ok(()),
            _ => Err(HeartflowError::StaleReference(conversation_id.to_string())),
        }
    }

    /// Sub-minds in creation order.
    pub async fn sub_minds(&self) -> Vec<Arc<SubMind>> {
        let mut minds: Vec<_> = self.sub_minds.read().await.values().cloned().collect();
        minds.sort_by_key(|m| m.seq());
        minds
    }

    pub async fn len(&self) -> usize {
        self.sub_minds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sub_minds.read().await.is_empty()
    }

    /// Overwrite every sub-mind's inbound global thought.
    pub async fn broadcast(&self, thought: &str) {
        for mind in self.sub_minds().await {
            mind.set_inbound_global_thought(thought).await;
        }
    }

    /// Evict every sub-mind idle for longer than the configured timeout.
    /// Returns the evicted conversation ids.
    pub async fn sweep_idle(&self) -> Vec<String> {
        let now = Instant::now();
        let timeout = self.config.idle_timeout();
        let mut map = self.sub_minds.write().await;

        let mut inactive = Vec::new();
        for (id, mind) in map.iter() {
            let idle = now.saturating_duration_since(mind.last_active().await);
            if idle > timeout {
                info!(conversation_id = %id, idle_secs = idle.as_secs(), "found inactive sub-mind");
                inactive.push(id.clone());
            }
        }

        for id in &inactive {
            map.remove(id);
            info!(conversation_id = %id, "evicted inactive sub-mind");
        }
        inactive
    }

    /// Periodic eviction sweep. Runs until shutdown.
    pub async fn run_cleanup(self: Arc<Self>) {
        let interval = self.config.cleanup_interval();
        info!(interval_secs = interval.as_secs(), "sub-mind cleanup started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            self.sweep_idle().await;
        }
        info!("sub-mind cleanup stopped");
    }

    /// Number of sub-mind loops that have not exited yet.
    pub fn running_loops(&self) -> usize {
        self.running_loops.load(Ordering::SeqCst)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop creating sub-minds and signal every loop to exit.
    pub fn shutdown(&self) {
        info!("heartflow shutdown requested");
        self.shutdown.cancel();
    }

    fn publish(&self, proposal: ActionProposal) {
        if let Err(e) = self.proposals.try_send(proposal) {
            warn!("dropping action proposal: {}", e);
        }
    }
}

struct LoopGuard(Arc<AtomicUsize>);

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_sub_mind(registry: Arc<MindRegistry>, mind: Arc<SubMind>) {
    let _guard = LoopGuard(registry.running_loops.clone());
    let interval = registry.config.sub_mind_interval();
    let conversation_id = mind.conversation_id().to_string();
    let instance = mind.instance_id();
    debug!(conversation_id = %conversation_id, instance = %instance, "sub-mind loop started");

    loop {
        tokio::select! {
            _ = registry.shutdown.cancelled() => {
                debug!(conversation_id = %conversation_id, "sub-mind loop stopped by shutdown");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if let Err(e) = registry.ensure_current(&conversation_id, instance).await {
            debug!(conversation_id = %conversation_id, instance = %instance, "{}, loop exiting", e);
            break;
        }

        if let Some(decision) = mind.step().await {
            registry.publish(ActionProposal {
                conversation_id: conversation_id.clone(),
                decision,
            });
        }
    }
}
