use heartflow::services::{InMemorySchedule, LLMService, StaticMood, StaticPersonality};
use heartflow::{ChatMessage, Heartflow, HeartflowConfig, MindServices};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Parse `<conversation_id> <sender>: <text>`.
fn parse_line(line: &str) -> Option<(&str, ChatMessage)> {
    let (conversation_id, rest) = line.trim().split_once(' ')?;
    let (sender, text) = rest.split_once(':')?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some((conversation_id, ChatMessage::new(sender.trim(), text)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = HeartflowConfig::from_env()?;
    tracing::info!(llm_url = %config.llm_url, "Heartflow booting...");

    let services = MindServices {
        thinker: Arc::new(LLMService::for_thinking(&config)?),
        planner: Arc::new(LLMService::for_planning(&config)?),
        mood: Arc::new(StaticMood::default()),
        schedule: Arc::new(InMemorySchedule::new(vec!["在宿舍摸鱼".to_string()])),
        personality: Arc::new(StaticPersonality::new(
            config.bot_nickname.clone(),
            config.personality.clone(),
        )),
    };

    let (heartflow, mut proposals) = Heartflow::new(config, services);
    let handles = heartflow.spawn();
    let registry = heartflow.registry().clone();

    // Proposals are only printed here; a chat adapter would act on them
    tokio::spawn(async move {
        while let Some(proposal) = proposals.recv().await {
            println!(
                "[{}] {} ({})",
                proposal.conversation_id, proposal.decision.action, proposal.decision.reason
            );
        }
    });

    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Type '<conversation_id> <sender>: <text>' to feed a conversation.");

        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let Some((conversation_id, message)) = parse_line(&line) else {
                tracing::warn!("Ignoring malformed line: '{}'", line);
                continue;
            };
            if let Err(e) = registry.observe(conversation_id, message).await {
                tracing::error!("Failed to observe message: {}", e);
                break;
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received, shutting down");
    heartflow.shutdown();
    input.abort();

    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}
