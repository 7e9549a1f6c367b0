mod common;

use common::{services, settle, test_config, ScriptedOracle};
use heartflow::services::InMemorySchedule;
use heartflow::{ChatMessage, Goal, HeartflowError, MindRegistry, PlanAction};
use std::sync::Arc;
use std::time::Duration;

fn registry(
    oracle: &Arc<ScriptedOracle>,
) -> (Arc<MindRegistry>, tokio::sync::mpsc::Receiver<heartflow::ActionProposal>) {
    let schedule = Arc::new(InMemorySchedule::default());
    MindRegistry::new(test_config(), services(oracle.clone(), schedule))
}

#[tokio::test(start_paused = true)]
async fn test_one_sub_mind_per_conversation() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    let first = registry.get_or_create("group-1").await.unwrap();
    let again = registry.get_or_create("group-1").await.unwrap();
    let other = registry.get_or_create("group-2").await.unwrap();

    assert!(Arc::ptr_eq(&first, &again), "Same id must map to the same sub-mind");
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(registry.len().await, 2);
    assert!(settle(|| registry.running_loops() == 2).await);

    let ordered: Vec<String> = registry
        .sub_minds()
        .await
        .iter()
        .map(|m| m.conversation_id().to_string())
        .collect();
    assert_eq!(ordered, vec!["group-1".to_string(), "group-2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_evicts_only_past_timeout() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    registry.get_or_create("stale").await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;
    registry.get_or_create("boundary").await.unwrap();

    // stale: idle 601s, boundary: idle exactly 600s
    tokio::time::advance(Duration::from_secs(600)).await;
    let evicted = registry.sweep_idle().await;

    assert_eq!(evicted, vec!["stale".to_string()]);
    assert!(registry.get("stale").await.is_none());
    assert!(registry.get("boundary").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_traffic_keeps_sub_mind_alive() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    registry.get_or_create("group-1").await.unwrap();
    tokio::time::advance(Duration::from_secs(500)).await;
    registry
        .observe("group-1", ChatMessage::new("alice", "还在吗"))
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(200)).await;

    assert!(registry.sweep_idle().await.is_empty());
    assert!(registry.get("group-1").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_evicted_loop_exits_and_id_gets_fresh_sub_mind() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    let old = registry
        .observe("group-1", ChatMessage::new("alice", "第一条"))
        .await
        .unwrap();
    old.push_goal(Goal::new("认识新朋友", "有新人进群")).await;
    assert!(settle(|| registry.running_loops() == 1).await);

    tokio::time::advance(Duration::from_secs(601)).await;
    // The loop may have planned once while time moved; only eviction matters here
    registry.sweep_idle().await;
    assert!(registry.is_empty().await);
    assert!(matches!(
        registry.ensure_current("group-1", old.instance_id()).await,
        Err(HeartflowError::StaleReference(_))
    ));

    // Next wake-up notices the eviction and the loop ends
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(settle(|| registry.running_loops() == 0).await, "Evicted loop must exit");

    let fresh = registry
        .observe("group-1", ChatMessage::new("alice", "我又回来了"))
        .await
        .unwrap();
    assert_ne!(fresh.instance_id(), old.instance_id());
    assert!(fresh.conversation().await.goal_stack.is_empty(), "State is not restored");
    assert_eq!(fresh.unprocessed_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_message_racing_a_sweep_lands_on_registered_sub_mind() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    let old = registry.get_or_create("group-1").await.unwrap();
    tokio::time::advance(Duration::from_secs(601)).await;

    let (routed, _) = tokio::join!(
        registry.observe("group-1", ChatMessage::new("alice", "还有人吗")),
        registry.sweep_idle(),
    );
    let routed = routed.unwrap();

    // Whichever ran first, the message is held by the sub-mind the registry maps
    let current = registry.get("group-1").await.expect("conversation stays registered");
    assert!(Arc::ptr_eq(&routed, &current));
    assert!(registry.ensure_current("group-1", routed.instance_id()).await.is_ok());
    assert_eq!(current.unprocessed_count().await, 1);
    if !Arc::ptr_eq(&old, &current) {
        assert_eq!(old.unprocessed_count().await, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_observe_after_eviction_creates_fresh_sub_mind() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    let old = registry.get_or_create("group-1").await.unwrap();
    tokio::time::advance(Duration::from_secs(601)).await;
    assert_eq!(registry.sweep_idle().await, vec!["group-1".to_string()]);

    let routed = registry
        .observe("group-1", ChatMessage::new("alice", "还有人吗"))
        .await
        .unwrap();

    assert_ne!(routed.instance_id(), old.instance_id());
    assert!(registry.ensure_current("group-1", routed.instance_id()).await.is_ok());
    assert_eq!(routed.unprocessed_count().await, 1);
    assert_eq!(old.unprocessed_count().await, 0, "Evicted instance gets nothing");
}

#[tokio::test(start_paused = true)]
async fn test_sub_mind_loop_thinks_plans_and_publishes() {
    let oracle = ScriptedOracle::new(&[
        "大家在讨论晚饭吃什么，我也有点饿了",
        r#"{"action": "direct_reply", "reason": "有人问我意见"}"#,
    ]);
    let (registry, mut rx) = registry(&oracle);

    let mind = registry
        .observe("group-1", ChatMessage::new("bob", "麦麦晚饭吃什么"))
        .await
        .unwrap();

    let proposal = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .expect("sub-mind should plan within one interval")
        .expect("channel open");

    assert_eq!(proposal.conversation_id, "group-1");
    assert_eq!(proposal.decision.action, PlanAction::DirectReply);
    assert_eq!(proposal.decision.reason, "有人问我意见");

    assert_eq!(mind.current_thought().await, "大家在讨论晚饭吃什么，我也有点饿了");
    assert_eq!(mind.unprocessed_count().await, 0);
    assert_eq!(
        mind.conversation().await.action_history,
        vec!["direct_reply: 有人问我意见".to_string()]
    );

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("bob: 麦麦晚饭吃什么"), "Thinking sees the new message");
    assert!(prompts[1].contains("有1条新消息："), "Planning sees it as new");
}

#[tokio::test(start_paused = true)]
async fn test_rethink_goal_pops_active_goal() {
    let oracle = ScriptedOracle::new(&[
        "这个话题好像聊不下去了",
        r#"{"action": "rethink_goal", "reason": "目标不合适"}"#,
    ]);
    let (registry, mut rx) = registry(&oracle);

    let mind = registry.get_or_create("group-1").await.unwrap();
    mind.push_goal(Goal::new("推销自己的画", "想被夸")).await;
    mind.observe(ChatMessage::new("carol", "不感兴趣")).await;

    let proposal = tokio::time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(proposal.decision.action, PlanAction::RethinkGoal);
    assert!(mind.conversation().await.goal_stack.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_idle_sub_mind_makes_no_oracle_calls() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    registry.get_or_create("group-1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(oracle.calls(), 0, "No pending messages means nothing to think about");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_loops_and_creation() {
    let oracle = ScriptedOracle::new(&[]);
    let (registry, _rx) = registry(&oracle);

    registry.get_or_create("group-1").await.unwrap();
    registry.get_or_create("group-2").await.unwrap();
    assert!(settle(|| registry.running_loops() == 2).await);

    registry.shutdown();
    assert!(registry.is_shutting_down());
    assert!(settle(|| registry.running_loops() == 0).await);

    assert!(matches!(
        registry.get_or_create("group-3").await,
        Err(HeartflowError::ShuttingDown)
    ));
    // Existing entries can still be looked up
    assert!(registry.get_or_create("group-1").await.is_ok());
}
