//! Scripted local round: two principals, a handful of viewers, one
//! rematch. Useful for watching the engine's pushes and logs end to end.

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use faceoff_core::clock::SystemClock;
use faceoff_core::error::EngineError;
use faceoff_core::rng::ThreadRandom;
use faceoff_core::store::DurableStore;
use faceoff_round::config::RoundConfig;
use faceoff_round::domain::{Phase, Role, Side, User};
use faceoff_round::events::{OutboundPush, RoundChannel, RoundEvent};
use faceoff_round::orchestrator::RoundOrchestrator;
use faceoff_round::state::RoundStateStore;
use faceoff_test_support::{MemoryStore, MemoryWinStreaks};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// In-memory store whose alarm actually fires back into the event queue.
struct AlarmStore {
    inner: MemoryStore,
    events: mpsc::UnboundedSender<RoundEvent>,
    alarm_task: Mutex<Option<JoinHandle<()>>>,
}

impl AlarmStore {
    fn new(events: mpsc::UnboundedSender<RoundEvent>) -> Self {
        Self {
            inner: MemoryStore::new(),
            events,
            alarm_task: Mutex::new(None),
        }
    }

    fn replace_alarm_task(&self, task: Option<JoinHandle<()>>) {
        let mut slot = self.alarm_task.lock().unwrap();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = task;
    }
}

#[async_trait]
impl DurableStore for AlarmStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, EngineError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), EngineError> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), EngineError> {
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<(), EngineError> {
        self.inner.clear().await
    }

    async fn set_alarm(&self, delay: Duration) -> Result<(), EngineError> {
        let events = self.events.clone();
        self.replace_alarm_task(Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(RoundEvent::Alarm);
        })));
        Ok(())
    }

    async fn cancel_alarm(&self) -> Result<(), EngineError> {
        self.replace_alarm_task(None);
        Ok(())
    }
}

/// Channel that logs every push instead of delivering it anywhere.
struct LogChannel;

fn push_label(push: &OutboundPush) -> &'static str {
    match push {
        OutboundPush::SetState(_) => "set-state",
        OutboundPush::UpdateScores(_) => "update-scores",
        OutboundPush::UpdateBooster(_) => "update-booster",
        OutboundPush::UpdateLeaderboard(_) => "update-leaderboard",
        OutboundPush::AnnounceTarget(_) => "announce-target",
        OutboundPush::SetDoubleTapped(_) => "set-double-tapped",
        OutboundPush::InviteDeclined => "invite-declined",
    }
}

#[async_trait]
impl RoundChannel for LogChannel {
    async fn broadcast(&self, push: OutboundPush) {
        tracing::debug!(kind = push_label(&push), "broadcast");
    }

    async fn send_to_role(&self, role: Role, push: OutboundPush) {
        tracing::debug!(?role, kind = push_label(&push), "send");
    }

    async fn send_to_user(&self, user_id: &str, push: OutboundPush) {
        tracing::debug!(user_id, kind = push_label(&push), "send");
    }
}

fn env_ms(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A compressed round so the whole script runs in under a minute.
    let config = RoundConfig {
        round_duration_ms: env_ms("ROUND_DURATION_MS", 15_000),
        victory_lap_ms: env_ms("VICTORY_LAP_MS", 3_000),
        alarm_grace_ms: 1_000,
        booster_duration_ms: 5_000,
        score_challenge_window_ms: 4_000,
        gifter_challenge_window_ms: 4_000,
        score_challenge_floor: 30,
        challenge_intro_min_ms: 1_000,
        challenge_intro_max_ms: 3_000,
        extra_time_ms: Some(5_000),
        ..RoundConfig::default()
    };
    config.validate()?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let store = Arc::new(AlarmStore::new(events_tx.clone()));
    let streaks = Arc::new(MemoryWinStreaks::new());
    streaks.seed("host-user", "2");

    let orchestrator = RoundOrchestrator::new(
        Arc::clone(&store) as _,
        Arc::clone(&streaks) as _,
        Arc::new(LogChannel),
        Arc::new(SystemClock),
        Box::new(ThreadRandom),
        config.clone(),
    );
    let driver = tokio::spawn(orchestrator.run(events_rx));

    let host = User::new("host-user", "hosty");
    let guest = User::new("guest-user", "guesty");
    events_tx.send(RoundEvent::Connect {
        role: Role::Streamer,
        user: host,
    })?;
    events_tx.send(RoundEvent::Connect {
        role: Role::Guest,
        user: guest,
    })?;
    for index in 1..=3 {
        events_tx.send(RoundEvent::Connect {
            role: Role::Viewer,
            user: User::new(format!("viewer-{index}"), format!("viewer {index}")),
        })?;
    }

    events_tx.send(RoundEvent::Start)?;

    // Contributions trickle in for the length of the round; viewer 1
    // favors the host, the others the guest.
    let round = Duration::from_millis(config.round_duration_ms);
    let started = tokio::time::Instant::now();
    let mut tick: u64 = 0;
    while started.elapsed() < round {
        tick += 1;
        let side = if tick % 3 == 0 { Side::Host } else { Side::Guest };
        let viewer = format!("viewer-{}", tick % 3 + 1);
        events_tx.send(RoundEvent::Contribution {
            side,
            user_id: viewer.clone(),
            value: 5,
            label: Some("rose".to_owned()),
        })?;
        if tick == 2 {
            events_tx.send(RoundEvent::Tap {
                side: Side::Host,
                user_id: viewer,
            })?;
        }
        tokio::time::sleep(Duration::from_millis(800)).await;
    }

    // Let the alarm and victory lap play out.
    tokio::time::sleep(Duration::from_millis(config.alarm_grace_ms + 1_000)).await;

    let state = RoundStateStore::new(Arc::clone(&store) as _);
    if let Some(data) = state.round(Phase::Concluded).await? {
        tracing::info!(
            winner = ?data.winner,
            host = data.scores.host,
            guest = data.scores.guest,
            feed_entries = data.feed.len(),
            "final whistle"
        );
    }
    tracing::info!(
        host_streak = ?streaks.value("host-user"),
        guest_streak = ?streaks.value("guest-user"),
        "ledger after round"
    );

    events_tx.send(RoundEvent::Restart {
        role: Role::Streamer,
    })?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    drop(events_tx);
    driver.await?;
    Ok(())
}
