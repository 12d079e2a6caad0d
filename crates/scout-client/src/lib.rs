//! Client side of the notification channel.
//!
//! An explicit connection state machine rather than ad hoc timers: unexpected
//! closes reconnect with doubling backoff up to an attempt budget, a periodic
//! heartbeat detects half-open connections, and event handling is idempotent
//! per envelope id so duplicate delivery never double-counts unread
//! notifications. After the attempt budget is exhausted the channel parks in
//! `Failed` and the caller falls back to polling.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use scout_events::{Envelope, NotificationEvent};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("reconnect attempts exhausted after {0}")]
    Exhausted(u32),
}

/// Connection lifecycle of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Reconnecting => "reconnecting",
            ChannelState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    /// First reconnect delay; doubles on every further attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub heartbeat_interval: Duration,
    /// Ring of recent display events kept client-side.
    pub retain_events: usize,
    /// Bound on the duplicate-suppression id set.
    pub seen_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
            heartbeat_interval: Duration::from_secs(15),
            retain_events: 50,
            seen_capacity: 512,
        }
    }
}

/// Doubling backoff with a cap; `attempt` counts from 1.
pub fn backoff_delay(config: &ChannelConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(20);
    let delay = config.base_delay.saturating_mul(1u32 << exp);
    delay.min(config.max_delay)
}

/// One live duplex connection to the server.
#[async_trait]
pub trait ChannelConnection: Send {
    /// Next envelope; `Ok(None)` means the server closed cleanly.
    async fn recv(&mut self) -> Result<Option<Envelope>, ChannelError>;
    async fn send_heartbeat(&mut self) -> Result<(), ChannelError>;
}

/// Factory for connections; the WebSocket dialer in production, a script in
/// tests.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ChannelConnection>, ChannelError>;
}

/// Bounded id set for idempotent dispatch.
struct SeenIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
    capacity: usize,
}

impl SeenIds {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Returns `false` when the id was already seen.
    fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        self.order.push_back(id.to_string());
        self.ids.insert(id.to_string());
        true
    }
}

enum SessionEnd {
    Clean,
    Dropped(ChannelError),
}

pub struct NotificationChannel<T: ChannelTransport> {
    transport: T,
    config: ChannelConfig,
    state: ChannelState,
    seen: SeenIds,
    recent: VecDeque<Envelope>,
    unread: usize,
    last_status: Option<(bool, f64)>,
}

impl<T: ChannelTransport> NotificationChannel<T> {
    pub fn new(transport: T, config: ChannelConfig) -> Self {
        Self {
            transport,
            state: ChannelState::Disconnected,
            seen: SeenIds::new(config.seen_capacity),
            recent: VecDeque::with_capacity(config.retain_events),
            unread: 0,
            last_status: None,
            config,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn mark_all_read(&mut self) {
        self.unread = 0;
    }

    /// Engine running flag and impetus from the latest status event.
    pub fn last_status(&self) -> Option<(bool, f64)> {
        self.last_status
    }

    /// Recent display events, newest last.
    pub fn recent(&self) -> impl Iterator<Item = &Envelope> {
        self.recent.iter()
    }

    /// Drive the channel until the server closes cleanly or the reconnect
    /// budget is exhausted.
    pub async fn run(&mut self) -> Result<(), ChannelError> {
        let mut attempt: u32 = 0;
        loop {
            self.state = if attempt == 0 {
                ChannelState::Connecting
            } else {
                ChannelState::Reconnecting
            };
            match self.transport.connect().await {
                Ok(conn) => {
                    attempt = 0;
                    self.state = ChannelState::Connected;
                    match self.pump(conn).await {
                        SessionEnd::Clean => {
                            self.state = ChannelState::Disconnected;
                            return Ok(());
                        }
                        SessionEnd::Dropped(err) => {
                            warn!(error = %err, "channel dropped; reconnecting");
                        }
                    }
                }
                Err(err) => {
                    debug!(error = %err, attempt, "connect failed");
                }
            }
            attempt += 1;
            if attempt > self.config.max_attempts {
                self.state = ChannelState::Failed;
                return Err(ChannelError::Exhausted(self.config.max_attempts));
            }
            tokio::time::sleep(backoff_delay(&self.config, attempt)).await;
        }
    }

    async fn pump(&mut self, mut conn: Box<dyn ChannelConnection>) -> SessionEnd {
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately; it doubles as the
        // post-connect liveness probe.
        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if let Err(err) = conn.send_heartbeat().await {
                        return SessionEnd::Dropped(err);
                    }
                }
                msg = conn.recv() => match msg {
                    Ok(Some(envelope)) => {
                        self.handle_envelope(envelope);
                    }
                    Ok(None) => return SessionEnd::Clean,
                    Err(err) => return SessionEnd::Dropped(err),
                },
            }
        }
    }

    /// Dispatch one envelope. Returns `false` for a duplicate id, which is
    /// dropped without any side effect.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> bool {
        if !self.seen.insert(&envelope.id) {
            debug!(id = %envelope.id, kind = envelope.event.kind(), "duplicate event dropped");
            return false;
        }
        match &envelope.event {
            NotificationEvent::ConnectionEstablished { user_id } => {
                debug!(user = %user_id, "channel established");
            }
            NotificationEvent::Heartbeat => {
                // Liveness only; not retained for display.
                return true;
            }
            NotificationEvent::NewResearch { .. } => {
                self.unread += 1;
            }
            NotificationEvent::ResearchComplete { .. } => {}
            NotificationEvent::SystemStatus { running, impetus, .. } => {
                self.last_status = Some((*running, *impetus));
            }
        }
        if self.recent.len() == self.config.retain_events {
            self.recent.pop_front();
        }
        self.recent.push_back(envelope);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn envelope(id: &str, event: NotificationEvent) -> Envelope {
        Envelope {
            id: id.to_string(),
            time: "2026-01-01T00:00:00.000Z".into(),
            event,
        }
    }

    fn finding_event(n: usize) -> NotificationEvent {
        NotificationEvent::NewResearch {
            finding: scout_protocol::ResearchFinding {
                finding_id: format!("f{n}"),
                topic_id: "t".into(),
                topic_name: "t".into(),
                quality_score: 0.5,
                research_time: "2026-01-01T00:00:00.000Z".into(),
                read: false,
                bookmarked: false,
                integrated: false,
                content: serde_json::json!({}),
            },
        }
    }

    /// Scripted transport: fails `failures` times, then hands out
    /// connections that replay a fixed message tape.
    struct ScriptTransport {
        failures: AtomicUsize,
        tape: Vec<Envelope>,
        connects_at: Arc<Mutex<Vec<Instant>>>,
    }

    struct TapeConnection {
        tape: std::vec::IntoIter<Envelope>,
        heartbeats: usize,
    }

    #[async_trait]
    impl ChannelConnection for TapeConnection {
        async fn recv(&mut self) -> Result<Option<Envelope>, ChannelError> {
            match self.tape.next() {
                Some(env) => Ok(Some(env)),
                None => Ok(None),
            }
        }

        async fn send_heartbeat(&mut self) -> Result<(), ChannelError> {
            self.heartbeats += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl ChannelTransport for ScriptTransport {
        async fn connect(&self) -> Result<Box<dyn ChannelConnection>, ChannelError> {
            self.connects_at.lock().unwrap().push(Instant::now());
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ChannelError::Transport("refused".into()));
            }
            Ok(Box::new(TapeConnection {
                tape: self.tape.clone().into_iter(),
                heartbeats: 0,
            }))
        }
    }

    fn config() -> ChannelConfig {
        ChannelConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            max_attempts: 4,
            heartbeat_interval: Duration::from_secs(60),
            retain_events: 50,
            seen_capacity: 512,
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let cfg = config();
        let delays: Vec<u64> = (1..=6)
            .map(|n| backoff_delay(&cfg, n).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_with_increasing_delays_until_transport_recovers() {
        let connects_at = Arc::new(Mutex::new(Vec::new()));
        let transport = ScriptTransport {
            failures: AtomicUsize::new(2),
            tape: vec![envelope(
                "e1",
                NotificationEvent::ConnectionEstablished {
                    user_id: "kai".into(),
                },
            )],
            connects_at: connects_at.clone(),
        };
        let mut channel = NotificationChannel::new(transport, config());

        channel.run().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Disconnected);

        let instants = connects_at.lock().unwrap().clone();
        assert_eq!(instants.len(), 3);
        // Delays between attempts follow the doubling schedule.
        let gap1 = instants[1] - instants[0];
        let gap2 = instants[2] - instants[1];
        assert_eq!(gap1, Duration::from_secs(1));
        assert_eq!(gap2, Duration::from_secs(2));
        assert_eq!(channel.recent().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_park_in_failed() {
        let transport = ScriptTransport {
            failures: AtomicUsize::new(usize::MAX),
            tape: Vec::new(),
            connects_at: Arc::new(Mutex::new(Vec::new())),
        };
        let mut channel = NotificationChannel::new(transport, config());
        let err = channel.run().await.unwrap_err();
        assert!(matches!(err, ChannelError::Exhausted(4)));
        assert_eq!(channel.state(), ChannelState::Failed);
    }

    #[test]
    fn duplicate_ids_never_double_count() {
        let transport = ScriptTransport {
            failures: AtomicUsize::new(0),
            tape: Vec::new(),
            connects_at: Arc::new(Mutex::new(Vec::new())),
        };
        let mut channel = NotificationChannel::new(transport, config());

        assert!(channel.handle_envelope(envelope("a", finding_event(1))));
        assert!(!channel.handle_envelope(envelope("a", finding_event(1))));
        assert_eq!(channel.unread(), 1);
        assert_eq!(channel.recent().count(), 1);

        // An already-acknowledged heartbeat id is also dropped silently.
        assert!(channel.handle_envelope(envelope("hb", NotificationEvent::Heartbeat)));
        assert!(!channel.handle_envelope(envelope("hb", NotificationEvent::Heartbeat)));
    }

    #[test]
    fn ring_is_bounded() {
        let transport = ScriptTransport {
            failures: AtomicUsize::new(0),
            tape: Vec::new(),
            connects_at: Arc::new(Mutex::new(Vec::new())),
        };
        let mut channel = NotificationChannel::new(transport, config());
        for n in 0..60 {
            channel.handle_envelope(envelope(&format!("id-{n}"), finding_event(n)));
        }
        assert_eq!(channel.recent().count(), 50);
        assert_eq!(channel.unread(), 60);
        // Oldest entries were evicted.
        assert_eq!(channel.recent().next().unwrap().id, "id-10");
    }

    #[test]
    fn status_events_update_last_status() {
        let transport = ScriptTransport {
            failures: AtomicUsize::new(0),
            tape: Vec::new(),
            connects_at: Arc::new(Mutex::new(Vec::new())),
        };
        let mut channel = NotificationChannel::new(transport, config());
        channel.handle_envelope(envelope(
            "s1",
            NotificationEvent::SystemStatus {
                running: true,
                impetus: 0.75,
                active_topics: 2,
            },
        ));
        assert_eq!(channel.last_status(), Some((true, 0.75)));
    }
}
