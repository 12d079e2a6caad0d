//! Per-user actor.
//!
//! Each user's drive state, topic set, and running-cycle set are owned by a
//! single task fed from an mpsc mailbox, so ticks, admission calls, and
//! trigger requests for one user are processed one at a time in arrival
//! order. That single-writer discipline is what makes the cap re-check and
//! the idle→running transition atomic without explicit locks.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use scout_events::{NotificationEvent, NotifyHub};
use scout_protocol::{
    AdmissionOutcome, ConfigUpdate, DriveOverride, ResearchFinding, ResearchStatus, Topic,
    TopicCandidate,
};

use crate::drives::{now_ms, DriveConfig, DriveState};
use crate::error::EngineError;
use crate::findings::FindingStore;
use crate::researcher::{CycleOutput, Researcher};
use crate::topics::TopicSet;

const MAILBOX_CAPACITY: usize = 64;

pub(crate) enum UserCmd {
    Tick {
        now_ms: u64,
    },
    Activity,
    Status {
        reply: oneshot::Sender<ResearchStatus>,
    },
    SetConfig {
        update: ConfigUpdate,
        reply: oneshot::Sender<Result<ResearchStatus, EngineError>>,
    },
    OverrideDrives {
        update: DriveOverride,
        reply: oneshot::Sender<Result<ResearchStatus, EngineError>>,
    },
    Propose {
        candidate: TopicCandidate,
        reply: oneshot::Sender<(Topic, AdmissionOutcome)>,
    },
    ListTopics {
        reply: oneshot::Sender<Vec<Topic>>,
    },
    Enable {
        topic_id: String,
        reply: oneshot::Sender<Result<Topic, EngineError>>,
    },
    Disable {
        topic_id: String,
        reply: oneshot::Sender<Result<Topic, EngineError>>,
    },
    Delete {
        topic_id: String,
        reply: oneshot::Sender<Result<Topic, EngineError>>,
    },
    DeleteSession {
        session_id: String,
        reply: oneshot::Sender<usize>,
    },
    CleanupDuplicates {
        reply: oneshot::Sender<usize>,
    },
    ManualTrigger {
        reply: oneshot::Sender<usize>,
    },
    Start {
        reply: oneshot::Sender<ResearchStatus>,
    },
    Stop {
        reply: oneshot::Sender<ResearchStatus>,
    },
    CycleDone {
        topic: Topic,
        outcome: Result<CycleOutput, EngineError>,
    },
    Shutdown,
}

/// Cheap cloneable handle to one user's actor.
#[derive(Clone)]
pub struct ActorHandle {
    user_id: String,
    tx: mpsc::Sender<UserCmd>,
}

impl ActorHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> UserCmd,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(make(tx))
            .await
            .map_err(|_| EngineError::ActorUnavailable(self.user_id.clone()))?;
        rx.await
            .map_err(|_| EngineError::ActorUnavailable(self.user_id.clone()))
    }

    /// Non-blocking: a full mailbox drops this tick instead of stalling the
    /// shared clock; the next tick covers the whole elapsed interval anyway.
    pub fn tick(&self, now_ms: u64) -> Result<(), EngineError> {
        self.tx
            .try_send(UserCmd::Tick { now_ms })
            .map_err(|_| EngineError::ActorUnavailable(self.user_id.clone()))
    }

    pub async fn record_activity(&self) -> Result<(), EngineError> {
        self.tx
            .send(UserCmd::Activity)
            .await
            .map_err(|_| EngineError::ActorUnavailable(self.user_id.clone()))
    }

    pub async fn status(&self) -> Result<ResearchStatus, EngineError> {
        self.call(|reply| UserCmd::Status { reply }).await
    }

    pub async fn set_config(&self, update: ConfigUpdate) -> Result<ResearchStatus, EngineError> {
        self.call(|reply| UserCmd::SetConfig { update, reply })
            .await?
    }

    pub async fn override_drives(
        &self,
        update: DriveOverride,
    ) -> Result<ResearchStatus, EngineError> {
        self.call(|reply| UserCmd::OverrideDrives { update, reply })
            .await?
    }

    pub async fn propose(
        &self,
        candidate: TopicCandidate,
    ) -> Result<(Topic, AdmissionOutcome), EngineError> {
        self.call(|reply| UserCmd::Propose { candidate, reply })
            .await
    }

    pub async fn list_topics(&self) -> Result<Vec<Topic>, EngineError> {
        self.call(|reply| UserCmd::ListTopics { reply }).await
    }

    pub async fn enable(&self, topic_id: impl Into<String>) -> Result<Topic, EngineError> {
        let topic_id = topic_id.into();
        self.call(|reply| UserCmd::Enable { topic_id, reply }).await?
    }

    pub async fn disable(&self, topic_id: impl Into<String>) -> Result<Topic, EngineError> {
        let topic_id = topic_id.into();
        self.call(|reply| UserCmd::Disable { topic_id, reply })
            .await?
    }

    pub async fn delete(&self, topic_id: impl Into<String>) -> Result<Topic, EngineError> {
        let topic_id = topic_id.into();
        self.call(|reply| UserCmd::Delete { topic_id, reply }).await?
    }

    pub async fn delete_session(&self, session_id: impl Into<String>) -> Result<usize, EngineError> {
        let session_id = session_id.into();
        self.call(|reply| UserCmd::DeleteSession { session_id, reply })
            .await
    }

    pub async fn cleanup_duplicates(&self) -> Result<usize, EngineError> {
        self.call(|reply| UserCmd::CleanupDuplicates { reply }).await
    }

    /// Manual "research now". Returns how many cycles actually started.
    pub async fn trigger(&self) -> Result<usize, EngineError> {
        self.call(|reply| UserCmd::ManualTrigger { reply }).await
    }

    pub async fn start(&self) -> Result<ResearchStatus, EngineError> {
        self.call(|reply| UserCmd::Start { reply }).await
    }

    pub async fn stop(&self) -> Result<ResearchStatus, EngineError> {
        self.call(|reply| UserCmd::Stop { reply }).await
    }

    pub async fn restart(&self) -> Result<ResearchStatus, EngineError> {
        self.stop().await?;
        self.start().await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(UserCmd::Shutdown).await;
    }
}

pub(crate) struct UserActor {
    user_id: String,
    drives: DriveState,
    topics: TopicSet,
    findings: Arc<RwLock<FindingStore>>,
    running: HashSet<String>,
    engine_running: bool,
    max_concurrent: usize,
    researcher: Arc<dyn Researcher>,
    hub: Arc<NotifyHub>,
    tx_self: mpsc::Sender<UserCmd>,
    updated_ms: u64,
}

pub(crate) fn spawn(
    user_id: String,
    drive_config: DriveConfig,
    active_cap: usize,
    max_concurrent: usize,
    researcher: Arc<dyn Researcher>,
    hub: Arc<NotifyHub>,
    findings: Arc<RwLock<FindingStore>>,
) -> ActorHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let now = now_ms();
    let actor = UserActor {
        user_id: user_id.clone(),
        drives: DriveState::new(drive_config, now),
        topics: TopicSet::new(active_cap),
        findings,
        running: HashSet::new(),
        engine_running: true,
        max_concurrent: max_concurrent.max(1),
        researcher,
        hub,
        tx_self: tx.clone(),
        updated_ms: now,
    };
    tokio::spawn(actor.run(rx));
    ActorHandle { user_id, tx }
}

impl UserActor {
    async fn run(mut self, mut rx: mpsc::Receiver<UserCmd>) {
        debug!(user = %self.user_id, "research actor started");
        while let Some(cmd) = rx.recv().await {
            if !self.handle(cmd).await {
                break;
            }
        }
        debug!(user = %self.user_id, "research actor stopped");
    }

    /// Returns `false` when the actor should exit.
    async fn handle(&mut self, cmd: UserCmd) -> bool {
        match cmd {
            UserCmd::Tick { now_ms } => {
                // Frozen while stopped: elapsed wall time produces zero
                // drive change, and the baseline is rebased on restart.
                if self.engine_running {
                    self.drives.tick(now_ms);
                    self.updated_ms = now_ms;
                    if self.drives.ready() {
                        self.dispatch_cycles();
                    }
                }
            }
            UserCmd::Activity => {
                self.drives.record_activity();
                self.touch();
                if self.engine_running && self.drives.ready() {
                    self.dispatch_cycles();
                }
            }
            UserCmd::Status { reply } => {
                let _ = reply.send(self.status());
            }
            UserCmd::SetConfig { update, reply } => {
                let result = self.drives.apply_config(&update).map(|()| {
                    self.touch();
                    self.status()
                });
                let _ = reply.send(result);
            }
            UserCmd::OverrideDrives { update, reply } => {
                let result = self.drives.apply_override(&update).map(|()| {
                    self.touch();
                    self.status()
                });
                let ok = result.is_ok();
                let _ = reply.send(result);
                if ok && self.engine_running && self.drives.ready() {
                    self.dispatch_cycles();
                }
            }
            UserCmd::Propose { candidate, reply } => {
                let outcome = self.topics.propose(candidate);
                self.touch();
                let _ = reply.send(outcome);
            }
            UserCmd::ListTopics { reply } => {
                let _ = reply.send(self.topics.list());
            }
            UserCmd::Enable { topic_id, reply } => {
                let result = self.topics.enable(&topic_id);
                self.touch();
                let _ = reply.send(result);
            }
            UserCmd::Disable { topic_id, reply } => {
                let result = self.topics.disable(&topic_id);
                self.touch();
                let _ = reply.send(result);
            }
            UserCmd::Delete { topic_id, reply } => {
                let result = self.topics.remove(&topic_id);
                if result.is_ok() {
                    self.findings.write().await.remove_for_topic(&topic_id);
                }
                self.touch();
                let _ = reply.send(result);
            }
            UserCmd::DeleteSession { session_id, reply } => {
                let removed = self.topics.remove_session(&session_id);
                self.touch();
                let _ = reply.send(removed);
            }
            UserCmd::CleanupDuplicates { reply } => {
                let removed = self.topics.cleanup_duplicates();
                self.touch();
                let _ = reply.send(removed);
            }
            UserCmd::ManualTrigger { reply } => {
                // Bypasses the threshold, never the no-overlap rule. Zero
                // eligible topics is a normal answer, not an error.
                let started = if self.engine_running {
                    self.dispatch_cycles()
                } else {
                    0
                };
                let _ = reply.send(started);
            }
            UserCmd::Start { reply } => {
                if !self.engine_running {
                    self.engine_running = true;
                    self.drives.rebase(now_ms());
                    info!(user = %self.user_id, "research engine started");
                }
                self.touch();
                self.publish_status();
                let _ = reply.send(self.status());
            }
            UserCmd::Stop { reply } => {
                if self.engine_running {
                    self.engine_running = false;
                    info!(
                        user = %self.user_id,
                        in_flight = self.running.len(),
                        "research engine stopped; in-flight cycles will drain"
                    );
                }
                self.touch();
                self.publish_status();
                let _ = reply.send(self.status());
            }
            UserCmd::CycleDone { topic, outcome } => {
                self.on_cycle_done(topic, outcome).await;
            }
            UserCmd::Shutdown => return false,
        }
        true
    }

    fn touch(&mut self) {
        self.updated_ms = now_ms();
    }

    fn status(&self) -> ResearchStatus {
        ResearchStatus {
            user_id: self.user_id.clone(),
            running: self.engine_running,
            drives: self.drives.drives(),
            impetus: self.drives.impetus(),
            threshold: self.drives.threshold(),
            rates: self.drives.rates(),
            active_topics: self.topics.active_count(),
            running_cycles: self.running.len(),
            updated_ms: self.updated_ms,
        }
    }

    fn publish_status(&self) {
        self.hub.publish(
            &self.user_id,
            NotificationEvent::SystemStatus {
                running: self.engine_running,
                impetus: self.drives.impetus(),
                active_topics: self.topics.active_count(),
            },
        );
    }

    /// Select eligible active topics and start one cycle per topic, bounded
    /// by the per-user concurrency budget. The running-set insert happens
    /// here, inside the actor, before the cycle future is spawned, so a
    /// rapid double trigger can never start two cycles for one topic.
    fn dispatch_cycles(&mut self) -> usize {
        let budget = self.max_concurrent.saturating_sub(self.running.len());
        if budget == 0 {
            return 0;
        }
        let mut started = 0;
        for topic in self.topics.active() {
            if started >= budget {
                break;
            }
            if self.running.contains(&topic.topic_id) {
                // Skip signal, not an error to the caller.
                let skip = EngineError::CycleInProgress(topic.topic_id.clone());
                debug!(user = %self.user_id, reason = %skip, "skipping dispatch");
                continue;
            }
            self.running.insert(topic.topic_id.clone());
            let researcher = self.researcher.clone();
            let tx = self.tx_self.clone();
            debug!(user = %self.user_id, topic = %topic.topic_id, name = %topic.name, "research cycle starting");
            tokio::spawn(async move {
                let outcome = researcher.research(&topic).await;
                // The actor may already be gone on shutdown; nothing to do then.
                let _ = tx.send(UserCmd::CycleDone { topic, outcome }).await;
            });
            started += 1;
        }
        started
    }

    async fn on_cycle_done(&mut self, topic: Topic, outcome: Result<CycleOutput, EngineError>) {
        self.running.remove(&topic.topic_id);
        self.touch();
        match outcome {
            Ok(output) => {
                let quality = output.quality_score.clamp(0.0, 1.0);
                let finding = ResearchFinding {
                    finding_id: uuid::Uuid::new_v4().to_string(),
                    topic_id: topic.topic_id.clone(),
                    topic_name: topic.name.clone(),
                    quality_score: quality,
                    research_time: chrono::Utc::now()
                        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                    read: false,
                    bookmarked: false,
                    integrated: false,
                    content: serde_json::json!({
                        "content": output.content,
                        "key_insights": output.key_insights,
                        "sources": output.sources,
                    }),
                };
                self.findings.write().await.insert(finding.clone());
                // Drives stay frozen while the engine is stopped; a draining
                // cycle still records its finding.
                if self.engine_running {
                    self.drives.absorb_cycle(quality);
                }
                info!(
                    user = %self.user_id,
                    topic = %topic.topic_id,
                    quality,
                    "research cycle completed"
                );
                self.hub.publish(
                    &self.user_id,
                    NotificationEvent::NewResearch { finding },
                );
                self.hub.publish(
                    &self.user_id,
                    NotificationEvent::ResearchComplete {
                        topic_id: topic.topic_id,
                        topic_name: topic.name,
                        quality_score: quality,
                    },
                );
            }
            Err(err) => {
                // Absorbed into the normal cadence: no finding, no drive
                // change, no immediate retry.
                warn!(
                    user = %self.user_id,
                    topic = %topic.topic_id,
                    error = %err,
                    "research cycle failed; will retry at next natural trigger"
                );
            }
        }
    }
}
