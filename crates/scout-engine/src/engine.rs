//! Engine facade: lazy per-user actor registry and the decay clock entry
//! point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use scout_events::NotifyHub;
use scout_protocol::ResearchFinding;

use crate::actor::{self, ActorHandle};
use crate::drives::{now_ms, DriveConfig};
use crate::error::EngineError;
use crate::findings::FindingStore;
use crate::researcher::Researcher;
use crate::topics::DEFAULT_ACTIVE_CAP;

/// Engine-wide tuning. Per-user drive configuration starts from
/// `drive_config` and is adjusted per user through the config surface.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub active_cap: usize,
    pub max_concurrent_cycles: usize,
    pub tick_interval: Duration,
    pub drive_config: DriveConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            active_cap: DEFAULT_ACTIVE_CAP,
            max_concurrent_cycles: 3,
            tick_interval: Duration::from_secs(10),
            drive_config: DriveConfig::default(),
        }
    }
}

#[derive(Clone)]
struct UserEntry {
    actor: ActorHandle,
    findings: Arc<RwLock<FindingStore>>,
}

/// One engine manages many users; each user's state lives in its own actor.
pub struct ResearchEngine {
    config: EngineConfig,
    researcher: Arc<dyn Researcher>,
    hub: Arc<NotifyHub>,
    users: RwLock<HashMap<String, UserEntry>>,
}

impl ResearchEngine {
    pub fn new(config: EngineConfig, researcher: Arc<dyn Researcher>, hub: Arc<NotifyHub>) -> Arc<Self> {
        Arc::new(Self {
            config,
            researcher,
            hub,
            users: RwLock::new(HashMap::new()),
        })
    }

    pub fn hub(&self) -> Arc<NotifyHub> {
        self.hub.clone()
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval
    }

    /// Handle for a user, creating the actor with default drive config on
    /// first activity.
    pub async fn user(&self, user_id: &str) -> ActorHandle {
        if let Some(entry) = self.users.read().await.get(user_id) {
            return entry.actor.clone();
        }
        let mut guard = self.users.write().await;
        if let Some(entry) = guard.get(user_id) {
            return entry.actor.clone();
        }
        debug!(user = %user_id, "creating research actor");
        let findings = Arc::new(RwLock::new(FindingStore::new()));
        let actor = actor::spawn(
            user_id.to_string(),
            self.config.drive_config,
            self.config.active_cap,
            self.config.max_concurrent_cycles,
            self.researcher.clone(),
            self.hub.clone(),
            findings.clone(),
        );
        guard.insert(
            user_id.to_string(),
            UserEntry {
                actor: actor.clone(),
                findings,
            },
        );
        actor
    }

    /// Advance every known user's drive state to `now`. Called by the clock
    /// task; cheap non-blocking arithmetic inside each actor.
    pub async fn tick_all(&self, now_ms: u64) {
        let actors: Vec<ActorHandle> = {
            let guard = self.users.read().await;
            guard.values().map(|e| e.actor.clone()).collect()
        };
        for actor in actors {
            // A full mailbox or a gone actor must not stall the clock.
            let _ = actor.tick(now_ms);
        }
    }

    /// Advance every user to the current wall clock.
    pub async fn tick_now(&self) {
        self.tick_all(now_ms()).await;
    }

    async fn findings_of(&self, user_id: &str) -> Arc<RwLock<FindingStore>> {
        // Ensure the user exists so finding reads on a fresh user return
        // an empty list instead of an error.
        self.user(user_id).await;
        self.users
            .read()
            .await
            .get(user_id)
            .map(|e| e.findings.clone())
            .expect("user entry created above")
    }

    pub async fn list_findings(&self, user_id: &str) -> Vec<ResearchFinding> {
        self.findings_of(user_id).await.read().await.list()
    }

    pub async fn unread_findings(&self, user_id: &str) -> usize {
        self.findings_of(user_id).await.read().await.unread_count()
    }

    pub async fn mark_finding_read(
        &self,
        user_id: &str,
        finding_id: &str,
    ) -> Result<ResearchFinding, EngineError> {
        self.findings_of(user_id)
            .await
            .write()
            .await
            .mark_read(finding_id)
    }

    pub async fn mark_finding_bookmarked(
        &self,
        user_id: &str,
        finding_id: &str,
    ) -> Result<ResearchFinding, EngineError> {
        self.findings_of(user_id)
            .await
            .write()
            .await
            .mark_bookmarked(finding_id)
    }

    pub async fn mark_finding_integrated(
        &self,
        user_id: &str,
        finding_id: &str,
    ) -> Result<ResearchFinding, EngineError> {
        self.findings_of(user_id)
            .await
            .write()
            .await
            .mark_integrated(finding_id)
    }

    pub async fn delete_finding(
        &self,
        user_id: &str,
        finding_id: &str,
    ) -> Result<ResearchFinding, EngineError> {
        self.findings_of(user_id)
            .await
            .write()
            .await
            .remove(finding_id)
    }

    pub async fn delete_findings_for_topic(&self, user_id: &str, topic_id: &str) -> usize {
        self.findings_of(user_id)
            .await
            .write()
            .await
            .remove_for_topic(topic_id)
    }

    /// Stop all actors. Used on service shutdown; in-flight cycles are left
    /// to drain with the runtime.
    pub async fn shutdown(&self) {
        let actors: Vec<ActorHandle> = {
            let guard = self.users.read().await;
            guard.values().map(|e| e.actor.clone()).collect()
        };
        for actor in actors {
            actor.shutdown().await;
        }
    }
}
