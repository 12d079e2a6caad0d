//! Per-user finding store.
//!
//! Findings are appended by completed cycles and mutated by read/bookmark/
//! integrate actions from the client. All mark operations are idempotent.

use std::collections::HashMap;

use scout_protocol::ResearchFinding;

use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct FindingStore {
    findings: HashMap<String, ResearchFinding>,
}

impl FindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, finding: ResearchFinding) {
        self.findings.insert(finding.finding_id.clone(), finding);
    }

    pub fn get(&self, finding_id: &str) -> Option<&ResearchFinding> {
        self.findings.get(finding_id)
    }

    /// Findings sorted newest-first.
    pub fn list(&self) -> Vec<ResearchFinding> {
        let mut items: Vec<ResearchFinding> = self.findings.values().cloned().collect();
        items.sort_by(|a, b| {
            b.research_time
                .cmp(&a.research_time)
                .then(a.finding_id.cmp(&b.finding_id))
        });
        items
    }

    pub fn unread_count(&self) -> usize {
        self.findings.values().filter(|f| !f.read).count()
    }

    pub fn mark_read(&mut self, finding_id: &str) -> Result<ResearchFinding, EngineError> {
        self.mark(finding_id, |f| f.read = true)
    }

    pub fn mark_bookmarked(&mut self, finding_id: &str) -> Result<ResearchFinding, EngineError> {
        self.mark(finding_id, |f| f.bookmarked = true)
    }

    pub fn mark_integrated(&mut self, finding_id: &str) -> Result<ResearchFinding, EngineError> {
        self.mark(finding_id, |f| f.integrated = true)
    }

    fn mark<F>(&mut self, finding_id: &str, apply: F) -> Result<ResearchFinding, EngineError>
    where
        F: FnOnce(&mut ResearchFinding),
    {
        let finding = self
            .findings
            .get_mut(finding_id)
            .ok_or_else(|| EngineError::FindingNotFound(finding_id.to_string()))?;
        apply(finding);
        Ok(finding.clone())
    }

    pub fn remove(&mut self, finding_id: &str) -> Result<ResearchFinding, EngineError> {
        self.findings
            .remove(finding_id)
            .ok_or_else(|| EngineError::FindingNotFound(finding_id.to_string()))
    }

    /// Delete every finding for a topic. Returns the number removed.
    pub fn remove_for_topic(&mut self, topic_id: &str) -> usize {
        let before = self.findings.len();
        self.findings.retain(|_, f| f.topic_id != topic_id);
        before - self.findings.len()
    }
}
