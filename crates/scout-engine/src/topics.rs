//! Topic set and admission control.
//!
//! The set is owned by one user's actor, so every mutation here runs under
//! that actor's total order; the cap check and the flag flip are a single
//! step. The active count is always recomputed from the flags, never tracked
//! incrementally.

use std::collections::HashMap;

use scout_protocol::{AdmissionOutcome, Topic, TopicCandidate};

use crate::error::EngineError;

pub const DEFAULT_ACTIVE_CAP: usize = 5;

#[derive(Debug)]
pub struct TopicSet {
    topics: HashMap<String, Topic>,
    cap: usize,
}

impl TopicSet {
    pub fn new(cap: usize) -> Self {
        Self {
            topics: HashMap::new(),
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Active count, recomputed from the source of truth.
    pub fn active_count(&self) -> usize {
        self.topics.values().filter(|t| t.is_active_research).count()
    }

    pub fn get(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.get(topic_id)
    }

    /// Topics sorted newest-first.
    pub fn list(&self) -> Vec<Topic> {
        let mut items: Vec<Topic> = self.topics.values().cloned().collect();
        items.sort_by(|a, b| b.suggested_at.cmp(&a.suggested_at).then(a.topic_id.cmp(&b.topic_id)));
        items
    }

    /// Ids of topics currently authorized for research.
    pub fn active(&self) -> Vec<Topic> {
        self.topics
            .values()
            .filter(|t| t.is_active_research)
            .cloned()
            .collect()
    }

    /// Admit a newly suggested or hand-created topic.
    ///
    /// Activates immediately when a slot is free, otherwise parks it
    /// (`is_active_research = false`) for later explicit enablement. Parking
    /// is a deferred state, not an error.
    pub fn propose(&mut self, candidate: TopicCandidate) -> (Topic, AdmissionOutcome) {
        let outcome = if self.active_count() < self.cap {
            AdmissionOutcome::Activated
        } else {
            AdmissionOutcome::Parked
        };
        let topic = Topic {
            topic_id: uuid::Uuid::new_v4().to_string(),
            session_id: candidate.session_id,
            name: candidate.name,
            description: candidate.description,
            confidence_score: candidate.confidence_score.clamp(0.0, 1.0),
            suggested_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            is_active_research: outcome == AdmissionOutcome::Activated,
        };
        self.topics.insert(topic.topic_id.clone(), topic.clone());
        (topic, outcome)
    }

    /// Explicit activation. The cap re-check and the flip happen in one step
    /// under the owning actor's serialization.
    pub fn enable(&mut self, topic_id: &str) -> Result<Topic, EngineError> {
        let active_count = self.active_count();
        let cap = self.cap;
        let topic = self
            .topics
            .get_mut(topic_id)
            .ok_or_else(|| EngineError::TopicNotFound(topic_id.to_string()))?;
        if topic.is_active_research {
            return Ok(topic.clone());
        }
        if active_count >= cap {
            return Err(EngineError::CapacityExceeded { active_count, cap });
        }
        topic.is_active_research = true;
        Ok(topic.clone())
    }

    /// Deactivate a topic, freeing its slot. Parked topics are never
    /// auto-promoted by this; promotion only happens on a later explicit
    /// enable or proposal.
    pub fn disable(&mut self, topic_id: &str) -> Result<Topic, EngineError> {
        let topic = self
            .topics
            .get_mut(topic_id)
            .ok_or_else(|| EngineError::TopicNotFound(topic_id.to_string()))?;
        topic.is_active_research = false;
        Ok(topic.clone())
    }

    pub fn remove(&mut self, topic_id: &str) -> Result<Topic, EngineError> {
        self.topics
            .remove(topic_id)
            .ok_or_else(|| EngineError::TopicNotFound(topic_id.to_string()))
    }

    /// Bulk delete of every topic belonging to a session. Returns the number
    /// removed.
    pub fn remove_session(&mut self, session_id: &str) -> usize {
        let before = self.topics.len();
        self.topics.retain(|_, t| t.session_id != session_id);
        before - self.topics.len()
    }

    /// Drop duplicate topics sharing a (case-insensitive) name, preferring an
    /// active entry, then the higher confidence score. Returns the number
    /// removed.
    pub fn cleanup_duplicates(&mut self) -> usize {
        let mut keep: HashMap<String, String> = HashMap::new();
        for t in self.topics.values() {
            let key = t.name.trim().to_lowercase();
            match keep.get(&key) {
                None => {
                    keep.insert(key, t.topic_id.clone());
                }
                Some(existing_id) => {
                    let existing = &self.topics[existing_id];
                    let better = (t.is_active_research, t.confidence_score)
                        > (existing.is_active_research, existing.confidence_score);
                    if better {
                        keep.insert(key, t.topic_id.clone());
                    }
                }
            }
        }
        let before = self.topics.len();
        self.topics.retain(|id, t| {
            keep.get(&t.name.trim().to_lowercase())
                .map(|kept| kept == id)
                .unwrap_or(true)
        });
        before - self.topics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> TopicCandidate {
        TopicCandidate {
            session_id: "s1".into(),
            name: name.into(),
            description: String::new(),
            confidence_score: 0.7,
        }
    }

    fn full_set() -> (TopicSet, Vec<String>) {
        let mut set = TopicSet::new(5);
        let mut ids = Vec::new();
        for i in 0..5 {
            let (t, outcome) = set.propose(candidate(&format!("topic-{i}")));
            assert_eq!(outcome, AdmissionOutcome::Activated);
            ids.push(t.topic_id);
        }
        (set, ids)
    }

    #[test]
    fn sixth_topic_parks_and_enable_reports_capacity() {
        let (mut set, _ids) = full_set();
        let (sixth, outcome) = set.propose(candidate("overflow"));
        assert_eq!(outcome, AdmissionOutcome::Parked);
        assert!(!sixth.is_active_research);
        assert_eq!(set.active_count(), 5);

        match set.enable(&sixth.topic_id) {
            Err(EngineError::CapacityExceeded { active_count, cap }) => {
                assert_eq!(active_count, 5);
                assert_eq!(cap, 5);
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
        assert!(!set.get(&sixth.topic_id).unwrap().is_active_research);
    }

    #[test]
    fn disable_frees_slot_without_promotion() {
        let (mut set, ids) = full_set();
        let (parked, _) = set.propose(candidate("parked"));

        set.disable(&ids[0]).unwrap();
        assert_eq!(set.active_count(), 4);
        // No auto-promotion from the disable itself.
        assert!(!set.get(&parked.topic_id).unwrap().is_active_research);

        let enabled = set.enable(&parked.topic_id).unwrap();
        assert!(enabled.is_active_research);
        assert_eq!(set.active_count(), 5);
    }

    #[test]
    fn delete_active_frees_slot() {
        let (mut set, ids) = full_set();
        set.remove(&ids[0]).unwrap();
        assert_eq!(set.active_count(), 4);
        let (_, outcome) = set.propose(candidate("replacement"));
        assert_eq!(outcome, AdmissionOutcome::Activated);
    }

    #[test]
    fn enable_is_idempotent_for_active_topic() {
        let (mut set, ids) = full_set();
        let t = set.enable(&ids[0]).unwrap();
        assert!(t.is_active_research);
        assert_eq!(set.active_count(), 5);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut set = TopicSet::new(5);
        assert!(matches!(set.enable("nope"), Err(EngineError::TopicNotFound(_))));
        assert!(matches!(set.disable("nope"), Err(EngineError::TopicNotFound(_))));
        assert!(matches!(set.remove("nope"), Err(EngineError::TopicNotFound(_))));
    }

    #[test]
    fn session_bulk_delete_keeps_invariant() {
        let mut set = TopicSet::new(2);
        set.propose(candidate("a"));
        set.propose(candidate("b"));
        let mut other = candidate("c");
        other.session_id = "s2".into();
        set.propose(other);

        let removed = set.remove_session("s1");
        assert_eq!(removed, 2);
        assert!(set.active_count() <= set.cap());
        assert_eq!(set.list().len(), 1);
    }

    #[test]
    fn duplicate_cleanup_prefers_active_then_confidence() {
        let mut set = TopicSet::new(1);
        let (first, _) = set.propose(candidate("Rust Async"));
        // Second copy parks (cap 1), despite higher confidence.
        let mut dup = candidate("rust async");
        dup.confidence_score = 0.95;
        let (second, outcome) = set.propose(dup);
        assert_eq!(outcome, AdmissionOutcome::Parked);

        let removed = set.cleanup_duplicates();
        assert_eq!(removed, 1);
        assert!(set.get(&first.topic_id).is_some());
        assert!(set.get(&second.topic_id).is_none());
        assert!(set.active_count() <= set.cap());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Propose(u8),
            Enable(u8),
            Disable(u8),
            Delete(u8),
            DeleteSession,
            Cleanup,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<u8>().prop_map(Op::Propose),
                any::<u8>().prop_map(Op::Enable),
                any::<u8>().prop_map(Op::Disable),
                any::<u8>().prop_map(Op::Delete),
                Just(Op::DeleteSession),
                Just(Op::Cleanup),
            ]
        }

        proptest! {
            /// The active count never exceeds the cap after any operation,
            /// for arbitrary operation sequences.
            #[test]
            fn cap_invariant_holds(cap in 1usize..8, ops in proptest::collection::vec(op_strategy(), 1..120)) {
                let mut set = TopicSet::new(cap);
                let mut known: Vec<String> = Vec::new();
                for op in ops {
                    match op {
                        Op::Propose(seed) => {
                            let (t, _) = set.propose(TopicCandidate {
                                session_id: format!("s{}", seed % 3),
                                name: format!("topic-{}", seed % 16),
                                description: String::new(),
                                confidence_score: f64::from(seed) / 255.0,
                            });
                            known.push(t.topic_id);
                        }
                        Op::Enable(i) if !known.is_empty() => {
                            let id = &known[i as usize % known.len()];
                            let _ = set.enable(id);
                        }
                        Op::Disable(i) if !known.is_empty() => {
                            let id = &known[i as usize % known.len()];
                            let _ = set.disable(id);
                        }
                        Op::Delete(i) if !known.is_empty() => {
                            let id = known[i as usize % known.len()].clone();
                            let _ = set.remove(&id);
                        }
                        Op::DeleteSession => {
                            set.remove_session("s0");
                        }
                        Op::Cleanup => {
                            set.cleanup_duplicates();
                        }
                        _ => {}
                    }
                    prop_assert!(set.active_count() <= set.cap());
                    // Count always agrees with the flags themselves.
                    let from_flags = set.list().iter().filter(|t| t.is_active_research).count();
                    prop_assert_eq!(set.active_count(), from_flags);
                }
            }
        }
    }
}
