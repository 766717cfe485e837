//! Resumable queue state persisted between drain invocations.

use serde::{Deserialize, Serialize};

use super::accumulator::Accumulator;

/// Version of the queue document shape.
///
/// Bumping it forces the next drain to discard any in-flight cycle and
/// enumerate the record population again.
pub const QUEUE_SCHEMA_VERSION: u32 = 5;

/// Observable phase of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePhase {
    /// No cycle in progress; the next drain enumerates.
    Empty,
    /// Entries remain to be folded.
    Draining,
    /// Cycle finalized; waiting for the reset task.
    Complete,
}

impl std::fmt::Display for QueuePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueuePhase::Empty => write!(f, "empty"),
            QueuePhase::Draining => write!(f, "draining"),
            QueuePhase::Complete => write!(f, "complete"),
        }
    }
}

/// The single, globally shared queue document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Record keys awaiting a full-payload fold.
    #[serde(default)]
    pub entries: Vec<String>,
    /// Accumulator of the cycle in progress.
    #[serde(default)]
    pub data: Accumulator,
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub process_complete: bool,
}

impl QueueState {
    /// A fresh, empty queue at the current schema version.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            data: Accumulator::new(),
            schema_version: QUEUE_SCHEMA_VERSION,
            process_complete: false,
        }
    }

    /// Queue left behind by a finalized cycle.
    pub fn completed() -> Self {
        Self {
            process_complete: true,
            ..Self::new()
        }
    }

    /// Whether the stored shape predates the current schema.
    pub fn is_stale(&self) -> bool {
        self.schema_version != QUEUE_SCHEMA_VERSION
    }

    pub fn phase(&self) -> QueuePhase {
        match (self.entries.is_empty(), self.process_complete) {
            (false, _) => QueuePhase::Draining,
            (true, true) => QueuePhase::Complete,
            (true, false) => QueuePhase::Empty,
        }
    }

    /// Reset is only allowed once a cycle has fully drained.
    pub fn can_reset(&self) -> bool {
        self.entries.is_empty() && self.process_complete
    }

    /// Remove and return up to `limit` entries from the front of the queue.
    pub fn pop_chunk(&mut self, limit: usize) -> Vec<String> {
        let take = limit.min(self.entries.len());
        self.entries.drain(..take).collect()
    }
}

impl Default for QueueState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_entries(n: usize) -> QueueState {
        QueueState {
            entries: (0..n).map(|i| format!("uuid:{i}")).collect(),
            ..QueueState::new()
        }
    }

    #[test]
    fn test_new_queue_is_empty_phase() {
        let queue = QueueState::new();
        assert_eq!(queue.phase(), QueuePhase::Empty);
        assert!(!queue.is_stale());
        assert!(!queue.can_reset());
    }

    #[test]
    fn test_phases() {
        assert_eq!(with_entries(3).phase(), QueuePhase::Draining);
        assert_eq!(QueueState::completed().phase(), QueuePhase::Complete);
    }

    #[test]
    fn test_can_reset_requires_complete_and_empty() {
        assert!(QueueState::completed().can_reset());

        let mut draining = with_entries(1);
        draining.process_complete = true;
        assert!(!draining.can_reset());

        assert!(!with_entries(0).can_reset());
    }

    #[test]
    fn test_pop_chunk() {
        let mut queue = with_entries(5);
        let chunk = queue.pop_chunk(2);
        assert_eq!(chunk, vec!["uuid:0", "uuid:1"]);
        assert_eq!(queue.entries.len(), 3);

        let rest = queue.pop_chunk(100);
        assert_eq!(rest.len(), 3);
        assert!(queue.entries.is_empty());
        assert!(queue.pop_chunk(10).is_empty());
    }

    #[test]
    fn test_missing_schema_version_is_stale() {
        let queue: QueueState = serde_json::from_str(r#"{"entries":[],"process_complete":false}"#)
            .unwrap();
        assert!(queue.is_stale());
    }

    #[test]
    fn test_completed_document_without_data() {
        let queue: QueueState = serde_json::from_str(
            r#"{"entries":[],"process_complete":true,"schema_version":5}"#,
        )
        .unwrap();
        assert_eq!(queue.phase(), QueuePhase::Complete);
        assert_eq!(queue.data, Accumulator::new());
    }
}
