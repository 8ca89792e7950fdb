//! Session bookkeeping
//!
//! What survives a dropped socket: the session id, where to resume, and the
//! last sequence number seen.

use std::time::Duration;

/// Resumable session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<String>,
    resume_url: Option<String>,
    sequence: Option<u64>,
    heartbeat_interval: Option<Duration>,
    missed_acks: u32,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[inline]
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    /// Last sequence number received
    #[inline]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    #[inline]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
    }

    #[inline]
    pub fn missed_acks(&self) -> u32 {
        self.missed_acks
    }

    /// Check if a resume can be attempted
    #[inline]
    pub fn is_resumable(&self) -> bool {
        self.id.is_some()
    }

    /// Record the session READY created
    pub fn establish(&mut self, id: impl Into<String>, resume_url: Option<String>) {
        self.id = Some(id.into());
        self.resume_url = resume_url;
    }

    /// Advance the resume cursor; it never moves backwards
    pub fn observe_sequence(&mut self, sequence: u64) {
        self.sequence = Some(self.sequence.map_or(sequence, |s| s.max(sequence)));
    }

    pub fn set_heartbeat_interval(&mut self, interval: Duration) {
        self.heartbeat_interval = Some(interval);
    }

    pub fn set_missed_acks(&mut self, missed: u32) {
        self.missed_acks = missed;
    }

    /// Forget everything; the next handshake identifies from scratch
    pub fn invalidate(&mut self) {
        if let Some(id) = self.id.as_deref() {
            tracing::debug!(session_id = %id, "Session invalidated");
        }
        *self = Self::default();
    }
}
