//! Heartbeat monitor
//!
//! Two halves: a timer task that ticks at the server-provided interval, and
//! [`HeartbeatState`], the ack bookkeeping the connection loop consults on
//! every tick. Ticks carry the connection generation they were started for,
//! so a tick that races a reconnect is recognised and ignored.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Consecutive unacknowledged heartbeats that mark a connection stale
pub const MISSED_ACK_TOLERANCE: u32 = 2;

/// Shortest interval the timer accepts
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// What to do on a timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    /// Send a heartbeat
    Beat,
    /// Too many acks missed; treat the connection as dropped
    Stale,
}

/// Ack tracking for one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatState {
    awaiting_ack: bool,
    missed: u32,
}

impl HeartbeatState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a tick and decide whether to beat
    pub fn on_tick(&mut self) -> Pulse {
        if self.awaiting_ack {
            self.missed += 1;
        }
        if self.missed >= MISSED_ACK_TOLERANCE {
            return Pulse::Stale;
        }
        self.awaiting_ack = true;
        Pulse::Beat
    }

    /// A heartbeat was sent outside the timer (server request)
    pub fn on_forced_beat(&mut self) {
        self.awaiting_ack = true;
    }

    pub fn on_ack(&mut self) {
        self.awaiting_ack = false;
        self.missed = 0;
    }

    #[inline]
    pub fn missed(&self) -> u32 {
        self.missed
    }

    #[inline]
    pub fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }
}

/// Timer tick tagged with its connection generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTick {
    pub generation: u64,
}

/// Periodic heartbeat timer bound to one connection generation
///
/// The timer task is aborted when the monitor is stopped or dropped.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    generation: u64,
    task: JoinHandle<()>,
}

impl HeartbeatMonitor {
    /// Start ticking; the first tick fires one full interval from now
    pub fn start(
        generation: u64,
        interval: Duration,
        ticks: mpsc::UnboundedSender<HeartbeatTick>,
    ) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let task = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if ticks.send(HeartbeatTick { generation }).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(
            generation,
            interval_ms = interval.as_millis() as u64,
            "Heartbeat monitor started"
        );

        Self { generation, task }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the timer
    pub fn stop(self) {
        tracing::debug!(generation = self.generation, "Heartbeat monitor stopped");
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acked_heartbeats_never_go_stale() {
        let mut state = HeartbeatState::new();
        for _ in 0..10 {
            assert_eq!(state.on_tick(), Pulse::Beat);
            state.on_ack();
        }
        assert_eq!(state.missed(), 0);
    }

    #[test]
    fn test_two_missed_acks_go_stale() {
        let mut state = HeartbeatState::new();
        assert_eq!(state.on_tick(), Pulse::Beat);
        assert_eq!(state.on_tick(), Pulse::Beat);
        assert_eq!(state.missed(), 1);
        assert_eq!(state.on_tick(), Pulse::Stale);
        assert_eq!(state.missed(), MISSED_ACK_TOLERANCE);
    }

    #[test]
    fn test_ack_resets_missed_count() {
        let mut state = HeartbeatState::new();
        state.on_tick();
        state.on_tick();
        state.on_ack();
        assert_eq!(state.on_tick(), Pulse::Beat);
        assert_eq!(state.on_tick(), Pulse::Beat);
        assert_eq!(state.on_tick(), Pulse::Stale);
    }

    #[test]
    fn test_forced_beat_awaits_ack() {
        let mut state = HeartbeatState::new();
        state.on_forced_beat();
        assert!(state.is_awaiting_ack());
        assert_eq!(state.on_tick(), Pulse::Beat);
        assert_eq!(state.missed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_ticks_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let monitor = HeartbeatMonitor::start(7, Duration::from_millis(500), tx);

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick, HeartbeatTick { generation: 7 });
        assert_eq!(monitor.generation(), 7);

        monitor.stop();
        // The aborted task drops its sender, closing the channel
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let _monitor = HeartbeatMonitor::start(1, Duration::from_secs(3), tx);

        rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
