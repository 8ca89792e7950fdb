//! Event dispatcher
//!
//! Stateless router: decode, apply to the cache, notify subscribers. A
//! payload that fails to decode skips the cache but is still delivered raw,
//! and a failing subscriber never affects the others or the cache.

use guildlink_cache::StateCache;
use guildlink_common::{DeliveryReport, ListenerRegistry, Subscription};
use guildlink_core::DecodeError;
use serde_json::Value;
use std::sync::Arc;

use super::apply_event;
use crate::events::GatewayEvent;

/// A dispatch exactly as it came off the wire
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub kind: String,
    pub payload: Option<Value>,
}

impl RawEvent {
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// What happened to one dispatched event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// The cache was mutated
    pub applied: bool,
    /// The payload did not decode; the cache was left alone
    pub decode_error: Option<DecodeError>,
    pub delivery: DeliveryReport,
}

/// Routes dispatch events into the state cache and out to subscribers
pub struct EventDispatcher {
    cache: Arc<StateCache>,
    subscribers: ListenerRegistry<RawEvent>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new(cache: Arc<StateCache>) -> Self {
        Self {
            cache,
            subscribers: ListenerRegistry::new("dispatch"),
        }
    }

    #[inline]
    pub fn cache(&self) -> &Arc<StateCache> {
        &self.cache
    }

    /// Receive every dispatch, known or not, after its cache effect
    pub fn subscribe<F>(&self, subscriber: F) -> Subscription
    where
        F: Fn(&RawEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.register(subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Dispatch one event
    pub fn dispatch(&self, kind: &str, payload: Option<Value>) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        match GatewayEvent::decode(kind, payload.as_ref()) {
            Ok(event) if touches_cache(&event) => {
                outcome.applied = self.cache.commit(|snapshot| apply_event(snapshot, event));
            }
            Ok(_) => {
                tracing::trace!(event_type = %kind, "Notify-only event");
            }
            Err(e) => {
                tracing::warn!(
                    event_type = %kind,
                    error = %e,
                    code = e.code(),
                    "Event payload failed to decode; cache untouched"
                );
                outcome.decode_error = Some(e);
            }
        }

        outcome.delivery = self.subscribers.notify(&RawEvent::new(kind, payload));
        outcome
    }

    /// Dispatch several events with a single cache commit
    ///
    /// The resulting snapshot equals dispatching them one by one in order.
    /// Subscribers are notified per event after the commit.
    pub fn dispatch_batch(&self, events: Vec<RawEvent>) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        let mut decoded = Vec::with_capacity(events.len());

        for raw in &events {
            let mut outcome = DispatchOutcome::default();
            match GatewayEvent::decode(&raw.kind, raw.payload.as_ref()) {
                Ok(event) if touches_cache(&event) => decoded.push((outcomes.len(), event)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        event_type = %raw.kind,
                        error = %e,
                        "Event payload failed to decode; skipped in batch"
                    );
                    outcome.decode_error = Some(e);
                }
            }
            outcomes.push(outcome);
        }

        if !decoded.is_empty() {
            let applied = self.cache.commit(|snapshot| {
                decoded
                    .into_iter()
                    .map(|(index, event)| (index, apply_event(snapshot, event)))
                    .collect::<Vec<_>>()
            });
            for (index, was_applied) in applied {
                outcomes[index].applied = was_applied;
            }
        }

        tracing::debug!(count = events.len(), "Dispatched event batch");

        for (raw, outcome) in events.iter().zip(outcomes.iter_mut()) {
            outcome.delivery = self.subscribers.notify(raw);
        }
        outcomes
    }
}

fn touches_cache(event: &GatewayEvent) -> bool {
    !matches!(
        event,
        GatewayEvent::Resumed | GatewayEvent::TypingStart(_) | GatewayEvent::Unknown(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildlink_core::Snowflake;
    use parking_lot::Mutex;
    use serde_json::json;

    fn dispatcher() -> EventDispatcher {
        EventDispatcher::new(Arc::new(StateCache::default()))
    }

    fn sample_events() -> Vec<RawEvent> {
        vec![
            RawEvent::new(
                "READY",
                Some(json!({
                    "v": 9,
                    "session_id": "s",
                    "user": { "id": "1", "username": "me" },
                    "guilds": [{ "id": "10", "name": "g", "member_count": 3 }]
                })),
            ),
            RawEvent::new(
                "CHANNEL_CREATE",
                Some(json!({ "id": "100", "guild_id": "10", "type": 0, "name": "general" })),
            ),
            RawEvent::new(
                "MESSAGE_CREATE",
                Some(json!({ "id": "500", "channel_id": "100", "content": "one" })),
            ),
            RawEvent::new("MESSAGE_CREATE", Some(json!({ "id": "bad" }))),
            RawEvent::new("GUILD_UPDATE", Some(json!({ "id": "10", "name": "renamed" }))),
            RawEvent::new(
                "PRESENCE_UPDATE",
                Some(json!({ "user": { "id": "2" }, "status": "online" })),
            ),
            RawEvent::new("TYPING_START", Some(json!({ "channel_id": "100", "user_id": "2" }))),
            RawEvent::new(
                "CHANNEL_UPDATE",
                Some(json!({ "id": "100", "guild_id": "10", "type": 0, "name": "renamed" })),
            ),
            RawEvent::new("MESSAGE_DELETE", Some(json!({ "id": "500", "channel_id": "100" }))),
        ]
    }

    #[test]
    fn test_batch_equals_sequential() {
        let sequential = dispatcher();
        for raw in sample_events() {
            sequential.dispatch(&raw.kind, raw.payload);
        }

        let batched = dispatcher();
        let outcomes = batched.dispatch_batch(sample_events());

        assert_eq!(*sequential.cache().snapshot(), *batched.cache().snapshot());
        assert!(outcomes[0].applied);
        assert!(outcomes[3].decode_error.is_some());
        assert!(!outcomes[6].applied);
    }

    #[test]
    fn test_batch_commits_once() {
        let dispatcher = dispatcher();
        let commits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&commits);
        let _sub = dispatcher.cache().subscribe(move |_| {
            *counter.lock() += 1;
            Ok(())
        });

        dispatcher.dispatch_batch(sample_events());
        assert_eq!(*commits.lock(), 1);
    }

    #[test]
    fn test_subscribers_see_every_event() {
        let dispatcher = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = dispatcher.subscribe(move |raw| {
            sink.lock().push(raw.kind.clone());
            Ok(())
        });

        dispatcher.dispatch("SESSIONS_REPLACE", Some(json!([])));
        let outcome = dispatcher.dispatch("GUILD_CREATE", Some(json!({ "id": "x" })));
        dispatcher.dispatch("RESUMED", None);

        assert!(outcome.decode_error.is_some());
        assert_eq!(outcome.delivery.delivered, 1);
        assert_eq!(
            *seen.lock(),
            vec!["SESSIONS_REPLACE", "GUILD_CREATE", "RESUMED"]
        );
    }

    #[test]
    fn test_failing_subscriber_is_isolated() {
        let dispatcher = dispatcher();
        let reached = Arc::new(Mutex::new(0));

        let _panics = dispatcher.subscribe(|_| panic!("subscriber blew up"));
        let _errors = dispatcher.subscribe(|_| Err(anyhow::anyhow!("subscriber failed")));
        let counter = Arc::clone(&reached);
        let _ok = dispatcher.subscribe(move |_| {
            *counter.lock() += 1;
            Ok(())
        });

        let outcome = dispatcher.dispatch(
            "CHANNEL_CREATE",
            Some(json!({ "id": "7", "type": 1, "name": "dm" })),
        );

        assert!(outcome.applied);
        assert_eq!(outcome.delivery.failed, 2);
        assert_eq!(outcome.delivery.delivered, 1);
        assert_eq!(*reached.lock(), 1);
        assert!(dispatcher.cache().snapshot().channel(Snowflake::new(7)).is_some());
    }

    #[test]
    fn test_notify_only_does_not_commit() {
        let dispatcher = dispatcher();
        let before = dispatcher.cache().snapshot();
        let outcome = dispatcher.dispatch(
            "TYPING_START",
            Some(json!({ "channel_id": "1", "user_id": "2" })),
        );
        assert!(!outcome.applied);
        assert!(Arc::ptr_eq(&before, &dispatcher.cache().snapshot()));
    }

    #[test]
    fn test_malformed_presences_leave_cache_alone() {
        let dispatcher = dispatcher();
        dispatcher.dispatch(
            "PRESENCE_UPDATE",
            Some(json!({ "user_id": "2", "status": "online" })),
        );
        let before = dispatcher.cache().snapshot();

        let anonymous = dispatcher.dispatch("PRESENCE_UPDATE", Some(json!({ "status": "idle" })));
        let truncated = dispatcher.dispatch("READY_SUPPLEMENTAL", Some(json!({ "guilds": [] })));

        assert!(anonymous.decode_error.is_some());
        assert!(truncated.decode_error.is_some());
        assert!(!anonymous.applied && !truncated.applied);
        assert!(Arc::ptr_eq(&before, &dispatcher.cache().snapshot()));

        let snapshot = dispatcher.cache().snapshot();
        assert!(snapshot.presence(Snowflake::new(0)).is_none());
        assert_eq!(snapshot.presence_count(), 1);
    }
}
