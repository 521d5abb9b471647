//! event persistence and in-process fan-out.
//!
//! the [`EventStore`] persists immutable events to the history store (or a
//! null sink); the [`ReceiverHub`] multicasts them to best-effort in-process
//! subscribers over bounded channels. A slow subscriber loses events instead
//! of blocking publishers.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tracing::error;

use hue_db::{EventQuery, HistoryDb};
use hue_types::{Event, EventStoreKind, EventType};

use crate::{Error, Result};

/// persists emitted events according to the configured store kind.
#[derive(Debug)]
pub enum EventStore {
    /// write to the history store.
    Db(HistoryDb),
    /// drop everything.
    None,
}

impl EventStore {
    /// build a store for the configured kind.
    ///
    /// the file backend is reserved and fails with "not implemented".
    pub fn new(kind: EventStoreKind, history: HistoryDb) -> Result<Self> {
        match kind {
            EventStoreKind::Db => Ok(EventStore::Db(history)),
            EventStoreKind::None => Ok(EventStore::None),
            EventStoreKind::File => Err(Error::NotImplemented("file-based event store")),
        }
    }

    /// persist one event.
    pub async fn store(&self, ev: &Event) -> Result<()> {
        match self {
            EventStore::Db(history) => history.store_event(ev).await.map_err(Into::into),
            EventStore::None => Ok(()),
        }
    }

    /// range-scan stored events (empty for the null sink).
    pub async fn events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        match self {
            EventStore::Db(history) => history.events(query).await.map_err(Into::into),
            EventStore::None => Ok(Vec::new()),
        }
    }
}

struct Receiver {
    types: Vec<EventType>,
    sender: mpsc::Sender<Event>,
}

impl Receiver {
    fn accepts(&self, t: EventType) -> bool {
        self.types.is_empty() || self.types.contains(&t)
    }
}

/// in-process pub/sub over bounded channels.
#[derive(Default)]
pub struct ReceiverHub {
    receivers: RwLock<HashMap<String, Receiver>>,
}

impl ReceiverHub {
    /// create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// register a subscriber and get its channel.
    ///
    /// an empty `types` filter means all event types. A subscriber with the
    /// same id replaces the previous one, closing its channel.
    pub fn subscribe(
        &self,
        id: &str,
        buffer_size: usize,
        types: Vec<EventType>,
    ) -> mpsc::Receiver<Event> {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let mut receivers = self.receivers.write().unwrap();
        receivers.insert(id.to_string(), Receiver { types, sender });
        receiver
    }

    /// drop a subscriber, closing its channel.
    pub fn unsubscribe(&self, id: &str) {
        self.receivers.write().unwrap().remove(id);
    }

    /// multicast an event to matching subscribers without blocking.
    ///
    /// a subscriber whose buffer is full loses this event; others are
    /// unaffected.
    pub fn publish(&self, ev: &Event) {
        let receivers = self.receivers.read().unwrap();
        for receiver in receivers.values() {
            if !receiver.accepts(ev.event_type) {
                continue;
            }
            let _ = receiver.sender.try_send(ev.clone());
        }
    }
}

/// emit an event: persist it (log-and-continue on failure) and fan out.
pub(crate) async fn emit(store: &EventStore, hub: &ReceiverHub, ev: Event) {
    if let Err(e) = store.store(&ev).await {
        error!(event_type = %ev.event_type, error = %e, "failed to store event");
    }
    hub.publish(&ev);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(t: EventType) -> Event {
        Event::new(t, Some("u1".to_string()), None, None, None, vec![])
    }

    #[tokio::test]
    async fn file_store_is_reserved() {
        let history = HistoryDb::new_in_memory().await.unwrap();
        let err = EventStore::new(EventStoreKind::File, history).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
    }

    #[tokio::test]
    async fn null_store_swallows_events() {
        let history = HistoryDb::new_in_memory().await.unwrap();
        let store = EventStore::new(EventStoreKind::None, history).unwrap();
        store.store(&event(EventType::UserConnected)).await.unwrap();
        assert!(store.events(&EventQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn db_store_round_trips() {
        let history = HistoryDb::new_in_memory().await.unwrap();
        let store = EventStore::new(EventStoreKind::Db, history).unwrap();
        store.store(&event(EventType::UserSuspended)).await.unwrap();
        let events = store.events(&EventQuery::default()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::UserSuspended);
    }

    #[tokio::test]
    async fn full_buffer_drops_for_that_subscriber_only() {
        let hub = ReceiverHub::new();
        let mut small = hub.subscribe("small", 1, vec![EventType::UsageRecorded]);
        let mut large = hub.subscribe("large", 8, vec![]);

        for _ in 0..3 {
            hub.publish(&event(EventType::UsageRecorded));
        }
        hub.publish(&event(EventType::UserConnected));

        // the filtered subscriber got exactly one usage event: two dropped
        // on the full buffer, the connect filtered out
        assert_eq!(
            small.try_recv().unwrap().event_type,
            EventType::UsageRecorded
        );
        assert!(small.try_recv().is_err());

        // the unfiltered subscriber saw all four
        let mut count = 0;
        while large.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_channel() {
        let hub = ReceiverHub::new();
        let mut receiver = hub.subscribe("sub", 4, vec![]);
        hub.unsubscribe("sub");
        hub.publish(&event(EventType::UserConnected));
        assert!(matches!(
            receiver.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
