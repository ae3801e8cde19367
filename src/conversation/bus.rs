//! Agent event bus: serialized delivery from any number of emitters.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

use super::events::{AgentEvent, AgentEventEnvelope};
use crate::types::{Message, MessageId};

/// What flows from emitters to the single consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum BusItem {
    Event(AgentEventEnvelope),
    /// A plain message to show (or update, by id) in the conversation.
    Message(Message),
    /// Remove a previously published message that never completed.
    Retract(MessageId),
}

struct BusInner {
    /// Guards both the counter and the send so `seq` order is delivery order.
    seq: Mutex<u64>,
    tx: Option<mpsc::UnboundedSender<BusItem>>,
}

/// Cloneable handle used by agents and the tool loop to publish events.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    fn from_sender(tx: Option<mpsc::UnboundedSender<BusItem>>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                seq: Mutex::new(0),
                tx,
            }),
        }
    }

    /// Bus plus the receiving end for a single consumer.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BusItem>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::from_sender(Some(tx)), rx)
    }

    /// Bus whose receiving end is a `Stream`.
    pub fn stream() -> (Self, UnboundedReceiverStream<BusItem>) {
        let (bus, rx) = Self::channel();
        (bus, UnboundedReceiverStream::new(rx))
    }

    /// Bus that drops everything it is given.
    pub fn detached() -> Self {
        Self::from_sender(None)
    }

    /// Bus delivering events, in emission order, to `callback` on a task.
    ///
    /// The task ends once every handle to the bus is dropped.
    pub fn with_callback<F>(callback: F) -> (Self, JoinHandle<()>)
    where
        F: Fn(AgentEventEnvelope) + Send + 'static,
    {
        let (bus, mut items) = Self::stream();
        let task = tokio::spawn(async move {
            while let Some(item) = items.next().await {
                if let BusItem::Event(envelope) = item {
                    callback(envelope);
                }
            }
        });
        (bus, task)
    }

    fn send(&self, item: impl FnOnce(u64) -> BusItem) -> u64 {
        let mut seq = self.inner.seq.lock().unwrap_or_else(PoisonError::into_inner);
        *seq += 1;
        if let Some(tx) = &self.inner.tx {
            // A closed receiver means nobody is listening any more.
            let _ = tx.send(item(*seq));
        }
        *seq
    }

    /// Publish one event; returns its sequence number.
    pub fn emit(&self, event: AgentEvent) -> u64 {
        debug!(agent = event.agent(), kind = %event.kind(), "agent event");
        self.send(|seq| {
            BusItem::Event(AgentEventEnvelope {
                seq,
                timestamp: chrono::Utc::now(),
                event,
            })
        })
    }

    pub fn publish_message(&self, message: Message) -> u64 {
        self.send(|_| BusItem::Message(message))
    }

    pub fn retract_message(&self, id: MessageId) -> u64 {
        self.send(|_| BusItem::Retract(id))
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("attached", &self.inner.tx.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(agent: &str) -> AgentEvent {
        AgentEvent::Error {
            agent: agent.into(),
            message: "m".into(),
        }
    }

    #[tokio::test]
    async fn sequence_numbers_follow_delivery_order() {
        let (bus, mut rx) = EventBus::channel();
        let clone = bus.clone();
        assert_eq!(bus.emit(error("a")), 1);
        assert_eq!(clone.emit(error("b")), 2);
        drop((bus, clone));

        let mut seqs = Vec::new();
        while let Some(item) = rx.recv().await {
            if let BusItem::Event(envelope) = item {
                seqs.push((envelope.seq, envelope.event.agent().to_string()));
            }
        }
        assert_eq!(seqs, vec![(1, "a".to_string()), (2, "b".to_string())]);
    }

    #[tokio::test]
    async fn callback_sees_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (bus, task) = EventBus::with_callback(move |envelope| {
            sink.lock().unwrap().push(envelope.seq);
        });
        for agent in ["a", "b", "c"] {
            bus.emit(error(agent));
        }
        drop(bus);
        task.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn detached_bus_still_counts() {
        let bus = EventBus::detached();
        bus.emit(error("a"));
        assert_eq!(bus.emit(error("a")), 2);
    }
}
