use crate::shared::error::{DispatcherError, DispatcherResult};
use crate::shared::types::DomainEvent;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// Append-only feed of domain events
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Store an event, assigning its id and timestamp, and publish it to
    /// subscribers
    async fn append(&self, event: DomainEvent) -> DispatcherResult<DomainEvent>;

    /// Retained events in append order
    async fn list(&self) -> DispatcherResult<Vec<DomainEvent>>;

    /// Receive events stored after this call
    fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>>;
}

struct EventLog {
    next_id: u64,
    events: VecDeque<DomainEvent>,
}

/// Keeps the most recent `history` events. Ids keep ascending after older
/// events are dropped.
#[derive(Clone)]
pub struct InMemoryEventRepository {
    log: Arc<RwLock<EventLog>>,
    history: usize,
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl InMemoryEventRepository {
    pub fn new(buffer: usize, history: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer.max(1));
        Self {
            log: Arc::new(RwLock::new(EventLog {
                next_id: 1,
                events: VecDeque::with_capacity(history.min(1024)),
            })),
            history,
            sender,
        }
    }
}

impl Default for InMemoryEventRepository {
    fn default() -> Self {
        Self::new(1024, 1000)
    }
}

fn poisoned() -> DispatcherError {
    DispatcherError::StorageError("event feed lock poisoned".to_string())
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append(&self, mut event: DomainEvent) -> DispatcherResult<DomainEvent> {
        {
            let mut log = self.log.write().map_err(|_| poisoned())?;
            event.id = log.next_id;
            log.next_id += 1;
            event.created_at = Utc::now();

            if self.history > 0 {
                while log.events.len() >= self.history {
                    log.events.pop_front();
                }
                log.events.push_back(event.clone());
            }

            // Published under the lock so subscribers see ids in order
            if self.sender.send(Arc::new(event.clone())).is_err() {
                debug!(event_id = event.id, "No event subscribers");
            }
        }

        Ok(event)
    }

    async fn list(&self) -> DispatcherResult<Vec<DomainEvent>> {
        let log = self.log.read().map_err(|_| poisoned())?;
        Ok(log.events.iter().cloned().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}
