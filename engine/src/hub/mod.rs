//! Broadcast hub for live viewers
//!
//! The hub owns the registry of connected viewers and fans item-change and
//! focus events out to all of them. Each viewer gets a bounded channel so a
//! stalled connection cannot grow memory without limit.
//!
//! # Delivery
//!
//! - At-most-once, no replay. A viewer connecting late re-fetches the item list.
//! - Order is preserved per viewer; there is no ordering across viewers.
//! - `publish` never waits. A viewer whose channel is full or closed is dropped
//!   from the registry without affecting anyone else.
//! - Every viewer receives `connected` first, then a `ping` every keep-alive
//!   interval. Pings are not counted as published events.

use chrono::Utc;
use futures::stream::{self, Stream};
use sdk::errors::BoardError;
use sdk::types::BoardEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::config::LiveConfig;

/// Default interval between keep-alive pings
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(25);

/// Default number of events buffered per viewer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Identifies one live connection
pub type SubscriberId = u64;

struct SubscriberEntry {
    sender: mpsc::Sender<BoardEvent>,
    // Dropping the entry stops the viewer's keep-alive task
    _stop: oneshot::Sender<()>,
}

type Registry = Arc<Mutex<HashMap<SubscriberId, SubscriberEntry>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<SubscriberId, SubscriberEntry>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters exposed on the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub published: u64,
}

/// Receiving end of one live connection
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<BoardEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event, or `None` once the hub has dropped this viewer
    pub async fn recv(&mut self) -> Option<BoardEvent> {
        self.receiver.recv().await
    }

    /// Next buffered event without waiting
    pub fn try_recv(&mut self) -> Option<BoardEvent> {
        self.receiver.try_recv().ok()
    }

    /// Turn the subscription into a stream for a transport to drain
    pub fn into_stream(self) -> impl Stream<Item = BoardEvent> + Send + 'static {
        stream::unfold(self.receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
    }
}

/// Registry of live viewers and fan-out of board events
pub struct BroadcastHub {
    subscribers: Registry,
    next_id: AtomicU64,
    published: AtomicU64,
    keepalive: Duration,
    capacity: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_KEEPALIVE, DEFAULT_CHANNEL_CAPACITY)
    }
}

impl BroadcastHub {
    pub fn new(keepalive: Duration, capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            keepalive,
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &LiveConfig) -> Self {
        Self::new(
            Duration::from_secs(config.keepalive_secs),
            config.channel_capacity,
        )
    }

    /// Register a new viewer
    ///
    /// The returned subscription already holds the `connected` event. Must be
    /// called inside a tokio runtime: it spawns the viewer's keep-alive task.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.capacity);
        let (stop_tx, stop_rx) = oneshot::channel();

        // Fresh channel with capacity >= 1, cannot fail
        let _ = sender.try_send(BoardEvent::Connected {
            subscriber_id: id,
            timestamp: Utc::now(),
        });

        let count = {
            let mut subscribers = lock(&self.subscribers);
            subscribers.insert(
                id,
                SubscriberEntry {
                    sender: sender.clone(),
                    _stop: stop_tx,
                },
            );
            subscribers.len()
        };

        tokio::spawn(keepalive_loop(
            id,
            sender,
            stop_rx,
            Arc::clone(&self.subscribers),
            self.keepalive,
        ));

        info!("Live viewer {} connected ({} total)", id, count);
        Subscription { id, receiver }
    }

    /// Remove a viewer; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = lock(&self.subscribers).remove(&id).is_some();
        if removed {
            info!("Live viewer {} disconnected", id);
        }
        removed
    }

    /// Fan an event out to every registered viewer
    ///
    /// Returns how many viewers accepted it. Viewers whose channel is full or
    /// closed are dropped.
    pub fn publish(&self, event: BoardEvent) -> usize {
        let mut subscribers = lock(&self.subscribers);
        let mut dead = Vec::new();
        let mut delivered = 0;

        for (id, entry) in subscribers.iter() {
            match entry.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let err = BoardError::ChannelWrite(format!("viewer {} buffer full", id));
                    debug!("{}", err);
                    dead.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    let err = BoardError::ChannelWrite(format!("viewer {} closed", id));
                    debug!("{}", err);
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            subscribers.remove(&id);
            info!("Live viewer {} dropped after failed write", id);
        }

        if !matches!(event, BoardEvent::Ping { .. }) {
            self.published.fetch_add(1, Ordering::Relaxed);
        }

        debug!("Published {} to {} viewer(s)", event.name(), delivered);
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            published: self.published.load(Ordering::Relaxed),
        }
    }
}

/// Per-viewer keep-alive
///
/// Ends when the transport closes, the viewer is unsubscribed, or a ping
/// cannot be written. Removes the viewer from the registry on the way out.
async fn keepalive_loop(
    id: SubscriberId,
    sender: mpsc::Sender<BoardEvent>,
    mut stop: oneshot::Receiver<()>,
    subscribers: Registry,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = sender.closed() => {
                debug!("Viewer {} transport closed", id);
                break;
            }
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let ping = BoardEvent::Ping { timestamp: Utc::now() };
                if sender.try_send(ping).is_err() {
                    debug!("Viewer {} keep-alive failed", id);
                    break;
                }
            }
        }
    }

    if lock(&subscribers).remove(&id).is_some() {
        info!("Live viewer {} disconnected", id);
    }
}
