//! In-process delivery of operations between sessions.
//!
//! Stands in for the external sync channel: every broadcast reaches every
//! other registered replica, after a random delay and sometimes twice, so
//! arrival order differs per replica.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use gridsync_engine::{Operation, ReplicaId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, Notify};

/// Receiving end of a replica's inbox.
pub type Inbox = mpsc::UnboundedReceiver<Operation>;

/// Sending end of a replica's inbox.
pub type InboxSender = mpsc::UnboundedSender<Operation>;

/// Upper bound on the random per-delivery delay.
const MAX_JITTER_MS: u64 = 5;

/// Routes operations between registered replicas.
///
/// Thread-safe and can be shared across sessions via `Arc`.
#[derive(Debug)]
pub struct Relay {
    inboxes: DashMap<ReplicaId, InboxSender>,
    duplicate_rate: f64,
    rng: Mutex<StdRng>,
    in_flight: AtomicUsize,
    idle: Notify,
    delivered: AtomicUsize,
}

impl Relay {
    /// Create a new relay.
    pub fn new(duplicate_rate: f64, seed: u64) -> Self {
        Self {
            inboxes: DashMap::new(),
            duplicate_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            delivered: AtomicUsize::new(0),
        }
    }

    /// Create a new relay wrapped in Arc for sharing.
    pub fn new_shared(duplicate_rate: f64, seed: u64) -> Arc<Self> {
        Arc::new(Self::new(duplicate_rate, seed))
    }

    /// Register a replica and return its inbox.
    pub fn register(&self, replica_id: ReplicaId) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::debug!(replica = %replica_id, "replica registered with relay");
        self.inboxes.insert(replica_id, tx);
        rx
    }

    /// Number of registered replicas.
    pub fn replica_count(&self) -> usize {
        self.inboxes.len()
    }

    /// Total deliveries handed to inboxes so far, duplicates included.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Send `op` to every replica except `from`.
    pub fn broadcast(self: &Arc<Self>, from: &str, op: &Operation) {
        let targets: Vec<InboxSender> = self
            .inboxes
            .iter()
            .filter(|entry| entry.key() != from)
            .map(|entry| entry.value().clone())
            .collect();

        for tx in targets {
            let copies = if self.roll(self.duplicate_rate) { 2 } else { 1 };
            for _ in 0..copies {
                self.spawn_delivery(tx.clone(), op.clone());
            }
        }
    }

    /// Wait until every scheduled delivery has reached its inbox.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn spawn_delivery(self: &Arc<Self>, tx: InboxSender, op: Operation) {
        let delay = Duration::from_millis(self.jitter_ms());
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let relay = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(op).is_ok() {
                relay.delivered.fetch_add(1, Ordering::SeqCst);
            } else {
                tracing::warn!("delivery dropped: inbox closed");
            }
            if relay.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                relay.idle.notify_waiters();
            }
        });
    }

    fn roll(&self, probability: f64) -> bool {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(probability),
            Err(poisoned) => poisoned.into_inner().gen_bool(probability),
        }
    }

    fn jitter_ms(&self) -> u64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..=MAX_JITTER_MS),
            Err(poisoned) => poisoned.into_inner().gen_range(0..=MAX_JITTER_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_engine::{Change, Replica};

    #[tokio::test]
    async fn broadcast_skips_sender() {
        let relay = Relay::new_shared(0.0, 1);
        let mut a_inbox = relay.register("a".into());
        let mut b_inbox = relay.register("b".into());

        let mut a = Replica::new("a").unwrap();
        let op = a.create_operation("row-1", Change::Delete, 1);
        relay.broadcast("a", &op);
        relay.wait_idle().await;

        assert_eq!(b_inbox.try_recv().unwrap(), op);
        assert!(b_inbox.try_recv().is_err());
        assert!(a_inbox.try_recv().is_err());
        assert_eq!(relay.delivered(), 1);
    }

    #[tokio::test]
    async fn duplicate_rate_one_delivers_twice() {
        let relay = Relay::new_shared(1.0, 7);
        let _a_inbox = relay.register("a".into());
        let mut b_inbox = relay.register("b".into());

        let mut a = Replica::new("a").unwrap();
        let op = a.create_operation("row-1", Change::Delete, 1);
        relay.broadcast("a", &op);
        relay.wait_idle().await;

        assert_eq!(b_inbox.try_recv().unwrap(), op);
        assert_eq!(b_inbox.try_recv().unwrap(), op);
        assert_eq!(relay.delivered(), 2);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_nothing_in_flight() {
        let relay = Relay::new_shared(0.0, 1);
        relay.wait_idle().await;
        assert_eq!(relay.replica_count(), 0);
    }
}
