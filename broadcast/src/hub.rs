//! One voting's broadcast state: known votes plus live subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use agora_types::{VoteRecord, VotingId};

use crate::{BroadcastError, BroadcastEvent};

struct HubState {
    /// `None` while cold (never loaded from the ledger).
    votes: Option<Vec<VoteRecord>>,
    subscribers: HashMap<u64, mpsc::Sender<BroadcastEvent>>,
    next_subscriber: u64,
    last_activity: Instant,
    /// Set once the hub is removed from the registry; a retired hub accepts
    /// no new subscribers.
    retired: bool,
}

/// Broadcast hub for a single voting.
///
/// Guarded by its own mutex so that traffic on one voting never contends
/// with another. The lock is never held across an `.await`.
pub struct VotingHub {
    voting_id: VotingId,
    buffer: usize,
    state: Mutex<HubState>,
}

impl VotingHub {
    pub(crate) fn new(voting_id: VotingId, buffer: usize) -> Self {
        Self {
            voting_id,
            buffer: buffer.max(1),
            state: Mutex::new(HubState {
                votes: None,
                subscribers: HashMap::new(),
                next_subscriber: 0,
                last_activity: Instant::now(),
                retired: false,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HubState>, BroadcastError> {
        self.state.lock().map_err(|_| BroadcastError::Poisoned)
    }

    /// Seed the vote set if the hub is still cold, taking `votes` only when
    /// it is used. Returns whether it was seeded, or `None` if the hub has
    /// been retired.
    pub(crate) fn initialize(
        &self,
        votes: &mut Option<Vec<VoteRecord>>,
    ) -> Result<Option<bool>, BroadcastError> {
        let mut state = self.lock()?;
        if state.retired {
            return Ok(None);
        }
        if state.votes.is_some() {
            return Ok(Some(false));
        }
        state.votes = Some(votes.take().unwrap_or_default());
        state.last_activity = Instant::now();
        Ok(Some(true))
    }

    pub(crate) fn votes(&self) -> Result<Option<Vec<VoteRecord>>, BroadcastError> {
        Ok(self.lock()?.votes.clone())
    }

    /// Register a subscriber, loading the vote set first if the hub is cold.
    ///
    /// The loader runs under the hub lock: a publish racing with the load
    /// waits, then lands either in the loaded set or as a live event. The
    /// loader is only taken when it is actually run. Returns `None` if the
    /// hub has been retired.
    pub(crate) fn subscribe<F>(
        self: &Arc<Self>,
        loader: &mut Option<F>,
    ) -> Result<Option<Subscription>, BroadcastError>
    where
        F: FnOnce() -> Result<Vec<VoteRecord>, agora_store::StoreError>,
    {
        let mut state = self.lock()?;
        if state.retired {
            return Ok(None);
        }
        if state.votes.is_none() {
            let Some(loader) = loader.take() else {
                return Err(BroadcastError::Cold(self.voting_id));
            };
            let votes = loader().map_err(|source| BroadcastError::Load {
                voting: self.voting_id,
                source,
            })?;
            debug!(voting = %self.voting_id, votes = votes.len(), "broadcast hub warmed");
            state.votes = Some(votes);
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.insert(id, tx);
        state.last_activity = Instant::now();
        let snapshot = state.votes.clone().unwrap_or_default();

        debug!(
            voting = %self.voting_id,
            subscriber = id,
            subscribers = state.subscribers.len(),
            "subscriber added"
        );
        Ok(Some(Subscription {
            voting_id: self.voting_id,
            id,
            snapshot,
            receiver: rx,
            hub: Arc::clone(self),
        }))
    }

    fn unsubscribe(&self, id: u64) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.subscribers.remove(&id).is_some() {
            state.last_activity = Instant::now();
            debug!(
                voting = %self.voting_id,
                subscriber = id,
                subscribers = state.subscribers.len(),
                "subscriber removed"
            );
        }
    }

    /// Apply an event to the vote set and fan it out without blocking.
    ///
    /// Returns the number of subscribers the event was queued for. Events
    /// that do not change the vote set (a vote already known, a deletion of
    /// an unknown vote) are not fanned out, which is what keeps snapshot and
    /// live events from overlapping.
    pub(crate) fn publish(&self, event: BroadcastEvent) -> Result<usize, BroadcastError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let Some(votes) = state.votes.as_mut() else {
            return Ok(0);
        };

        let changed = match &event {
            BroadcastEvent::NewVote(record) => {
                if votes.iter().any(|v| v.id == record.id) {
                    false
                } else {
                    votes.push(record.clone());
                    true
                }
            }
            BroadcastEvent::VoteDeleted(record) => {
                let before = votes.len();
                votes.retain(|v| v.id != record.id);
                votes.len() != before
            }
        };
        state.last_activity = Instant::now();
        if !changed {
            debug!(
                voting = %self.voting_id,
                vote = %event.record().id,
                kind = event.kind(),
                "event already reflected, not fanned out"
            );
            return Ok(0);
        }

        let mut delivered = 0;
        let voting_id = self.voting_id;
        state.subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    voting = %voting_id,
                    subscriber = id,
                    "subscriber buffer full, dropping subscriber"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(voting = %voting_id, subscriber = id, "pruning closed subscriber");
                false
            }
        });
        Ok(delivered)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().map(|s| s.subscribers.len()).unwrap_or(0)
    }

    /// Retire the hub if it has no subscribers and has seen no activity for
    /// `max_idle`. Returns whether it was retired.
    pub(crate) fn retire_if_idle(&self, now: Instant, max_idle: Duration) -> bool {
        match self.state.lock() {
            Ok(mut state) => {
                let idle = state.subscribers.is_empty()
                    && now.saturating_duration_since(state.last_activity) >= max_idle;
                if idle {
                    state.retired = true;
                    state.votes = None;
                }
                idle
            }
            // Poisoned hubs are replaced by a fresh one on next use.
            Err(_) => true,
        }
    }
}

/// A live subscription to one voting.
///
/// Holds the snapshot taken at registration and the receiving end of the
/// event channel. Dropping it unregisters the subscriber from its hub, so a
/// subscription can never outlive the connection that owns it.
pub struct Subscription {
    voting_id: VotingId,
    id: u64,
    snapshot: Vec<VoteRecord>,
    receiver: mpsc::Receiver<BroadcastEvent>,
    hub: Arc<VotingHub>,
}

impl Subscription {
    pub fn voting_id(&self) -> VotingId {
        self.voting_id
    }

    /// Votes known at the moment of subscribing.
    pub fn snapshot(&self) -> &[VoteRecord] {
        &self.snapshot
    }

    /// Take the snapshot out, leaving an empty one behind.
    pub fn take_snapshot(&mut self) -> Vec<VoteRecord> {
        std::mem::take(&mut self.snapshot)
    }

    /// Next live event. `None` once the hub dropped this subscriber (it fell
    /// behind, or the hub was evicted).
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<BroadcastEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
