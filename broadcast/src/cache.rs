//! Registry of per-voting broadcast hubs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use agora_store::StoreError;
use agora_types::{VoteRecord, VotingId};

use crate::hub::{Subscription, VotingHub};
use crate::{BroadcastError, BroadcastEvent};

/// Default per-subscriber queue length before a slow subscriber is dropped.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

type Loader = fn() -> Result<Vec<VoteRecord>, StoreError>;

/// In-memory publish/subscribe cache, one hub per voting.
///
/// The registry lock is held only long enough to find or create a hub; all
/// per-voting work happens under that hub's own lock.
pub struct VoteBroadcastCache {
    hubs: RwLock<HashMap<VotingId, Arc<VotingHub>>>,
    subscriber_buffer: usize,
}

impl VoteBroadcastCache {
    pub fn new(subscriber_buffer: usize) -> Self {
        Self {
            hubs: RwLock::new(HashMap::new()),
            subscriber_buffer,
        }
    }

    fn existing(&self, voting_id: VotingId) -> Result<Option<Arc<VotingHub>>, BroadcastError> {
        let hubs = self.hubs.read().map_err(|_| BroadcastError::Poisoned)?;
        Ok(hubs.get(&voting_id).cloned())
    }

    fn hub(&self, voting_id: VotingId) -> Result<Arc<VotingHub>, BroadcastError> {
        if let Some(hub) = self.existing(voting_id)? {
            return Ok(hub);
        }
        let mut hubs = self.hubs.write().map_err(|_| BroadcastError::Poisoned)?;
        let hub = hubs
            .entry(voting_id)
            .or_insert_with(|| Arc::new(VotingHub::new(voting_id, self.subscriber_buffer)));
        Ok(Arc::clone(hub))
    }

    /// Seed a voting's state the first time it is touched.
    ///
    /// Returns `false` (and leaves the state alone) if it was already warm.
    pub fn initialize(
        &self,
        voting_id: VotingId,
        votes: Vec<VoteRecord>,
    ) -> Result<bool, BroadcastError> {
        let mut votes = Some(votes);
        loop {
            if let Some(seeded) = self.hub(voting_id)?.initialize(&mut votes)? {
                return Ok(seeded);
            }
        }
    }

    /// Current known vote set, or `None` while the voting is cold.
    pub fn get_state(&self, voting_id: VotingId) -> Result<Option<Vec<VoteRecord>>, BroadcastError> {
        match self.existing(voting_id)? {
            Some(hub) => hub.votes(),
            None => Ok(None),
        }
    }

    /// Subscribe to a warm voting. Fails with [`BroadcastError::Cold`] if it
    /// was never initialized.
    pub fn subscribe(&self, voting_id: VotingId) -> Result<Subscription, BroadcastError> {
        let mut loader: Option<Loader> = None;
        loop {
            if let Some(subscription) = self.hub(voting_id)?.subscribe(&mut loader)? {
                return Ok(subscription);
            }
        }
    }

    /// Subscribe, warming a cold voting with `loader` first.
    pub fn subscribe_or_load<F>(
        &self,
        voting_id: VotingId,
        loader: F,
    ) -> Result<Subscription, BroadcastError>
    where
        F: FnOnce() -> Result<Vec<VoteRecord>, StoreError>,
    {
        let mut loader = Some(loader);
        loop {
            if let Some(subscription) = self.hub(voting_id)?.subscribe(&mut loader)? {
                return Ok(subscription);
            }
        }
    }

    /// Apply an event and fan it out to the voting's live subscribers.
    ///
    /// Never blocks on a subscriber. Publishing to a cold voting is a no-op:
    /// the fact is already in the ledger and the next load will see it.
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(
        &self,
        voting_id: VotingId,
        event: BroadcastEvent,
    ) -> Result<usize, BroadcastError> {
        match self.existing(voting_id)? {
            Some(hub) => hub.publish(event),
            None => {
                debug!(voting = %voting_id, kind = event.kind(), "voting is cold, event not cached");
                Ok(0)
            }
        }
    }

    /// Drop hubs with no subscribers that have been idle for `max_idle`.
    /// Returns how many were evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> Result<usize, BroadcastError> {
        let now = Instant::now();
        let mut hubs = self.hubs.write().map_err(|_| BroadcastError::Poisoned)?;
        let before = hubs.len();
        hubs.retain(|_, hub| !hub.retire_if_idle(now, max_idle));
        let evicted = before - hubs.len();
        if evicted > 0 {
            debug!(evicted, remaining = hubs.len(), "evicted idle broadcast hubs");
        }
        Ok(evicted)
    }

    /// Number of votings with a hub (warm or warming).
    pub fn hub_count(&self) -> usize {
        self.hubs.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn subscriber_count(&self, voting_id: VotingId) -> usize {
        match self.existing(voting_id) {
            Ok(Some(hub)) => hub.subscriber_count(),
            _ => 0,
        }
    }
}

impl Default for VoteBroadcastCache {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}
