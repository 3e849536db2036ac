//! Server-sent event gateway: one live vote stream per connection.
//!
//! Frame order is fixed: `connected`, then a single `initial_data` carrying
//! the snapshot taken at subscription, then `new_vote` / `vote_deleted` as
//! they happen, with a `heartbeat` whenever the heartbeat interval elapses.
//! The stream owns its [`Subscription`]; when the client goes away axum
//! drops the stream and the subscriber is unregistered with it.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, Sse};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn, Instrument, Span};

use agora_broadcast::Subscription;
use agora_types::{Clock, VoteRecord, VotingId};

use crate::metrics::ConnectionGuard;

enum Phase {
    Connected,
    Snapshot,
    Live,
}

struct VoteStream {
    phase: Phase,
    subscription: Subscription,
    heartbeat: Interval,
    heartbeat_secs: u64,
    redact: bool,
    shutdown: broadcast::Receiver<()>,
    clock: Arc<dyn Clock>,
    span: Span,
    _connection: ConnectionGuard,
}

impl VoteStream {
    fn voting_id(&self) -> VotingId {
        self.subscription.voting_id()
    }

    /// Next frame, or `None` once the hub has dropped this subscriber or the
    /// server is shutting down.
    async fn next_frame(&mut self) -> Option<Event> {
        match self.phase {
            Phase::Connected => {
                self.phase = Phase::Snapshot;
                Some(frame(
                    "connected",
                    &json!({
                        "votingId": self.voting_id(),
                        "connectedAt": self.clock.now(),
                        "heartbeatSecs": self.heartbeat_secs,
                    }),
                ))
            }
            Phase::Snapshot => {
                self.phase = Phase::Live;
                let votes = redact_all(self.subscription.take_snapshot(), self.redact);
                debug!(votes = votes.len(), "sending initial data");
                Some(frame(
                    "initial_data",
                    &json!({ "votingId": self.voting_id(), "votes": votes }),
                ))
            }
            Phase::Live => {
                tokio::select! {
                    event = self.subscription.recv() => match event {
                        Some(event) => {
                            let event = if self.redact { event.redacted() } else { event };
                            Some(frame(event.kind(), event.record()))
                        }
                        None => {
                            debug!("subscriber dropped by hub, closing stream");
                            None
                        }
                    },
                    _ = self.heartbeat.tick() => {
                        Some(frame("heartbeat", &json!({ "timestamp": self.clock.now() })))
                    }
                    _ = self.shutdown.recv() => {
                        debug!("server shutting down, closing stream");
                        None
                    }
                }
            }
        }
    }
}

fn redact_all(votes: Vec<VoteRecord>, redact: bool) -> Vec<VoteRecord> {
    if redact {
        votes.into_iter().map(VoteRecord::redacted).collect()
    } else {
        votes
    }
}

fn frame<T: Serialize + ?Sized>(kind: &str, payload: &T) -> Event {
    match Event::default().event(kind).json_data(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(kind, error = %e, "could not encode event payload");
            Event::default().event(kind).data("null")
        }
    }
}

/// Turn a subscription into an SSE response.
///
/// `redact` strips voter identity from every vote, for secret votings on
/// public surfaces. The stream ends when `shutdown` fires. Frame timestamps
/// are read from `clock`.
pub fn vote_stream(
    subscription: Subscription,
    heartbeat: Duration,
    redact: bool,
    shutdown: broadcast::Receiver<()>,
    clock: Arc<dyn Clock>,
    connection: ConnectionGuard,
    span: Span,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let period = heartbeat.max(Duration::from_secs(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    span.in_scope(|| debug!("vote stream opened"));
    let state = VoteStream {
        phase: Phase::Connected,
        subscription,
        heartbeat: ticker,
        heartbeat_secs: period.as_secs(),
        redact,
        shutdown,
        clock,
        span,
        _connection: connection,
    };

    let events = stream::unfold(state, |mut state| async move {
        let span = state.span.clone();
        let frame = state.next_frame().instrument(span).await?;
        Some((Ok(frame), state))
    });
    Sse::new(events)
}
