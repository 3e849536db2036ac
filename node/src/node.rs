//! The voting node: wires ledger, live cache, tokens and HTTP server
//! together and owns their background tasks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use agora_broadcast::VoteBroadcastCache;
use agora_crypto::TokenAuthority;
use agora_nullables::{InMemoryLedger, LedgerSeed};
use agora_rpc::{AppState, RpcServer, SharedState, VotingMetrics};
use agora_types::{Clock, SystemClock};
use agora_voting::VoteSubmissionCoordinator;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::shutdown::ShutdownController;

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AgoraNode {
    config: NodeConfig,
    ledger: Arc<InMemoryLedger>,
    state: SharedState,
    pub shutdown: Arc<ShutdownController>,
    local_addr: Option<SocketAddr>,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl AgoraNode {
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a node reading time from `clock` for tokens and vote timestamps.
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, NodeError> {
        config.validate()?;

        let ledger = match &config.seed_file {
            Some(path) => {
                let ledger = InMemoryLedger::from_seed(LedgerSeed::from_json_file(path)?)?;
                tracing::info!(seed = %path.display(), "ledger seeded");
                ledger
            }
            None => {
                tracing::warn!("no seed file configured, starting with an empty ledger");
                InMemoryLedger::new()
            }
        };
        let ledger = Arc::new(ledger);

        let cache = Arc::new(VoteBroadcastCache::new(config.subscriber_buffer));
        let voting = VoteSubmissionCoordinator::with_clock(ledger.clone(), cache, clock.clone());
        let tokens = TokenAuthority::with_clock(config.token_secret.as_bytes(), clock)?;
        let metrics = Arc::new(VotingMetrics::new()?);
        let shutdown = Arc::new(ShutdownController::new());

        let state = Arc::new(AppState {
            tokens,
            voting,
            metrics,
            settings: config.api_settings(),
            shutdown: shutdown.sender(),
        });

        Ok(Self {
            config,
            ledger,
            state,
            shutdown,
            local_addr: None,
            task_handles: Vec::new(),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Address the HTTP API is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the HTTP API and spawn background tasks. Returns once the
    /// listener is bound; serving continues until [`AgoraNode::stop`].
    pub async fn start(&mut self) -> Result<SocketAddr, NodeError> {
        if self.local_addr.is_some() {
            return Err(NodeError::AlreadyStarted);
        }

        let listener = TcpListener::bind(self.config.socket_addr()?).await?;
        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            metrics = self.config.enable_metrics,
            "Agora node starting"
        );

        self.spawn_cache_sweeper();

        let state = Arc::clone(&self.state);
        let mut shutdown_rx = self.shutdown.subscribe();
        let server_handle = tokio::spawn(async move {
            let signal = async move {
                let _ = shutdown_rx.recv().await;
            };
            if let Err(e) = RpcServer::serve_on(listener, state, signal).await {
                tracing::error!(error = %e, "HTTP server failed");
            }
        });
        self.task_handles.push(server_handle);

        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Periodically drop live caches nobody has watched for a while.
    fn spawn_cache_sweeper(&mut self) {
        let cache = Arc::clone(self.state.voting.cache());
        let max_idle = Duration::from_secs(self.config.cache_idle_secs);
        let period = Duration::from_secs(self.config.cache_sweep_secs);
        let mut shutdown_rx = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("cache sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match cache.evict_idle(max_idle) {
                            Ok(0) => {}
                            Ok(evicted) => {
                                tracing::debug!(
                                    evicted,
                                    live = cache.hub_count(),
                                    "idle votings evicted"
                                );
                            }
                            Err(e) => tracing::warn!(error = %e, "cache sweep failed"),
                        }
                    }
                }
            }
        });
        self.task_handles.push(handle);
    }

    /// Signal every task to stop and wait for them, up to a timeout.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        tracing::info!("Agora node stopping");
        self.shutdown.shutdown();

        for handle in self.task_handles.drain(..) {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "background task panicked"),
                Err(_) => tracing::warn!("background task did not stop in time"),
            }
        }
        self.local_addr = None;
        tracing::info!("Agora node stopped");
        Ok(())
    }
}
