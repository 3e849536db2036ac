//! Shared state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use agora_crypto::TokenAuthority;
use agora_voting::VoteSubmissionCoordinator;

use crate::metrics::VotingMetrics;

/// Settings the HTTP surface needs from the node configuration.
#[derive(Clone, Debug)]
pub struct ApiSettings {
    /// Bearer key for the admin surface.
    pub admin_api_key: String,
    /// Base of generated public voting links, without a trailing slash.
    pub public_base_url: String,
    pub default_public_token_hours: u32,
    pub heartbeat: Duration,
    /// Whether `/metrics` is served.
    pub enable_metrics: bool,
}

pub struct AppState {
    pub tokens: TokenAuthority,
    pub voting: VoteSubmissionCoordinator,
    pub metrics: Arc<VotingMetrics>,
    pub settings: ApiSettings,
    /// Fired once on shutdown; live streams end when it does.
    pub shutdown: broadcast::Sender<()>,
}

pub type SharedState = Arc<AppState>;
