//! Hub server lifecycle.
//!
//! [`CallHubServer`] owns the broadcaster, the customer directory and the
//! HTTP listener, and manages startup and graceful shutdown of the serve
//! task. One broadcaster is constructed per server process and shared by the
//! ingest and socket paths.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

use crate::api::{self, AppState};
use crate::broadcaster::EventBroadcaster;
use crate::config::CallHubConfig;
use crate::customers::{CustomerDirectory, InMemoryCustomerDirectory};
use crate::error::{HubError, HubResult};
use crate::token::AccessTokenIssuer;

/// A complete call hub server: broadcaster, directory, HTTP endpoints.
pub struct CallHubServer {
    config: CallHubConfig,
    broadcaster: Arc<EventBroadcaster>,
    directory: Arc<dyn CustomerDirectory>,
    local_addr: Option<SocketAddr>,
    serve_handle: Option<JoinHandle<()>>,
}

impl CallHubServer {
    /// Create a server with the seeded in-memory customer directory.
    pub fn new(config: CallHubConfig) -> Self {
        Self::with_directory(config, Arc::new(InMemoryCustomerDirectory::seeded()))
    }

    /// Create a server over a caller-supplied directory implementation.
    pub fn with_directory(config: CallHubConfig, directory: Arc<dyn CustomerDirectory>) -> Self {
        Self {
            config,
            broadcaster: Arc::new(EventBroadcaster::new()),
            directory,
            local_addr: None,
            serve_handle: None,
        }
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(&mut self) -> HubResult<()> {
        if self.serve_handle.is_some() {
            return Err(HubError::invalid_state("server already started"));
        }

        let state = AppState {
            broadcaster: self.broadcaster.clone(),
            directory: self.directory.clone(),
            tokens: Arc::new(AccessTokenIssuer::new(self.config.provider.clone())),
            hold_music_url: self.config.hold_music_url.clone(),
        };
        let app = api::router(state);

        let listener = TcpListener::bind(self.config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        if !self.config.provider.is_configured() {
            info!("Provider credentials absent; token issuance will fail until configured");
        }

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "Hub serve loop exited");
            }
        });
        self.serve_handle = Some(handle);

        info!("✅ Call hub listening on {}", local_addr);
        Ok(())
    }

    /// Address the listener actually bound to (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The broadcaster shared by all producer paths.
    pub fn broadcaster(&self) -> Arc<EventBroadcaster> {
        self.broadcaster.clone()
    }

    /// Stop serving. Idempotent; in-flight connections are dropped.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.serve_handle.take() {
            handle.abort();
            let _ = handle.await;
            info!("🛑 Call hub stopped");
        }
    }

    /// Serve until the process is stopped, logging periodic stats.
    pub async fn run(&self) -> HubResult<()> {
        info!("📞 Call hub is running");

        let mut ticker = interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            info!(
                subscribers = self.broadcaster.subscriber_count(),
                "Hub status"
            );
        }
    }
}

impl Drop for CallHubServer {
    fn drop(&mut self) {
        if let Some(handle) = self.serve_handle.take() {
            handle.abort();
        }
    }
}

/// Builder for [`CallHubServer`] with a fluent API.
pub struct CallHubServerBuilder {
    config: CallHubConfig,
    directory: Option<Arc<dyn CustomerDirectory>>,
}

impl CallHubServerBuilder {
    pub fn new() -> Self {
        Self {
            config: CallHubConfig::default(),
            directory: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: CallHubConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the seeded directory with a custom implementation.
    pub fn with_directory(mut self, directory: Arc<dyn CustomerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Build the server.
    pub fn build(self) -> CallHubServer {
        match self.directory {
            Some(directory) => CallHubServer::with_directory(self.config, directory),
            None => CallHubServer::new(self.config),
        }
    }
}

impl Default for CallHubServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
