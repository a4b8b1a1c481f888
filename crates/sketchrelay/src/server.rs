//! `RelayServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport → JSON codec →
//! [`RoomService`] → room registry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sketchrelay_protocol::{Codec, JsonCodec};
use sketchrelay_room::{RoomConfig, RoomRegistry, RoomService, TerminationPolicy};

use crate::handler::handle_connection;
use crate::{RelayError, Store, WsListener};

/// Default time a connection may stay silent before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<R: RoomRegistry, C: Codec> {
    pub(crate) service: RoomService<R>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Everything needed to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub room: RoomConfig,
    /// JSON room store; `None` keeps rooms in memory.
    pub store_path: Option<PathBuf>,
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room: RoomConfig::default(),
            store_path: None,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use sketchrelay::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:8080")
///     .termination(TerminationPolicy::RoundLimit)
///     .store_path("rooms.json")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelayServerBuilder {
    config: ServerConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the room configuration.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets when games end on their own.
    pub fn termination(mut self, policy: TerminationPolicy) -> Self {
        self.config.room.termination = policy;
        self
    }

    /// Persists rooms to a JSON file at `path`.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = Some(path.into());
        self
    }

    /// Drops connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listener with the store chosen by `store_path`.
    pub async fn build(self) -> Result<RelayServer<Store, JsonCodec>, RelayError> {
        let store = Store::open(self.config.store_path.clone());
        self.build_with(store).await
    }

    /// Binds the listener with a caller-supplied registry.
    pub async fn build_with<R: RoomRegistry>(
        self,
        registry: R,
    ) -> Result<RelayServer<R, JsonCodec>, RelayError> {
        let listener = WsListener::bind(&self.config.bind_addr).await?;
        let state = Arc::new(ServerState {
            service: RoomService::new(registry, self.config.room),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });
        Ok(RelayServer { listener, state })
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<R: RoomRegistry, C: Codec> {
    listener: WsListener,
    state: Arc<ServerState<R, C>>,
}

impl RelayServer<Store, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<R: RoomRegistry, C: Codec> RelayServer<R, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each connection gets its own task. A failed accept is logged and
    /// does not stop the loop.
    pub async fn run(self) -> Result<(), RelayError> {
        tracing::info!(addr = %self.local_addr()?, "sketchrelay server running");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let id = conn.id();
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(%id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
