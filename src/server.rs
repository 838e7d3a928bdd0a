//! Broker facade
//!
//! Owns the process-wide registry and the broadcaster, and turns each
//! accepted stream into a session task.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::broadcaster::Broadcaster;
use crate::config::Config;
use crate::registry::Registry;
use crate::session::handle_connection;

/// Shared broker state
///
/// Cheap to clone; every clone refers to the same registry and broadcaster.
#[derive(Debug, Clone)]
pub struct Broker {
    registry: Arc<Registry>,
    broadcaster: Broadcaster,
}

impl Broker {
    /// Create the registry and start the broadcaster task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config) -> Self {
        let registry = Arc::new(Registry::new());
        let (broadcaster, _task) =
            Broadcaster::spawn(Arc::clone(&registry), config.broadcast_buffer);
        info!("Broker started");
        Self {
            registry,
            broadcaster,
        }
    }

    /// Hand an accepted stream to a new session
    ///
    /// `remote_addr` becomes the participant's address and initial name.
    pub fn spawn_session<S>(&self, stream: S, remote_addr: String) -> JoinHandle<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let broadcaster = self.broadcaster.clone();

        tokio::spawn(async move {
            debug!("Session for {} starting", remote_addr);
            let result =
                handle_connection(stream, remote_addr.clone(), Arc::clone(&registry), broadcaster)
                    .await;
            if let Err(e) = result {
                error!("Session for {} ended with error: {}", remote_addr, e);
            }
            debug!("Online: {}", registry.len());
        })
    }

    /// The shared roster
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
