//! `chat_broker` binary: binds the listener and hands every accepted
//! TCP stream to the broker.

use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use chat_broker::{Broker, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG overrides, e.g. RUST_LOG=chat_broker=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_broker=info")),
        )
        .init();

    let config = Config::from_env();

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "Listening on {} (broadcast buffer {})",
        config.bind_addr, config.broadcast_buffer
    );

    let broker = Broker::start(&config);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("Accepted {}", addr);
                broker.spawn_session(stream, addr.to_string());
            }
            Err(e) => {
                error!("Accept failed: {}", e);
            }
        }
    }
}
