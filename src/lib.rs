//! In-memory Line-Oriented Chat Broker Library
//!
//! Clients connect over a byte stream, join a shared roster, and exchange
//! broadcast or directed text lines through a central broker.
//!
//! # Features
//! - Public chat broadcast to everyone online
//! - Presence query (`who`)
//! - Rename (`rename|<newName>`)
//! - Directed messages (`to|<name>|<text>`)
//! - Join/leave notices
//!
//! # Architecture
//! - `Registry`: name → participant map behind a single lock
//! - `Broadcaster`: one ordered queue, one consumer fanning out to every mailbox
//! - `Mailbox`: per-participant unbounded queue drained by its own delivery task
//! - `session`: per-connection read loop and command interpreter
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use chat_broker::{Broker, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     let broker = Broker::start(&config);
//!
//!     while let Ok((stream, addr)) = listener.accept().await {
//!         broker.spawn_session(stream, addr.to_string());
//!     }
//! }
//! ```

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod participant;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcaster::Broadcaster;
pub use config::Config;
pub use error::{BrokerError, CommandError, RegistryError, SendError};
pub use mailbox::Mailbox;
pub use message::{Command, Reply};
pub use participant::Participant;
pub use registry::{Registry, RosterEntry};
pub use server::Broker;
pub use session::handle_connection;
pub use types::ParticipantId;
