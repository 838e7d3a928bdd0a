//! Runtime configuration
//!
//! Bind address from the first command-line argument, then the
//! environment, then the built-in default.

use std::env;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8766";

/// Default capacity of the broadcaster queue
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;

/// Environment variable overriding the bind address
pub const ADDR_ENV: &str = "CHAT_BROKER_ADDR";

/// Environment variable overriding the broadcaster queue capacity
pub const BROADCAST_BUFFER_ENV: &str = "CHAT_BROKER_BROADCAST_BUFFER";

/// Broker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the listener binds to
    pub bind_addr: String,
    /// Capacity of the broadcaster's ordered queue
    pub broadcast_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            broadcast_buffer: DEFAULT_BROADCAST_BUFFER,
        }
    }
}

impl Config {
    /// Build from process arguments and environment
    pub fn from_env() -> Self {
        Self::resolve(
            env::args().nth(1),
            env::var(ADDR_ENV).ok(),
            env::var(BROADCAST_BUFFER_ENV).ok(),
        )
    }

    /// Apply precedence: argument, then environment, then default
    ///
    /// An unparsable or zero buffer size falls back to the default.
    pub fn resolve(
        arg_addr: Option<String>,
        env_addr: Option<String>,
        env_buffer: Option<String>,
    ) -> Self {
        let bind_addr = arg_addr
            .or(env_addr)
            .unwrap_or_else(|| DEFAULT_ADDR.to_string());

        let broadcast_buffer = env_buffer
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BROADCAST_BUFFER);

        Self {
            bind_addr,
            broadcast_buffer,
        }
    }
}
