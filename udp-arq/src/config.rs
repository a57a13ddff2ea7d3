//! Transfer and rendezvous parameters.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ArqError;
use crate::packet::HEADER_LEN;

/// Default chunk size in bytes for one DATA payload.
pub const MAX_PAYLOAD: usize = 500;

/// Default maximum number of DATA packets in flight.
pub const WINDOW_SIZE: u32 = 10;

/// Largest window either side accepts.
pub const MAX_WINDOW: u32 = 1 << 16;

/// Largest payload that still fits one IPv4 UDP datagram with our header.
pub const MAX_PAYLOAD_LIMIT: usize = 65_507 - HEADER_LEN;

/// Default retransmission timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Default name of the file a peer publishes its `host port` into.
pub const CHANNEL_INFO_FILE: &str = "channelInfo";

/// Parameters shared by both sending engines.
#[derive(Debug, Clone)]
pub struct ArqConfig {
    /// Retransmission timeout (GBN timer interval, SR per-packet wait).
    pub timeout: Duration,
    /// Maximum payload bytes per DATA packet.
    pub max_payload: usize,
    /// Maximum number of unacknowledged DATA packets.
    pub window_size: u32,
    /// Give up after this many consecutive timeouts for one packet.
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_payload: MAX_PAYLOAD,
            window_size: WINDOW_SIZE,
            max_retries: None,
        }
    }
}

impl ArqConfig {
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    /// Reject parameters the engines cannot run with.
    pub fn validate(&self) -> Result<(), ArqError> {
        validate_window(self.window_size)?;
        if self.max_payload == 0 || self.max_payload > MAX_PAYLOAD_LIMIT {
            return Err(ArqError::InvalidConfig(format!(
                "max_payload must be in 1..={MAX_PAYLOAD_LIMIT}, got {}",
                self.max_payload
            )));
        }
        if self.timeout.is_zero() {
            return Err(ArqError::InvalidConfig("timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// `true` once `retries` consecutive timeouts exceed the ceiling.
    pub(crate) fn retries_exhausted(&self, retries: u32) -> bool {
        self.max_retries.is_some_and(|max| retries > max)
    }
}

/// Window sizes outside `1..=MAX_WINDOW` are rejected.
pub fn validate_window(window_size: u32) -> Result<(), ArqError> {
    if (1..=MAX_WINDOW).contains(&window_size) {
        Ok(())
    } else {
        Err(ArqError::InvalidConfig(format!(
            "window_size must be in 1..={MAX_WINDOW}, got {window_size}"
        )))
    }
}

/// How to find the peer's address.
#[derive(Debug, Clone)]
pub struct RendezvousConfig {
    /// File holding `"<host> <port>"` on its first line.
    pub path: PathBuf,
    /// Number of reads attempted before giving up.
    pub attempts: u32,
    /// Pause after each failed attempt, the last one included.
    pub interval: Duration,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(CHANNEL_INFO_FILE),
            attempts: 6,
            interval: Duration::from_secs(10),
        }
    }
}
