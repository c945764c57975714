// src/config.rs  —  Engine tuning parameters (TOML, no CLI layer)
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlapError;

/// The example config is embedded directly in the crate at compile time, so a host
/// application can write it out as a starting point without shipping a separate asset.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config.toml.example");

// ── TOML file structure ───────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    pub retry: Option<RetryCfg>,
    pub wire: Option<WireCfg>,
    pub channels: Option<ChannelCfg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryCfg {
    /// Milliseconds between retransmissions of an unacknowledged command.
    pub interval_ms: Option<u64>,
    /// Number of retransmissions attempted before a command moves to the unanswered list.
    pub max_retries: Option<u32>,
    /// Granularity of the retry handler's scan loop, in milliseconds.
    pub tick_ms: Option<u64>,
    /// Window during which a repeated inbound frame is treated as a duplicate retransmission.
    pub dedup_window_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCfg {
    /// The frame's start sentinel byte, 'a' on stock LLAP firmware.
    pub start_byte: Option<char>,
    /// The body padding byte, '-' on stock LLAP firmware.
    pub fill_byte: Option<char>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCfg {
    /// Bounded capacity of the inter-worker mpsc channels.
    pub capacity: Option<usize>,
    /// Grace period the coordinator waits for the writer/retry handler to drain on shutdown.
    pub shutdown_grace_ms: Option<u64>,
}

// ── Resolved config used by the engine ────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry_interval: Duration,
    pub max_retries: u32,
    pub retry_tick: Duration,
    pub dedup_window: Duration,
    pub start_byte: u8,
    pub fill_byte: u8,
    pub channel_capacity: usize,
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            max_retries: 5,
            retry_tick: Duration::from_millis(10),
            dedup_window: Duration::from_millis(500),
            start_byte: b'a',
            fill_byte: b'-',
            channel_capacity: 64,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Load and merge a TOML file on top of the defaults. Missing fields, and a missing file,
    /// fall back to [`EngineConfig::default`] — there is no required configuration.
    pub fn load(path: &Path) -> Result<Self, LlapError> {
        let mut cfg = Self::default();
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let fc: FileConfig = toml::from_str(&raw)?;
            cfg.apply_file(&fc);
        }
        Ok(cfg)
    }

    pub fn from_str(raw: &str) -> Result<Self, LlapError> {
        let mut cfg = Self::default();
        let fc: FileConfig = toml::from_str(raw)?;
        cfg.apply_file(&fc);
        Ok(cfg)
    }

    fn apply_file(&mut self, fc: &FileConfig) {
        if let Some(r) = &fc.retry {
            if let Some(v) = r.interval_ms {
                self.retry_interval = Duration::from_millis(v);
            }
            if let Some(v) = r.max_retries {
                self.max_retries = v;
            }
            if let Some(v) = r.tick_ms {
                self.retry_tick = Duration::from_millis(v);
            }
            if let Some(v) = r.dedup_window_ms {
                self.dedup_window = Duration::from_millis(v);
            }
        }
        if let Some(w) = &fc.wire {
            if let Some(v) = w.start_byte {
                self.start_byte = v as u8;
            }
            if let Some(v) = w.fill_byte {
                self.fill_byte = v as u8;
            }
        }
        if let Some(c) = &fc.channels {
            if let Some(v) = c.capacity {
                self.channel_capacity = v;
            }
            if let Some(v) = c.shutdown_grace_ms {
                self.shutdown_grace = Duration::from_millis(v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.retry_interval, Duration::from_millis(100));
        assert_eq!(cfg.dedup_window, Duration::from_millis(500));
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = EngineConfig::from_str("[retry]\nmax_retries = 3\n").unwrap();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_interval, Duration::from_millis(100));
    }

    #[test]
    fn embedded_default_config_parses() {
        EngineConfig::from_str(DEFAULT_CONFIG_TOML).unwrap();
    }
}
