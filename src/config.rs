//! Engine Configuration

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Reconnaissance engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Channel dwell time while discovering, in milliseconds.
    #[serde(default = "default_hop_period_ms")]
    pub hop_period_ms: u64,

    /// Keep-alive ping interval while locked, in milliseconds.
    #[serde(default = "default_ping_period_ms")]
    pub ping_period_ms: u64,

    /// Auto-triage sniff window for newly discovered devices, in milliseconds.
    #[serde(default = "default_sniff_period_ms")]
    pub sniff_period_ms: u64,

    /// Enable the dongle's low-noise amplifier at start.
    #[serde(default = "default_true")]
    pub use_lna: bool,

    /// Keyboard layout used to translate the injection text.
    #[serde(default = "default_keymap")]
    pub keymap: String,

    /// Text injected as keystrokes while locked on a device.
    #[serde(default = "default_inject_text")]
    pub inject_text: String,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            hop_period_ms: default_hop_period_ms(),
            ping_period_ms: default_ping_period_ms(),
            sniff_period_ms: default_sniff_period_ms(),
            use_lna: true,
            keymap: default_keymap(),
            inject_text: default_inject_text(),
        }
    }
}

impl ReconConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config {}", path.as_ref().display()))?;
        let config: ReconConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("writing config {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn hop_period(&self) -> Duration {
        Duration::from_millis(self.hop_period_ms)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_period_ms)
    }

    pub fn sniff_period(&self) -> Duration {
        Duration::from_millis(self.sniff_period_ms)
    }
}

// Default value functions
fn default_hop_period_ms() -> u64 {
    100
}

fn default_ping_period_ms() -> u64 {
    100
}

fn default_sniff_period_ms() -> u64 {
    500
}

fn default_keymap() -> String {
    "us".to_string()
}

fn default_inject_text() -> String {
    "hello world".to_string()
}

fn default_true() -> bool {
    true
}
