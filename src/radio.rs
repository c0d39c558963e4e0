//! Transceiver Contract
//!
//! Abstraction over a 2.4 GHz nRF24-style dongle capable of channel
//! switching, promiscuous reception, address-filtered sniffing and
//! acknowledged transmission. The register-level driver lives outside
//! this crate; everything here is the surface the engine drives.

use thiserror::Error;

/// Highest usable RF channel (2400 + n MHz).
pub const TOP_CHANNEL: u8 = 82;

/// Lowest usable RF channel.
pub const BOTTOM_CHANNEL: u8 = 1;

/// Fixed keep-alive payload transmitted to hold a target's receive window open.
pub const PING_PAYLOAD: [u8; 4] = [0x0f, 0x0f, 0x0f, 0x0f];

/// Transmit timeout for pings and injected frames, in milliseconds.
pub const TRANSMIT_TIMEOUT_MS: u16 = 250;

/// Retransmit attempts for pings and injected frames.
pub const TRANSMIT_RETRIES: u8 = 1;

/// Transceiver errors. Every operation may fail transiently; only a
/// failure while opening/configuring the device is fatal to the engine.
#[derive(Debug, Error)]
pub enum RadioError {
    #[error("device error: {0}")]
    Device(String),

    #[error("channel {0} out of range")]
    InvalidChannel(u8),

    #[error("transmit failed after {retries} retries")]
    TransmitFailed { retries: u8 },

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Operations the reconnaissance engine needs from the dongle.
///
/// One engine loop owns the transceiver exclusively; implementations do
/// not need to be thread-safe beyond `Send`.
pub trait Transceiver: Send {
    /// Tune to an RF channel in `[BOTTOM_CHANNEL, TOP_CHANNEL]`.
    fn set_channel(&mut self, channel: u8) -> Result<(), RadioError>;

    /// Receive all traffic on the current channel regardless of address.
    fn enter_promiscuous_mode(&mut self) -> Result<(), RadioError>;

    /// Receive only traffic addressed to the given 5-byte radio address.
    fn enter_sniffer_mode(&mut self, address: &[u8; 5]) -> Result<(), RadioError>;

    /// Transmit a payload with acknowledgement, bounded by `timeout_ms`
    /// and at most `retries` retransmissions.
    fn transmit(&mut self, payload: &[u8], timeout_ms: u16, retries: u8) -> Result<(), RadioError>;

    /// Pull the next pending payload. An empty buffer means no traffic.
    fn receive(&mut self) -> Result<Vec<u8>, RadioError>;

    /// Enable the low-noise amplifier, when the hardware carries one.
    fn enable_lna(&mut self) -> Result<(), RadioError>;

    /// Release the device.
    fn close(&mut self);
}

/// Opens a transceiver. The engine calls this on every `start` so a
/// stopped engine holds no USB handle.
pub type TransceiverOpener = Box<dyn FnMut() -> Result<Box<dyn Transceiver>, RadioError> + Send>;
