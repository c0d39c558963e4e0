//! Scripted Transceiver
//!
//! An in-memory `Transceiver` for tests: received payloads are queued in
//! advance, transmissions are recorded, and individual operations can be
//! scripted to fail. Handles are cheap clones over shared state so a
//! test can keep inspecting the radio after the engine takes ownership.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::radio::{RadioError, Transceiver};

/// What the scripted radio is currently tuned to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Idle,
    Promiscuous,
    Sniffer([u8; 5]),
}

#[derive(Debug)]
struct Inner {
    channel: u8,
    mode: RadioMode,
    lna_enabled: bool,
    closed: bool,
    rx_queue: VecDeque<Vec<u8>>,
    /// Channels where transmit succeeds; `None` means every channel.
    tx_channels: Option<HashSet<u8>>,
    /// Remaining transmits before forced failure; `None` means unlimited.
    tx_budget: Option<usize>,
    /// Channels rejected by `set_channel`.
    dead_channels: HashSet<u8>,
    fail_promiscuous: bool,
    fail_sniffer: bool,
    fail_lna: bool,
    transmissions: Vec<(u8, Vec<u8>)>,
    channel_history: Vec<u8>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            channel: 1,
            mode: RadioMode::Idle,
            lna_enabled: false,
            closed: false,
            rx_queue: VecDeque::new(),
            tx_channels: None,
            tx_budget: None,
            dead_channels: HashSet::new(),
            fail_promiscuous: false,
            fail_sniffer: false,
            fail_lna: false,
            transmissions: Vec::new(),
            channel_history: Vec::new(),
        }
    }
}

/// Shared-state scripted transceiver.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRadio {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload for the next `receive` calls.
    pub fn push_rx(&self, payload: &[u8]) {
        self.inner.lock().rx_queue.push_back(payload.to_vec());
    }

    /// Restrict transmit success to the given channels.
    pub fn transmit_only_on(&self, channels: &[u8]) {
        self.inner.lock().tx_channels = Some(channels.iter().copied().collect());
    }

    /// Make every transmit fail.
    pub fn fail_all_transmits(&self) {
        self.inner.lock().tx_channels = Some(HashSet::new());
    }

    /// Let the next `n` transmits through, then fail every one after.
    pub fn fail_transmits_after(&self, n: usize) {
        self.inner.lock().tx_budget = Some(n);
    }

    /// Make `set_channel` reject the given channels.
    pub fn kill_channels(&self, channels: &[u8]) {
        let mut inner = self.inner.lock();
        inner.dead_channels.extend(channels.iter().copied());
    }

    /// Accept the given channels again.
    pub fn revive_channels(&self, channels: &[u8]) {
        let mut inner = self.inner.lock();
        for ch in channels {
            inner.dead_channels.remove(ch);
        }
    }

    pub fn fail_promiscuous(&self, fail: bool) {
        self.inner.lock().fail_promiscuous = fail;
    }

    pub fn fail_sniffer(&self, fail: bool) {
        self.inner.lock().fail_sniffer = fail;
    }

    pub fn fail_lna(&self, fail: bool) {
        self.inner.lock().fail_lna = fail;
    }

    pub fn channel(&self) -> u8 {
        self.inner.lock().channel
    }

    pub fn mode(&self) -> RadioMode {
        self.inner.lock().mode
    }

    pub fn lna_enabled(&self) -> bool {
        self.inner.lock().lna_enabled
    }

    pub fn closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Every transmitted payload with the channel it went out on.
    pub fn transmissions(&self) -> Vec<(u8, Vec<u8>)> {
        self.inner.lock().transmissions.clone()
    }

    /// Every channel successfully tuned, in order.
    pub fn channel_history(&self) -> Vec<u8> {
        self.inner.lock().channel_history.clone()
    }

    /// Handle to pass into the engine.
    pub fn as_transceiver(&self) -> Box<dyn Transceiver> {
        Box::new(self.clone())
    }
}

impl Transceiver for ScriptedRadio {
    fn set_channel(&mut self, channel: u8) -> Result<(), RadioError> {
        let mut inner = self.inner.lock();
        if inner.dead_channels.contains(&channel) {
            return Err(RadioError::InvalidChannel(channel));
        }
        inner.channel = channel;
        inner.channel_history.push(channel);
        Ok(())
    }

    fn enter_promiscuous_mode(&mut self) -> Result<(), RadioError> {
        let mut inner = self.inner.lock();
        if inner.fail_promiscuous {
            return Err(RadioError::Device("promiscuous mode rejected".into()));
        }
        inner.mode = RadioMode::Promiscuous;
        Ok(())
    }

    fn enter_sniffer_mode(&mut self, address: &[u8; 5]) -> Result<(), RadioError> {
        let mut inner = self.inner.lock();
        if inner.fail_sniffer {
            return Err(RadioError::Device("sniffer mode rejected".into()));
        }
        inner.mode = RadioMode::Sniffer(*address);
        Ok(())
    }

    fn transmit(&mut self, payload: &[u8], _timeout_ms: u16, retries: u8) -> Result<(), RadioError> {
        let mut inner = self.inner.lock();
        let ok = match &inner.tx_channels {
            Some(channels) => channels.contains(&inner.channel),
            None => true,
        };
        if !ok {
            return Err(RadioError::TransmitFailed { retries });
        }
        if let Some(budget) = inner.tx_budget {
            if budget == 0 {
                return Err(RadioError::TransmitFailed { retries });
            }
            inner.tx_budget = Some(budget - 1);
        }
        let channel = inner.channel;
        inner.transmissions.push((channel, payload.to_vec()));
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, RadioError> {
        let next = self.inner.lock().rx_queue.pop_front();
        match next {
            Some(payload) => Ok(payload),
            None => {
                // keep a spinning engine loop from burning a core
                std::thread::sleep(Duration::from_millis(1));
                Ok(Vec::new())
            }
        }
    }

    fn enable_lna(&mut self) -> Result<(), RadioError> {
        let mut inner = self.inner.lock();
        if inner.fail_lna {
            return Err(RadioError::Device("no LNA present".into()));
        }
        inner.lna_enabled = true;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_rx_queue() {
        let radio = ScriptedRadio::new();
        radio.push_rx(&[1, 2, 3]);

        let mut handle = radio.clone();
        assert_eq!(handle.receive().unwrap(), vec![1, 2, 3]);
        assert!(handle.receive().unwrap().is_empty());
    }

    #[test]
    fn test_scripted_transmit_gating() {
        let radio = ScriptedRadio::new();
        radio.transmit_only_on(&[42]);

        let mut handle = radio.clone();
        handle.set_channel(7).unwrap();
        assert!(handle.transmit(&[0xff], 250, 1).is_err());
        handle.set_channel(42).unwrap();
        handle.transmit(&[0xff], 250, 1).unwrap();

        assert_eq!(radio.transmissions(), vec![(42, vec![0xff])]);
    }

    #[test]
    fn test_scripted_dead_channels() {
        let radio = ScriptedRadio::new();
        radio.kill_channels(&[5]);

        let mut handle = radio.clone();
        assert!(handle.set_channel(5).is_err());
        assert_eq!(radio.channel(), 1);
    }
}
