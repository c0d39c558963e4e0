//! Device Directory
//!
//! Tracks HID transmitters discovered over the air: identity, inferred
//! type, observed channels and sniffed payload history. Records outlive
//! engine runs; nothing here is persisted across restarts.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use parking_lot::RwLock;

use crate::address::HidAddress;

/// Upper bound on retained payload samples per device.
const MAX_PAYLOADS: usize = 512;

/// Vendor protocol family, inferred from sniffed payload sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Unknown,
    Logitech,
    Microsoft,
    Amazon,
}

impl DeviceType {
    /// Guess the protocol family from one payload. Returns `Unknown`
    /// when the size matches no known vendor framing.
    pub fn guess(payload: &[u8]) -> DeviceType {
        match payload.len() {
            5 | 10 | 22 => DeviceType::Logitech,
            19 => DeviceType::Microsoft,
            6 => DeviceType::Amazon,
            _ => DeviceType::Unknown,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceType::Unknown => "unknown",
            DeviceType::Logitech => "Logitech",
            DeviceType::Microsoft => "Microsoft",
            DeviceType::Amazon => "Amazon",
        };
        f.write_str(s)
    }
}

/// One discovered HID transmitter.
#[derive(Debug, Clone)]
pub struct Device {
    address: HidAddress,
    device_type: DeviceType,
    last_seen: Instant,
    payloads: Vec<Vec<u8>>,
    channels: Vec<u8>,
}

impl Device {
    fn new(address: HidAddress, channel: u8, payload: &[u8]) -> Self {
        let mut dev = Self {
            address,
            device_type: DeviceType::Unknown,
            last_seen: Instant::now(),
            payloads: Vec::new(),
            channels: Vec::new(),
        };
        dev.record(payload, channel);
        dev
    }

    pub fn address(&self) -> &HidAddress {
        &self.address
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Payload history, oldest first.
    pub fn payloads(&self) -> &[Vec<u8>] {
        &self.payloads
    }

    /// Channels the device was heard on, in observation order, deduplicated.
    pub fn channels(&self) -> &[u8] {
        &self.channels
    }

    fn record(&mut self, payload: &[u8], channel: u8) {
        self.last_seen = Instant::now();

        if !payload.is_empty() && self.payloads.len() < MAX_PAYLOADS {
            self.payloads.push(payload.to_vec());
        }
        if !self.channels.contains(&channel) {
            self.channels.push(channel);
        }
        if self.device_type == DeviceType::Unknown {
            self.device_type = DeviceType::guess(payload);
        }
    }
}

/// Directory statistics.
#[derive(Debug, Default, Clone)]
pub struct DirectoryStats {
    pub total_devices: u64,
    pub total_payloads: u64,
}

/// Thread-safe registry of discovered devices, keyed by normalized address.
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    devices: RwLock<HashMap<String, Device>>,
    stats: RwLock<DirectoryStats>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a device by normalized address. Returns a snapshot.
    pub fn get(&self, address: &str) -> Option<Device> {
        self.devices.read().get(address).cloned()
    }

    /// Register a sighting. Returns `(is_new, snapshot)`; an existing
    /// device gets the payload and channel appended instead.
    pub fn add_if_new(&self, raw: [u8; 5], channel: u8, payload: &[u8]) -> (bool, Device) {
        let address = HidAddress::from_bytes(raw);
        let mut devices = self.devices.write();

        let is_new = !devices.contains_key(address.text());
        let key = address.text().to_string();
        let dev = devices
            .entry(key)
            .and_modify(|d| d.record(payload, channel))
            .or_insert_with(|| Device::new(address, channel, payload));

        let mut stats = self.stats.write();
        if is_new {
            stats.total_devices += 1;
        }
        stats.total_payloads += 1;

        (is_new, dev.clone())
    }

    /// Append sniffed traffic to a known device. Returns false when the
    /// address has never been seen.
    pub fn record_traffic(&self, address: &str, payload: &[u8], channel: u8) -> bool {
        let mut devices = self.devices.write();
        match devices.get_mut(address) {
            Some(dev) => {
                dev.record(payload, channel);
                self.stats.write().total_payloads += 1;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all devices, sorted by address.
    pub fn devices(&self) -> Vec<Device> {
        let mut all: Vec<Device> = self.devices.read().values().cloned().collect();
        all.sort_by(|a, b| a.address().text().cmp(b.address().text()));
        all
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    pub fn stats(&self) -> DirectoryStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_guess() {
        assert_eq!(DeviceType::guess(&[0u8; 10]), DeviceType::Logitech);
        assert_eq!(DeviceType::guess(&[0u8; 22]), DeviceType::Logitech);
        assert_eq!(DeviceType::guess(&[0u8; 19]), DeviceType::Microsoft);
        assert_eq!(DeviceType::guess(&[0u8; 6]), DeviceType::Amazon);
        assert_eq!(DeviceType::guess(&[]), DeviceType::Unknown);
        assert_eq!(DeviceType::guess(&[0u8; 3]), DeviceType::Unknown);
    }

    #[test]
    fn test_add_if_new() {
        let dir = DeviceDirectory::new();
        let raw = [0xa1, 0xb2, 0xc3, 0xd4, 0xe5];

        let (is_new, dev) = dir.add_if_new(raw, 7, &[0u8; 10]);
        assert!(is_new);
        assert_eq!(dev.address().text(), "a1:b2:c3:d4:e5");
        assert_eq!(dev.device_type(), DeviceType::Logitech);
        assert_eq!(dev.channels(), &[7]);

        let (is_new, dev) = dir.add_if_new(raw, 9, &[1u8; 10]);
        assert!(!is_new);
        assert_eq!(dev.channels(), &[7, 9]);
        assert_eq!(dev.payloads().len(), 2);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_record_traffic_unknown_address() {
        let dir = DeviceDirectory::new();
        assert!(!dir.record_traffic("aa:bb:cc:dd:ee", &[1, 2, 3], 4));
    }

    #[test]
    fn test_record_traffic_dedups_channels() {
        let dir = DeviceDirectory::new();
        let raw = [0x11, 0x22, 0x33, 0x44, 0x55];
        dir.add_if_new(raw, 3, &[]);

        assert!(dir.record_traffic("11:22:33:44:55", &[0xaa, 0xbb], 3));
        assert!(dir.record_traffic("11:22:33:44:55", &[0xcc], 5));

        let dev = dir.get("11:22:33:44:55").unwrap();
        assert_eq!(dev.channels(), &[3, 5]);
        assert_eq!(dev.payloads(), &[vec![0xaa, 0xbb], vec![0xcc]]);
    }

    #[test]
    fn test_type_sticks_once_guessed() {
        let dir = DeviceDirectory::new();
        let raw = [1, 2, 3, 4, 5];
        dir.add_if_new(raw, 1, &[0u8; 10]);
        dir.record_traffic("01:02:03:04:05", &[0u8; 19], 1);

        let dev = dir.get("01:02:03:04:05").unwrap();
        assert_eq!(dev.device_type(), DeviceType::Logitech);
    }

    #[test]
    fn test_devices_sorted() {
        let dir = DeviceDirectory::new();
        dir.add_if_new([9, 9, 9, 9, 9], 1, &[]);
        dir.add_if_new([1, 1, 1, 1, 1], 1, &[]);

        let all = dir.devices();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].address().text(), "01:01:01:01:01");
        assert_eq!(all[1].address().text(), "09:09:09:09:09");
    }
}
