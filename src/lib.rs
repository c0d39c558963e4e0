//! hidrecon — 2.4 GHz wireless HID reconnaissance and injection.
//!
//! Discovers wireless keyboard/mouse transmitters by sweeping channels
//! in promiscuous mode, locks onto a device's radio address to monitor
//! its traffic, keeps a forged link open with periodic keep-alive pings
//! and injects text as device-specific keystroke frames.
//!
//! The hardware driver is not part of this crate: bring any dongle that
//! can implement [`radio::Transceiver`] (channel switching, promiscuous
//! and address-filtered reception, acknowledged transmit).
//!
//! ```no_run
//! use std::sync::Arc;
//! use hidrecon::{ReconConfig, ReconEngine, DeviceDirectory};
//! # fn open_dongle() -> Result<Box<dyn hidrecon::Transceiver>, hidrecon::RadioError> { unimplemented!() }
//!
//! let engine = ReconEngine::new(
//!     ReconConfig::default(),
//!     Arc::new(DeviceDirectory::new()),
//!     Box::new(open_dongle),
//! );
//! engine.start()?;
//! engine.set_sniff_mode("a1:b2:c3:d4:e5")?;
//! // ...
//! engine.stop();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod address;
pub mod commands;
pub mod config;
pub mod directory;
pub mod engine;
pub mod frames;
pub mod keymap;
pub mod radio;
pub mod testing;

pub use address::{AddressError, HidAddress};
pub use config::ReconConfig;
pub use directory::{Device, DeviceDirectory, DeviceType};
pub use engine::{EngineState, ReconEngine};
pub use frames::{builder_for, Command, FrameBuilder, FrameSet};
pub use keymap::{translator_for, KeyPress, KeyTranslator};
pub use radio::{RadioError, Transceiver, TransceiverOpener, TOP_CHANNEL};
