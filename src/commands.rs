//! Operator Command Surface
//!
//! Maps the operator's command strings onto one engine. Registration
//! with a shell or UI front end stays outside this crate; this is just
//! the dispatch seam it calls into.

use anyhow::{bail, Result};

use crate::directory::Device;
use crate::engine::ReconEngine;

/// Dispatch one operator command line. Returns the text to display.
pub fn dispatch(engine: &ReconEngine, line: &str) -> Result<String> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("recon"), Some("on"), None) => {
            engine.start()?;
            Ok("HID recon started".to_string())
        }
        (Some("recon"), Some("off"), None) => {
            engine.stop();
            Ok("HID recon stopped".to_string())
        }
        (Some("sniff"), Some(arg), None) => {
            engine.set_sniff_mode(arg)?;
            if arg.eq_ignore_ascii_case("clear") {
                Ok("sniff target cleared".to_string())
            } else {
                Ok(format!("sniffing {}", arg.to_ascii_lowercase()))
            }
        }
        (Some("show"), None, None) => Ok(render_devices(&engine.directory().devices())),
        _ => bail!("unknown command '{}'", line),
    }
}

fn render_devices(devices: &[Device]) -> String {
    if devices.is_empty() {
        return "no HID devices discovered".to_string();
    }

    let mut out = String::new();
    for dev in devices {
        let channels: Vec<String> = dev.channels().iter().map(|c| c.to_string()).collect();
        out.push_str(&format!(
            "{}  {}  seen {:?} ago  channels [{}]  {} payloads\n",
            dev.address(),
            dev.device_type(),
            dev.last_seen().elapsed(),
            channels.join(","),
            dev.payloads().len(),
        ));
    }
    out
}
