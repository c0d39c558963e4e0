//! Frame Building
//!
//! Turns translated keystroke commands into vendor-specific wire frames.
//! Builders are a registry keyed by `DeviceType`; each produces the full
//! frame sequence for a command list plus the delay to honor between
//! frames.

use std::time::Duration;

use crate::directory::DeviceType;
use crate::keymap::MODE_NONE;

/// One keystroke to inject: the source character and its translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub character: char,
    pub code: u8,
    pub mode: u8,
}

/// Wire frames for a command sequence plus the inter-frame delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    pub frames: Vec<Vec<u8>>,
    pub delay: Duration,
}

impl FrameSet {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total payload bytes across all frames.
    pub fn total_bytes(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }
}

/// Device-type-specific frame generation.
pub trait FrameBuilder: Sync {
    /// Build the full ordered frame sequence for `commands`.
    fn build(&self, commands: &[Command]) -> FrameSet;
}

/// Resolve a frame builder for a device type. `None` means injection is
/// not supported for that vendor.
pub fn builder_for(device_type: DeviceType) -> Option<&'static dyn FrameBuilder> {
    match device_type {
        DeviceType::Logitech => Some(&LogitechBuilder),
        _ => None,
    }
}

/// Unencrypted Logitech keystroke frames.
///
/// Each keystroke becomes a 10-byte key-down frame followed by a key-up
/// frame releasing it, with the vendor checksum in the last byte.
struct LogitechBuilder;

const LOGITECH_FRAME_LEN: usize = 10;
const LOGITECH_KEYSTROKE: u8 = 0xc1;
const LOGITECH_FRAME_DELAY_MS: u64 = 5;

impl LogitechBuilder {
    fn keystroke(mode: u8, code: u8) -> Vec<u8> {
        let mut frame = vec![0u8; LOGITECH_FRAME_LEN];
        frame[1] = LOGITECH_KEYSTROKE;
        frame[3] = mode;
        frame[4] = code;
        frame[LOGITECH_FRAME_LEN - 1] = logitech_checksum(&frame[..LOGITECH_FRAME_LEN - 1]);
        frame
    }
}

impl FrameBuilder for LogitechBuilder {
    fn build(&self, commands: &[Command]) -> FrameSet {
        let mut frames = Vec::with_capacity(commands.len() * 2);
        for cmd in commands {
            frames.push(Self::keystroke(cmd.mode, cmd.code));
            frames.push(Self::keystroke(MODE_NONE, 0x00));
        }
        FrameSet {
            frames,
            delay: Duration::from_millis(LOGITECH_FRAME_DELAY_MS),
        }
    }
}

/// The receiver drops frames whose bytes do not sum to zero mod 256.
fn logitech_checksum(body: &[u8]) -> u8 {
    body.iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::MODE_SHIFT;

    #[test]
    fn test_checksum_balances_frame() {
        let frame = LogitechBuilder::keystroke(MODE_SHIFT, 0x12);
        let sum: u8 = frame.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn test_logitech_press_release_pairs() {
        let cmds = [
            Command {
                character: 'o',
                code: 0x12,
                mode: MODE_NONE,
            },
            Command {
                character: 'k',
                code: 0x0e,
                mode: MODE_NONE,
            },
        ];
        let set = builder_for(DeviceType::Logitech).unwrap().build(&cmds);

        assert_eq!(set.frames.len(), 4);
        assert_eq!(set.delay, Duration::from_millis(5));

        // key-down frames carry the usage code, key-up frames clear it
        assert_eq!(set.frames[0][4], 0x12);
        assert_eq!(set.frames[1][4], 0x00);
        assert_eq!(set.frames[2][4], 0x0e);
        assert_eq!(set.frames[3][4], 0x00);
        for frame in &set.frames {
            assert_eq!(frame.len(), 10);
            assert_eq!(frame[1], 0xc1);
        }
    }

    #[test]
    fn test_unsupported_types() {
        assert!(builder_for(DeviceType::Unknown).is_none());
        assert!(builder_for(DeviceType::Microsoft).is_none());
        assert!(builder_for(DeviceType::Amazon).is_none());
    }

    #[test]
    fn test_empty_command_list() {
        let set = builder_for(DeviceType::Logitech).unwrap().build(&[]);
        assert!(set.is_empty());
        assert_eq!(set.total_bytes(), 0);
    }
}
