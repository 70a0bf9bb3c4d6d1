//! Aura keyboard wire protocol.
//!
//! Every outbound message is a 17-byte feature report whose report ID is its
//! first byte. Standard lighting frames carry the `0x5d,0xb3` header; the
//! brightness family uses the `0x5a` header and embeds its own apply step.

use bytes::{BufMut, Bytes, BytesMut};

use crate::commands::{CommandArguments, CommandKind};
use crate::state::BrightnessStore;
use crate::Rgb;

/// Fixed length of every outbound feature report.
pub const MESSAGE_LENGTH: usize = 17;

/// Upper bound on messages a single command may emit.
pub const MAX_NUM_MESSAGES: usize = 6;

/// Stages the current configuration into the device profile; always followed
/// by [`MESSAGE_APPLY`].
pub const MESSAGE_SET: [u8; MESSAGE_LENGTH] =
    [0x5d, 0xb5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Commits the staged configuration.
pub const MESSAGE_APPLY: [u8; MESSAGE_LENGTH] =
    [0x5d, 0xb4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Wire encoding of speed levels 1..=3.
const SPEED_BYTES: [u8; 3] = [0xe1, 0xeb, 0xf5];

/// Speed applied when the optional scalar is omitted.
const DEFAULT_SPEED: u8 = 3;

/// Messages produced for one command, in transmission order.
pub struct EncodedOutput {
    pub messages: Vec<Bytes>,
    /// Append the SET/APPLY trailer pair after the main sequence.
    pub set_and_apply: bool,
}

/// Encode a command into its outbound message sequence.
///
/// Arguments are assumed to have passed dispatch-table validation, so
/// encoding itself cannot fail. The brightness commands read and write the
/// persisted state as a side effect.
pub fn encode(kind: CommandKind, args: &CommandArguments, store: &BrightnessStore) -> EncodedOutput {
    let output = match kind {
        CommandKind::SingleStatic => single_static(args.color(0)),
        CommandKind::NamedColor(color) => single_static(color),
        CommandKind::SingleBreathing => single_breathing(args),
        CommandKind::SingleColorcycle | CommandKind::Rainbow => colorcycle(args),
        CommandKind::MultiStatic => multi_static(args),
        CommandKind::SetBrightness => set_brightness(args.scalar(0).unwrap_or(0), store),
        CommandKind::CycleBrightness => cycle_brightness(store),
        CommandKind::InitializeKeyboard => initialize_keyboard(store),
    };

    debug_assert!(output.messages.len() <= MAX_NUM_MESSAGES);
    output
}

/// Map a validated speed level to its wire byte.
fn speed_byte(speed: u8) -> u8 {
    SPEED_BYTES[speed as usize - 1]
}

/// Speed requested by the caller, or the default when omitted.
fn requested_speed(args: &CommandArguments) -> u8 {
    args.scalar(0).unwrap_or(DEFAULT_SPEED)
}

/// Start a standard lighting frame.
fn standard_frame() -> BytesMut {
    let mut buf = BytesMut::with_capacity(MESSAGE_LENGTH);
    buf.put_slice(&[0x5d, 0xb3]);
    buf
}

/// Zero-pad a frame to the fixed report length.
fn finish(mut buf: BytesMut) -> Bytes {
    buf.resize(MESSAGE_LENGTH, 0);
    buf.freeze()
}

fn put_color(buf: &mut BytesMut, color: Rgb) {
    buf.put_u8(color.r);
    buf.put_u8(color.g);
    buf.put_u8(color.b);
}

fn single_static(color: Rgb) -> EncodedOutput {
    let mut buf = standard_frame();

    // Zone and mode stay zero for a whole-keyboard static color.
    buf.put_slice(&[0, 0]);
    put_color(&mut buf, color);

    EncodedOutput { messages: vec![finish(buf)], set_and_apply: false }
}

fn single_breathing(args: &CommandArguments) -> EncodedOutput {
    let mut buf = standard_frame();

    buf.put_u8(0);
    buf.put_u8(1); // Breathing mode.
    put_color(&mut buf, args.color(0));
    buf.put_u8(speed_byte(requested_speed(args)));
    buf.put_u8(0);
    buf.put_u8(1); // Secondary color slot.
    put_color(&mut buf, args.color(1));

    EncodedOutput { messages: vec![finish(buf)], set_and_apply: false }
}

/// Shared frame for `single_colorcycle` and `rainbow`.
fn colorcycle(args: &CommandArguments) -> EncodedOutput {
    let mut buf = standard_frame();

    buf.put_u8(0);
    buf.put_u8(0x02); // Color cycle mode.
    buf.put_u8(0xff); // Full color range.
    buf.put_slice(&[0, 0]);
    buf.put_u8(speed_byte(requested_speed(args)));

    EncodedOutput { messages: vec![finish(buf)], set_and_apply: true }
}

fn multi_static(args: &CommandArguments) -> EncodedOutput {
    let mut messages = Vec::with_capacity(4);

    for zone in 1..=4u8 {
        let mut buf = standard_frame();
        buf.put_u8(zone);
        buf.put_u8(0);
        put_color(&mut buf, args.color(zone as usize - 1));
        messages.push(finish(buf));
    }

    EncodedOutput { messages, set_and_apply: true }
}

/// Emits the brightness frame plus its own apply message; the generic
/// SET/APPLY trailer must not follow.
fn set_brightness(brightness: u8, store: &BrightnessStore) -> EncodedOutput {
    let mut buf = BytesMut::with_capacity(MESSAGE_LENGTH);
    buf.put_slice(&[0x5a, 0xba, 0xc5, 0xc4]);
    buf.put_u8(brightness);

    store.save(brightness);

    EncodedOutput {
        messages: vec![finish(buf), Bytes::from_static(&MESSAGE_APPLY)],
        set_and_apply: false,
    }
}

/// Advance to the next brightness level, wrapping 4 back to 1. Out-of-range
/// persisted values also recover to 1.
fn cycle_brightness(store: &BrightnessStore) -> EncodedOutput {
    let current = store.load();
    let next = if current >= 0x04 || current < 0x01 { 0x01 } else { current + 1 };
    set_brightness(next, store)
}

/// Re-assert the persisted brightness, for driver or login initialization.
fn initialize_keyboard(store: &BrightnessStore) -> EncodedOutput {
    set_brightness(store.load(), store)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::commands::{find_command, parse_arguments};

    fn store_in(dir: &TempDir) -> BrightnessStore {
        BrightnessStore::new(dir.path().join("brightness"))
    }

    /// Run a command line through parsing and encoding.
    fn run(command: &str, tokens: &[&str], store: &BrightnessStore) -> EncodedOutput {
        let spec = find_command(command).expect(command);
        let raw: Vec<String> = tokens.iter().map(|token| token.to_string()).collect();
        let args = parse_arguments(spec, &raw).unwrap();
        encode(spec.kind, &args, store)
    }

    #[test]
    fn single_static_byte_image() {
        let dir = TempDir::new().unwrap();
        let output = run("single_static", &["ff0000"], &store_in(&dir));

        assert_eq!(output.messages.len(), 1);
        assert_eq!(
            &output.messages[0][..],
            &[0x5d, 0xb3, 0, 0, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert!(!output.set_and_apply);
    }

    #[test]
    fn color_channels_round_trip() {
        let dir = TempDir::new().unwrap();
        let output = run("single_static", &["12af9b"], &store_in(&dir));

        assert_eq!(&output.messages[0][4..7], &[0x12, 0xaf, 0x9b]);
    }

    #[test]
    fn single_breathing_byte_image() {
        let dir = TempDir::new().unwrap();
        let output = run("single_breathing", &["ff0000", "0000ff", "1"], &store_in(&dir));

        assert_eq!(output.messages.len(), 1);
        assert_eq!(
            &output.messages[0][..],
            &[0x5d, 0xb3, 0, 1, 0xff, 0, 0, 0xe1, 0, 1, 0, 0, 0xff, 0, 0, 0, 0]
        );
        assert!(!output.set_and_apply);
    }

    #[test]
    fn speed_levels_map_to_wire_bytes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (level, byte) in [("1", 0xe1), ("2", 0xeb), ("3", 0xf5)] {
            let output = run("rainbow", &[level], &store);
            assert_eq!(output.messages[0][7], byte);
        }
    }

    #[test]
    fn omitted_speed_defaults_to_three() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for command in ["single_colorcycle", "rainbow"] {
            let output = run(command, &[], &store);
            assert_eq!(output.messages[0][7], 0xf5);
        }

        let output = run("single_breathing", &["ff0000", "0000ff"], &store);
        assert_eq!(output.messages[0][7], 0xf5);
    }

    #[test]
    fn colorcycle_and_rainbow_share_a_frame() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let cycle = run("single_colorcycle", &["2"], &store);
        let rainbow = run("rainbow", &["2"], &store);

        assert_eq!(cycle.messages[0], rainbow.messages[0]);
        assert_eq!(
            &cycle.messages[0][..],
            &[0x5d, 0xb3, 0, 0x02, 0xff, 0, 0, 0xeb, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert!(cycle.set_and_apply);
        assert!(rainbow.set_and_apply);
    }

    #[test]
    fn multi_static_emits_one_message_per_zone() {
        let dir = TempDir::new().unwrap();
        let colors = ["ff0000", "00ff00", "0000ff", "ffffff"];
        let output = run("multi_static", &colors, &store_in(&dir));

        assert_eq!(output.messages.len(), 4);
        assert!(output.set_and_apply);

        let triples = [[0xff, 0, 0], [0, 0xff, 0], [0, 0, 0xff], [0xff, 0xff, 0xff]];
        for (i, message) in output.messages.iter().enumerate() {
            assert_eq!(message.len(), MESSAGE_LENGTH);
            assert_eq!(&message[..2], &[0x5d, 0xb3]);
            assert_eq!(message[2], i as u8 + 1);
            assert_eq!(&message[4..7], &triples[i]);
        }
    }

    #[test]
    fn named_colors_delegate_to_single_static() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let cases = [
            ("red", [0xff, 0x00, 0x00]),
            ("green", [0x00, 0xff, 0x00]),
            ("blue", [0x00, 0x00, 0xff]),
            ("yellow", [0xff, 0xff, 0x00]),
            ("gold", [0xff, 0x8c, 0x00]),
            ("cyan", [0x00, 0xff, 0xff]),
            ("magenta", [0xff, 0x00, 0xff]),
            ("white", [0xff, 0xff, 0xff]),
            ("black", [0x00, 0x00, 0x00]),
            ("on", [0xff, 0x00, 0x00]),
            ("off", [0x00, 0x00, 0x00]),
        ];

        for (command, triple) in cases {
            let output = run(command, &[], &store);
            assert_eq!(output.messages.len(), 1, "{}", command);
            assert_eq!(&output.messages[0][..2], &[0x5d, 0xb3], "{}", command);
            assert_eq!(&output.messages[0][4..7], &triple, "{}", command);
            assert!(!output.set_and_apply, "{}", command);
        }
    }

    #[test]
    fn set_brightness_byte_image_and_persistence() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let output = run("brightness", &["2"], &store);

        assert_eq!(output.messages.len(), 2);
        assert_eq!(
            &output.messages[0][..],
            &[0x5a, 0xba, 0xc5, 0xc4, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(&output.messages[1][..], &MESSAGE_APPLY);
        assert!(!output.set_and_apply);
        assert_eq!(store.load(), 2);
    }

    #[test]
    fn brightness_scalar_defaults_to_zero() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let output = run("brightness", &[], &store);

        assert_eq!(output.messages[0][4], 0);
        assert_eq!(store.load(), 0);
    }

    #[test]
    fn cycle_brightness_wraps() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (current, next) in [(1, 2), (2, 3), (3, 4), (4, 1)] {
            store.save(current);
            let output = run("cycle_brightness", &[], &store);
            assert_eq!(output.messages[0][4], next);
            assert_eq!(store.load(), next);
        }
    }

    #[test]
    fn cycle_brightness_recovers_out_of_range_state() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for stale in [0, 5, 0xff] {
            store.save(stale);
            let output = run("cycle_brightness", &[], &store);
            assert_eq!(output.messages[0][4], 1);
        }
    }

    #[test]
    fn initialize_keyboard_replays_persisted_brightness() {
        let dir = TempDir::new().unwrap();

        run("brightness", &["3"], &store_in(&dir));

        // A fresh store over the same path simulates a new process.
        let output = run("initialize_keyboard", &[], &store_in(&dir));
        assert_eq!(output.messages[0][4], 3);
        assert_eq!(&output.messages[1][..], &MESSAGE_APPLY);
    }

    #[test]
    fn initialize_keyboard_without_state_uses_default() {
        let dir = TempDir::new().unwrap();
        let output = run("initialize_keyboard", &[], &store_in(&dir));
        assert_eq!(output.messages[0][4], 1);
    }

    #[test]
    fn every_command_stays_within_message_limits() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let runs = [
            ("initialize_keyboard", vec![]),
            ("brightness", vec!["1"]),
            ("cycle_brightness", vec![]),
            ("on", vec![]),
            ("off", vec![]),
            ("single_static", vec!["102030"]),
            ("single_breathing", vec!["102030", "405060"]),
            ("single_colorcycle", vec![]),
            ("multi_static", vec!["102030", "405060", "708090", "a0b0c0"]),
            ("rainbow", vec![]),
        ];

        for (command, tokens) in runs {
            let output = run(command, &tokens, &store);
            assert!(!output.messages.is_empty(), "{}", command);
            assert!(output.messages.len() <= MAX_NUM_MESSAGES, "{}", command);
            for message in &output.messages {
                assert_eq!(message.len(), MESSAGE_LENGTH, "{}", command);
            }
        }
    }

    #[test]
    fn trailer_constants_match_the_wire() {
        assert_eq!(&MESSAGE_SET[..2], &[0x5d, 0xb5]);
        assert_eq!(&MESSAGE_APPLY[..2], &[0x5d, 0xb4]);
        assert!(MESSAGE_SET[2..].iter().all(|&byte| byte == 0));
        assert!(MESSAGE_APPLY[2..].iter().all(|&byte| byte == 0));
    }
}
