//! Encode/decode between `Message` and the fixed 12-byte LLAP wire frame (§4.1).

use crate::device::DeviceId;
use crate::error::LlapError;
use crate::message::{ButtonInput, Message};

/// Length of an LLAP frame on the wire.
pub const FRAME_LEN: usize = 12;

/// Default start-of-frame sentinel byte.
pub const DEFAULT_START: u8 = b'a';

/// Default right-pad fill byte.
pub const DEFAULT_FILL: u8 = b'-';

/// A fully-encoded 12-byte LLAP frame.
pub type Frame = [u8; FRAME_LEN];

/// Encode `message` into a 12-byte frame using `start` and `fill`.
///
/// Fails with [`LlapError::FrameTooLong`] if the device + body prefix would not fit in
/// [`FRAME_LEN`] bytes (only reachable with pathologically long button labels, since
/// `DeviceId` already guarantees a 2-byte device field).
pub fn encode(message: &Message, start: u8, fill: u8) -> Result<Frame, LlapError> {
    let device = message.device();
    let body = message.body();

    let mut out = [fill; FRAME_LEN];
    out[0] = start;
    let device_bytes = device.as_bytes();
    out[1] = device_bytes[0];
    out[2] = device_bytes[1];

    let body_bytes = body.as_bytes();
    if 3 + body_bytes.len() > FRAME_LEN {
        return Err(LlapError::FrameTooLong {
            device: device.to_string(),
            body,
        });
    }
    out[3..3 + body_bytes.len()].copy_from_slice(body_bytes);
    Ok(out)
}

/// Decode a raw frame into a [`Message`]. Returns `None` if `raw` is not a well-formed LLAP
/// frame (wrong length, wrong start sentinel, non-ASCII, or an unparseable device id) — per
/// §7 this is the "frame malformed" case, which the caller handles by requesting a reader
/// flush, not by propagating an error.
pub fn decode(raw: &[u8], start: u8, fill: u8) -> Option<Message> {
    if raw.len() != FRAME_LEN || raw[0] != start {
        return None;
    }
    if !raw.is_ascii() {
        return None;
    }

    let device = DeviceId::new([raw[1], raw[2]])?;
    let body_raw = &raw[3..FRAME_LEN];
    let fill_start = body_raw
        .iter()
        .rposition(|&b| b != fill)
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let body = std::str::from_utf8(&body_raw[..fill_start]).ok()?;

    Some(classify(device, body))
}

/// Classify a decoded (device, body) pair into a [`Message`] variant.
///
/// Pattern order is significant (§4.1): button patterns are tested most-specific-first
/// (`ButtonDoor` > `ButtonSwitch` > `ButtonPress`), reversing the REDESIGN FLAG'd ordering bug
/// in the reference implementation.
fn classify(device: DeviceId, body: &str) -> Message {
    if body == "ACK" {
        return Message::Ack(device);
    }
    if body == "AWAKE" {
        return Message::Awake(device);
    }
    if let Some(rest) = body.strip_prefix("BATT") {
        if rest.is_empty() {
            return Message::Battery(device, None);
        }
        if rest == "LOW" {
            return Message::BatteryLow(device);
        }
        if is_voltage(rest) {
            return Message::Battery(device, Some(rest.to_string()));
        }
    }
    if let Some(rest) = body.strip_prefix("FVER") {
        if rest.is_empty() {
            return Message::FirmwareVersion(device, None);
        }
        if is_firmware_version(rest) {
            return Message::FirmwareVersion(device, Some(rest.to_string()));
        }
    }
    if body == "HELLO" {
        return Message::Hello(device);
    }
    if let Some(rest) = body.strip_prefix("APVER") {
        if rest.is_empty() {
            return Message::ProtocolVersion(device, None);
        }
        if is_protocol_version(rest) {
            return Message::ProtocolVersion(device, Some(rest.to_string()));
        }
    }
    if body == "REBOOT" {
        return Message::Reboot(device);
    }
    if body == "SLEEP" {
        return Message::Sleep(device);
    }
    if body == "SLEEPING" {
        return Message::Sleeping(device);
    }
    if body == "STARTED" {
        return Message::Started(device);
    }
    if body == "WAKE" {
        return Message::Wake(device);
    }
    // Button-pattern matching, most specific first: ButtonDoor > ButtonSwitch > ButtonPress.
    if let Some((label, input, state)) = match_button_door(body) {
        return Message::ButtonDoor(device, label.to_string(), input, state);
    }
    if let Some((label, state)) = match_button_switch(body) {
        return Message::ButtonSwitch(device, label.to_string(), state);
    }
    if let Some((label, input)) = match_button_press(body) {
        return Message::ButtonPress(device, label.to_string(), input);
    }

    Message::Opaque(device, body.to_string())
}

fn is_voltage(s: &str) -> bool {
    // d.dd
    let bytes = s.as_bytes();
    bytes.len() == 4
        && bytes[0].is_ascii_digit()
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit()
        && bytes[3].is_ascii_digit()
}

fn is_firmware_version(s: &str) -> bool {
    // d.ddC  (C = any single trailing character)
    let bytes = s.as_bytes();
    bytes.len() == 5
        && bytes[0].is_ascii_digit()
        && bytes[1] == b'.'
        && bytes[2].is_ascii_digit()
        && bytes[3].is_ascii_digit()
}

fn is_protocol_version(s: &str) -> bool {
    // d.dd or d.d
    let bytes = s.as_bytes();
    (bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit())
        || (bytes.len() == 4
            && bytes[0].is_ascii_digit()
            && bytes[1] == b'.'
            && bytes[2].is_ascii_digit()
            && bytes[3].is_ascii_digit())
}

fn input_from_char(c: u8) -> Option<ButtonInput> {
    match c {
        b'A' => Some(ButtonInput::A),
        b'B' => Some(ButtonInput::B),
        _ => None,
    }
}

fn match_button_door(body: &str) -> Option<(&str, ButtonInput, bool)> {
    let bytes = body.as_bytes();
    for (suffix, state) in [("ON", true), ("OFF", false)] {
        if let Some(rest) = body.strip_suffix(suffix) {
            if let Some(&input_byte) = rest.as_bytes().last() {
                if let Some(input) = input_from_char(input_byte) {
                    let label_len = rest.len() - 1;
                    return Some((&body[..label_len], input, state));
                }
            }
        }
    }
    let _ = bytes;
    None
}

fn match_button_switch(body: &str) -> Option<(&str, bool)> {
    for (suffix, state) in [("ON", true), ("OFF", false)] {
        if let Some(label) = body.strip_suffix(suffix) {
            return Some((label, state));
        }
    }
    None
}

fn match_button_press(body: &str) -> Option<(&str, ButtonInput)> {
    let (label, last) = body.split_at(body.len().saturating_sub(1));
    let input = input_from_char(*last.as_bytes().first()?)?;
    Some((label, input))
}
