//! The semantic content of one LLAP frame.

use crate::device::DeviceId;

/// Which physical input on a two-paddle button fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonInput {
    A,
    B,
}

/// One decoded (or to-be-encoded) LLAP message.
///
/// `Message` is intentionally free of mutable tracking state (timestamps, retry counts) —
/// those only matter for outbound commands and live on `Pending` instead, so a `Message` stays
/// a plain value usable for dedup/response-matching comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Ack(DeviceId),
    Awake(DeviceId),
    Battery(DeviceId, Option<String>),
    BatteryLow(DeviceId),
    FirmwareVersion(DeviceId, Option<String>),
    ProtocolVersion(DeviceId, Option<String>),
    Hello(DeviceId),
    Reboot(DeviceId),
    Sleep(DeviceId),
    Sleeping(DeviceId),
    Started(DeviceId),
    Wake(DeviceId),
    WakeCount(DeviceId, u16),
    ButtonPress(DeviceId, String, ButtonInput),
    ButtonDoor(DeviceId, String, ButtonInput, bool),
    ButtonSwitch(DeviceId, String, bool),
    Opaque(DeviceId, String),
}

impl Message {
    pub fn device(&self) -> DeviceId {
        match self {
            Message::Ack(d)
            | Message::Awake(d)
            | Message::Battery(d, _)
            | Message::BatteryLow(d)
            | Message::FirmwareVersion(d, _)
            | Message::ProtocolVersion(d, _)
            | Message::Hello(d)
            | Message::Reboot(d)
            | Message::Sleep(d)
            | Message::Sleeping(d)
            | Message::Started(d)
            | Message::Wake(d)
            | Message::WakeCount(d, _)
            | Message::ButtonPress(d, _, _)
            | Message::ButtonDoor(d, _, _, _)
            | Message::ButtonSwitch(d, _, _)
            | Message::Opaque(d, _) => *d,
        }
    }

    /// Whether an inbound message of this shape must be acknowledged with an `Ack`.
    ///
    /// This is a pure function of the variant (§4.1 table), not a stored field — it applies
    /// equally whether the `Message` was just decoded off the wire or is about to be sent.
    pub fn requires_ack(&self) -> bool {
        match self {
            Message::Ack(_)
            | Message::Awake(_)
            | Message::Battery(_, _)
            | Message::FirmwareVersion(_, _)
            | Message::ProtocolVersion(_, _)
            | Message::Hello(_)
            | Message::Reboot(_)
            | Message::Sleeping(_)
            | Message::Wake(_)
            | Message::WakeCount(_, _) => false,
            Message::BatteryLow(_)
            | Message::Sleep(_)
            | Message::Started(_)
            | Message::ButtonPress(_, _, _)
            | Message::ButtonDoor(_, _, _, _)
            | Message::ButtonSwitch(_, _, _)
            | Message::Opaque(_, _) => true,
        }
    }

    /// The body of the frame this message encodes to, without the start sentinel, device or
    /// fill padding. Used both by the codec and by dedup/equality reasoning.
    pub(crate) fn body(&self) -> String {
        match self {
            Message::Ack(_) => "ACK".to_string(),
            Message::Awake(_) => "AWAKE".to_string(),
            Message::Battery(_, v) => match v {
                Some(v) => format!("BATT{v}"),
                None => "BATT".to_string(),
            },
            Message::BatteryLow(_) => "BATTLOW".to_string(),
            Message::FirmwareVersion(_, v) => match v {
                Some(v) => format!("FVER{v}"),
                None => "FVER".to_string(),
            },
            Message::ProtocolVersion(_, v) => match v {
                Some(v) => format!("APVER{v}"),
                None => "APVER".to_string(),
            },
            Message::Hello(_) => "HELLO".to_string(),
            Message::Reboot(_) => "REBOOT".to_string(),
            Message::Sleep(_) => "SLEEP".to_string(),
            Message::Sleeping(_) => "SLEEPING".to_string(),
            Message::Started(_) => "STARTED".to_string(),
            Message::Wake(_) => "WAKE".to_string(),
            Message::WakeCount(_, count) => format!("WAKEC{count:03}"),
            Message::ButtonPress(_, label, input) => format!("{label}{}", input_char(*input)),
            Message::ButtonDoor(_, label, input, state) => {
                format!("{label}{}{}", input_char(*input), on_off(*state))
            }
            Message::ButtonSwitch(_, label, state) => format!("{label}{}", on_off(*state)),
            Message::Opaque(_, body) => body.clone(),
        }
    }
}

fn input_char(input: ButtonInput) -> &'static str {
    match input {
        ButtonInput::A => "A",
        ButtonInput::B => "B",
    }
}

fn on_off(state: bool) -> &'static str {
    if state {
        "ON"
    } else {
        "OFF"
    }
}

/// Whether `inbound` is the designated response to the previously-sent `pending` message
/// (§4.3). This replaces the reference implementation's per-class `is_response` method with a
/// single exhaustive match so the matching rule is visible in one place.
///
/// Priority, highest first:
/// 1. A pending message with its own distinguished-response rule (`Sleep` -> `Sleeping`, or a
///    bodiless `Battery`/`FirmwareVersion`/`ProtocolVersion` query) is closed ONLY by that
///    rule — a generic `Ack` arriving first (e.g. the device's transport-level
///    acknowledgement of the command itself) must not prematurely close it.
/// 2. Otherwise, since an `Ack` frame carries no information about which command it
///    acknowledges beyond the device id, any inbound `Ack` closes any remaining pending entry
///    for that device (this is what lets a plain `Reboot`, which has no override, be cleared
///    by the device's bare `ACK`).
/// 3. Otherwise, fall back to full structural equality of `(variant, device, body)`.
pub fn matches_response(pending: &Message, inbound: &Message) -> bool {
    if pending.device() != inbound.device() {
        return false;
    }

    match pending {
        Message::Sleep(_) => return matches!(inbound, Message::Sleeping(_)),
        Message::Battery(_, None) => return matches!(inbound, Message::Battery(_, _)),
        Message::FirmwareVersion(_, None) => {
            return matches!(inbound, Message::FirmwareVersion(_, _))
        }
        Message::ProtocolVersion(_, None) => {
            return matches!(inbound, Message::ProtocolVersion(_, _))
        }
        _ => {}
    }

    if matches!(inbound, Message::Ack(_)) {
        return true;
    }

    pending == inbound
}
