//! Host-side protocol engine for LLAP (Lightweight Local Automation Protocol) radio devices.
//!
//! A host application opens a [`serialport::SerialPort`], hands it to
//! [`Coordinator::start`], and from then on talks to the device network purely in terms of
//! [`Message`] values: send commands on [`Handle::commands`], receive decoded inbound frames
//! from [`Handle::events`]. Retransmission, duplicate suppression, and the wake-window replay
//! of commands to sleeping devices are handled internally.

pub mod clock;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod list;
pub mod message;
pub mod pending;
pub mod serial;
pub mod test_support;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use codec::{decode, encode, Frame, FRAME_LEN};
pub use config::EngineConfig;
pub use coordinator::{Coordinator, Handle};
pub use device::DeviceId;
pub use error::LlapError;
pub use message::{matches_response, ButtonInput, Message};
pub use pending::Pending;
