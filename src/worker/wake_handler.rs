// src/worker/wake_handler.rs  —  §4.6: flush queued unanswered messages on device wake
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::codec::{self, Frame};
use crate::list::GuardedList;
use crate::pending::Pending;

/// On each `Awake(device)`, drains every queued `unanswered` entry for that device and
/// retransmits it, in original insertion order. Not re-added to pending — this is best-effort
/// delivery inside the wake window; a caller that needs a response must resubmit.
pub struct WakeHandler {
    _handle: JoinHandle<()>,
}

impl WakeHandler {
    pub fn spawn(
        awake: Receiver<crate::device::DeviceId>,
        unanswered: Arc<GuardedList<Pending>>,
        outbound: SyncSender<Frame>,
        start_byte: u8,
        fill_byte: u8,
    ) -> Self {
        let handle = thread::spawn(move || {
            while let Ok(device) = awake.recv() {
                let drained = unanswered.drain_matching(|p| p.message.device() == device);
                for entry in drained {
                    match codec::encode(&entry.message, start_byte, fill_byte) {
                        Ok(frame) => {
                            if outbound.send(frame).is_err() {
                                log::debug!("wake handler: writer gone, exiting");
                                return;
                            }
                        }
                        Err(e) => {
                            log::error!("wake handler: failed to re-encode {:?}: {e}", entry.message)
                        }
                    }
                }
            }
        });

        Self { _handle: handle }
    }
}
