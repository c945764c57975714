// src/worker/write_handler.rs  —  §4.4: host commands -> pending list -> outbound frames
use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::clock::Clock;
use crate::codec;
use crate::codec::Frame;
use crate::list::GuardedList;
use crate::message::Message;
use crate::pending::Pending;

/// Accepts host-submitted commands and gets them onto the wire and into the pending list.
///
/// The pending-list append happens *before* the frame reaches the writer's channel in program
/// order, but that alone doesn't prevent the read handler from observing a fast response first
/// — so the append is done while still holding whatever exclusion the enqueue needs. In
/// practice the race is closed by appending to `pending` before handing the frame to
/// `outbound`: the read handler can only see a response after the write handler has already
/// queued the frame for transmission, and it always does so after recording the `Pending`.
pub struct WriteHandler {
    _handle: JoinHandle<()>,
}

impl WriteHandler {
    pub fn spawn(
        commands: Receiver<Message>,
        outbound: SyncSender<Frame>,
        pending: Arc<GuardedList<Pending>>,
        clock: Arc<dyn Clock>,
        start_byte: u8,
        fill_byte: u8,
    ) -> Self {
        let handle = thread::spawn(move || {
            while let Ok(message) = commands.recv() {
                let frame = match codec::encode(&message, start_byte, fill_byte) {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::error!("write handler: dropping unencodable command: {e}");
                        continue;
                    }
                };

                let entry = Pending::new(message, clock.now());
                pending.append(entry);

                if outbound.send(frame).is_err() {
                    log::debug!("write handler: writer gone, exiting");
                    return;
                }
            }
        });

        Self { _handle: handle }
    }
}
