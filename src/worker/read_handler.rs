// src/worker/read_handler.rs  —  §4.3: dedup, response matching, ack, publish
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::codec::{self, Frame};
use crate::device::DeviceId;
use crate::list::GuardedList;
use crate::message::{matches_response, Message};
use crate::pending::Pending;
use crate::serial::Reader;

/// Consumes decoded frames and turns them into host-visible events, ACKs, and pending-list
/// closures. Owns the short-lived retransmission-dedup buffer exclusively — no lock needed.
pub struct ReadHandler {
    _handle: JoinHandle<()>,
}

impl ReadHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        frames: Receiver<Frame>,
        outbound: SyncSender<Frame>,
        awake_tx: Sender<DeviceId>,
        events_tx: Sender<Message>,
        pending: Arc<GuardedList<Pending>>,
        reader: Arc<Reader>,
        clock: Arc<dyn Clock>,
        dedup_window: Duration,
        start_byte: u8,
        fill_byte: u8,
    ) -> Self {
        let handle = thread::spawn(move || {
            let mut retry_buffer: Vec<(Message, Instant)> = Vec::new();

            while let Ok(frame) = frames.recv() {
                let Some(message) = codec::decode(&frame, start_byte, fill_byte) else {
                    reader.request_flush();
                    continue;
                };

                if let Message::Awake(device) = message {
                    if awake_tx.send(device).is_err() {
                        log::debug!("read handler: wake handler gone, exiting");
                        return;
                    }
                }

                let now = clock.now();
                retry_buffer.retain(|(_, seen_at)| now.saturating_duration_since(*seen_at) <= dedup_window);

                if retry_buffer.iter().any(|(seen, _)| *seen == message) {
                    if message.requires_ack() {
                        send_ack(&outbound, message.device(), start_byte, fill_byte);
                    }
                    continue;
                }

                pending.remove_first_matching(|p| matches_response(&p.message, &message));

                if message.requires_ack() {
                    send_ack(&outbound, message.device(), start_byte, fill_byte);
                    retry_buffer.push((message.clone(), now));
                }

                if events_tx.send(message).is_err() {
                    log::debug!("read handler: host event receiver gone, exiting");
                    return;
                }
            }
        });

        Self { _handle: handle }
    }
}

fn send_ack(outbound: &SyncSender<Frame>, device: DeviceId, start_byte: u8, fill_byte: u8) {
    match codec::encode(&Message::Ack(device), start_byte, fill_byte) {
        Ok(frame) => {
            if outbound.send(frame).is_err() {
                log::debug!("read handler: writer gone, dropping ack for {device}");
            }
        }
        Err(e) => log::error!("read handler: failed to encode ack for {device}: {e}"),
    }
}
