// src/worker/retry_handler.rs  —  §4.5: periodic pending-list scan, retransmit or escalate
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::codec::{self, Frame};
use crate::list::GuardedList;
use crate::pending::Pending;

/// Scans the pending list every `tick` and either retransmits a stale command or, once it has
/// been retried `max_retries` times, moves it to the unanswered list for the wake handler.
pub struct RetryHandler {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl RetryHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        pending: Arc<GuardedList<Pending>>,
        unanswered: Arc<GuardedList<Pending>>,
        outbound: SyncSender<Frame>,
        clock: Arc<dyn Clock>,
        tick: Duration,
        retry_interval: Duration,
        max_retries: u32,
        start_byte: u8,
        fill_byte: u8,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while running_flag.load(Ordering::Acquire) {
                let now = clock.now();
                let mut retransmits = Vec::new();
                let mut escalated = Vec::new();

                pending.with_lock(|list| {
                    // Collect indices to remove and process back-to-front so earlier indices
                    // stay valid, matching the reference's deferred-removal scan.
                    let mut to_remove = Vec::new();
                    for (idx, entry) in list.iter_mut().enumerate() {
                        if entry.retries >= max_retries {
                            to_remove.push(idx);
                        } else if entry.age(now) >= retry_interval {
                            entry.retransmitted(now);
                            retransmits.push(entry.message.clone());
                        }
                    }
                    for idx in to_remove.into_iter().rev() {
                        escalated.push(list.remove(idx));
                    }
                });

                for message in retransmits {
                    match codec::encode(&message, start_byte, fill_byte) {
                        Ok(frame) => {
                            if outbound.send(frame).is_err() {
                                log::debug!("retry handler: writer gone, exiting");
                                return;
                            }
                        }
                        Err(e) => log::error!("retry handler: failed to re-encode {message:?}: {e}"),
                    }
                }

                for entry in escalated {
                    log::warn!(
                        "retry handler: {} exhausted retries, moving to unanswered",
                        entry.message.device()
                    );
                    unanswered.append(entry);
                }

                thread::sleep(tick);
            }
        });

        Self {
            handle: Some(handle),
            running,
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn join(&mut self, grace: Duration) -> bool {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + grace;
            while Instant::now() < deadline {
                if handle.is_finished() {
                    let _ = handle.join();
                    return true;
                }
                thread::sleep(Duration::from_millis(5));
            }
            false
        } else {
            true
        }
    }
}
