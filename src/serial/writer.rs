// src/serial/writer.rs  —  outbound frame writer
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::codec::Frame;
use crate::error::LlapError;

/// Writes encoded frames to the port in the order they arrive on the outbound channel.
///
/// Unlike the reader, the writer is joined on shutdown with a bounded grace period (§4.2) so
/// commands already accepted from the host are not silently lost mid-drain.
pub struct Writer {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl Writer {
    pub fn spawn(
        mut port: Box<dyn SerialPort>,
        frames: Receiver<Frame>,
        faults: Sender<LlapError>,
        drain_grace: Duration,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while running_flag.load(Ordering::Acquire) {
                match frames.recv_timeout(Duration::from_millis(100)) {
                    Ok(frame) => {
                        if let Err(e) = port.write_all(&frame) {
                            log::error!("writer: serial write failed, exiting: {e}");
                            let _ = faults.send(LlapError::Io(e));
                            return;
                        }
                    }
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                        log::debug!("writer: outbound channel closed, exiting");
                        return;
                    }
                }
            }

            // Drain whatever is already queued, up to the grace period, then stop.
            let deadline = Instant::now() + drain_grace;
            while Instant::now() < deadline {
                match frames.try_recv() {
                    Ok(frame) => {
                        if let Err(e) = port.write_all(&frame) {
                            log::error!("writer: serial write failed during drain: {e}");
                            let _ = faults.send(LlapError::Io(e));
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            handle: Some(handle),
            running,
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
    }

    /// Join the writer thread, waiting up to `grace` beyond what [`Writer::stop`] already
    /// allotted internally. Returns `false` if it did not finish in time.
    pub fn join(&mut self, grace: Duration) -> bool {
        self.stop();
        if let Some(handle) = self.handle.take() {
            join_with_timeout(handle, grace)
        } else {
            true
        }
    }
}

/// `JoinHandle` has no built-in timeout; poll `is_finished` instead of blocking forever.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if handle.is_finished() {
            let _ = handle.join();
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}
