// src/serial/reader.rs  —  blocking 12-byte frame reader
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, SyncSender};
use std::sync::Arc;
use std::thread;

use serialport::{ClearBuffer, SerialPort};

use crate::codec::{Frame, FRAME_LEN};
use crate::error::LlapError;

/// Reads fixed-size 12-byte frames off the port and forwards them to the read handler.
///
/// Abandoned unconditionally on shutdown (never joined) — matches the reference's
/// `daemon = True` reader thread. A `flush` request is the only thing it ever reacts to
/// besides raw bytes: the read handler raises it after an unparseable frame so the next
/// iteration resynchronises on a clean buffer instead of limping through garbage byte-by-byte.
pub struct Reader {
    flush: Arc<AtomicBool>,
}

impl Reader {
    /// Spawn the reader thread. `port` is read exclusively by this thread from here on.
    pub fn spawn(mut port: Box<dyn SerialPort>, frames: SyncSender<Frame>, faults: Sender<LlapError>) -> Self {
        let flush = Arc::new(AtomicBool::new(false));
        let flush_flag = Arc::clone(&flush);

        thread::spawn(move || {
            let mut buf = [0u8; FRAME_LEN];
            loop {
                if flush_flag.swap(false, Ordering::AcqRel) {
                    if let Err(e) = port.clear(ClearBuffer::Input) {
                        log::warn!("reader: failed to clear input buffer: {e}");
                    }
                }

                match read_exact_frame(port.as_mut(), &mut buf) {
                    Ok(true) => {
                        if frames.send(buf).is_err() {
                            log::debug!("reader: read handler gone, exiting");
                            return;
                        }
                    }
                    Ok(false) => continue,
                    Err(e) => {
                        log::error!("reader: serial read failed, exiting: {e}");
                        let _ = faults.send(LlapError::Io(e));
                        return;
                    }
                }
            }
        });

        Self { flush }
    }

    /// Request an input-buffer flush on the next loop iteration (§4.2, §4.3 point 1).
    pub fn request_flush(&self) {
        self.flush.store(true, Ordering::Release);
    }
}

/// Fill `buf` with exactly `FRAME_LEN` bytes, looping over short reads. Returns `Ok(false)` on
/// a read timeout (no bytes yet, not an error) so the caller can re-check the flush flag.
fn read_exact_frame(port: &mut dyn SerialPort, buf: &mut [u8; FRAME_LEN]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < FRAME_LEN {
        match port.read(&mut buf[filled..]) {
            Ok(0) => return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                if filled == 0 {
                    return Ok(false);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
