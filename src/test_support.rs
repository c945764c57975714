//! An in-memory stand-in for [`serialport::SerialPort`], so the pipeline can be driven in
//! tests without real hardware.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

#[derive(Default)]
struct Shared {
    /// Bytes queued for the reader to hand to the read handler — push with
    /// [`LoopbackPort::push_inbound`] to simulate a device transmission.
    to_host: VecDeque<u8>,
    /// Every byte the writer has written — inspect with [`LoopbackPort::take_written`] to
    /// assert on outbound traffic.
    written: Vec<u8>,
}

/// A loopback serial port backed by two plain queues instead of a real UART.
///
/// `Coordinator::start` calls `try_clone()` once (one handle for the reader thread, one for
/// the writer thread); both clones share the same [`Shared`] state, so writes performed by one
/// clone are visible to `take_written` called on any other. `LoopbackPort` itself is also
/// `Clone` (unlike a real `SerialPort`) so integration tests can keep a typed probe handle
/// after moving the original into `Coordinator::start`.
#[derive(Clone)]
pub struct LoopbackPort {
    shared: Arc<Mutex<Shared>>,
    timeout: Duration,
}

impl LoopbackPort {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            timeout: Duration::from_millis(50),
        }
    }

    /// Queue bytes as if a device had just transmitted them; the reader thread will pick them
    /// up on its next poll.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.shared.lock().unwrap().to_host.extend(bytes);
    }

    /// Drain and return every byte written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.shared.lock().unwrap().written)
    }
}

impl Default for LoopbackPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for LoopbackPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut shared = self.shared.lock().unwrap();
        if shared.to_host.is_empty() {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        }
        let n = buf.len().min(shared.to_host.len());
        for slot in buf.iter_mut().take(n) {
            *slot = shared.to_host.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for LoopbackPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.shared.lock().unwrap().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialPort for LoopbackPort {
    fn name(&self) -> Option<String> {
        Some("loopback".to_string())
    }

    fn baud_rate(&self) -> serialport::Result<u32> {
        Ok(9600)
    }

    fn data_bits(&self) -> serialport::Result<DataBits> {
        Ok(DataBits::Eight)
    }

    fn flow_control(&self) -> serialport::Result<FlowControl> {
        Ok(FlowControl::None)
    }

    fn parity(&self) -> serialport::Result<Parity> {
        Ok(Parity::None)
    }

    fn stop_bits(&self) -> serialport::Result<StopBits> {
        Ok(StopBits::One)
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_baud_rate(&mut self, _baud_rate: u32) -> serialport::Result<()> {
        Ok(())
    }

    fn set_data_bits(&mut self, _data_bits: DataBits) -> serialport::Result<()> {
        Ok(())
    }

    fn set_flow_control(&mut self, _flow_control: FlowControl) -> serialport::Result<()> {
        Ok(())
    }

    fn set_parity(&mut self, _parity: Parity) -> serialport::Result<()> {
        Ok(())
    }

    fn set_stop_bits(&mut self, _stop_bits: StopBits) -> serialport::Result<()> {
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> serialport::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn write_request_to_send(&mut self, _level: bool) -> serialport::Result<()> {
        Ok(())
    }

    fn write_data_terminal_ready(&mut self, _level: bool) -> serialport::Result<()> {
        Ok(())
    }

    fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
        Ok(true)
    }

    fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
        Ok(true)
    }

    fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
        Ok(false)
    }

    fn bytes_to_read(&self) -> serialport::Result<u32> {
        Ok(self.shared.lock().unwrap().to_host.len() as u32)
    }

    fn bytes_to_write(&self) -> serialport::Result<u32> {
        Ok(0)
    }

    fn clear(&self, buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
        let mut shared = self.shared.lock().unwrap();
        match buffer_to_clear {
            ClearBuffer::Input => shared.to_host.clear(),
            ClearBuffer::Output => shared.written.clear(),
            ClearBuffer::All => {
                shared.to_host.clear();
                shared.written.clear();
            }
        }
        Ok(())
    }

    fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
        Ok(Box::new(LoopbackPort {
            shared: Arc::clone(&self.shared),
            timeout: self.timeout,
        }))
    }

    fn set_break(&self) -> serialport::Result<()> {
        Ok(())
    }

    fn clear_break(&self) -> serialport::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_bytes_are_visible_through_a_clone() {
        let port = LoopbackPort::new();
        let mut clone = port.try_clone().unwrap();
        clone.write_all(b"hello").unwrap();
        assert_eq!(port.take_written(), b"hello");
    }

    #[test]
    fn read_times_out_when_nothing_queued() {
        let mut port = LoopbackPort::new();
        let mut buf = [0u8; 4];
        let err = port.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn pushed_inbound_bytes_are_readable() {
        let mut port = LoopbackPort::new();
        port.push_inbound(b"aABACK------");
        let mut buf = [0u8; 12];
        let n = port.read(&mut buf).unwrap();
        assert_eq!(n, 12);
        assert_eq!(&buf, b"aABACK------");
    }
}
