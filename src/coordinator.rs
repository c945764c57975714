// src/coordinator.rs  —  wires the serial pair and four workers together (§4.7)
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use serialport::SerialPort;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::device::DeviceId;
use crate::error::LlapError;
use crate::list::GuardedList;
use crate::message::Message;
use crate::pending::Pending;
use crate::serial::{Reader, Writer};
use crate::worker::{ReadHandler, RetryHandler, WakeHandler, WriteHandler};

/// Owns every shared data structure and channel endpoint the six workers need, and the
/// lifecycle of the pipeline as a whole. `Coordinator` itself is not `Clone`/shareable — a
/// running pipeline is represented to callers by the [`Handle`] it returns from `start`.
pub struct Coordinator {
    writer: Writer,
    retry_handler: RetryHandler,
    _reader: Arc<Reader>,
    _read_handler: ReadHandler,
    _write_handler: WriteHandler,
    _wake_handler: WakeHandler,
    shutdown_grace: Duration,
}

impl Coordinator {
    /// Start the pipeline on an already-open, already-configured port (baud rate, parity, flow
    /// control are a host concern — see §6 Non-goals). Uses [`SystemClock`].
    pub fn start(port: Box<dyn SerialPort>, config: EngineConfig) -> Result<Handle, LlapError> {
        Self::start_with_clock(port, config, Arc::new(SystemClock))
    }

    /// Start the pipeline with an injectable [`Clock`], for deterministic tests against
    /// [`crate::test_support::LoopbackPort`].
    pub fn start_with_clock(
        port: Box<dyn SerialPort>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Handle, LlapError> {
        let reader_port = port.try_clone().map_err(LlapError::Io)?;
        let writer_port = port;

        let (frames_tx, frames_rx) = mpsc::sync_channel(config.channel_capacity);
        let (outbound_tx, outbound_rx): (SyncSender<_>, _) =
            mpsc::sync_channel(config.channel_capacity);
        let (awake_tx, awake_rx): (Sender<DeviceId>, Receiver<DeviceId>) = mpsc::channel();
        let (events_tx, events_rx): (Sender<Message>, Receiver<Message>) = mpsc::channel();
        let (commands_tx, commands_rx): (Sender<Message>, Receiver<Message>) = mpsc::channel();
        let (fault_tx, fault_rx): (Sender<LlapError>, Receiver<LlapError>) = mpsc::channel();

        let pending: Arc<GuardedList<Pending>> = Arc::new(GuardedList::new());
        let unanswered: Arc<GuardedList<Pending>> = Arc::new(GuardedList::new());

        let reader = Arc::new(Reader::spawn(reader_port, frames_tx, fault_tx.clone()));
        let writer = Writer::spawn(
            writer_port,
            outbound_rx,
            fault_tx.clone(),
            config.shutdown_grace,
        );

        let read_handler = ReadHandler::spawn(
            frames_rx,
            outbound_tx.clone(),
            awake_tx,
            events_tx,
            Arc::clone(&pending),
            Arc::clone(&reader),
            Arc::clone(&clock),
            config.dedup_window,
            config.start_byte,
            config.fill_byte,
        );

        let write_handler = WriteHandler::spawn(
            commands_rx,
            outbound_tx.clone(),
            Arc::clone(&pending),
            Arc::clone(&clock),
            config.start_byte,
            config.fill_byte,
        );

        let retry_handler = RetryHandler::spawn(
            Arc::clone(&pending),
            Arc::clone(&unanswered),
            outbound_tx.clone(),
            Arc::clone(&clock),
            config.retry_tick,
            config.retry_interval,
            config.max_retries,
            config.start_byte,
            config.fill_byte,
        );

        let wake_handler = WakeHandler::spawn(
            awake_rx,
            Arc::clone(&unanswered),
            outbound_tx,
            config.start_byte,
            config.fill_byte,
        );

        let coordinator = Coordinator {
            writer,
            retry_handler,
            _reader: reader,
            _read_handler: read_handler,
            _write_handler: write_handler,
            _wake_handler: wake_handler,
            shutdown_grace: config.shutdown_grace,
        };

        Ok(Handle {
            coordinator,
            commands: commands_tx,
            events: events_rx,
            fault: fault_rx,
        })
    }

    /// Clears `running` for the writer and retry handler, then joins them with the configured
    /// grace period. The reader, read handler and wake handler are never joined (§4.2/§4.7) —
    /// they are abandoned when `Handle` is dropped.
    fn stop(&mut self) -> Result<(), LlapError> {
        let writer_joined = self.writer.join(self.shutdown_grace);
        let retry_joined = self.retry_handler.join(self.shutdown_grace);
        if writer_joined && retry_joined {
            Ok(())
        } else {
            Err(LlapError::ShutdownTimedOut)
        }
    }
}

/// The host-facing surface of a running pipeline.
pub struct Handle {
    coordinator: Coordinator,
    commands: Sender<Message>,
    events: Receiver<Message>,
    fault: Receiver<LlapError>,
}

impl Handle {
    /// The channel for submitting commands to transmit. Cloning the sender is the normal way
    /// to give multiple host components write access (`mpsc::Sender` is `Clone`).
    ///
    /// Submitting a message whose `requires_ack()` is `false` and which has no distinguished
    /// response (e.g. `Hello`) still records a `Pending` entry; it will be silently escalated
    /// to the unanswered list once its retries are exhausted. Only do this if that
    /// retry-then-unanswered behavior is what you want.
    pub fn commands(&self) -> Sender<Message> {
        self.commands.clone()
    }

    /// The channel of every inbound `Message`, post-dedup, in arrival order.
    pub fn events(&self) -> &Receiver<Message> {
        &self.events
    }

    /// Poll for a fault reported by the reader or writer thread, without blocking.
    pub fn take_fault(&self) -> Option<LlapError> {
        self.fault.try_recv().ok()
    }

    /// Signal shutdown and wait for the writer and retry handler to drain, up to the
    /// configured grace period.
    pub fn stop(mut self) -> Result<(), LlapError> {
        self.coordinator.stop()
    }
}
