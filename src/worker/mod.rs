//! The four protocol workers that sit between the serial I/O pair and the host (§4.3-§4.6).

mod read_handler;
mod retry_handler;
mod wake_handler;
mod write_handler;

pub use read_handler::ReadHandler;
pub use retry_handler::RetryHandler;
pub use wake_handler::WakeHandler;
pub use write_handler::WriteHandler;
