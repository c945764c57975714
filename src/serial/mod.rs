//! The byte-oriented serial I/O pair (§4.2): one thread reads, one thread writes.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;
