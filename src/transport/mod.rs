//! Byte transports the ELM327 framer can drive
//!
//! The hardware transport wraps a serial-style duplex stream (a Bluetooth SPP
//! adapter shows up as an rfcomm tty). The demo transport answers commands
//! itself and never touches hardware.

mod demo;
pub use demo::DemoAdapter;

#[cfg(feature = "serialport_comm")]
mod serial;
#[cfg(feature = "serialport_comm")]
pub use serial::SppSerial;

pub type Result<T> = std::result::Result<T, Error>;

/// A duplex byte channel to an ELM327 adapter
///
/// Reads are polling and non-blocking: no data pending is `Ok(None)`, not an
/// error. The framer owns pacing and timeouts.
pub trait Transport: Send {
    fn write_all(&mut self, data: &[u8]) -> Result<()>;
    fn read_byte(&mut self) -> Result<Option<u8>>;
    fn flush(&mut self) -> Result<()>;
    fn close(&mut self) {}
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(feature = "serialport_comm")]
    #[error("Serial port error: `{0:?}`")]
    Serial(#[from] serialport::Error),
    #[error("IO error: `{0:?}`")]
    IO(#[from] std::io::Error),
}
