use log::{debug, trace};
use std::io::{Read, Write};
use std::time::Duration;

use super::{Result, Transport};

pub const DEFAULT_BAUD_RATE: u32 = 38_400;
const FALLBACK_BAUD_RATE: u32 = 115_200;

/// A Bluetooth SPP adapter bound to a serial device node
///
/// /dev/rfcomm* or similar on unix-like systems, COM devices on Windows
/// systems. Opening tries two strategies in order: a fully configured 8N1
/// port at the ELM327 default baud rate, then a plain open at the rate used
/// by reflashed adapters. First success wins.
pub struct SppSerial {
    device: Box<dyn serialport::SerialPort>,
}

impl SppSerial {
    /// Opens the serial device behind `path`
    pub fn open(path: &str) -> Result<Self> {
        let device = match Self::open_configured(path) {
            Ok(device) => device,
            Err(first) => {
                debug!(
                    "open: configured open of {} failed ({}), trying plain open",
                    path, first
                );
                Self::open_plain(path).map_err(|_| first)?
            }
        };
        Ok(Self { device })
    }

    fn open_configured(path: &str) -> serialport::Result<Box<dyn serialport::SerialPort>> {
        serialport::new(path, DEFAULT_BAUD_RATE)
            .timeout(Duration::from_millis(10))
            .parity(serialport::Parity::None)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .open()
    }

    fn open_plain(path: &str) -> serialport::Result<Box<dyn serialport::SerialPort>> {
        serialport::new(path, FALLBACK_BAUD_RATE)
            .timeout(Duration::from_millis(10))
            .open()
    }
}

impl Transport for SppSerial {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        Ok(self.device.write_all(data)?)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.device.bytes_to_read()? == 0 {
            return Ok(None);
        }
        let mut buf = [0u8; 1];
        match self.device.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => {
                trace!("read_byte: got {:#04x}", buf[0]);
                Ok(Some(buf[0]))
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.device.flush()?)
    }

    fn close(&mut self) {
        let _ = self.device.clear(serialport::ClearBuffer::All);
    }
}
