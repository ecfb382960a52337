//! Command framer for ELM327-style adapters
//!
//! One exchange = write the command terminated by a carriage return, then
//! accumulate bytes until the adapter prints its `>` prompt or the deadline
//! passes. The framer owns the channel mutex: exchanges are atomic on the
//! wire, and concurrent callers queue on the lock.

use log::{trace, warn};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::transport::Transport;

/// Prompt byte the adapter emits when it is ready for the next command
const PROMPT: u8 = b'>';

/// Deadline for one full exchange, measured from the end of the write
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause between empty polls of the transport
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An ELM327 adapter behind a [Transport]
pub struct Elm327<T: Transport> {
    transport: Mutex<T>,
    timeout: Duration,
}

impl<T: Transport> Elm327<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Elm327 {
            transport: Mutex::new(transport),
            timeout,
        }
    }

    /// Sends `cmd` and returns the full response text
    ///
    /// Blocks until the prompt byte arrives or the timeout elapses; a timed
    /// out exchange returns whatever was accumulated. I/O failures are logged
    /// and surfaced as an empty string, so callers treat empty as "no
    /// answer". Carriage returns are normalized to line breaks and bytes that
    /// are not ASCII are dropped.
    pub fn exchange(&self, cmd: &str) -> String {
        let mut transport = self.lock_transport();
        trace!("exchange: sending {:?}", cmd);

        let mut framed = cmd.as_bytes().to_vec();
        framed.push(b'\r');
        if let Err(e) = transport.write_all(&framed).and_then(|_| transport.flush()) {
            warn!("exchange: write of {:?} failed: {}", cmd, e);
            return String::new();
        }

        let mut buf = Vec::new();
        let start = Instant::now();
        while start.elapsed() < self.timeout {
            match transport.read_byte() {
                Ok(Some(b)) => {
                    buf.push(b);
                    if b == PROMPT {
                        break;
                    }
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    warn!("exchange: read after {:?} failed: {}", cmd, e);
                    return String::new();
                }
            }
        }

        let text = decode_ascii(&buf);
        trace!("exchange: got {:?}", text);
        text
    }

    /// Closes the underlying transport
    pub fn close(&self) {
        self.lock_transport().close();
    }

    fn lock_transport(&self) -> MutexGuard<'_, T> {
        match self.transport.lock() {
            Ok(guard) => guard,
            // a panic mid-exchange leaves the transport usable; keep going
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn decode_ascii(buf: &[u8]) -> String {
    buf.iter()
        .filter(|b| b.is_ascii())
        .map(|&b| if b == b'\r' { '\n' } else { b as char })
        .collect()
}
