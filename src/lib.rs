//! Crate for communicating with Toyota/Prius vehicles through ELM327
//! Bluetooth OBD-II (SPP) adapters
//!
//! # Usage
//! ```no_run
//! use priusscan::Session;
//!
//! fn main() -> Result<(), priusscan::Error> {
//!     let session = Session::demo();
//!     println!("{}", session.connect_blocking("DEMO")?);
//!     println!("RPM: {:?}", session.query("Engine RPM"));
//!     for code in session.read_dtcs() {
//!         println!("  - {}", code);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod dtc;

pub mod pid;

pub mod transport;

mod elm327;
pub use elm327::Elm327;

mod parse;
pub use parse::parse_payload;

mod error;
pub use error::Error;
pub use error::Result;

mod session;
pub use session::{ConnectionState, DeviceScanner, Session};
