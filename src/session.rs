//! Session manager
//!
//! Owns the connection state machine and the active link, and exposes the
//! operation surface the UI layer consumes: scan, connect, disconnect,
//! query, DTC read/clear, raw commands, and the live-data polling loop.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use crate::dtc::{self, TroubleCode};
#[cfg(feature = "serialport_comm")]
use crate::elm327::Elm327;
#[cfg(not(feature = "serialport_comm"))]
use crate::error::Error;
use crate::error::Result;
use crate::parse::parse_payload;
use crate::pid;
use crate::transport::DemoAdapter;
#[cfg(feature = "serialport_comm")]
use crate::transport::SppSerial;

/// Configuration commands sent after the transport opens, in order
#[cfg(feature = "serialport_comm")]
const INIT_SEQUENCE: &[&str] = &["ATZ", "ATE0", "ATL0", "ATS0", "ATH1", "ATSP0"];

/// Settle time between initialization commands
#[cfg(feature = "serialport_comm")]
const INIT_SETTLE: Duration = Duration::from_millis(150);

/// Simulated connection delay in demo mode
const DEMO_CONNECT_DELAY: Duration = Duration::from_millis(1200);

/// The entry `scan` reports when running without Bluetooth hardware
const DEMO_DEVICE: (&str, &str) = ("OBDCheck BLE (demo)", "00:11:22:33:44:55");

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Transport open and initialization in progress
    Connecting,
    /// Talking to a real adapter
    Connected,
    /// Talking to the simulated adapter
    DemoConnected,
}

/// Source of paired (name, address) pairs
///
/// Pairing and discovery live outside this crate; the platform layer hands a
/// scanner in and `Session::scan` delegates to it.
pub trait DeviceScanner: Send + Sync {
    fn paired_devices(&self) -> Vec<(String, String)>;
}

/// The one active link of a session
enum Link {
    #[cfg(feature = "serialport_comm")]
    Serial(Elm327<SppSerial>),
    Demo(DemoAdapter),
}

impl Link {
    fn exchange(&self, cmd: &str) -> String {
        match self {
            #[cfg(feature = "serialport_comm")]
            Link::Serial(device) => device.exchange(cmd),
            Link::Demo(adapter) => adapter.exchange(cmd),
        }
    }

    fn close(&self) {
        match self {
            #[cfg(feature = "serialport_comm")]
            Link::Serial(device) => device.close(),
            Link::Demo(_) => {}
        }
    }
}

struct Inner {
    state: RwLock<ConnectionState>,
    link: RwLock<Option<Arc<Link>>>,
    adapter_id: Mutex<Option<String>>,
    demo_mode: AtomicBool,
    live: AtomicBool,
    scanner: Option<Box<dyn DeviceScanner>>,
}

/// A diagnostic session over one ELM327 adapter
///
/// Cheap to clone; clones share the same connection. All operations are safe
/// to call from any thread: exchanges serialize on the framer's channel lock,
/// and operations invoked while disconnected return "no data" rather than
/// erroring, since callers may race connect/disconnect.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// A session that talks to the simulated adapter
    pub fn demo() -> Self {
        Self::build(None, true)
    }

    /// A session that scans through the given platform collaborator
    pub fn with_scanner(scanner: impl DeviceScanner + 'static) -> Self {
        Self::build(Some(Box::new(scanner)), false)
    }

    fn build(scanner: Option<Box<dyn DeviceScanner>>, demo_mode: bool) -> Self {
        Session {
            inner: Arc::new(Inner {
                state: RwLock::new(ConnectionState::Disconnected),
                link: RwLock::new(None),
                adapter_id: Mutex::new(None),
                demo_mode: AtomicBool::new(demo_mode),
                live: AtomicBool::new(false),
                scanner,
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *read_lock(&self.inner.state)
    }

    pub fn demo_mode(&self) -> bool {
        self.inner.demo_mode.load(Ordering::SeqCst)
    }

    pub fn set_demo_mode(&self, demo: bool) {
        self.inner.demo_mode.store(demo, Ordering::SeqCst);
    }

    /// Paired devices the platform knows about
    pub fn scan(&self) -> Vec<(String, String)> {
        if let Some(scanner) = &self.inner.scanner {
            return scanner.paired_devices();
        }
        if self.demo_mode() {
            return vec![(DEMO_DEVICE.0.to_string(), DEMO_DEVICE.1.to_string())];
        }
        Vec::new()
    }

    /// Connects in a background thread and reports through `callback`
    pub fn connect<F>(&self, address: &str, callback: F)
    where
        F: FnOnce(bool, String) + Send + 'static,
    {
        let session = self.clone();
        let address = address.to_string();
        thread::spawn(move || match session.connect_blocking(&address) {
            Ok(message) => callback(true, message),
            Err(e) => callback(false, e.to_string()),
        });
    }

    /// Opens the transport, runs the initialization sequence, and records the
    /// adapter identification; returns a human-readable success message
    pub fn connect_blocking(&self, address: &str) -> Result<String> {
        self.set_state(ConnectionState::Connecting);

        if self.demo_mode() {
            thread::sleep(DEMO_CONNECT_DELAY);
            let link = Arc::new(Link::Demo(DemoAdapter::new()));
            let ident = trim_response(&link.exchange("ATI"));
            *lock(&self.inner.adapter_id) = Some(ident);
            *write_lock(&self.inner.link) = Some(link);
            self.set_state(ConnectionState::DemoConnected);
            info!("connected to simulated adapter");
            return Ok("Connected to simulated adapter (demo mode)".to_string());
        }

        match self.open_hardware(address) {
            Ok(message) => Ok(message),
            Err(e) => {
                warn!("connect to {} failed: {}", address, e);
                *write_lock(&self.inner.link) = None;
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    #[cfg(feature = "serialport_comm")]
    fn open_hardware(&self, address: &str) -> Result<String> {
        let transport = SppSerial::open(address)?;
        let link = Arc::new(Link::Serial(Elm327::new(transport)));

        for cmd in INIT_SEQUENCE {
            debug!("init: {} -> {:?}", cmd, link.exchange(cmd));
            thread::sleep(INIT_SETTLE);
        }
        let ident = trim_response(&link.exchange("ATI"));
        info!("adapter identified as {:?}", ident);
        *lock(&self.inner.adapter_id) = Some(ident);

        *write_lock(&self.inner.link) = Some(link);
        self.set_state(ConnectionState::Connected);

        let name = self
            .scan()
            .into_iter()
            .find(|(_, addr)| addr == address)
            .map(|(name, _)| name)
            .unwrap_or_else(|| address.to_string());
        Ok(format!("Connected to {}", name))
    }

    #[cfg(not(feature = "serialport_comm"))]
    fn open_hardware(&self, _address: &str) -> Result<String> {
        Err(Error::TransportUnavailable)
    }

    /// Tears the connection down; safe to call repeatedly
    pub fn disconnect(&self) {
        self.stop_live();
        if let Some(link) = write_lock(&self.inner.link).take() {
            link.close();
        }
        *lock(&self.inner.adapter_id) = None;
        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// The trimmed `ATI` response recorded at connect time
    pub fn adapter_id(&self) -> Option<String> {
        lock(&self.inner.adapter_id).clone()
    }

    /// Asks the adapter which bus protocol it negotiated (`ATDP`)
    pub fn adapter_protocol(&self) -> Option<String> {
        let link = self.active_link()?;
        let response = trim_response(&link.exchange("ATDP"));
        if response.is_empty() {
            None
        } else {
            Some(response)
        }
    }

    /// Requests one registry parameter and decodes it
    ///
    /// `None` covers every failure: unknown name, not connected, timeout, or
    /// an unparseable response. A live gauge treats them all the same.
    pub fn query(&self, name: &str) -> Option<f64> {
        let spec = pid::lookup(name)?;
        let link = self.active_link()?;
        let raw = link.exchange(&spec.command());
        let data = parse_payload(&raw)?;
        Some(spec.decode.apply(&data))
    }

    /// Reads stored trouble codes (service 03)
    pub fn read_dtcs(&self) -> Vec<TroubleCode> {
        self.read_code_report("03")
    }

    /// Reads pending trouble codes (service 07)
    pub fn read_pending_dtcs(&self) -> Vec<TroubleCode> {
        self.read_code_report("07")
    }

    fn read_code_report(&self, service: &str) -> Vec<TroubleCode> {
        match self.active_link() {
            Some(link) => dtc::decode_report(&link.exchange(service)),
            None => Vec::new(),
        }
    }

    /// Erases stored codes (service 04); true when the adapter acknowledged
    pub fn clear_dtcs(&self) -> bool {
        match self.active_link() {
            Some(link) => dtc::clear_acknowledged(&link.exchange("04")),
            None => false,
        }
    }

    /// Sends an arbitrary service/identifier/data command and returns the raw
    /// response text (empty when disconnected or timed out)
    pub fn send_custom(&self, service: &str, pid: &str, data: &str) -> String {
        match self.active_link() {
            Some(link) => link.exchange(&format!("{}{}{}", service, pid, data)),
            None => String::new(),
        }
    }

    /// Starts the live polling loop over the named parameters
    ///
    /// One background thread queries each parameter per cycle and hands
    /// decoded values to `on_value`. Returns false if streaming was already
    /// active. A failed query is skipped for that cycle; the loop exits when
    /// [stop_live](Self::stop_live) is called or the session disconnects.
    pub fn start_live<F>(&self, names: &[&str], period: Duration, on_value: F) -> bool
    where
        F: Fn(&str, f64) + Send + 'static,
    {
        if self
            .inner
            .live
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let session = self.clone();
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        thread::spawn(move || {
            debug!("live loop started for {} parameters", names.len());
            while session.inner.live.load(Ordering::SeqCst) {
                if session.active_link().is_none() {
                    break;
                }
                for name in &names {
                    if !session.inner.live.load(Ordering::SeqCst) {
                        break;
                    }
                    if let Some(value) = session.query(name) {
                        on_value(name, value);
                    }
                }
                thread::sleep(period);
            }
            session.inner.live.store(false, Ordering::SeqCst);
            debug!("live loop stopped");
        });
        true
    }

    /// Signals the live loop to exit at its next check
    pub fn stop_live(&self) {
        self.inner.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        *write_lock(&self.inner.state) = state;
    }

    /// The link, provided the session is in a connected state
    fn active_link(&self) -> Option<Arc<Link>> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::DemoConnected => {
                read_lock(&self.inner.link).clone()
            }
            _ => None,
        }
    }
}

fn trim_response(raw: &str) -> String {
    raw.replace('>', " ").trim().to_string()
}

// poisoned locks only mean another thread panicked mid-update; the data is
// still a plain value, so recover instead of propagating the panic
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn demo_session() -> Session {
        let session = Session::demo();
        session
            .connect_blocking("DEMO")
            .expect("demo connect cannot fail");
        session
    }

    #[test]
    fn demo_connect_reaches_demo_connected() {
        let session = demo_session();
        assert_eq!(session.state(), ConnectionState::DemoConnected);
        assert_eq!(session.adapter_id().as_deref(), Some("ELM327 v1.5"));
        assert_eq!(
            session.adapter_protocol().as_deref(),
            Some("ISO 15765-4 (CAN 11/500)")
        );
    }

    #[test]
    fn connect_reports_through_callback() {
        let session = Session::demo();
        let (tx, rx) = mpsc::channel();
        session.connect("DEMO", move |ok, message| {
            let _ = tx.send((ok, message));
        });
        let (ok, message) = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("callback must fire");
        assert!(ok, "demo connect failed: {}", message);
        assert_eq!(session.state(), ConnectionState::DemoConnected);
    }

    #[test]
    fn queries_decode_demo_values() {
        let session = demo_session();
        let rpm = session.query("Engine RPM").expect("rpm should decode");
        assert!((0.0..=8000.0).contains(&rpm));
        let soc = session.query("HV Battery SOC").expect("soc should decode");
        assert!((0.0..=100.0).contains(&soc));
        assert_eq!(session.query("Flux Capacitor"), None);
    }

    #[test]
    fn reads_and_clears_demo_codes() {
        let session = demo_session();
        let codes: Vec<String> = session.read_dtcs().iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, vec!["P0103", "P0001", "P0A7F"]);
        let pending: Vec<String> = session
            .read_pending_dtcs()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(pending, vec!["P0136"]);
        assert!(session.clear_dtcs());
    }

    #[test]
    fn operations_while_disconnected_yield_no_data() {
        let session = Session::demo();
        assert_eq!(session.query("Engine RPM"), None);
        assert!(session.read_dtcs().is_empty());
        assert!(!session.clear_dtcs());
        assert_eq!(session.send_custom("01", "0C", ""), "");
        assert_eq!(session.adapter_protocol(), None);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let session = demo_session();
        session.disconnect();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.adapter_id(), None);
    }

    #[test]
    fn scan_in_demo_mode_lists_the_simulated_adapter() {
        let session = Session::demo();
        let devices = session.scan();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].1, "00:11:22:33:44:55");

        assert!(Session::new().scan().is_empty());
    }

    #[test]
    fn scan_delegates_to_the_platform_scanner() {
        struct FixedScanner;
        impl DeviceScanner for FixedScanner {
            fn paired_devices(&self) -> Vec<(String, String)> {
                vec![("OBDII".to_string(), "AA:BB:CC:DD:EE:FF".to_string())]
            }
        }
        let session = Session::with_scanner(FixedScanner);
        assert_eq!(session.scan()[0].0, "OBDII");
    }

    #[test]
    fn live_loop_streams_until_stopped() {
        let session = demo_session();
        let (tx, rx) = mpsc::channel();
        let started = session.start_live(
            &["Vehicle Speed", "Engine RPM"],
            Duration::from_millis(20),
            move |name, value| {
                let _ = tx.send((name.to_string(), value));
            },
        );
        assert!(started);
        assert!(!session.start_live(&[], Duration::from_millis(20), |_, _| {}));

        let (name, value) = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("live loop must produce a value");
        assert!(name == "Vehicle Speed" || name == "Engine RPM");
        assert!(value.is_finite());

        session.stop_live();
        // drain until the loop winds down
        while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}
        assert!(!session.is_live());
    }

    #[test]
    fn send_custom_concatenates_the_command() {
        let session = demo_session();
        let raw = session.send_custom("01", "0C", "");
        assert!(raw.ends_with('>'), "got {:?}", raw);
        assert!(raw.starts_with("41 0C"));
    }
}
