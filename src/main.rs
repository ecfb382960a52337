use std::sync::mpsc;
use std::time::Duration;

use priusscan::{pid, Session};

fn main() {
    env_logger::init();
    let session = Session::demo();

    let (tx, rx) = mpsc::channel();
    session.connect("DEMO", move |ok, message| {
        let _ = tx.send((ok, message));
    });
    let (ok, message) = rx.recv().expect("connect callback");
    println!("{}", message);
    if !ok {
        return;
    }

    println!("Adapter: {:?}", session.adapter_id());
    println!("Protocol: {:?}", session.adapter_protocol());

    println!("\nLive data:");
    for spec in pid::all() {
        if let Some(value) = session.query(spec.name) {
            println!("  {:<20} {:8.2} {}", spec.name, value, spec.unit);
        }
    }

    println!("\nStored trouble codes:");
    for code in session.read_dtcs() {
        println!("  {}  {}", code, code.describe().unwrap_or("(no description)"));
    }
    println!("Pending trouble codes:");
    for code in session.read_pending_dtcs() {
        println!("  {}  {}", code, code.describe().unwrap_or("(no description)"));
    }
    println!("Clear acknowledged: {}", session.clear_dtcs());

    println!("\nStreaming for two seconds:");
    session.start_live(
        &["Engine RPM", "Vehicle Speed", "HV Battery SOC"],
        Duration::from_millis(250),
        |name, value| println!("  {:<16} {:8.2}", name, value),
    );
    std::thread::sleep(Duration::from_secs(2));
    session.stop_live();
    session.disconnect();
}
