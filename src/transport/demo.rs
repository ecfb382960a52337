//! Simulated ELM327 adapter for development without hardware
//!
//! Each command is answered atomically from a pure function of the command
//! string and the current wall-clock time. Live values ride slow sinusoids so
//! gauges oscillate plausibly, and every generated frame satisfies the same
//! parsing and decode contract as a real adapter's response.

use std::time::{SystemTime, UNIX_EPOCH};

const PROMPT: &str = "\r\n>";

/// A canned-response ELM327 simulator
#[derive(Debug, Default)]
pub struct DemoAdapter;

impl DemoAdapter {
    pub fn new() -> Self {
        DemoAdapter
    }

    /// Answers `cmd` as a stuck-in-the-driveway 2010 Prius would
    pub fn exchange(&self, cmd: &str) -> String {
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self::response_at(cmd, t)
    }

    /// The response for `cmd` at time `t` (seconds)
    pub fn response_at(cmd: &str, t: f64) -> String {
        let cmd = cmd.trim().to_uppercase();
        let body = match cmd.as_str() {
            "ATZ" | "ATI" => "ELM327 v1.5".to_owned(),
            "ATDP" => "ISO 15765-4 (CAN 11/500)".to_owned(),
            "ATE0" | "ATL0" | "ATS0" | "ATH1" | "ATSP0" => "OK".to_owned(),

            // one stored P0103, one P0001, one P0A7F, zero padding
            "03" => "43 01 03 00 01 0A 7F 00 00".to_owned(),
            // one pending P0136
            "07" => "47 01 36 00 00".to_owned(),
            "04" => "44".to_owned(),

            "010C" => word("41 0C", (800.0 + 1200.0 * (t * 0.3).sin().abs()) * 4.0),
            "010D" => byte("41 0D", 60.0 + 30.0 * (t * 0.1).sin()),
            "0105" => byte("41 05", 88.0 + 2.0 * (t * 0.05).sin() + 40.0),
            "0104" => byte("41 04", (30.0 + 20.0 * (t * 0.3).sin().abs()) * 255.0 / 100.0),
            "0111" => byte("41 11", (15.0 + 10.0 * (t * 0.4).sin().abs()) * 255.0 / 100.0),
            "0106" => byte("41 06", (2.3 + 1.5 * (t * 2.0).sin()) * 128.0 / 100.0 + 128.0),
            "0107" => byte("41 07", (1.6 + 0.5 * (t * 0.1).sin()) * 128.0 / 100.0 + 128.0),
            "010F" => byte("41 0F", 25.0 + 3.0 * (t * 0.07).sin() + 40.0),
            "0114" => byte("41 14", (0.45 + 0.4 * t.sin()) / 0.005) + " FF",
            "0110" => word("41 10", (5.2 + 3.0 * (t * 0.3).sin().abs()) * 100.0),
            "010E" => byte("41 0E", (10.0 + 5.0 * (t * 0.5).sin() + 64.0) * 2.0),
            "012F" => "41 2F B8".to_owned(),

            // Toyota-enhanced PIDs; multi-byte identifiers keep a two-byte
            // echo so data always starts at the third payload byte
            "2110" => byte("61 10", (55.0 + 15.0 * (t * 0.1).sin()) * 2.0),
            "22F401" => word("62 F4", (195.0 + 2.0 * (t * 0.2).sin()) * 10.0),
            "22F402" => signed_word("62 F4", 20.0 * (t * 0.3).sin() * 10.0),
            "22F403" => word("62 F4", (28.0 + 4.0 * (t * 0.04).sin() + 40.0) * 10.0),
            "22E3" => signed_word("62 E3", 1800.0 + 400.0 * (t * 0.4).sin()),
            "22E4" => signed_word("62 E4", 2500.0 + 800.0 * (t * 0.3).sin()),
            "22E5" => signed_word("62 E5", (50.0 + 20.0 * (t * 0.4).sin()) * 2.0),
            "22E6" => signed_word("62 E6", (120.0 + 40.0 * (t * 0.3).sin()) * 2.0),
            "22F405" => byte("62 F4", 45.0 + 8.0 * (t * 0.05).sin() + 40.0),
            "22F406" => byte("62 F4", (14.1 + 0.2 * (t * 0.3).sin()) * 10.0),
            "2125" => byte("61 25", (15.0 + 12.0 * (t * 0.4).sin()) * 2.0 + 128.0),
            "2161" => byte("61 61", 95.0 + 3.0 * (t * 0.03).sin() + 40.0),
            "22F407" => byte("62 F4", (1200.0 + 300.0 * (t * 0.1).sin()) / 100.0),
            "22F408" => byte("62 F4", 91.0 * 2.0),

            _ => "NO DATA".to_owned(),
        };
        body + PROMPT
    }
}

fn byte(echo: &str, value: f64) -> String {
    format!("{} {:02X}", echo, (value.max(0.0) as u32) & 0xFF)
}

fn word(echo: &str, value: f64) -> String {
    let raw = (value.max(0.0) as u32) & 0xFFFF;
    format!("{} {:02X} {:02X}", echo, raw >> 8, raw & 0xFF)
}

fn signed_word(echo: &str, value: f64) -> String {
    let raw = (value as i32 as i16) as u16;
    format!("{} {:02X} {:02X}", echo, raw >> 8, raw & 0xFF)
}
