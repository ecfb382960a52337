//! Parameter registry
//!
//! Maps human parameter names to the (service, PID) pair to request and the
//! formula that turns the payload bytes into a physical value. The tables are
//! fixed at compile time; `service` and `pid` are the ASCII hex fragments
//! concatenated into the wire command (`"01"` + `"0C"` -> `010C`).
//!
//! Formula byte indices count from the start of the payload: bytes 0 and 1
//! are the echoed mode/PID header, data starts at byte 2.

/// Decode formula attached to a parameter
///
/// Every variant is total over the payload: bytes past the end of a short
/// response read as zero, so a truncated frame degrades to a defined value
/// instead of an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decode {
    /// `((B2 * 256) + B3) / 4` — engine speed
    Rpm,
    /// `B2` taken directly
    ByteValue,
    /// `B2 - 40` — one-byte temperature in degrees C
    Temp,
    /// `((B2 * 256) + B3) * 0.1 - 40` — two-byte temperature
    Temp16,
    /// `B2 * 100 / 255`
    Percent,
    /// `(B2 - 128) * 100 / 128` — fuel trim
    FuelTrim,
    /// `B2 * 0.005` — oxygen sensor voltage
    O2Voltage,
    /// `((B2 * 256) + B3) / 100` — mass air flow in g/s
    MassAirFlow,
    /// `B2 / 2 - 64` — ignition timing advance
    Timing,
    /// `B2 * factor` — scaled single byte (SOC/SOH 0.5, fan speed 100, ...)
    Scaled(f64),
    /// `((B2 * 256) + B3) * factor` — unsigned big-endian word
    Word(f64),
    /// two's-complement 16-bit big-endian of B2:B3, times `factor`
    SignedWord(f64),
    /// `(B2 - 128) * factor` — offset-binary single byte (VVT advance)
    Offset128(f64),
}

impl Decode {
    /// Applies the formula to a payload; never fails
    pub fn apply(&self, data: &[u8]) -> f64 {
        let a = byte_at(data, 2);
        let b = byte_at(data, 3);
        match self {
            Decode::Rpm => (a * 256.0 + b) / 4.0,
            Decode::ByteValue => a,
            Decode::Temp => a - 40.0,
            Decode::Temp16 => (a * 256.0 + b) * 0.1 - 40.0,
            Decode::Percent => a * 100.0 / 255.0,
            Decode::FuelTrim => (a - 128.0) * 100.0 / 128.0,
            Decode::O2Voltage => a * 0.005,
            Decode::MassAirFlow => (a * 256.0 + b) / 100.0,
            Decode::Timing => a / 2.0 - 64.0,
            Decode::Scaled(factor) => a * factor,
            Decode::Word(factor) => (a * 256.0 + b) * factor,
            Decode::SignedWord(factor) => {
                let hi = data.get(2).copied().unwrap_or(0);
                let lo = data.get(3).copied().unwrap_or(0);
                f64::from(i16::from_be_bytes([hi, lo])) * factor
            }
            Decode::Offset128(factor) => (a - 128.0) * factor,
        }
    }
}

fn byte_at(data: &[u8], index: usize) -> f64 {
    data.get(index).copied().unwrap_or(0).into()
}

/// One entry of the parameter registry
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    /// Unique display name, also the lookup key
    pub name: &'static str,
    /// OBD service/mode as two ASCII hex chars
    pub service: &'static str,
    /// Parameter identifier, 2-6 ASCII hex chars
    pub pid: &'static str,
    pub unit: &'static str,
    pub decode: Decode,
    /// Advisory gauge range; decoded values are not clamped to it
    pub range: (f64, f64),
}

impl ParameterSpec {
    /// The wire command requesting this parameter
    pub fn command(&self) -> String {
        format!("{}{}", self.service, self.pid)
    }
}

/// Standard SAE J1979 service 01 parameters
pub const STANDARD: &[ParameterSpec] = &[
    p("Engine RPM", "01", "0C", "rpm", Decode::Rpm, 0.0, 8000.0),
    p("Vehicle Speed", "01", "0D", "km/h", Decode::ByteValue, 0.0, 250.0),
    p("Coolant Temp", "01", "05", "°C", Decode::Temp, -40.0, 215.0),
    p("Intake Air Temp", "01", "0F", "°C", Decode::Temp, -40.0, 215.0),
    p("Throttle Position", "01", "11", "%", Decode::Percent, 0.0, 100.0),
    p("Engine Load", "01", "04", "%", Decode::Percent, 0.0, 100.0),
    p("Short Fuel Trim B1", "01", "06", "%", Decode::FuelTrim, -100.0, 99.0),
    p("Long Fuel Trim B1", "01", "07", "%", Decode::FuelTrim, -100.0, 99.0),
    p("O2 Sensor B1S1", "01", "14", "V", Decode::O2Voltage, 0.0, 1.275),
    p("MAF Air Flow", "01", "10", "g/s", Decode::MassAirFlow, 0.0, 655.0),
    p("Ignition Timing", "01", "0E", "°", Decode::Timing, -64.0, 63.5),
    p("Fuel Level", "01", "2F", "%", Decode::Percent, 0.0, 100.0),
];

/// Toyota/Prius enhanced parameters (services 21 and 22)
pub const HYBRID: &[ParameterSpec] = &[
    p("HV Battery SOC", "21", "10", "%", Decode::Scaled(0.5), 0.0, 100.0),
    p("HV Battery Voltage", "22", "F401", "V", Decode::Word(0.1), 0.0, 300.0),
    p("HV Battery Current", "22", "F402", "A", Decode::SignedWord(0.1), -200.0, 200.0),
    p("HV Battery Temp", "22", "F403", "°C", Decode::Temp16, -40.0, 80.0),
    p("MG1 Speed", "22", "E3", "rpm", Decode::SignedWord(1.0), -10000.0, 10000.0),
    p("MG2 Speed", "22", "E4", "rpm", Decode::SignedWord(1.0), -10000.0, 10000.0),
    p("MG1 Torque", "22", "E5", "Nm", Decode::SignedWord(0.5), -200.0, 200.0),
    p("MG2 Torque", "22", "E6", "Nm", Decode::SignedWord(0.5), -200.0, 200.0),
    p("Inverter Temp", "22", "F405", "°C", Decode::Temp, -40.0, 200.0),
    p("DC-DC Output", "22", "F406", "V", Decode::Scaled(0.1), 0.0, 20.0),
    p("VVT Advance B1", "21", "25", "°CA", Decode::Offset128(0.5), -50.0, 50.0),
    p("Oil Temp", "21", "61", "°C", Decode::Temp, -40.0, 200.0),
    p("Battery Fan Speed", "22", "F407", "rpm", Decode::Scaled(100.0), 0.0, 5000.0),
    p("HV SOH", "22", "F408", "%", Decode::Scaled(0.5), 0.0, 100.0),
];

const fn p(
    name: &'static str,
    service: &'static str,
    pid: &'static str,
    unit: &'static str,
    decode: Decode,
    min: f64,
    max: f64,
) -> ParameterSpec {
    ParameterSpec {
        name,
        service,
        pid,
        unit,
        decode,
        range: (min, max),
    }
}

/// Iterates the whole registry, standard entries first
pub fn all() -> impl Iterator<Item = &'static ParameterSpec> {
    STANDARD.iter().chain(HYBRID.iter())
}

/// Finds a parameter by its display name
pub fn lookup(name: &str) -> Option<&'static ParameterSpec> {
    all().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpm_formula() {
        assert_eq!(Decode::Rpm.apply(&[0x41, 0x0C, 0x1A, 0xF8]), 1726.0);
    }

    #[test]
    fn temperature_formulas() {
        assert_eq!(Decode::Temp.apply(&[0x41, 0x05, 0x7B]), 83.0);
        let v = Decode::Temp16.apply(&[0x62, 0xF4, 0x02, 0xA8]);
        assert!((v - 28.0).abs() < 1e-9);
    }

    #[test]
    fn signed_word_is_twos_complement() {
        // -100 raw, factor 0.1 -> -10.0
        let v = Decode::SignedWord(0.1).apply(&[0x62, 0xF4, 0xFF, 0x9C]);
        assert!((v + 10.0).abs() < 1e-9, "got {}", v);
        assert_eq!(Decode::SignedWord(1.0).apply(&[0x62, 0xE3, 0x07, 0x08]), 1800.0);
    }

    #[test]
    fn fuel_trim_and_offset_formulas() {
        assert_eq!(Decode::FuelTrim.apply(&[0x41, 0x06, 0x80]), 0.0);
        assert_eq!(Decode::FuelTrim.apply(&[0x41, 0x06, 0x00]), -100.0);
        assert_eq!(Decode::Offset128(0.5).apply(&[0x61, 0x25, 0x9E]), 15.0);
    }

    #[test]
    fn short_payloads_never_fail() {
        let frames: &[&[u8]] = &[&[], &[0x41], &[0x41, 0x0C], &[0x41, 0x0C, 0x10]];
        for spec in all() {
            for frame in frames {
                let value = spec.decode.apply(frame);
                assert!(value.is_finite(), "{} on {:?}", spec.name, frame);
            }
        }
        // fully missing data reads as zero bytes
        assert_eq!(Decode::Rpm.apply(&[]), 0.0);
        assert_eq!(Decode::Temp.apply(&[0x41, 0x05]), -40.0);
        assert_eq!(Decode::SignedWord(1.0).apply(&[0x62]), 0.0);
    }

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<&str> = all().map(|spec| spec.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 26);
    }

    #[test]
    fn registry_commands_are_unique() {
        let mut commands: Vec<String> = all().map(|spec| spec.command()).collect();
        let total = commands.len();
        commands.sort_unstable();
        commands.dedup();
        assert_eq!(commands.len(), total);
    }

    #[test]
    fn lookup_finds_known_parameters() {
        let spec = lookup("Engine RPM").unwrap();
        assert_eq!(spec.command(), "010C");
        assert_eq!(lookup("HV Battery Voltage").unwrap().command(), "22F401");
        assert!(lookup("Flux Capacitor").is_none());
    }
}
