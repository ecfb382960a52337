//! Diagnostic trouble codes
//!
//! A stored-codes response (service 03) packs each code into two bytes: the
//! top two bits of the first byte select the SAE J2012 category letter, the
//! remaining fourteen bits are the four hex digits of the code number.

use std::fmt;

/// SAE J2012 code category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Powertrain, represented with `'P'`
    Powertrain,
    /// Chassis, represented with `'C'`
    Chassis,
    /// Body, represented with `'B'`
    Body,
    /// Network, represented with `'U'` likely due to previously being the "unknown" category
    Network,
}

impl Category {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Category::Powertrain,
            1 => Category::Chassis,
            2 => Category::Body,
            _ => Category::Network,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Category::Powertrain => 'P',
            Category::Chassis => 'C',
            Category::Body => 'B',
            Category::Network => 'U',
        }
    }
}

/// An individual trouble code from an ECU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TroubleCode {
    pub category: Category,
    pub number: u16,
}

impl TroubleCode {
    /// Unpacks one two-byte DTC record
    pub fn from_pair(b1: u8, b2: u8) -> Self {
        TroubleCode {
            category: Category::from_bits(b1 >> 6),
            number: (u16::from(b1 & 0x3F) << 8) | u16::from(b2),
        }
    }

    /// Canonical string form, e.g. `P0171`
    pub fn code(&self) -> String {
        self.to_string()
    }

    /// Human-readable description, when the code is in the built-in table
    pub fn describe(&self) -> Option<&'static str> {
        let code = self.to_string();
        DESCRIPTIONS
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, text)| *text)
    }
}

impl fmt::Display for TroubleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04X}", self.category.letter(), self.number)
    }
}

/// Decodes the byte payload of one stored-codes response line
///
/// The first byte (service acknowledgement) is skipped; all-zero pairs are
/// padding, not codes. Duplicates are kept; callers may deduplicate.
pub fn decode_frame(data: &[u8]) -> Vec<TroubleCode> {
    let mut codes = Vec::new();
    let mut i = 1;
    while i + 1 < data.len() {
        let (b1, b2) = (data[i], data[i + 1]);
        i += 2;
        if b1 == 0 && b2 == 0 {
            continue;
        }
        codes.push(TroubleCode::from_pair(b1, b2));
    }
    codes
}

/// Decodes a full raw response, line by line
///
/// Each line is tokenized and decoded independently; a line with a non-hex
/// token is skipped without aborting the rest. Results keep line order.
pub fn decode_report(raw: &str) -> Vec<TroubleCode> {
    let mut codes = Vec::new();
    for line in raw.split('\n') {
        let line = line.replace('>', " ");
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let Ok(data) = tokens
            .iter()
            .map(|t| u8::from_str_radix(t, 16))
            .collect::<Result<Vec<u8>, _>>()
        else {
            continue;
        };
        codes.extend(decode_frame(&data));
    }
    codes
}

/// Whether a clear-codes (service 04) response acknowledges the erase
///
/// Loose textual check: the positive-response byte `44` or a literal `OK`
/// anywhere in the text counts as success.
pub fn clear_acknowledged(raw: &str) -> bool {
    let upper = raw.to_uppercase();
    upper.contains("44") || upper.contains("OK")
}

/// Descriptions for common powertrain codes plus the Toyota hybrid set
const DESCRIPTIONS: &[(&str, &str)] = &[
    ("P0100", "Mass Air Flow Circuit Malfunction"),
    ("P0115", "Engine Coolant Temperature Circuit Malfunction"),
    ("P0120", "Throttle Position Sensor A Circuit Malfunction"),
    ("P0130", "O2 Sensor Circuit Malfunction (Bank 1 Sensor 1)"),
    ("P0171", "System Too Lean (Bank 1)"),
    ("P0172", "System Too Rich (Bank 1)"),
    ("P0300", "Random/Multiple Cylinder Misfire Detected"),
    ("P0301", "Cylinder 1 Misfire Detected"),
    ("P0302", "Cylinder 2 Misfire Detected"),
    ("P0325", "Knock Sensor 1 Circuit Malfunction"),
    ("P0335", "Crankshaft Position Sensor A Circuit Malfunction"),
    ("P0420", "Catalyst System Efficiency Below Threshold (Bank 1)"),
    ("P0440", "Evaporative Emission Control System Malfunction"),
    ("P0500", "Vehicle Speed Sensor Malfunction"),
    ("P3000", "HV Battery Malfunction"),
    ("P3004", "HV Battery Pack Voltage Low"),
    ("P3009", "HV Battery High Voltage Leak Detected"),
    ("P0A80", "Replace Hybrid Battery Pack"),
    ("P0A7F", "Hybrid Battery Pack Deterioration"),
    ("P0AC0", "Drive Motor A Temperature Sensor Circuit"),
    ("P0A94", "DC/DC Converter Performance"),
    ("P0B40", "Generator Inverter Performance"),
    ("P0B41", "Drive Motor Inverter Performance"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_category_and_number() {
        let code = TroubleCode::from_pair(0x01, 0x71);
        assert_eq!(code.category, Category::Powertrain);
        assert_eq!(code.to_string(), "P0171");

        assert_eq!(TroubleCode::from_pair(0x41, 0x23).to_string(), "C0123");
        assert_eq!(TroubleCode::from_pair(0x81, 0x23).to_string(), "B0123");
        assert_eq!(TroubleCode::from_pair(0xC1, 0x23).to_string(), "U0123");
    }

    #[test]
    fn decodes_reference_frame() {
        let frame = [0x43, 0x01, 0x03, 0x00, 0x01, 0x0A, 0x7F, 0x00, 0x00];
        let codes: Vec<String> = decode_frame(&frame).iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, vec!["P0103", "P0001", "P0A7F"]);
    }

    #[test]
    fn zero_pairs_are_padding() {
        assert!(decode_frame(&[0x43, 0x00, 0x00, 0x00, 0x00]).is_empty());
    }

    #[test]
    fn report_handles_multiple_and_malformed_lines() {
        let raw = "43 01 71 00 00\nBUS INIT: OK\n43 30 00 00 00\r\n>";
        let codes: Vec<String> = decode_report(raw).iter().map(|c| c.to_string()).collect();
        assert_eq!(codes, vec!["P0171", "P3000"]);
    }

    #[test]
    fn odd_leftover_byte_is_ignored() {
        // trailing 0x7F has no partner
        let codes = decode_frame(&[0x43, 0x01, 0x03, 0x7F]);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].to_string(), "P0103");
    }

    #[test]
    fn clear_acknowledgement() {
        assert!(clear_acknowledged("44\r\n>"));
        assert!(clear_acknowledged("ok\r\n>"));
        assert!(!clear_acknowledged("7F0431\r\n>"));
        assert!(!clear_acknowledged(""));
    }

    #[test]
    fn describes_known_codes() {
        let p0171 = TroubleCode::from_pair(0x01, 0x71);
        assert_eq!(p0171.describe(), Some("System Too Lean (Bank 1)"));
        let p0a80 = TroubleCode::from_pair(0x0A, 0x80);
        assert_eq!(p0a80.describe(), Some("Replace Hybrid Battery Pack"));
        assert_eq!(TroubleCode::from_pair(0x3F, 0xFF).describe(), None);
    }
}
