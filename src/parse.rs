//! Raw adapter text to payload bytes
//!
//! ELM327 responses arrive as free-form ASCII lines: echo noise, status
//! chatter, CAN reassembly headers, and somewhere in there the hex payload.
//! The first line made entirely of hex byte pairs wins; everything else is
//! skipped silently.

use log::trace;

/// Status lines the adapter emits that carry no payload
const NOISE_TOKENS: &[&str] = &["NO DATA", "ERROR", "?", "SEARCHING...", "STOPPED"];

/// Extracts the payload bytes from one raw command response
///
/// Returns `None` when no line parses, which callers must treat as "no data"
/// rather than an empty payload. Lines shorter than two tokens are rejected:
/// a real response always carries at least a mode/PID echo header.
pub fn parse_payload(raw: &str) -> Option<Vec<u8>> {
    for line in raw.split('\n') {
        let line = line.replace('>', " ");
        let line = line.trim();
        if line.is_empty() || NOISE_TOKENS.contains(&line.to_uppercase().as_str()) {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }

        match tokens
            .iter()
            .map(|t| u8::from_str_radix(t, 16))
            .collect::<Result<Vec<u8>, _>>()
        {
            Ok(bytes) => return Some(bytes),
            Err(_) => {
                trace!("parse_payload: skipping non-hex line {:?}", line);
                continue;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_response() {
        assert_eq!(
            parse_payload("41 0C 1A F8\r\n>"),
            Some(vec![0x41, 0x0C, 0x1A, 0xF8])
        );
    }

    #[test]
    fn strips_prompt_and_whitespace() {
        assert_eq!(parse_payload("  41 0D 3C>"), Some(vec![0x41, 0x0D, 0x3C]));
    }

    #[test]
    fn skips_noise_lines() {
        let raw = "SEARCHING...\nNO DATA\n41 05 7B\n>";
        assert_eq!(parse_payload(raw), Some(vec![0x41, 0x05, 0x7B]));
        assert_eq!(parse_payload("no data\n>"), None);
        assert_eq!(parse_payload("STOPPED\n>"), None);
        assert_eq!(parse_payload("?\n>"), None);
    }

    #[test]
    fn skips_malformed_lines_and_keeps_scanning() {
        let raw = "41 0C ZZ\n010C\n41 0C 0B B8\n>";
        assert_eq!(parse_payload(raw), Some(vec![0x41, 0x0C, 0x0B, 0xB8]));
    }

    #[test]
    fn rejects_single_token_lines() {
        assert_eq!(parse_payload("44\r\n>"), None);
    }

    #[test]
    fn empty_input_is_no_data() {
        assert_eq!(parse_payload(""), None);
        assert_eq!(parse_payload("\n\n>"), None);
    }
}
