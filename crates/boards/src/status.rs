//! Decoder for the board status document.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use relay_core::relay_state::RelayState;

/// Matches `<Rly3>1</Rly3>`; the closing tag must carry the same number.
static RELAY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Rly(\d+)>\s*(\d)\s*</Rly(\d+)>").expect("valid regex"));

/// Extract the state of relays `1..=total_relays` from a status document.
///
/// Each relay is decoded independently. A missing, mismatched or
/// unrecognised element reads as off, so a partial document still yields a
/// full-width state.
pub fn parse_relay_status(document: &str, total_relays: usize) -> RelayState {
    let mut found: HashMap<usize, bool> = HashMap::new();
    for caps in RELAY_TAG_RE.captures_iter(document) {
        if caps[1] != caps[3] {
            continue;
        }
        if let Ok(number) = caps[1].parse::<usize>() {
            found.entry(number).or_insert(&caps[2] == "1");
        }
    }
    RelayState::from_bits((1..=total_relays).map(|n| found.get(&n).copied().unwrap_or(false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(relays: &[(usize, &str)]) -> String {
        let body: String = relays
            .iter()
            .map(|(n, v)| format!("<Rly{n}>{v}</Rly{n}>"))
            .collect();
        format!("<?xml version=\"1.0\"?><response>{body}<Vin>12.1</Vin></response>")
    }

    #[test]
    fn decodes_every_relay() {
        let xml = document(&[(1, "1"), (2, "0"), (3, "0"), (4, "1")]);
        assert_eq!(parse_relay_status(&xml, 4).as_str(), "1001");
    }

    #[test]
    fn missing_tag_reads_as_off() {
        let xml = document(&[(1, "1"), (2, "1"), (4, "1")]);
        let state = parse_relay_status(&xml, 4);
        assert_eq!(state.as_str(), "1101");
        assert!(!state.is_on(2));
    }

    #[test]
    fn garbage_document_is_all_off() {
        assert_eq!(parse_relay_status("<html>503</html>", 8).as_str(), "00000000");
        assert_eq!(parse_relay_status("", 3).as_str(), "000");
    }

    #[test]
    fn extra_relays_and_bad_values_are_ignored() {
        let xml = document(&[(1, "2"), (2, "1"), (9, "1")]);
        assert_eq!(parse_relay_status(&xml, 2).as_str(), "01");
        assert_eq!(parse_relay_status("<Rly1>1</Rly2>", 2).as_str(), "00");
    }

    #[test]
    fn tolerates_whitespace_inside_elements() {
        assert_eq!(parse_relay_status("<Rly1> 1 </Rly1>\n<Rly2>\n0\n</Rly2>", 2).as_str(), "10");
    }
}
