//! Parsed `_companion-link._tcp` TXT record (§6 "Discovery").
//!
//! mDNS itself is an external collaborator per §1's Non-goals; this
//! module only interprets the TXT record keys a caller's own mDNS client
//! (e.g. `mdns-sd`) hands back, the way `airplay2-rs`'s
//! `discovery::parser` interprets `_airplay._tcp` TXT records.

use std::collections::HashMap;

/// Bit in `rpFl`/`rpfl` meaning pairing is currently disabled.
pub const FLAG_PAIRING_DISABLED: u32 = 0x02;
/// Bit in `rpFl`/`rpfl` meaning PIN-based pairing is supported.
pub const FLAG_PIN_PAIRING_SUPPORTED: u32 = 0x200;

/// A `_companion-link._tcp` TXT record, parsed from the keys this spec
/// documents as interesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTxtRecord {
    /// `rpmd`: the device's model identifier, e.g. `AppleTV14,1`.
    pub model: Option<String>,
    /// `rpHA`: the device's accessory id.
    pub accessory_id: Option<String>,
    /// `rpFl`/`rpfl`: pairing flags, parsed from hex.
    pub pairing_flags: Option<u32>,
}

impl DeviceTxtRecord {
    /// Parse from a `key=value` TXT record list, as returned by a
    /// typical mDNS resolver.
    #[must_use]
    pub fn parse(records: &[String]) -> Self {
        let fields: HashMap<&str, &str> = records
            .iter()
            .filter_map(|record| {
                let mut parts = record.splitn(2, '=');
                let key = parts.next()?;
                let value = parts.next().unwrap_or("");
                Some((key, value))
            })
            .collect();

        let pairing_flags = fields
            .get("rpFl")
            .or_else(|| fields.get("rpfl"))
            .and_then(|raw| parse_hex_u32(raw));

        Self {
            model: fields.get("rpmd").map(|s| (*s).to_string()),
            accessory_id: fields.get("rpHA").map(|s| (*s).to_string()),
            pairing_flags,
        }
    }

    /// Whether the device has pairing disabled (`rpFl` bit `0x02`).
    #[must_use]
    pub fn pairing_disabled(&self) -> bool {
        self.pairing_flags
            .is_some_and(|flags| flags & FLAG_PAIRING_DISABLED != 0)
    }

    /// Whether the device advertises PIN pairing support (`rpFl` bit
    /// `0x200`).
    #[must_use]
    pub fn supports_pin_pairing(&self) -> bool {
        self.pairing_flags
            .is_some_and(|flags| flags & FLAG_PIN_PAIRING_SUPPORTED != 0)
    }
}

fn parse_hex_u32(raw: &str) -> Option<u32> {
    let trimmed = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(trimmed, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(pairs: &[(&str, &str)]) -> Vec<String> {
        pairs.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    #[test]
    fn parses_known_keys() {
        let txt = DeviceTxtRecord::parse(&records(&[
            ("rpmd", "AppleTV14,1"),
            ("rpHA", "1234abcd"),
            ("rpFl", "0x20200"),
        ]));
        assert_eq!(txt.model.as_deref(), Some("AppleTV14,1"));
        assert_eq!(txt.accessory_id.as_deref(), Some("1234abcd"));
        assert_eq!(txt.pairing_flags, Some(0x2_0200));
    }

    #[test]
    fn lowercase_flags_key_is_also_recognized() {
        let txt = DeviceTxtRecord::parse(&records(&[("rpfl", "0x200")]));
        assert_eq!(txt.pairing_flags, Some(0x200));
    }

    #[test]
    fn pairing_disabled_bit_is_read() {
        let txt = DeviceTxtRecord::parse(&records(&[("rpFl", "0x2")]));
        assert!(txt.pairing_disabled());
        assert!(!txt.supports_pin_pairing());
    }

    #[test]
    fn pin_pairing_bit_is_read() {
        let txt = DeviceTxtRecord::parse(&records(&[("rpFl", "0x200")]));
        assert!(!txt.pairing_disabled());
        assert!(txt.supports_pin_pairing());
    }

    #[test]
    fn missing_flags_key_parses_to_none() {
        let txt = DeviceTxtRecord::parse(&records(&[("rpmd", "AppleTV14,1")]));
        assert_eq!(txt.pairing_flags, None);
        assert!(!txt.pairing_disabled());
        assert!(!txt.supports_pin_pairing());
    }
}
