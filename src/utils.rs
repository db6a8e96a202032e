//! Utility functions for the stm32-telemetry-ble crate.

use btleplug::api::CharPropFlags;

/// Render a notification payload for display.
///
/// Payloads that decode as printable UTF-8 text are shown as text, with
/// trailing NUL and line-ending bytes stripped. Anything else falls back
/// to a hex byte listing.
///
/// # Example
///
/// ```
/// use stm32_telemetry_ble::utils::render_payload;
///
/// assert_eq!(render_payload(b"temp=23.5\r\n"), "temp=23.5");
/// assert_eq!(render_payload(&[0x01, 0xFF]), "01 FF");
/// ```
pub fn render_payload(data: &[u8]) -> String {
    if data.is_empty() {
        return String::from("(empty)");
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let trimmed = text.trim_end_matches(|c| c == '\0' || c == '\r' || c == '\n');
        if !trimmed.is_empty() && trimmed.chars().all(|c| !c.is_control()) {
            return trimmed.to_string();
        }
    }

    hex_string(data)
}

/// Format bytes as space-separated uppercase hex.
///
/// # Example
///
/// ```
/// use stm32_telemetry_ble::utils::hex_string;
///
/// assert_eq!(hex_string(&[0xDE, 0xAD, 0xBE, 0xEF]), "DE AD BE EF");
/// ```
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Describe a characteristic's property flags in a human-readable form.
pub fn describe_properties(properties: CharPropFlags) -> String {
    let mut flags = Vec::new();

    if properties.contains(CharPropFlags::BROADCAST) {
        flags.push("broadcast");
    }
    if properties.contains(CharPropFlags::READ) {
        flags.push("read");
    }
    if properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        flags.push("write-without-response");
    }
    if properties.contains(CharPropFlags::WRITE) {
        flags.push("write");
    }
    if properties.contains(CharPropFlags::NOTIFY) {
        flags.push("notify");
    }
    if properties.contains(CharPropFlags::INDICATE) {
        flags.push("indicate");
    }

    if flags.is_empty() {
        String::from("none")
    } else {
        flags.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_payload_text() {
        assert_eq!(render_payload(b"hello"), "hello");
        assert_eq!(render_payload(b"hello\0\0"), "hello");
        assert_eq!(render_payload("23.5\u{00b0}C".as_bytes()), "23.5\u{00b0}C");
    }

    #[test]
    fn test_render_payload_binary_falls_back_to_hex() {
        assert_eq!(render_payload(&[0x00, 0x01]), "00 01");
        assert_eq!(render_payload(&[0xC3, 0x28]), "C3 28");
    }

    #[test]
    fn test_render_payload_empty() {
        assert_eq!(render_payload(&[]), "(empty)");
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x00]), "00");
        assert_eq!(hex_string(&[0x0A, 0xFF]), "0A FF");
    }

    #[test]
    fn test_describe_properties() {
        assert_eq!(describe_properties(CharPropFlags::empty()), "none");
        assert_eq!(describe_properties(CharPropFlags::NOTIFY), "notify");
        assert_eq!(
            describe_properties(CharPropFlags::READ | CharPropFlags::NOTIFY),
            "read, notify"
        );
    }
}
