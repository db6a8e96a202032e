//! BLE Service and Characteristic UUIDs.
//!
//! Contains UUID constants for the standard services commonly exposed by
//! STM32 demo firmware, used to label the enumeration output.

use uuid::Uuid;

// Generic Access / Generic Attribute (Standard BLE)
/// Standard BLE Generic Access Service UUID.
pub const GENERIC_ACCESS_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1800_0000_1000_8000_00805f9b34fb);
/// Standard BLE Generic Attribute Service UUID.
pub const GENERIC_ATTRIBUTE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1801_0000_1000_8000_00805f9b34fb);
/// Device Name characteristic UUID.
pub const DEVICE_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a00_0000_1000_8000_00805f9b34fb);
/// Appearance characteristic UUID.
pub const APPEARANCE_UUID: Uuid = Uuid::from_u128(0x0000_2a01_0000_1000_8000_00805f9b34fb);

// Device Information Service (Standard BLE)
/// Standard BLE Device Information Service UUID.
pub const DEVICE_INFO_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180a_0000_1000_8000_00805f9b34fb);
/// Manufacturer Name characteristic UUID.
pub const MANUFACTURER_NAME_UUID: Uuid = Uuid::from_u128(0x0000_2a29_0000_1000_8000_00805f9b34fb);
/// Model Number characteristic UUID.
pub const MODEL_NUMBER_UUID: Uuid = Uuid::from_u128(0x0000_2a24_0000_1000_8000_00805f9b34fb);
/// Serial Number characteristic UUID.
pub const SERIAL_NUMBER_UUID: Uuid = Uuid::from_u128(0x0000_2a25_0000_1000_8000_00805f9b34fb);
/// Firmware Revision characteristic UUID.
pub const FIRMWARE_REVISION_UUID: Uuid = Uuid::from_u128(0x0000_2a26_0000_1000_8000_00805f9b34fb);

// ST Peer-to-Peer demo service (STM32WB BLE_p2pServer firmware)
/// ST P2P demo service UUID.
pub const P2P_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fe40_cc7a_482a_984a_7f2ed5b3e58f);
/// ST P2P LED control characteristic UUID (Write).
pub const P2P_LED_UUID: Uuid = Uuid::from_u128(0x0000_fe41_8e22_4541_9d4c_21edae82ed19);
/// ST P2P switch characteristic UUID (Notify).
pub const P2P_SWITCH_UUID: Uuid = Uuid::from_u128(0x0000_fe42_8e22_4541_9d4c_21edae82ed19);

const SERVICE_LABELS: &[(Uuid, &str)] = &[
    (GENERIC_ACCESS_SERVICE_UUID, "Generic Access"),
    (GENERIC_ATTRIBUTE_SERVICE_UUID, "Generic Attribute"),
    (DEVICE_INFO_SERVICE_UUID, "Device Information"),
    (P2P_SERVICE_UUID, "ST P2P Demo"),
];

const CHARACTERISTIC_LABELS: &[(Uuid, &str)] = &[
    (DEVICE_NAME_UUID, "Device Name"),
    (APPEARANCE_UUID, "Appearance"),
    (MANUFACTURER_NAME_UUID, "Manufacturer Name"),
    (MODEL_NUMBER_UUID, "Model Number"),
    (SERIAL_NUMBER_UUID, "Serial Number"),
    (FIRMWARE_REVISION_UUID, "Firmware Revision"),
    (P2P_LED_UUID, "P2P LED Control"),
    (P2P_SWITCH_UUID, "P2P Switch"),
];

/// Human-readable label for a well-known service UUID.
pub fn service_label(uuid: &Uuid) -> Option<&'static str> {
    SERVICE_LABELS
        .iter()
        .find(|(known, _)| known == uuid)
        .map(|(_, label)| *label)
}

/// Human-readable label for a well-known characteristic UUID.
pub fn characteristic_label(uuid: &Uuid) -> Option<&'static str> {
    CHARACTERISTIC_LABELS
        .iter()
        .find(|(known, _)| known == uuid)
        .map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        // Verify UUIDs are properly formatted
        let device_info = DEVICE_INFO_SERVICE_UUID.to_string();
        assert!(device_info.contains("180a"));

        let p2p = P2P_SERVICE_UUID.to_string();
        assert!(p2p.contains("fe40"));
    }

    #[test]
    fn test_service_label() {
        assert_eq!(
            service_label(&DEVICE_INFO_SERVICE_UUID),
            Some("Device Information")
        );
        assert_eq!(service_label(&P2P_SERVICE_UUID), Some("ST P2P Demo"));
        assert_eq!(service_label(&SERIAL_NUMBER_UUID), None);
    }

    #[test]
    fn test_characteristic_label() {
        assert_eq!(characteristic_label(&P2P_SWITCH_UUID), Some("P2P Switch"));
        assert_eq!(characteristic_label(&P2P_SERVICE_UUID), None);
    }
}
