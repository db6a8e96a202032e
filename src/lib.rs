// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # stm32-telemetry-ble
//!
//! A minimal Bluetooth Low Energy central for STM32-based telemetry
//! peripherals.
//!
//! The crate scans for a peripheral whose advertised name contains
//! `"stm32"`, connects to it, enumerates its GATT services and
//! characteristics, subscribes to every characteristic that supports
//! notifications, and hands incoming payloads to the caller until the
//! session is torn down. All protocol-level BLE behavior is delegated to
//! the host stack; this crate only sequences the high-level calls and
//! releases resources (unsubscribe before disconnect) on exit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stm32_telemetry_ble::{render_payload, Monitor, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Scan for a device advertising an "stm32" name
//!     let monitor = Monitor::new().await?;
//!     let device = monitor.find_device().await?;
//!
//!     device.connect().await?;
//!     let subscribed = device.subscribe_notifiable().await?;
//!     println!("Subscribed to {} characteristics", subscribed);
//!
//!     // Print payloads as they arrive
//!     let mut notifications = device.notifications();
//!     while let Ok(event) = notifications.recv().await {
//!         println!(
//!             "{}: {}",
//!             event.characteristic_uuid,
//!             render_payload(&event.data)
//!         );
//!     }
//!
//!     device.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.

// Public modules
pub mod ble;
pub mod device;
pub mod error;
pub mod monitor;
pub mod utils;

// Re-exports for convenience
pub use device::Stm32Device;
pub use error::{Error, Result};
pub use monitor::{listen, Monitor};
pub use utils::render_payload;

// Re-export commonly used types from submodules
pub use ble::characteristics::NotificationEvent;
pub use ble::connection::ConnectionState;
pub use ble::scanner::{DiscoveredDevice, ScanConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<Monitor>();
        let _ = std::any::TypeId::of::<Stm32Device>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<NotificationEvent>();
        let _ = std::any::TypeId::of::<ConnectionState>();
        let _ = std::any::TypeId::of::<DiscoveredDevice>();
        let _ = std::any::TypeId::of::<ScanConfig>();
    }

    #[test]
    fn test_payload_rendering() {
        assert_eq!(render_payload(b"ok"), "ok");
        assert_eq!(render_payload(&[0xFF]), "FF");
    }
}
