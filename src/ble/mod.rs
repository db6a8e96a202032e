//! BLE communication module.
//!
//! This module provides low-level Bluetooth Low Energy functionality
//! for discovering and subscribing to STM32 telemetry peripherals.

pub mod characteristics;
pub mod connection;
pub mod scanner;
pub mod uuids;

pub use characteristics::{NotificationEvent, NotificationListener, SubscriptionSet};
pub use connection::{ConnectionManager, ConnectionState};
pub use scanner::{BleScanner, DiscoveredDevice, ScanConfig};
pub use uuids::*;
