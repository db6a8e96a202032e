//! BLE scanning functionality.
//!
//! Provides the scanner for discovering STM32 telemetry peripherals and
//! the retrying scan loop that selects a device by advertised name.

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

/// A device seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// The BLE peripheral identifier.
    pub identifier: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Peripheral address.
    pub address: String,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

impl DiscoveredDevice {
    /// Check whether the advertised name contains `filter`, ignoring case.
    ///
    /// Devices that advertise no name never match.
    pub fn matches_name(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.name
            .as_ref()
            .map(|name| name.to_lowercase().contains(&filter))
            .unwrap_or(false)
    }

    /// The advertised name, or a placeholder for unnamed devices.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Configuration for the scan loop.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Case-insensitive substring the advertised name must contain.
    pub name_filter: String,
    /// Number of scan passes before giving up.
    pub attempts: u32,
    /// How long each pass collects advertisements.
    pub scan_window: Duration,
    /// Delay between unsuccessful passes.
    pub retry_delay: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            name_filter: String::from("stm32"),
            attempts: 3,
            scan_window: Duration::from_secs(5),
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// One pass of device discovery.
///
/// Abstracts the host stack so the scan loop can be tested without
/// Bluetooth hardware.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Perform a single discovery pass and return every device seen.
    async fn discover(&self, window: Duration) -> Result<Vec<DiscoveredDevice>>;
}

/// BLE scanner for discovering nearby peripherals.
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
    /// Peripheral handles seen so far, by identifier.
    seen: Arc<RwLock<HashMap<String, Peripheral>>>,
}

impl BleScanner {
    /// Create a new BLE scanner on the system's first adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a new BLE scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            seen: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Look up the peripheral handle for a previously discovered device.
    pub fn peripheral(&self, identifier: &str) -> Option<Peripheral> {
        self.seen.read().get(identifier).cloned()
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}

#[async_trait]
impl DeviceDiscovery for BleScanner {
    async fn discover(&self, window: Duration) -> Result<Vec<DiscoveredDevice>> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        tokio::time::sleep(window).await;

        self.adapter.stop_scan().await.map_err(Error::Bluetooth)?;

        let peripherals = self.adapter.peripherals().await.map_err(Error::Bluetooth)?;

        let mut devices = Vec::with_capacity(peripherals.len());
        let mut handles = Vec::with_capacity(peripherals.len());

        for peripheral in peripherals {
            let identifier = peripheral.id().to_string();

            let properties = match peripheral.properties().await {
                Ok(Some(properties)) => properties,
                Ok(None) => {
                    trace!("No properties for peripheral {}", identifier);
                    continue;
                }
                Err(e) => {
                    trace!("Failed to read properties for {}: {}", identifier, e);
                    continue;
                }
            };

            trace!(
                "Saw {} ({}, rssi {:?})",
                properties.local_name.as_deref().unwrap_or("<unnamed>"),
                properties.address,
                properties.rssi
            );

            devices.push(DiscoveredDevice {
                identifier: identifier.clone(),
                name: properties.local_name,
                address: properties.address.to_string(),
                rssi: properties.rssi,
            });
            handles.push((identifier, peripheral));
        }

        self.seen.write().extend(handles);

        debug!("Scan pass finished, {} devices visible", devices.len());

        Ok(devices)
    }
}

/// Run the scan loop until a device matching the configured name filter
/// is found.
///
/// Performs up to `config.attempts` discovery passes, waiting
/// `config.retry_delay` between unsuccessful passes. The first matching
/// device ends the loop immediately.
///
/// # Errors
///
/// Returns [`Error::DeviceNotFound`] if every pass completes without a
/// match.
pub async fn scan_for_device<D>(discovery: &D, config: &ScanConfig) -> Result<DiscoveredDevice>
where
    D: DeviceDiscovery + ?Sized,
{
    for attempt in 1..=config.attempts {
        info!(
            "Scanning for BLE devices (attempt {}/{})",
            attempt, config.attempts
        );

        let devices = discovery.discover(config.scan_window).await?;
        debug!("Discovery pass returned {} devices", devices.len());

        if let Some(device) = devices
            .into_iter()
            .find(|device| device.matches_name(&config.name_filter))
        {
            info!(
                "Found matching device: {} ({})",
                device.display_name(),
                device.address
            );
            return Ok(device);
        }

        if attempt < config.attempts {
            info!(
                "No matching device found, retrying in {}s",
                config.retry_delay.as_secs()
            );
            tokio::time::sleep(config.retry_delay).await;
        }
    }

    warn!(
        "No device matching \"{}\" found after {} attempts",
        config.name_filter, config.attempts
    );

    Err(Error::DeviceNotFound {
        name_filter: config.name_filter.clone(),
        attempts: config.attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_test::assert_ok;

    fn device(identifier: &str, name: Option<&str>) -> DiscoveredDevice {
        DiscoveredDevice {
            identifier: identifier.to_string(),
            name: name.map(str::to_string),
            address: String::from("AA:BB:CC:DD:EE:FF"),
            rssi: Some(-60),
        }
    }

    fn fast_config() -> ScanConfig {
        ScanConfig {
            scan_window: Duration::ZERO,
            retry_delay: Duration::ZERO,
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_matches_name_is_case_insensitive() {
        assert!(device("0", Some("STM32-Node")).matches_name("stm32"));
        assert!(device("0", Some("my stm32wb board")).matches_name("STM32"));
        assert!(!device("0", Some("Thermometer")).matches_name("stm32"));
    }

    #[test]
    fn test_unnamed_device_never_matches() {
        assert!(!device("0", None).matches_name("stm32"));
        assert!(!device("0", None).matches_name(""));
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.name_filter, "stm32");
        assert_eq!(config.attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_scan_loop_exhausts_attempts_when_no_match() {
        let mut discovery = MockDeviceDiscovery::new();
        discovery
            .expect_discover()
            .times(3)
            .returning(|_| Ok(vec![device("0", Some("Thermometer")), device("1", None)]));

        let err = scan_for_device(&discovery, &fast_config())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DeviceNotFound { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_scan_loop_returns_first_match_without_further_passes() {
        let mut discovery = MockDeviceDiscovery::new();
        discovery.expect_discover().times(1).returning(|_| {
            Ok(vec![
                device("0", Some("Thermometer")),
                device("1", Some("STM32WB-P2P")),
                device("2", Some("stm32 sensor")),
            ])
        });

        let found = assert_ok!(scan_for_device(&discovery, &fast_config()).await);

        assert_eq!(found.identifier, "1");
        assert_eq!(found.name.as_deref(), Some("STM32WB-P2P"));
    }

    #[tokio::test]
    async fn test_scan_loop_matches_on_later_pass() {
        let mut discovery = MockDeviceDiscovery::new();
        let mut passes = 0;
        discovery.expect_discover().times(2).returning(move |_| {
            passes += 1;
            if passes < 2 {
                Ok(vec![])
            } else {
                Ok(vec![device("7", Some("stm32-node"))])
            }
        });

        let found = scan_for_device(&discovery, &fast_config()).await.unwrap();

        assert_eq!(found.identifier, "7");
    }

    #[tokio::test]
    async fn test_scan_loop_propagates_discovery_errors() {
        let mut discovery = MockDeviceDiscovery::new();
        discovery
            .expect_discover()
            .times(1)
            .returning(|_| Err(Error::BluetoothUnavailable));

        let err = scan_for_device(&discovery, &fast_config())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::BluetoothUnavailable));
    }
}
