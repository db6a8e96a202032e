//! Top-level sequencing for a monitoring session.
//!
//! A [`Monitor`] owns the scanner and drives the scan-then-connect
//! selection of a device; [`listen`] drains its notification events
//! until a shutdown signal fires.

use std::future::Future;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::ble::characteristics::NotificationEvent;
use crate::ble::scanner::{scan_for_device, BleScanner, ScanConfig};
use crate::device::Stm32Device;
use crate::error::{Error, Result};

/// Discovers and hands out STM32 telemetry devices.
pub struct Monitor {
    /// BLE scanner.
    scanner: BleScanner,
    /// Scan loop configuration.
    config: ScanConfig,
}

impl Monitor {
    /// Create a monitor with the default scan configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Self::with_config(ScanConfig::default()).await
    }

    /// Create a monitor with a specific scan configuration.
    pub async fn with_config(config: ScanConfig) -> Result<Self> {
        let scanner = BleScanner::new().await?;
        Ok(Self { scanner, config })
    }

    /// The scan configuration in use.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run the scan loop and return a facade for the first device whose
    /// advertised name matches the configured filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] when every scan pass completes
    /// without a match.
    pub async fn find_device(&self) -> Result<Stm32Device> {
        let discovered = scan_for_device(&self.scanner, &self.config).await?;

        let peripheral = self.scanner.peripheral(&discovered.identifier).ok_or_else(|| {
            Error::ConnectionFailed {
                reason: format!("peripheral {} vanished after scan", discovered.identifier),
            }
        })?;

        Ok(Stm32Device::new(discovered, peripheral))
    }
}

/// Drain notification events, invoking `on_notification` for each, until
/// `shutdown` resolves or the event channel closes.
pub async fn listen<F, S>(
    mut notifications: broadcast::Receiver<NotificationEvent>,
    mut on_notification: F,
    shutdown: S,
) where
    F: FnMut(NotificationEvent),
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Shutdown signal received, leaving listen loop");
                break;
            }
            event = notifications.recv() => match event {
                Ok(event) => on_notification(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Listener lagged, dropped {} notifications", missed);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Notification channel closed, leaving listen loop");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn event(uuid: u128, data: &[u8]) -> NotificationEvent {
        NotificationEvent {
            characteristic_uuid: Uuid::from_u128(uuid),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_listen_drains_buffered_events_until_channel_closes() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(event(1, b"one")).unwrap();
        tx.send(event(2, b"two")).unwrap();
        drop(tx);

        let mut seen = Vec::new();
        listen(
            rx,
            |event| seen.push(event.characteristic_uuid),
            std::future::pending(),
        )
        .await;

        assert_eq!(seen, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
    }

    #[tokio::test]
    async fn test_listen_stops_on_shutdown_signal() {
        let (tx, rx) = broadcast::channel(8);
        // Keep the sender alive so only the shutdown signal can end the loop.
        let _tx = tx;

        listen(rx, |_| {}, std::future::ready(())).await;
    }
}
