//! Device facade for an STM32 telemetry peripheral.
//!
//! Ties the connection, subscription bookkeeping, and notification
//! fan-out for a single peripheral together behind one handle.

use btleplug::api::{Characteristic, Peripheral as _, Service};
use btleplug::platform::Peripheral;
use std::collections::BTreeSet;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::ble::characteristics::{NotificationEvent, NotificationListener, SubscriptionSet};
use crate::ble::connection::{ConnectionManager, ConnectionState};
use crate::ble::scanner::DiscoveredDevice;
use crate::error::{Error, Result};
use uuid::Uuid;

/// A single STM32 telemetry peripheral selected by the scanner.
pub struct Stm32Device {
    /// Record from the scan that selected this device.
    discovered: DiscoveredDevice,
    /// The peripheral handle.
    peripheral: Peripheral,
    /// Connection manager.
    connection: ConnectionManager,
    /// Active notification subscriptions.
    subscriptions: SubscriptionSet<Peripheral>,
    /// Notification fan-out.
    listener: NotificationListener,
}

impl Stm32Device {
    /// Create a device facade from a scan result and its peripheral handle.
    pub fn new(discovered: DiscoveredDevice, peripheral: Peripheral) -> Self {
        Self {
            connection: ConnectionManager::new(peripheral.clone()),
            subscriptions: SubscriptionSet::new(peripheral.clone()),
            listener: NotificationListener::new(peripheral.clone()),
            discovered,
            peripheral,
        }
    }

    /// The advertised name, or a placeholder if the device was unnamed.
    pub fn name(&self) -> &str {
        self.discovered.display_name()
    }

    /// The peripheral address.
    pub fn address(&self) -> &str {
        &self.discovered.address
    }

    /// Signal strength at discovery time, in dBm.
    pub fn rssi(&self) -> Option<i16> {
        self.discovered.rssi
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Connect to the device and discover its GATT services.
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await
    }

    /// The GATT service tree discovered during connect.
    pub fn services(&self) -> BTreeSet<Service> {
        self.peripheral.services()
    }

    /// Subscribe to every characteristic that supports notifications and
    /// start the notification fan-out.
    ///
    /// Individual subscription failures are logged and skipped. Returns
    /// the number of characteristics subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if called before a successful
    /// [`connect`](Self::connect).
    pub async fn subscribe_notifiable(&self) -> Result<usize> {
        if !self.connection.is_connected() {
            return Err(Error::NotConnected);
        }

        let characteristics: Vec<Characteristic> = self
            .peripheral
            .services()
            .into_iter()
            .flat_map(|service| service.characteristics.into_iter())
            .collect();

        let count = self.subscriptions.subscribe_notifiable(&characteristics).await;

        if count > 0 {
            self.listener.start().await?;
        }

        info!(
            "Subscribed to {} of {} characteristics on {}",
            count,
            characteristics.len(),
            self.name()
        );

        Ok(count)
    }

    /// UUIDs of the characteristics with an active subscription.
    pub fn subscribed_uuids(&self) -> Vec<Uuid> {
        self.subscriptions.subscribed_uuids()
    }

    /// Get a receiver for incoming notification events.
    pub fn notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.listener.subscribe()
    }

    /// Tear the session down: unsubscribe every subscribed
    /// characteristic, stop the notification fan-out, and disconnect.
    ///
    /// Unsubscribe failures are logged and do not stop the remaining
    /// teardown steps.
    pub async fn shutdown(&self) -> Result<()> {
        let failures = self.subscriptions.unsubscribe_all().await;
        if failures > 0 {
            warn!("{} unsubscribe attempts failed during teardown", failures);
        }

        self.listener.stop().await;

        self.connection.disconnect().await
    }
}
