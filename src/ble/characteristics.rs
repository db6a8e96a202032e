//! GATT characteristic handling.
//!
//! Selects notifiable characteristics, tracks notification
//! subscriptions, and fans incoming notifications out to listeners.

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Notification event from a characteristic.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    /// UUID of the characteristic that sent the notification.
    pub characteristic_uuid: Uuid,
    /// The notification payload.
    pub data: Vec<u8>,
}

/// Notification subscribe/unsubscribe operations on a peripheral.
///
/// Abstracts the host stack so subscription bookkeeping can be tested
/// without Bluetooth hardware.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GattOps: Send + Sync {
    /// Enable notifications on a characteristic.
    async fn subscribe(&self, characteristic: &Characteristic) -> Result<()>;
    /// Disable notifications on a characteristic.
    async fn unsubscribe(&self, characteristic: &Characteristic) -> Result<()>;
}

#[async_trait]
impl GattOps for Peripheral {
    async fn subscribe(&self, characteristic: &Characteristic) -> Result<()> {
        btleplug::api::Peripheral::subscribe(self, characteristic)
            .await
            .map_err(Error::Bluetooth)
    }

    async fn unsubscribe(&self, characteristic: &Characteristic) -> Result<()> {
        btleplug::api::Peripheral::unsubscribe(self, characteristic)
            .await
            .map_err(Error::Bluetooth)
    }
}

/// Tracks which characteristics have an active notification subscription.
pub struct SubscriptionSet<G: GattOps> {
    gatt: G,
    /// Characteristics we have successfully subscribed to.
    subscribed: RwLock<Vec<Characteristic>>,
}

impl<G: GattOps> SubscriptionSet<G> {
    /// Create an empty subscription set over the given GATT operations.
    pub fn new(gatt: G) -> Self {
        Self {
            gatt,
            subscribed: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to every characteristic in `characteristics` that
    /// supports notifications.
    ///
    /// A failed subscription is logged and skipped; it does not block the
    /// remaining characteristics. Returns the number subscribed.
    pub async fn subscribe_notifiable(&self, characteristics: &[Characteristic]) -> usize {
        let mut count = 0;

        for characteristic in characteristics {
            if !characteristic.properties.contains(CharPropFlags::NOTIFY) {
                trace!("Skipping {} (not notifiable)", characteristic.uuid);
                continue;
            }

            debug!("Subscribing to notifications on {}", characteristic.uuid);

            match self.gatt.subscribe(characteristic).await {
                Ok(()) => {
                    self.subscribed.write().push(characteristic.clone());
                    count += 1;
                }
                Err(e) => {
                    warn!("Failed to subscribe to {}: {}", characteristic.uuid, e);
                }
            }
        }

        debug!("Subscribed to {} characteristics", count);

        count
    }

    /// Unsubscribe from every subscribed characteristic.
    ///
    /// Every characteristic is attempted, even when an earlier attempt
    /// fails. Returns the number of failed attempts.
    pub async fn unsubscribe_all(&self) -> usize {
        let subscribed = std::mem::take(&mut *self.subscribed.write());
        let mut failures = 0;

        for characteristic in &subscribed {
            debug!("Unsubscribing from {}", characteristic.uuid);

            if let Err(e) = self.gatt.unsubscribe(characteristic).await {
                warn!("Failed to unsubscribe from {}: {}", characteristic.uuid, e);
                failures += 1;
            }
        }

        failures
    }

    /// UUIDs of the characteristics currently subscribed.
    pub fn subscribed_uuids(&self) -> Vec<Uuid> {
        self.subscribed.read().iter().map(|c| c.uuid).collect()
    }

    /// The number of active subscriptions.
    pub fn len(&self) -> usize {
        self.subscribed.read().len()
    }

    /// Check whether no subscriptions are active.
    pub fn is_empty(&self) -> bool {
        self.subscribed.read().is_empty()
    }
}

/// Fans the peripheral's notification stream out to broadcast receivers.
pub struct NotificationListener {
    /// The peripheral whose notifications are drained.
    peripheral: Peripheral,
    /// Channel for notification events.
    notification_tx: broadcast::Sender<NotificationEvent>,
    /// Whether we're currently listening for notifications.
    is_listening: Arc<RwLock<bool>>,
    /// Handle to the notification listener task.
    listener_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl NotificationListener {
    /// Create a new listener for a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        let (notification_tx, _) = broadcast::channel(256);

        Self {
            peripheral,
            notification_tx,
            is_listening: Arc::new(RwLock::new(false)),
            listener_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Start draining the notification stream.
    ///
    /// Events are delivered through the channel returned by
    /// [`subscribe`](Self::subscribe).
    pub async fn start(&self) -> Result<()> {
        if *self.is_listening.read() {
            return Ok(());
        }

        *self.is_listening.write() = true;

        let peripheral = self.peripheral.clone();
        let is_listening = self.is_listening.clone();
        let notification_tx = self.notification_tx.clone();

        let handle = tokio::spawn(async move {
            debug!("Notification listener task starting");

            let mut notifications = match peripheral.notifications().await {
                Ok(notifications) => notifications,
                Err(e) => {
                    error!("Failed to get notifications stream: {}", e);
                    *is_listening.write() = false;
                    return;
                }
            };

            while *is_listening.read() {
                tokio::select! {
                    Some(notification) = notifications.next() => {
                        trace!(
                            "Notification from {}: {} bytes",
                            notification.uuid,
                            notification.value.len()
                        );

                        let event = NotificationEvent {
                            characteristic_uuid: notification.uuid,
                            data: notification.value,
                        };

                        let _ = notification_tx.send(event);
                    }
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        // Check if we should stop
                        if !*is_listening.read() {
                            break;
                        }
                    }
                }
            }

            debug!("Notification listener stopped");
        });

        *self.listener_handle.write() = Some(handle);

        Ok(())
    }

    /// Stop draining the notification stream.
    pub async fn stop(&self) {
        *self.is_listening.write() = false;

        if let Some(handle) = self.listener_handle.write().take() {
            let _ = handle.await;
        }
    }

    /// Get a receiver for notification events.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.notification_tx.subscribe()
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        *self.is_listening.write() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn characteristic(uuid: u128, properties: CharPropFlags) -> Characteristic {
        Characteristic {
            uuid: Uuid::from_u128(uuid),
            service_uuid: Uuid::from_u128(0xfe40),
            properties,
            descriptors: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_skips_non_notifiable_characteristics() {
        let characteristics = vec![
            characteristic(1, CharPropFlags::NOTIFY),
            characteristic(2, CharPropFlags::READ),
            characteristic(3, CharPropFlags::READ | CharPropFlags::NOTIFY),
            characteristic(4, CharPropFlags::INDICATE),
        ];

        let mut gatt = MockGattOps::new();
        gatt.expect_subscribe().times(2).returning(|_| Ok(()));

        let set = SubscriptionSet::new(gatt);
        let count = set.subscribe_notifiable(&characteristics).await;

        assert_eq!(count, 2);
        assert_eq!(
            set.subscribed_uuids(),
            vec![Uuid::from_u128(1), Uuid::from_u128(3)]
        );
    }

    #[tokio::test]
    async fn test_failed_subscription_does_not_block_others() {
        let characteristics = vec![
            characteristic(1, CharPropFlags::NOTIFY),
            characteristic(2, CharPropFlags::NOTIFY),
            characteristic(3, CharPropFlags::NOTIFY),
        ];

        let mut gatt = MockGattOps::new();
        gatt.expect_subscribe().times(3).returning(|c| {
            if c.uuid == Uuid::from_u128(2) {
                Err(Error::NotConnected)
            } else {
                Ok(())
            }
        });

        let set = SubscriptionSet::new(gatt);
        let count = set.subscribe_notifiable(&characteristics).await;

        assert_eq!(count, 2);
        assert_eq!(
            set.subscribed_uuids(),
            vec![Uuid::from_u128(1), Uuid::from_u128(3)]
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_all_attempts_every_characteristic() {
        let characteristics = vec![
            characteristic(1, CharPropFlags::NOTIFY),
            characteristic(2, CharPropFlags::NOTIFY),
            characteristic(3, CharPropFlags::NOTIFY),
        ];

        let mut gatt = MockGattOps::new();
        gatt.expect_subscribe().times(3).returning(|_| Ok(()));
        // The first unsubscribe fails; the remaining two must still be
        // attempted.
        gatt.expect_unsubscribe().times(3).returning(|c| {
            if c.uuid == Uuid::from_u128(1) {
                Err(Error::NotConnected)
            } else {
                Ok(())
            }
        });

        let set = SubscriptionSet::new(gatt);
        set.subscribe_notifiable(&characteristics).await;
        assert_eq!(set.len(), 3);

        let failures = set.unsubscribe_all().await;

        assert_eq!(failures, 1);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_all_with_no_subscriptions() {
        let mut gatt = MockGattOps::new();
        gatt.expect_unsubscribe().times(0);

        let set = SubscriptionSet::new(gatt);
        assert_eq!(set.unsubscribe_all().await, 0);
    }

    #[test]
    fn test_notification_event_clone() {
        let event = NotificationEvent {
            characteristic_uuid: Uuid::from_u128(0xfe42),
            data: vec![1, 2, 3],
        };
        let cloned = event.clone();
        assert_eq!(event.characteristic_uuid, cloned.characteristic_uuid);
        assert_eq!(event.data, cloned.data);
    }
}
