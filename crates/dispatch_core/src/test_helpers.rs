//! Test doubles for the notification seam. Compiled under the default-on
//! `test-helpers` feature so integration tests and benches can use them.

use std::sync::Mutex;

use crate::notify::{DeliveryStatus, Notification, NotificationDispatcher, NotifyTarget};

/// Records every notification instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<(NotifyTarget, Notification)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(NotifyTarget, Notification)> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn send(&self, target: &NotifyTarget, notification: &Notification) -> DeliveryStatus {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((*target, notification.clone()));
        DeliveryStatus::Delivered
    }
}

/// Simulates a target with no live connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDispatcher;

impl NotificationDispatcher for NullDispatcher {
    fn send(&self, _target: &NotifyTarget, _notification: &Notification) -> DeliveryStatus {
        DeliveryStatus::NoConnection
    }
}
