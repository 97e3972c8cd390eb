//! Notification dispatch service.
//!
//! # Responsibility
//! - Translate domain events into fixed-shape notification records.
//! - Check recipient preferences, persist the record for the in-app list,
//!   and hand it to platform delivery.
//!
//! # Invariants
//! - Dispatch is best-effort: delivery failures are logged and swallowed,
//!   never surfaced to the domain action that triggered them.
//! - A preference-suppressed dispatch is a successful no-op.

use crate::model::notification::{NotificationEvent, NotificationRecord};
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::user_repo::UserRepository;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Platform delivery failure (push/local notification transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    pub message: String,
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.message)
    }
}

impl Error for DeliveryError {}

/// Seam to the platform notification transport (out of core's scope).
pub trait NotificationDelivery {
    fn deliver(&self, record: &NotificationRecord) -> Result<(), DeliveryError>;
}

/// Delivery backend that only logs; used where no platform transport is
/// wired up (CLI probe, tests).
#[derive(Debug, Default)]
pub struct LogOnlyDelivery;

impl NotificationDelivery for LogOnlyDelivery {
    fn deliver(&self, record: &NotificationRecord) -> Result<(), DeliveryError> {
        info!(
            "event=notification_delivered module=notify status=ok category={:?} recipient={}",
            record.category, record.recipient_id
        );
        Ok(())
    }
}

/// What happened to one dispatched event. Informational only; callers must
/// not fail their domain action on any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Record persisted and handed to platform delivery.
    Delivered,
    /// Recipient preferences disable this category; successful no-op.
    Suppressed,
    /// Recipient record is missing or unreadable.
    RecipientUnknown,
    /// Platform delivery reported a failure (logged and swallowed).
    Failed,
}

impl DispatchOutcome {
    /// Whether the domain may consider the partner notified (delivery
    /// either happened or was deliberately suppressed).
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Delivered | Self::Suppressed)
    }
}

/// Narrow dispatch interface domain services depend on, keeping them
/// decoupled from preference lookup and transport wiring.
pub trait NotificationSink {
    fn notify(&self, event: NotificationEvent) -> DispatchOutcome;
}

/// Preference-aware dispatcher over user storage, notification history,
/// and a platform delivery backend.
pub struct NotificationService<U, H, D>
where
    U: UserRepository,
    H: NotificationRepository,
    D: NotificationDelivery,
{
    users: U,
    history: H,
    delivery: D,
}

impl<U, H, D> NotificationService<U, H, D>
where
    U: UserRepository,
    H: NotificationRepository,
    D: NotificationDelivery,
{
    pub fn new(users: U, history: H, delivery: D) -> Self {
        Self {
            users,
            history,
            delivery,
        }
    }
}

impl<U, H, D> NotificationSink for NotificationService<U, H, D>
where
    U: UserRepository,
    H: NotificationRepository,
    D: NotificationDelivery,
{
    fn notify(&self, event: NotificationEvent) -> DispatchOutcome {
        let recipient_id = event.recipient_id();
        let category = event.category();

        let recipient = match self.users.get_by_id(recipient_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(
                    "event=notification_skipped module=notify status=error reason=recipient_missing recipient={recipient_id}"
                );
                return DispatchOutcome::RecipientUnknown;
            }
            Err(err) => {
                warn!(
                    "event=notification_skipped module=notify status=error reason=recipient_unreadable recipient={recipient_id} error={err}"
                );
                return DispatchOutcome::RecipientUnknown;
            }
        };

        if !recipient.preferences.allows(category) {
            debug!(
                "event=notification_suppressed module=notify status=ok category={category:?} recipient={recipient_id}"
            );
            return DispatchOutcome::Suppressed;
        }

        let record = NotificationRecord::from_event(&event);

        // History write is best-effort too; a full in-app list is not worth
        // blocking the push.
        if let Err(err) = self.history.save(&record) {
            warn!(
                "event=notification_history_write module=notify status=error record={} error={err}",
                record.id
            );
        }

        match self.delivery.deliver(&record) {
            Ok(()) => {
                info!(
                    "event=notification_dispatched module=notify status=ok category={category:?} recipient={recipient_id}"
                );
                DispatchOutcome::Delivered
            }
            Err(err) => {
                warn!(
                    "event=notification_dispatched module=notify status=error category={category:?} recipient={recipient_id} error={err}"
                );
                DispatchOutcome::Failed
            }
        }
    }
}
