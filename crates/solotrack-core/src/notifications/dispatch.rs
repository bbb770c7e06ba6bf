//! Delivery of approved notifications.
//!
//! The pipeline never talks to a platform notification API directly; it
//! hands [`OutgoingNotification`]s to a [`Dispatcher`].

use super::event::OutgoingNotification;
use crate::error::DispatchError;

/// Hands notifications to whatever delivers them.
pub trait Dispatcher {
    /// Deliver one notification.
    ///
    /// # Errors
    /// Returns an error if the notification could not be handed over. The
    /// pipeline logs the failure but still counts the notification as sent.
    fn dispatch(&mut self, notification: &OutgoingNotification) -> Result<(), DispatchError>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for &mut D {
    fn dispatch(&mut self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        (**self).dispatch(notification)
    }
}

/// Keeps every notification in memory, for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct CollectingDispatcher {
    sent: Vec<OutgoingNotification>,
}

impl CollectingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> &[OutgoingNotification] {
        &self.sent
    }

    pub fn into_sent(self) -> Vec<OutgoingNotification> {
        self.sent
    }
}

impl Dispatcher for CollectingDispatcher {
    fn dispatch(&mut self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        self.sent.push(notification.clone());
        Ok(())
    }
}

/// Writes each notification to the log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&mut self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        tracing::info!(
            category = %notification.category,
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outgoing(title: &str) -> OutgoingNotification {
        OutgoingNotification {
            title: title.into(),
            body: "body".into(),
            category: "milestone_crossed".into(),
        }
    }

    #[test]
    fn collecting_keeps_order() {
        let mut dispatcher = CollectingDispatcher::new();
        dispatcher.dispatch(&outgoing("first")).unwrap();
        dispatcher.dispatch(&outgoing("second")).unwrap();
        let titles: Vec<_> = dispatcher.sent().iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn mutable_reference_dispatches_to_owner() {
        let mut dispatcher = CollectingDispatcher::new();
        {
            let mut by_ref = &mut dispatcher;
            by_ref.dispatch(&outgoing("via ref")).unwrap();
        }
        assert_eq!(dispatcher.into_sent().len(), 1);
    }

    #[test]
    fn log_dispatcher_never_fails() {
        assert!(LogDispatcher.dispatch(&outgoing("logged")).is_ok());
    }
}
