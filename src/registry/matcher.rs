//! Trigger matching.
//!
//! Variable notifications fan out: every trigger of the same class bound to
//! the payload matches, in definition order. Timer notifications stop at the
//! first timer trigger whose timer equals the payload, so at most one trigger
//! runs per expiry even if several name the same timer.

use crate::notify::{Notification, NotificationClass};

use super::triggers::TriggerId;
use super::Registry;

impl Registry {
    /// Triggers activated by `notification`, in execution order.
    #[must_use]
    pub fn matching(&self, notification: Notification) -> Vec<TriggerId> {
        let Notification { class, payload } = notification;

        match class {
            NotificationClass::VariableChange | NotificationClass::CalcRequest => self
                .iter()
                .filter(|(_, t)| t.is_bound_to(class, payload))
                .map(|(id, _)| id)
                .collect(),
            NotificationClass::Timer => self
                .iter()
                .find(|(_, t)| t.timer().is_some_and(|timer| timer.get() == payload))
                .map(|(id, _)| id)
                .into_iter()
                .collect(),
        }
    }
}
