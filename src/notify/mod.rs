//! Notification transport.
//!
//! Variable-change, calc-request and timer-expiry notifications each travel on
//! their own unbounded FIFO queue. The dispatcher waits on all of them at once,
//! so a burst on one class never hides another and nothing is coalesced.

/// Per-class queues and the blocking multi-wait.
pub mod queue;

use std::fmt;

pub use queue::{notification_channel, NotificationReceiver, Notifier, Received};

/// The kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationClass {
    /// A watched variable was written.
    VariableChange,
    /// A calculation was requested for a variable.
    CalcRequest,
    /// An interval timer fired.
    Timer,
}

impl NotificationClass {
    /// Short name used in logs and definition files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VariableChange => "change",
            Self::CalcRequest => "calc",
            Self::Timer => "timer",
        }
    }

    /// Whether every matching trigger fires, or only the first one.
    ///
    /// Variable notifications fan out to all bound triggers. A timer
    /// notification runs at most one trigger, the first in definition order.
    #[must_use]
    pub const fn fans_out(&self) -> bool {
        !matches!(self, Self::Timer)
    }
}

impl fmt::Display for NotificationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivered notification: its class and 32-bit payload.
///
/// The payload is a variable identifier for variable notifications and a timer
/// identifier for timer notifications.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notification {
    pub class: NotificationClass,
    pub payload: u32,
}

#[allow(missing_docs)]
impl Notification {
    #[must_use]
    pub const fn new(class: NotificationClass, payload: u32) -> Self {
        Self { class, payload }
    }

    #[must_use]
    pub const fn variable_change(payload: u32) -> Self {
        Self::new(NotificationClass::VariableChange, payload)
    }

    #[must_use]
    pub const fn calc_request(payload: u32) -> Self {
        Self::new(NotificationClass::CalcRequest, payload)
    }

    #[must_use]
    pub const fn timer(payload: u32) -> Self {
        Self::new(NotificationClass::Timer, payload)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id = {}", self.class, self.payload)
    }
}
