use std::cell::Cell;
use std::time::Duration;

use crossbeam_channel::{after, never, select, unbounded, Receiver, RecvError, Sender};

use crate::error::{ActionsResult, ExecutionError};

use super::{Notification, NotificationClass};

/// Result of one blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// A notification to dispatch.
    Notification(Notification),
    /// A cooperative stop was requested and everything queued at that moment
    /// has been handed out.
    Shutdown,
}

/// Producer side of the notification queues.
///
/// Cheap to clone; the variable store and the timer backend each hold one.
/// Once every `Notifier` is dropped the receiver reports a disconnect.
#[derive(Debug, Clone)]
pub struct Notifier {
    change_tx: Sender<u32>,
    calc_tx: Sender<u32>,
    timer_tx: Sender<u32>,
    shutdown_tx: Sender<()>,
}

/// Consumer side: the dispatcher's single multi-wait over every class.
#[derive(Debug)]
pub struct NotificationReceiver {
    change_rx: Receiver<u32>,
    calc_rx: Receiver<u32>,
    timer_rx: Receiver<u32>,
    shutdown_rx: Receiver<()>,
    // Notifications still to hand out once a shutdown was received.
    stopping: Cell<Option<usize>>,
}

/// Create a connected notifier/receiver pair.
#[must_use]
pub fn notification_channel() -> (Notifier, NotificationReceiver) {
    let (change_tx, change_rx) = unbounded();
    let (calc_tx, calc_rx) = unbounded();
    let (timer_tx, timer_rx) = unbounded();
    let (shutdown_tx, shutdown_rx) = unbounded();

    (
        Notifier {
            change_tx,
            calc_tx,
            timer_tx,
            shutdown_tx,
        },
        NotificationReceiver {
            change_rx,
            calc_rx,
            timer_rx,
            shutdown_rx,
            stopping: Cell::new(None),
        },
    )
}

fn disconnected(path: &str) -> ExecutionError {
    ExecutionError::Disconnected {
        path: path.to_string(),
    }
}

impl Notifier {
    /// Queue a notification on its class queue. Never blocks.
    pub fn raise(&self, notification: Notification) -> ActionsResult<()> {
        let tx = match notification.class {
            NotificationClass::VariableChange => &self.change_tx,
            NotificationClass::CalcRequest => &self.calc_tx,
            NotificationClass::Timer => &self.timer_tx,
        };
        tx.send(notification.payload)
            .map_err(|_| disconnected(notification.class.as_str()).into())
    }

    /// Ask the dispatcher to stop once the queued notifications are serviced.
    pub fn shutdown(&self) -> ActionsResult<()> {
        self.shutdown_tx
            .send(())
            .map_err(|_| disconnected("shutdown").into())
    }
}

impl NotificationReceiver {
    /// Block until the next notification (or a cooperative shutdown).
    pub fn wait(&self) -> ActionsResult<Received> {
        self.next(None)?
            .ok_or_else(|| disconnected("notifications").into())
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> ActionsResult<Option<Received>> {
        self.next(Some(timeout))
    }

    /// Number of notifications queued across all classes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.change_rx.len() + self.calc_rx.len() + self.timer_rx.len()
    }

    fn next(&self, timeout: Option<Duration>) -> ActionsResult<Option<Received>> {
        let deadline = timeout.map_or_else(never, after);

        loop {
            if self.stopping.get().is_none() && self.shutdown_rx.try_recv().is_ok() {
                self.begin_stop();
            }
            if let Some(remaining) = self.stopping.get() {
                return Ok(Some(self.drain_before_stop(remaining)));
            }

            select! {
                recv(self.change_rx) -> msg => {
                    return self.accept(msg, NotificationClass::VariableChange).map(Some);
                }
                recv(self.calc_rx) -> msg => {
                    return self.accept(msg, NotificationClass::CalcRequest).map(Some);
                }
                recv(self.timer_rx) -> msg => {
                    return self.accept(msg, NotificationClass::Timer).map(Some);
                }
                recv(self.shutdown_rx) -> msg => {
                    if msg.is_err() {
                        return self.drain_disconnected().map(Some);
                    }
                    self.begin_stop();
                }
                recv(deadline) -> _ => return Ok(None),
            }
        }
    }

    // Only what is queued now is serviced; later arrivals do not delay the stop.
    fn begin_stop(&self) {
        self.stopping.set(Some(self.pending()));
    }

    fn drain_before_stop(&self, remaining: usize) -> Received {
        if remaining == 0 {
            return Received::Shutdown;
        }
        match self.try_pending() {
            Some(n) => {
                self.stopping.set(Some(remaining - 1));
                Received::Notification(n)
            }
            None => {
                self.stopping.set(Some(0));
                Received::Shutdown
            }
        }
    }

    fn accept(&self, msg: Result<u32, RecvError>, class: NotificationClass) -> ActionsResult<Received> {
        match msg {
            Ok(payload) => Ok(Received::Notification(Notification::new(class, payload))),
            Err(_) => self.drain_disconnected(),
        }
    }

    // Every sender is gone; hand out what is still queued on any class.
    fn drain_disconnected(&self) -> ActionsResult<Received> {
        self.try_pending()
            .map(Received::Notification)
            .ok_or_else(|| disconnected("notifications").into())
    }

    fn try_pending(&self) -> Option<Notification> {
        self.change_rx
            .try_recv()
            .map(Notification::variable_change)
            .or_else(|_| self.calc_rx.try_recv().map(Notification::calc_request))
            .or_else(|_| self.timer_rx.try_recv().map(Notification::timer))
            .ok()
    }
}
