//! Dispatch engine.
//!
//! One thread blocks on the notification multi-wait, matches the delivered
//! notification against the registry and runs the matched triggers' statements
//! before waiting again. Nothing here runs concurrently with itself: a
//! statement that blocks stalls the whole engine.

mod executor;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{describe_code, ActionsResult, ExecutionError, StatementError, ENOENT, EOK};
use crate::notify::{Notification, NotificationReceiver, Received};
use crate::registry::{Registry, TriggerId};
use crate::statement::{LocalScope, StatementContext, StatementRunner};
use crate::store::VariableStore;

/// Outcome of servicing one notification.
///
/// The dispatch succeeds as soon as one trigger matched. A trigger whose
/// statements failed is recorded in `failures` but does not change the
/// overall result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// The serviced notification.
    pub notification: Notification,
    /// Triggers that ran, in execution order. Empty if nothing matched.
    pub fired: Vec<TriggerId>,
    /// Triggers whose statements reported a failure, with that failure.
    pub failures: Vec<(TriggerId, StatementError)>,
}

impl DispatchReport {
    /// Whether no trigger matched the notification.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.fired.is_empty()
    }

    /// The statement failure of `trigger`, if it ran and failed.
    #[must_use]
    pub fn failure(&self, trigger: TriggerId) -> Option<&StatementError> {
        self.failures
            .iter()
            .find(|(id, _)| *id == trigger)
            .map(|(_, e)| e)
    }

    /// errno-style result code: success if any trigger matched.
    #[must_use]
    pub fn code(&self) -> i32 {
        if self.is_not_found() {
            ENOENT
        } else {
            EOK
        }
    }

    /// Convert into a typed result.
    pub fn into_result(self) -> ActionsResult<()> {
        if self.fired.is_empty() {
            return Err(ExecutionError::NoMatchingTrigger {
                class: self.notification.class,
                payload: self.notification.payload,
            }
            .into());
        }
        Ok(())
    }
}

/// The engine: a loaded registry plus the collaborators its statements use.
pub struct Engine {
    registry: Registry,
    store: Arc<dyn VariableStore>,
    runner: Box<dyn StatementRunner>,
    locals: Vec<LocalScope>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("triggers", &self.registry.len())
            .field("verbose", &self.registry.verbose())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine. Each trigger's local scope is seeded from its
    /// declarations and persists across executions.
    #[must_use]
    pub fn new(registry: Registry, store: Arc<dyn VariableStore>, runner: Box<dyn StatementRunner>) -> Self {
        let locals = registry
            .iter()
            .map(|(_, t)| LocalScope::from_declarations(&t.declarations))
            .collect();
        Self {
            registry,
            store,
            runner,
            locals,
        }
    }

    /// The loaded registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The shared variable store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn VariableStore> {
        &self.store
    }

    /// Current local values of a trigger.
    #[must_use]
    pub fn locals(&self, id: TriggerId) -> Option<&LocalScope> {
        self.locals.get(id.get())
    }

    /// Match `notification` and run every activated trigger.
    ///
    /// Statement failures are logged and collected in the report.
    pub fn dispatch(&mut self, notification: Notification) -> DispatchReport {
        let fired = self.registry.matching(notification);
        let mut failures = Vec::new();

        for &id in &fired {
            let Some(trigger) = self.registry.get(id) else {
                continue;
            };
            let Some(locals) = self.locals.get_mut(id.get()) else {
                continue;
            };
            let mut ctx = StatementContext {
                store: self.store.as_ref(),
                locals,
                trigger: id,
            };
            match executor::execute_statements(self.runner.as_ref(), &mut ctx, &trigger.statements) {
                Ok(()) => debug!(trigger = %id, "trigger finished"),
                Err(e) => {
                    warn!(trigger = %id, code = e.code, line = e.line, "{e}");
                    failures.push((id, e));
                }
            }
        }

        DispatchReport {
            notification,
            fired,
            failures,
        }
    }

    /// Service notifications until a cooperative shutdown is received.
    ///
    /// An unmatched notification or a failed trigger is logged and the loop
    /// continues. Only a failure of the wait itself ends the loop with an error.
    pub fn run(&mut self, notifications: &NotificationReceiver) -> ActionsResult<()> {
        let verbose = self.registry.verbose();
        info!(triggers = self.registry.len(), "dispatcher started");

        loop {
            let notification = match notifications.wait()? {
                Received::Notification(n) => n,
                Received::Shutdown => {
                    info!("dispatcher stopped");
                    return Ok(());
                }
            };

            if verbose {
                info!("received {notification}");
            }

            let report = self.dispatch(notification);
            let code = report.code();
            if verbose {
                info!(code, "result: {}", describe_code(code));
            }
            if let Err(e) = report.into_result() {
                debug!("{e}");
            }
        }
    }
}
