//! In-memory variable store.
//!
//! Thread-safe reference implementation of [`VariableStore`], used by the
//! binary and by tests. Writes and calc requests are turned into notifications
//! on the [`Notifier`] the store was opened with.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::{ActionsError, ActionsResult, ExecutionError, ValidationError};
use crate::notify::{Notification, NotificationClass, Notifier};
use crate::value::Value;

use super::{VariableId, VariableStore};

fn lock_err(context: &'static str) -> ActionsError {
    ActionsError::internal(format!("poisoned lock: {context}"))
}

#[derive(Debug)]
struct VariableEntry {
    name: String,
    value: Value,
    notify_change: bool,
    notify_calc: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    by_name: HashMap<String, VariableId>,
    vars: Vec<VariableEntry>,
}

impl StoreState {
    fn entry(&self, id: VariableId) -> ActionsResult<&VariableEntry> {
        let idx = (id.get() as usize).checked_sub(1);
        idx.and_then(|i| self.vars.get(i))
            .ok_or_else(|| ExecutionError::VariableNotFound { id: id.get() }.into())
    }

    fn entry_mut(&mut self, id: VariableId) -> ActionsResult<&mut VariableEntry> {
        let idx = (id.get() as usize).checked_sub(1);
        idx.and_then(|i| self.vars.get_mut(i))
            .ok_or_else(|| ExecutionError::VariableNotFound { id: id.get() }.into())
    }
}

/// Variable store held in process memory.
#[derive(Debug)]
pub struct InMemoryVariableStore {
    state: RwLock<StoreState>,
    notifier: Notifier,
    open: AtomicBool,
}

impl InMemoryVariableStore {
    /// Open a store whose notifications are raised on `notifier`.
    #[must_use]
    pub fn open(notifier: Notifier) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            notifier,
            open: AtomicBool::new(true),
        }
    }

    /// Request a calculation of `id`.
    ///
    /// Raises a calc-request notification if one is registered for `id`.
    pub fn request_calc(&self, id: VariableId) -> ActionsResult<()> {
        self.ensure_open()?;
        let registered = {
            let state = self.state.read().map_err(|_| lock_err("variables"))?;
            state.entry(id)?.notify_calc
        };
        if registered {
            self.notifier.raise(Notification::calc_request(id.get()))?;
        }
        Ok(())
    }

    /// Name of a variable.
    pub fn name(&self, id: VariableId) -> ActionsResult<String> {
        let state = self.state.read().map_err(|_| lock_err("variables"))?;
        Ok(state.entry(id)?.name.clone())
    }

    fn ensure_open(&self) -> ActionsResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ExecutionError::StoreClosed.into())
        }
    }
}

impl VariableStore for InMemoryVariableStore {
    fn create(&self, name: &str, initial: Value) -> ActionsResult<VariableId> {
        self.ensure_open()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField {
                field: "variable name".to_string(),
            }
            .into());
        }

        let mut state = self.state.write().map_err(|_| lock_err("variables"))?;
        if let Some(id) = state.by_name.get(name) {
            return Ok(*id);
        }

        let raw = u32::try_from(state.vars.len() + 1)
            .map_err(|_| ActionsError::internal("variable table overflow"))?;
        let id = VariableId::new(raw);
        state.vars.push(VariableEntry {
            name: name.to_string(),
            value: initial,
            notify_change: false,
            notify_calc: false,
        });
        state.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    fn lookup(&self, name: &str) -> Option<VariableId> {
        let state = self.state.read().ok()?;
        state.by_name.get(name.trim()).copied()
    }

    fn get(&self, id: VariableId) -> ActionsResult<Value> {
        self.ensure_open()?;
        let state = self.state.read().map_err(|_| lock_err("variables"))?;
        Ok(state.entry(id)?.value.clone())
    }

    fn set(&self, id: VariableId, value: Value) -> ActionsResult<()> {
        self.ensure_open()?;
        let notify = {
            let mut state = self.state.write().map_err(|_| lock_err("variables"))?;
            let entry = state.entry_mut(id)?;
            debug!(variable = %entry.name, %value, "set");
            entry.value = value;
            entry.notify_change
        };

        if notify {
            // The write already happened; a missing consumer only loses the event.
            if let Err(e) = self.notifier.raise(Notification::variable_change(id.get())) {
                warn!(variable = id.get(), error = %e, "change notification undeliverable");
            }
        }
        Ok(())
    }

    fn register_notification(&self, id: VariableId, class: NotificationClass) -> ActionsResult<()> {
        self.ensure_open()?;
        let mut state = self.state.write().map_err(|_| lock_err("variables"))?;
        let entry = state.entry_mut(id)?;
        match class {
            NotificationClass::VariableChange => entry.notify_change = true,
            NotificationClass::CalcRequest => entry.notify_calc = true,
            NotificationClass::Timer => {
                return Err(ValidationError::UnsupportedRegistration { class }.into());
            }
        }
        Ok(())
    }

    fn close(&self) -> ActionsResult<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("variable store closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
