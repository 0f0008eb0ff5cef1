//! Variable store collaborator.
//!
//! The engine only needs a handle it can pass to statements and close on
//! termination. Registering which variables raise notifications is done by
//! the loader, never by the dispatcher.

mod memory;

use std::fmt;

use crate::error::ActionsResult;
use crate::notify::NotificationClass;
use crate::value::Value;

pub use memory::InMemoryVariableStore;

/// Identifier of a shared variable, used as the payload of variable
/// notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u32);

impl VariableId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw notification payload.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to the shared variable store.
///
/// Implementations must be safe to share: the termination watcher closes the
/// handle from its own thread while the dispatcher may still hold it.
pub trait VariableStore: Send + Sync {
    /// Define a variable if it does not exist yet and return its identifier.
    fn create(&self, name: &str, initial: Value) -> ActionsResult<VariableId>;

    /// Find a variable by name.
    fn lookup(&self, name: &str) -> Option<VariableId>;

    /// Read a variable.
    fn get(&self, id: VariableId) -> ActionsResult<Value>;

    /// Write a variable, raising a change notification if one is registered.
    fn set(&self, id: VariableId, value: Value) -> ActionsResult<()>;

    /// Ask for `class` notifications whenever `id` is affected.
    fn register_notification(&self, id: VariableId, class: NotificationClass) -> ActionsResult<()>;

    /// Close the handle. Idempotent.
    fn close(&self) -> ActionsResult<()>;

    /// Whether the handle is still open.
    fn is_open(&self) -> bool;
}
