//! # varactions - event-driven variable actions
//!
//! varactions waits for notifications that a shared variable changed, that a
//! calculation was requested for one, or that an interval timer fired. Each
//! notification is matched against a statically loaded set of triggers and
//! the matched triggers' statements run in order.
//!
//! ## Core Concepts
//!
//! - **Notification**: a class (change, calc or timer) plus a 32-bit payload
//! - **Trigger**: an activation condition and an ordered list of statements
//! - **Registry**: the read-only set of triggers, in definition order
//! - **Timer Manager**: a bounded table of repeating interval timers
//! - **Engine**: the single-threaded wait, match and execute loop
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use varactions::{
//!     load, notification_channel, BasicRunner, Engine, EngineConfig, InMemoryVariableStore,
//!     ThreadTimerBackend, TimerManager,
//! };
//!
//! # fn main() -> Result<(), varactions::ActionsError> {
//! let (notifier, notifications) = notification_channel();
//! let store = Arc::new(InMemoryVariableStore::open(notifier.clone()));
//! let mut timers = TimerManager::new(ThreadTimerBackend::start(notifier)?);
//!
//! let config = EngineConfig::with_definition("plant.json");
//! let registry = load(&config, store.as_ref(), &mut timers)?;
//!
//! let mut engine = Engine::new(registry, store, Box::new(BasicRunner::new()));
//! engine.run(&notifications)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod value;

pub mod notify;
pub mod registry;
pub mod statement;
pub mod store;
pub mod timer;

pub mod engine;
pub mod shutdown;

pub use config::EngineConfig;
pub use engine::{DispatchReport, Engine};
pub use error::{
    describe_code, ActionsError, ActionsResult, ConfigError, ExecutionError, ResourceError, StatementError,
    ValidationError,
};
pub use notify::{notification_channel, Notification, NotificationClass, NotificationReceiver, Notifier, Received};
pub use registry::{load, Activation, Declaration, Registry, SignalBinding, Trigger, TriggerId, VariableRef};
pub use shutdown::{install_termination_handler, TerminationContext};
pub use statement::{BasicRunner, LocalScope, Statement, StatementContext, StatementKind, StatementRunner};
pub use store::{InMemoryVariableStore, VariableId, VariableStore};
pub use timer::{repeat_interval, ThreadTimerBackend, TimerBackend, TimerId, TimerManager, Timescale, MAX_TIMERS};
pub use value::Value;
