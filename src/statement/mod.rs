//! Statements and the execution collaborator.
//!
//! The engine treats a statement as opaque: it hands each one, in order, to a
//! [`StatementRunner`] together with the store handle and the trigger's local
//! scope, and only looks at the returned result.

mod basic;

use std::fmt;

use crate::error::{StatementError, ValidationError};
use crate::registry::{Declaration, TriggerId};
use crate::store::VariableStore;
use crate::value::Value;

pub use basic::BasicRunner;

/// What a statement does.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `set <name> = <value>`: write a local or shared variable.
    Set { target: String, value: String },
    /// `run <command>`: run a shell command.
    Run { command: String },
    /// `log <message>`: emit a log line.
    Log { message: String },
}

/// One statement of a trigger.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: u32,
    pub kind: StatementKind,
}

impl Statement {
    #[must_use]
    pub const fn new(line: u32, kind: StatementKind) -> Self {
        Self { line, kind }
    }

    /// Parse a statement from its textual form.
    pub fn parse(line: u32, text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();
        let (verb, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        let rest = rest.trim();
        let invalid = |reason: &str| ValidationError::InvalidStatement {
            line,
            reason: reason.to_string(),
        };

        let kind = match verb {
            "set" => {
                let (target, value) = rest
                    .split_once('=')
                    .ok_or_else(|| invalid("expected 'set <name> = <value>'"))?;
                let target = target.trim();
                if target.is_empty() {
                    return Err(invalid("missing assignment target"));
                }
                StatementKind::Set {
                    target: target.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "run" if !rest.is_empty() => StatementKind::Run {
                command: rest.to_string(),
            },
            "run" => return Err(invalid("missing command")),
            "log" => StatementKind::Log {
                message: rest.to_string(),
            },
            other => return Err(invalid(&format!("unknown statement '{other}'"))),
        };

        Ok(Self { line, kind })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Set { target, value } => write!(f, "set {target} = {value}"),
            StatementKind::Run { command } => write!(f, "run {command}"),
            StatementKind::Log { message } => write!(f, "log {message}"),
        }
    }
}

/// Current values of a trigger's local declarations.
///
/// Seeded from the declarations at load time; statements may overwrite them
/// and the values persist across executions of the same trigger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalScope {
    values: Vec<(String, Value)>,
}

impl LocalScope {
    /// Locals seeded with each declaration's initial value.
    #[must_use]
    pub fn from_declarations(declarations: &[Declaration]) -> Self {
        Self {
            values: declarations
                .iter()
                .map(|d| (d.name.clone(), d.value.clone()))
                .collect(),
        }
    }

    /// Current value of a declared local.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Overwrite a declared local. Returns false if `name` is not declared.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Everything a statement may touch while it runs.
pub struct StatementContext<'a> {
    /// Shared variable store handle.
    pub store: &'a dyn VariableStore,
    /// The running trigger's local declarations.
    pub locals: &'a mut LocalScope,
    /// The running trigger.
    pub trigger: TriggerId,
}

/// Execution collaborator: runs one statement.
pub trait StatementRunner: Send {
    /// Run `statement`, reporting failure with an errno-style code.
    fn run(&self, ctx: &mut StatementContext<'_>, statement: &Statement) -> Result<(), StatementError>;
}
