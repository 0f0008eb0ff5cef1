//! Reference execution collaborator.

use std::borrow::Cow;
use std::process::Command;

use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::error::{StatementError, EINVAL, EIO, ENOENT};
use crate::value::Value;

use super::{Statement, StatementContext, StatementKind, StatementRunner};

/// Runs `set`, `run` and `log` statements.
///
/// `$name` and `${name}` are replaced with the value of a local declaration or,
/// failing that, of the shared variable with that name. Unknown names expand
/// to nothing.
#[derive(Debug, Clone)]
pub struct BasicRunner {
    interpolation: Regex,
}

impl Default for BasicRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicRunner {
    /// Runner for the built-in statement kinds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interpolation: Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("valid interpolation pattern"),
        }
    }

    fn interpolate<'t>(&self, ctx: &StatementContext<'_>, text: &'t str) -> Cow<'t, str> {
        self.interpolation.replace_all(text, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            lookup(ctx, name).map(|v| v.to_plain_string()).unwrap_or_default()
        })
    }

    fn set(&self, ctx: &mut StatementContext<'_>, line: u32, target: &str, value: &str) -> Result<(), StatementError> {
        let value = Value::parse_literal(&self.interpolate(ctx, value));
        if ctx.locals.get(target).is_some() {
            ctx.locals.set(target, value);
            return Ok(());
        }

        let id = ctx
            .store
            .lookup(target)
            .ok_or_else(|| StatementError::new(ENOENT, line, format!("unknown variable '{target}'")))?;
        ctx.store
            .set(id, value)
            .map_err(|e| StatementError::new(e.code(), line, e.to_string()))
    }

    fn run_command(&self, ctx: &StatementContext<'_>, line: u32, command: &str) -> Result<(), StatementError> {
        let argv: Vec<String> = shlex::split(command)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| StatementError::new(EINVAL, line, format!("cannot split command: {command}")))?
            .iter()
            .map(|arg| self.interpolate(ctx, arg).into_owned())
            .collect();

        debug!(line, ?argv, "running command");
        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .map_err(|e| StatementError::new(e.raw_os_error().unwrap_or(EIO), line, e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            let code = status.code().filter(|c| *c != 0).unwrap_or(EIO);
            Err(StatementError::new(code, line, format!("'{command}' exited with {status}")))
        }
    }
}

fn lookup(ctx: &StatementContext<'_>, name: &str) -> Option<Value> {
    if let Some(v) = ctx.locals.get(name) {
        return Some(v.clone());
    }
    let id = ctx.store.lookup(name)?;
    ctx.store.get(id).ok()
}

impl StatementRunner for BasicRunner {
    fn run(&self, ctx: &mut StatementContext<'_>, statement: &Statement) -> Result<(), StatementError> {
        match &statement.kind {
            StatementKind::Set { target, value } => self.set(ctx, statement.line, target, value),
            StatementKind::Run { command } => self.run_command(ctx, statement.line, command),
            StatementKind::Log { message } => {
                let message = self.interpolate(ctx, message);
                info!(trigger = ctx.trigger.get(), line = statement.line, "{message}");
                Ok(())
            }
        }
    }
}
