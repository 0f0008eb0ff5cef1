//! Trigger registry.
//!
//! The registry is built once from the trigger definition and is read-only
//! afterwards. Triggers live in a `Vec` in definition order and are addressed
//! by [`TriggerId`]; that order decides which trigger a timer expiry runs.

/// Trigger-definition loader.
pub mod loader;
/// Notification matching.
pub mod matcher;
/// Trigger data model.
pub mod triggers;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub use loader::load;
pub use triggers::{Activation, Declaration, SignalBinding, Trigger, TriggerId, VariableRef};

/// The loaded set of triggers plus display metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    filename: Option<PathBuf>,
    name: Option<String>,
    description: Option<String>,
    verbose: bool,
    output: bool,
    triggers: Vec<Trigger>,
}

impl Registry {
    /// Start an empty registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Definition file the registry was loaded from.
    #[must_use]
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Optional name given in the definition.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Optional description given in the definition.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether per-notification diagnostics are reported.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether documentation output was requested.
    #[must_use]
    pub const fn output(&self) -> bool {
        self.output
    }

    /// The trigger with identifier `id`.
    #[must_use]
    pub fn get(&self, id: TriggerId) -> Option<&Trigger> {
        self.triggers.get(id.get())
    }

    /// Triggers with their ids, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (TriggerId, &Trigger)> {
        self.triggers
            .iter()
            .enumerate()
            .map(|(idx, t)| (TriggerId::new(idx), t))
    }

    /// Number of triggers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Whether no trigger is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Plain-text documentation of the loaded definition.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.name.as_deref().unwrap_or("actions"));
        if let Some(desc) = &self.description {
            let _ = writeln!(out, "{desc}");
        }
        if let Some(path) = &self.filename {
            let _ = writeln!(out, "source: {}", path.display());
        }

        for (id, trigger) in self.iter() {
            let _ = write!(out, "\naction {id}: on {}", trigger.class());
            match &trigger.activation {
                Activation::Signals { bindings, .. } => {
                    let vars: Vec<String> = bindings.iter().map(|b| b.variable.to_string()).collect();
                    let _ = writeln!(out, " of variables [{}]", vars.join(", "));
                }
                Activation::Timer { timer } => {
                    let _ = writeln!(out, " {timer}");
                }
            }
            for decl in &trigger.declarations {
                let _ = writeln!(out, "  local {} = {}", decl.name, decl.value);
            }
            for var in &trigger.system_vars {
                let _ = writeln!(out, "  uses {} ({})", var.name, var.id);
            }
            for stmt in &trigger.statements {
                let _ = writeln!(out, "  {:>4}: {stmt}", stmt.line);
            }
        }
        out
    }
}

/// Builder for [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    inner: Registry,
}

#[allow(missing_docs)]
impl RegistryBuilder {
    #[must_use]
    pub fn filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.filename = Some(path.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.inner.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn output(mut self, output: bool) -> Self {
        self.inner.output = output;
        self
    }

    /// Append a trigger; definition order is preserved.
    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.inner.triggers.push(trigger);
        self
    }

    #[must_use]
    pub fn build(self) -> Registry {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Statement;
    use crate::store::VariableId;
    use crate::timer::TimerId;
    use crate::value::Value;

    #[test]
    fn describe_lists_each_action() {
        let reg = Registry::builder()
            .name("boiler")
            .description("keeps the water warm")
            .trigger(
                Trigger::on_change([VariableId::new(42)])
                    .declarations(vec![Declaration::new("n", 2, Value::Int(0))])
                    .statements(vec![Statement::parse(3, "set y = 1").unwrap()]),
            )
            .trigger(Trigger::on_timer(TimerId::new(3)))
            .build();

        let text = reg.describe();
        assert!(text.starts_with("boiler\nkeeps the water warm\n"));
        assert!(text.contains("action #0: on change of variables [42]"));
        assert!(text.contains("local n = 0"));
        assert!(text.contains("   3: set y = 1"));
        assert!(text.contains("action #1: on timer 3"));
    }

    #[test]
    fn builder_keeps_definition_order() {
        let reg = Registry::builder()
            .verbose(true)
            .trigger(Trigger::on_timer(TimerId::new(2)))
            .trigger(Trigger::on_timer(TimerId::new(1)))
            .build();
        assert!(reg.verbose());
        assert!(!reg.output());
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(TriggerId::new(1)).unwrap().timer(), Some(TimerId::new(1)));
        assert!(reg.get(TriggerId::new(2)).is_none());
    }
}
