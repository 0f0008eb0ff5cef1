//! Loads the trigger definition file.
//!
//! The definition is JSON:
//!
//! ```json
//! {
//!   "name": "boiler",
//!   "description": "keeps the water warm",
//!   "variables": [{ "name": "temp", "value": 20 }, { "name": "heater" }],
//!   "actions": [
//!     {
//!       "declarations": [{ "name": "n", "value": 0 }],
//!       "system_vars": ["heater"],
//!       "trigger": { "on": "change", "vars": ["temp"] },
//!       "statements": ["set heater = 1"]
//!     },
//!     { "trigger": { "on": "timer", "every": 5, "unit": "s" }, "statements": ["log tick"] }
//!   ]
//! }
//! ```
//!
//! Loading resolves variable names against the store, registers the
//! notifications each bound variable must raise, and creates the timers.
//! Line numbers are the 1-based position of an entry within its list.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{ActionsResult, ConfigError, ValidationError};
use crate::notify::NotificationClass;
use crate::statement::Statement;
use crate::store::{VariableId, VariableStore};
use crate::timer::{Timescale, TimerBackend, TimerManager};
use crate::value::Value;

use super::triggers::{Activation, Declaration, SignalBinding, Trigger, VariableRef};
use super::Registry;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Definition {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    variables: Vec<VariableDef>,
    actions: Vec<ActionDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableDef {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ActionDef {
    #[serde(default)]
    declarations: Vec<VariableDef>,
    #[serde(default)]
    system_vars: Vec<String>,
    trigger: TriggerDef,
    #[serde(default)]
    statements: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "on", rename_all = "snake_case")]
enum TriggerDef {
    Change { vars: Vec<String> },
    Calc { vars: Vec<String> },
    Timer { every: u32, unit: String },
}

/// Load the definition named by `config`.
pub fn load<B: TimerBackend>(
    config: &EngineConfig,
    store: &dyn VariableStore,
    timers: &mut TimerManager<B>,
) -> ActionsResult<Registry> {
    let path = config.definition.as_deref().ok_or(ConfigError::MissingDefinition)?;
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&text, path, config, store, timers)
}

/// Load a definition from text; `path` is only used for messages.
pub fn load_from_str<B: TimerBackend>(
    text: &str,
    path: &Path,
    config: &EngineConfig,
    store: &dyn VariableStore,
    timers: &mut TimerManager<B>,
) -> ActionsResult<Registry> {
    let def: Definition = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for var in def.variables {
        let initial = scalar(&var.name, var.value)?;
        store.create(&var.name, initial)?;
    }

    let mut builder = Registry::builder()
        .filename(path)
        .verbose(config.verbose)
        .output(config.output);
    if let Some(name) = def.name {
        builder = builder.name(name);
    }
    if let Some(description) = def.description {
        builder = builder.description(description);
    }

    for (index, action) in def.actions.into_iter().enumerate() {
        builder = builder.trigger(build_trigger(index, action, store, timers)?);
    }

    let registry = builder.build();
    info!(path = %path.display(), triggers = registry.len(), "loaded trigger definition");
    Ok(registry)
}

fn build_trigger<B: TimerBackend>(
    index: usize,
    action: ActionDef,
    store: &dyn VariableStore,
    timers: &mut TimerManager<B>,
) -> ActionsResult<Trigger> {
    let activation = match action.trigger {
        TriggerDef::Change { vars } => bind(index, NotificationClass::VariableChange, &vars, store)?,
        TriggerDef::Calc { vars } => bind(index, NotificationClass::CalcRequest, &vars, store)?,
        TriggerDef::Timer { every, unit } => {
            let scale = match unit.parse::<Timescale>() {
                Ok(scale) => Some(scale),
                Err(e) => {
                    warn!(action = index, error = %e, "unrecognised timer unit");
                    None
                }
            };
            Activation::Timer {
                timer: timers.create_repeating_timer(every, scale)?,
            }
        }
    };

    let declarations = action
        .declarations
        .into_iter()
        .zip(1u32..)
        .map(|(decl, line)| -> ActionsResult<Declaration> {
            let value = scalar(&decl.name, decl.value)?;
            Ok(Declaration::new(decl.name, line, value))
        })
        .collect::<ActionsResult<Vec<_>>>()?;

    let system_vars = action
        .system_vars
        .into_iter()
        .map(|name| -> ActionsResult<VariableRef> {
            let id = resolve(&name, store)?;
            Ok(VariableRef { name, id })
        })
        .collect::<ActionsResult<Vec<_>>>()?;

    let statements = action
        .statements
        .iter()
        .zip(1u32..)
        .map(|(text, line)| Statement::parse(line, text))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Trigger {
        declarations,
        system_vars,
        activation,
        statements,
    })
}

fn bind(
    index: usize,
    class: NotificationClass,
    vars: &[String],
    store: &dyn VariableStore,
) -> ActionsResult<Activation> {
    if vars.is_empty() {
        return Err(ValidationError::EmptyBindings { action: index, class }.into());
    }

    let mut bindings = Vec::with_capacity(vars.len());
    for (name, line) in vars.iter().zip(1u32..) {
        let variable = resolve(name, store)?;
        store.register_notification(variable, class)?;
        bindings.push(SignalBinding::new(line, variable));
    }
    Ok(Activation::Signals { class, bindings })
}

fn resolve(name: &str, store: &dyn VariableStore) -> ActionsResult<VariableId> {
    store.lookup(name).ok_or_else(|| {
        ValidationError::UnknownVariable {
            name: name.to_string(),
        }
        .into()
    })
}

fn scalar(name: &str, value: serde_json::Value) -> ActionsResult<Value> {
    Value::try_from(value).map_err(|reason| {
        ValidationError::InvalidValue {
            name: name.to_string(),
            reason,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;
    use crate::error::{ActionsError, ResourceError};
    use crate::notify::{notification_channel, Notifier};
    use crate::registry::TriggerId;
    use crate::store::InMemoryVariableStore;
    use crate::timer::{TimerId, TimerManager};

    #[derive(Debug, Default)]
    struct NullBackend {
        armed: Vec<Duration>,
    }

    impl TimerBackend for NullBackend {
        fn arm(&mut self, _id: TimerId, period: Duration) -> Result<(), ResourceError> {
            self.armed.push(period);
            Ok(())
        }
    }

    fn fixture() -> (Notifier, InMemoryVariableStore, TimerManager<NullBackend>) {
        let (tx, _rx) = notification_channel();
        let store = InMemoryVariableStore::open(tx.clone());
        (tx, store, TimerManager::new(NullBackend::default()))
    }

    fn load_text(text: &str) -> ActionsResult<(Registry, InMemoryVariableStore, TimerManager<NullBackend>)> {
        let (_tx, store, mut timers) = fixture();
        let reg = load_from_str(text, Path::new("test.json"), &EngineConfig::default(), &store, &mut timers)?;
        Ok((reg, store, timers))
    }

    const BOILER: &str = r#"{
        "name": "boiler",
        "variables": [{ "name": "temp", "value": 20 }, { "name": "heater" }],
        "actions": [
            {
                "declarations": [{ "name": "n", "value": 0 }],
                "system_vars": ["heater"],
                "trigger": { "on": "change", "vars": ["temp"] },
                "statements": ["set heater = 1", "log heating"]
            },
            { "trigger": { "on": "timer", "every": 1500, "unit": "ms" }, "statements": ["log tick"] },
            { "trigger": { "on": "calc", "vars": ["heater", "temp"] } }
        ]
    }"#;

    #[test]
    fn loads_triggers_in_definition_order() {
        let (reg, store, timers) = load_text(BOILER).unwrap();
        let temp = store.lookup("temp").unwrap();
        let heater = store.lookup("heater").unwrap();

        assert_eq!(reg.name(), Some("boiler"));
        assert_eq!(reg.len(), 3);

        let first = reg.get(TriggerId::new(0)).unwrap();
        assert_eq!(first.class(), NotificationClass::VariableChange);
        assert_eq!(first.bindings(), &[SignalBinding::new(1, temp)]);
        assert_eq!(first.declarations, vec![Declaration::new("n", 1, Value::Int(0))]);
        assert_eq!(first.system_vars, vec![VariableRef { name: "heater".into(), id: heater }]);
        assert_eq!(first.statements.len(), 2);
        assert_eq!(first.statements[1].line, 2);

        let second = reg.get(TriggerId::new(1)).unwrap();
        assert_eq!(second.timer(), Some(TimerId::new(1)));
        assert_eq!(timers.backend().armed, vec![Duration::from_millis(1500)]);

        let third = reg.get(TriggerId::new(2)).unwrap();
        assert_eq!(third.class(), NotificationClass::CalcRequest);
        assert_eq!(third.bindings().len(), 2);
        assert!(third.statements.is_empty());
    }

    #[test]
    fn bound_variables_raise_notifications() {
        let (tx, rx) = notification_channel();
        let store = InMemoryVariableStore::open(tx);
        let mut timers = TimerManager::new(NullBackend::default());
        load_from_str(BOILER, Path::new("t.json"), &EngineConfig::default(), &store, &mut timers).unwrap();

        let temp = store.lookup("temp").unwrap();
        store.set(temp, Value::Int(30)).unwrap();
        assert_eq!(rx.pending(), 1);
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let err = load_text(r#"{ "actions": [{ "trigger": { "on": "change", "vars": ["ghost"] } }] }"#).unwrap_err();
        assert!(matches!(err, ActionsError::Validation(ValidationError::UnknownVariable { ref name }) if name == "ghost"));
    }

    #[test]
    fn empty_binding_set_is_rejected() {
        let err = load_text(r#"{ "actions": [{ "trigger": { "on": "calc", "vars": [] } }] }"#).unwrap_err();
        assert!(matches!(err, ActionsError::Validation(ValidationError::EmptyBindings { action: 0, .. })));
    }

    #[test]
    fn zero_or_unknown_timer_interval_is_rejected() {
        let err = load_text(r#"{ "actions": [{ "trigger": { "on": "timer", "every": 0, "unit": "s" } }] }"#).unwrap_err();
        assert!(err.is_resource());

        let err = load_text(r#"{ "actions": [{ "trigger": { "on": "timer", "every": 2, "unit": "fortnights" } }] }"#)
            .unwrap_err();
        assert!(err.is_resource());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = load_text("{ \"actions\": [").unwrap_err();
        assert!(err.is_config());

        let err = load_text(r#"{ "actions": [{ "trigger": { "on": "sometimes" } }] }"#).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn bad_statement_is_rejected() {
        let err = load_text(r#"{ "actions": [{ "trigger": { "on": "timer", "every": 1, "unit": "s" }, "statements": ["dance"] }] }"#)
            .unwrap_err();
        assert!(matches!(err, ActionsError::Validation(ValidationError::InvalidStatement { line: 1, .. })));
    }

    #[test]
    fn load_reads_file_from_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BOILER.as_bytes()).unwrap();

        let (_tx, store, mut timers) = fixture();
        let config = EngineConfig {
            verbose: true,
            ..EngineConfig::with_definition(file.path())
        };
        let reg = load(&config, &store, &mut timers).unwrap();
        assert!(reg.verbose());
        assert_eq!(reg.filename(), Some(file.path()));
    }

    #[test]
    fn missing_file_and_missing_path_are_config_errors() {
        let (_tx, store, mut timers) = fixture();
        let err = load(&EngineConfig::default(), &store, &mut timers).unwrap_err();
        assert!(matches!(err, ActionsError::Config(ConfigError::MissingDefinition)));

        let config = EngineConfig::with_definition("/nonexistent/varactions/definition.json");
        let err = load(&config, &store, &mut timers).unwrap_err();
        assert!(matches!(err, ActionsError::Config(ConfigError::Io { .. })));
    }
}
