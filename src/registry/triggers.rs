//! Trigger definitions.
//!
//! A trigger is either bound to one or more variables for a variable
//! notification class, or to a single timer. The two shapes are separate
//! variants of [`Activation`], so a trigger can never carry both.

use std::fmt;

use crate::notify::NotificationClass;
use crate::statement::Statement;
use crate::store::VariableId;
use crate::timer::TimerId;
use crate::value::Value;

/// Position of a trigger in definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(usize);

impl TriggerId {
    /// Wrap a definition-order index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The definition-order index.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A local variable declared by a trigger.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub line: u32,
    pub value: Value,
}

impl Declaration {
    #[must_use]
    pub fn new(name: impl Into<String>, line: u32, value: Value) -> Self {
        Self {
            name: name.into(),
            line,
            value,
        }
    }
}

/// A shared variable a trigger refers to without owning.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub name: String,
    pub id: VariableId,
}

/// A variable whose notifications activate the owning trigger.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalBinding {
    pub line: u32,
    pub variable: VariableId,
}

impl SignalBinding {
    #[must_use]
    pub const fn new(line: u32, variable: VariableId) -> Self {
        Self { line, variable }
    }
}

/// What activates a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Variable-change or calc-request notifications for any bound variable.
    Signals {
        /// Either [`NotificationClass::VariableChange`] or [`NotificationClass::CalcRequest`].
        class: NotificationClass,
        /// Bound variables, in definition order.
        bindings: Vec<SignalBinding>,
    },
    /// Expiries of one timer.
    Timer {
        /// The timer whose expiry runs this trigger.
        timer: TimerId,
    },
}

/// A rule: an activation condition and the statements it runs.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub declarations: Vec<Declaration>,
    pub system_vars: Vec<VariableRef>,
    pub activation: Activation,
    pub statements: Vec<Statement>,
}

impl Trigger {
    /// A trigger run by change notifications of any of `variables`.
    #[must_use]
    pub fn on_change(variables: impl IntoIterator<Item = VariableId>) -> Self {
        Self::on_signals(NotificationClass::VariableChange, variables)
    }

    /// A trigger run by calc requests for any of `variables`.
    #[must_use]
    pub fn on_calc(variables: impl IntoIterator<Item = VariableId>) -> Self {
        Self::on_signals(NotificationClass::CalcRequest, variables)
    }

    /// A trigger run by expiries of `timer`.
    #[must_use]
    pub fn on_timer(timer: TimerId) -> Self {
        Self::with_activation(Activation::Timer { timer })
    }

    fn on_signals(class: NotificationClass, variables: impl IntoIterator<Item = VariableId>) -> Self {
        let bindings = variables
            .into_iter()
            .zip(1u32..)
            .map(|(variable, line)| SignalBinding::new(line, variable))
            .collect();
        Self::with_activation(Activation::Signals { class, bindings })
    }

    #[must_use]
    pub fn with_activation(activation: Activation) -> Self {
        Self {
            declarations: Vec::new(),
            system_vars: Vec::new(),
            activation,
            statements: Vec::new(),
        }
    }

    #[must_use]
    pub fn statements(mut self, statements: Vec<Statement>) -> Self {
        self.statements = statements;
        self
    }

    #[must_use]
    pub fn declarations(mut self, declarations: Vec<Declaration>) -> Self {
        self.declarations = declarations;
        self
    }

    #[must_use]
    pub fn system_vars(mut self, system_vars: Vec<VariableRef>) -> Self {
        self.system_vars = system_vars;
        self
    }

    /// The notification class this trigger listens for.
    #[must_use]
    pub fn class(&self) -> NotificationClass {
        match &self.activation {
            Activation::Signals { class, .. } => *class,
            Activation::Timer { .. } => NotificationClass::Timer,
        }
    }

    /// The bound timer, for timer triggers.
    #[must_use]
    pub fn timer(&self) -> Option<TimerId> {
        match &self.activation {
            Activation::Timer { timer } => Some(*timer),
            Activation::Signals { .. } => None,
        }
    }

    /// The bound variables, empty for timer triggers.
    #[must_use]
    pub fn bindings(&self) -> &[SignalBinding] {
        match &self.activation {
            Activation::Signals { bindings, .. } => bindings,
            Activation::Timer { .. } => &[],
        }
    }

    /// Whether a `class` notification for variable `payload` activates this
    /// trigger. Duplicate bindings still count as one match.
    #[must_use]
    pub fn is_bound_to(&self, class: NotificationClass, payload: u32) -> bool {
        match &self.activation {
            Activation::Signals { class: own, bindings } => {
                *own == class && bindings.iter().any(|b| b.variable.get() == payload)
            }
            Activation::Timer { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_follows_activation() {
        let change = Trigger::on_change([VariableId::new(1)]);
        let calc = Trigger::on_calc([VariableId::new(1)]);
        let timer = Trigger::on_timer(TimerId::new(4));

        assert_eq!(change.class(), NotificationClass::VariableChange);
        assert_eq!(calc.class(), NotificationClass::CalcRequest);
        assert_eq!(timer.class(), NotificationClass::Timer);
        assert_eq!(timer.timer(), Some(TimerId::new(4)));
        assert!(timer.bindings().is_empty());
        assert_eq!(change.timer(), None);
    }

    #[test]
    fn binding_requires_matching_class_and_variable() {
        let t = Trigger::on_change([VariableId::new(3), VariableId::new(3), VariableId::new(8)]);
        assert!(t.is_bound_to(NotificationClass::VariableChange, 3));
        assert!(t.is_bound_to(NotificationClass::VariableChange, 8));
        assert!(!t.is_bound_to(NotificationClass::CalcRequest, 3));
        assert!(!t.is_bound_to(NotificationClass::VariableChange, 4));
        assert!(!Trigger::on_timer(TimerId::new(3)).is_bound_to(NotificationClass::Timer, 3));
    }
}
