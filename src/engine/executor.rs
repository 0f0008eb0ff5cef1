//! Runs a trigger's statements.

use tracing::debug;

use crate::error::StatementError;
use crate::statement::{Statement, StatementContext, StatementRunner};

/// Run every statement in order and report the outcome of the last one.
///
/// A failure never stops the sequence. A later result always replaces an
/// earlier one, so `[fail, ok]` succeeds and `[fail(1), ok, fail(3)]` reports 3.
pub(crate) fn execute_statements(
    runner: &dyn StatementRunner,
    ctx: &mut StatementContext<'_>,
    statements: &[Statement],
) -> Result<(), StatementError> {
    let mut result = Ok(());
    for statement in statements {
        result = runner.run(ctx, statement);
        if let Err(e) = &result {
            debug!(trigger = ctx.trigger.get(), line = statement.line, code = e.code, "statement failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::notify::notification_channel;
    use crate::registry::TriggerId;
    use crate::statement::{LocalScope, StatementKind};
    use crate::store::InMemoryVariableStore;

    /// Statements are `log <code>`; code 0 succeeds, anything else fails.
    struct Scripted {
        ran: RefCell<Vec<u32>>,
    }

    impl StatementRunner for Scripted {
        fn run(&self, _ctx: &mut StatementContext<'_>, statement: &Statement) -> Result<(), StatementError> {
            self.ran.borrow_mut().push(statement.line);
            let StatementKind::Log { message } = &statement.kind else {
                panic!("unexpected statement {statement}");
            };
            match message.parse::<i32>().unwrap() {
                0 => Ok(()),
                code => Err(StatementError::new(code, statement.line, "scripted")),
            }
        }
    }

    fn outcome(codes: &[i32]) -> (Result<(), StatementError>, Vec<u32>) {
        let statements: Vec<Statement> = codes
            .iter()
            .zip(1u32..)
            .map(|(code, line)| Statement::new(line, StatementKind::Log { message: code.to_string() }))
            .collect();

        let (tx, _rx) = notification_channel();
        let store = InMemoryVariableStore::open(tx);
        let mut locals = LocalScope::default();
        let mut ctx = StatementContext {
            store: &store,
            locals: &mut locals,
            trigger: TriggerId::new(0),
        };
        let runner = Scripted { ran: RefCell::new(Vec::new()) };
        let result = execute_statements(&runner, &mut ctx, &statements);
        (result, runner.ran.into_inner())
    }

    #[test]
    fn last_failure_wins() {
        let (result, ran) = outcome(&[1, 0, 3]);
        assert_eq!(result.unwrap_err().code, 3);
        assert_eq!(ran, vec![1, 2, 3]);
    }

    #[test]
    fn later_success_overrides_earlier_failure() {
        let (result, ran) = outcome(&[1, 0]);
        assert!(result.is_ok());
        assert_eq!(ran, vec![1, 2]);
    }

    #[test]
    fn failure_does_not_short_circuit() {
        let (result, ran) = outcome(&[0, 5, 0, 0, 7]);
        assert_eq!(result.unwrap_err().code, 7);
        assert_eq!(ran.len(), 5);
    }

    #[test]
    fn empty_trigger_succeeds() {
        let (result, ran) = outcome(&[]);
        assert!(result.is_ok());
        assert!(ran.is_empty());
    }
}
