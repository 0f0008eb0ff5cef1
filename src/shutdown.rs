//! Abnormal termination.
//!
//! SIGINT and SIGTERM are watched on a dedicated thread. The watcher owns a
//! [`TerminationContext`]; on a signal it tears that context down and exits
//! the process with status 1 without waiting for the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{error, warn};

use crate::error::{ActionsError, ActionsResult};
use crate::store::VariableStore;

/// Exit status after abnormal termination.
pub const TERMINATION_EXIT_CODE: i32 = 1;

/// Engine state the termination watcher releases.
pub struct TerminationContext {
    store: Arc<dyn VariableStore>,
    filename: Option<PathBuf>,
}

impl std::fmt::Debug for TerminationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminationContext")
            .field("filename", &self.filename)
            .field("store_open", &self.store.is_open())
            .finish()
    }
}

impl TerminationContext {
    /// Context releasing `store`; `filename` is only reported.
    #[must_use]
    pub fn new(store: Arc<dyn VariableStore>, filename: Option<PathBuf>) -> Self {
        Self { store, filename }
    }

    /// Close the store handle and return the exit status to use.
    pub fn teardown(&self) -> i32 {
        let source = self
            .filename
            .as_deref()
            .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());
        error!(definition = %source, "abnormal termination");

        if let Err(e) = self.store.close() {
            warn!("closing variable store: {e}");
        }
        TERMINATION_EXIT_CODE
    }
}

/// Start the termination watcher.
///
/// The returned thread only finishes on its own if no signal could be
/// watched; otherwise it ends the process.
pub fn install_termination_handler(ctx: TerminationContext) -> ActionsResult<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ActionsError::internal(format!("signal runtime: {e}")))?;

    thread::Builder::new()
        .name("varactions-signals".to_string())
        .spawn(move || {
            if runtime.block_on(wait_for_termination()) {
                std::process::exit(ctx.teardown());
            }
        })
        .map_err(|e| ActionsError::internal(format!("spawn termination watcher: {e}")))
}

/// Resolves once SIGINT or SIGTERM arrives. False if neither can be watched.
async fn wait_for_termination() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                let signalled = tokio::select! {
                    res = tokio::signal::ctrl_c() => res.map_err(|e| warn!("cannot watch SIGINT: {e}")).is_ok(),
                    _ = term.recv() => true,
                };
                return signalled || term.recv().await.is_some();
            }
            Err(e) => warn!("cannot watch SIGTERM: {e}"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => true,
        Err(e) => {
            error!("cannot watch SIGINT: {e}");
            false
        }
    }
}
