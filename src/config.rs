//! Engine configuration.

use std::path::PathBuf;

/// Startup options for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Report every received notification and its result.
    pub verbose: bool,
    /// Print documentation of the loaded definition before running.
    pub output: bool,
    /// Path to the trigger definition.
    pub definition: Option<PathBuf>,
}

impl EngineConfig {
    /// Defaults with a definition file.
    #[must_use]
    pub fn with_definition(path: impl Into<PathBuf>) -> Self {
        Self {
            definition: Some(path.into()),
            ..Self::default()
        }
    }
}
