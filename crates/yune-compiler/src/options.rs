//! Compile options.

use std::time::Duration;

/// Settings for one module pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Name of the entry point, checked against `Fn((), ())`.
    pub entry_point: String,
    /// Fold constant bodies and type annotations in the compiler instead of
    /// evaluating them through the backend.
    pub fold_constants: bool,
    /// Keep one capture per distinct name in each scope.
    pub dedup_captures: bool,
    /// Upper bound on every request to a process backend.
    pub backend_timeout: Duration,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self {
            entry_point: "main".to_string(),
            fold_constants: true,
            dedup_captures: true,
            backend_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.fold_constants = enabled;
        self
    }

    pub fn with_capture_dedup(mut self, enabled: bool) -> Self {
        self.dedup_captures = enabled;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}
