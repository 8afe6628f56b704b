//! Application lifecycle: `Idle → Starting → Running → Stopping → Stopped`.
//!
//! Startup hooks run in registration order and the first failure aborts the
//! start, leaving the manager `Stopped` without running the rest. Shutdown
//! hooks run in reverse registration order; a failing hook is recorded and
//! the remaining hooks still run. `Stopped` is final.
//!
//! # Example
//!
//! ```rust
//! use solon_server::{LifecycleManager, LifecycleState};
//!
//! # tokio_test::block_on(async {
//! let lifecycle = LifecycleManager::new()
//!     .on_startup("warm-cache", || async { Ok(()) })
//!     .on_shutdown("flush-cache", || async { Ok(()) });
//!
//! lifecycle.start().await.unwrap();
//! assert_eq!(lifecycle.state(), LifecycleState::Running);
//!
//! lifecycle.stop().await.unwrap();
//! assert_eq!(lifecycle.state(), LifecycleState::Stopped);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use solon_core::{SolonError, SolonResult};
use solon_telemetry::metrics::record_hook_failure;
use thiserror::Error;
use tracing::{debug, error, info};

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Built, not started.
    Idle,
    /// Verifying bindings and running startup hooks.
    Starting,
    /// Accepting requests.
    Running,
    /// Running shutdown hooks.
    Stopping,
    /// Final state.
    Stopped,
}

impl LifecycleState {
    /// Lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shutdown hook that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    /// Hook name.
    pub hook: String,
    /// Failure message.
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.hook, self.message)
    }
}

/// Lifecycle errors, also the error type hooks return.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Startup was aborted by binding verification or a startup hook.
    #[error("startup aborted: {0}")]
    Startup(#[source] SolonError),

    /// One or more shutdown hooks failed. All of them still ran.
    #[error("shutdown hooks failed: {}", join_failures(.0))]
    Shutdown(Vec<HookFailure>),

    /// The requested transition is not possible from the current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// Attempted action.
        action: &'static str,
        /// State at the time of the attempt.
        state: LifecycleState,
    },

    /// Failure reported by a hook.
    #[error("{message}")]
    Hook {
        /// Failure message.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LifecycleError {
    /// Creates a hook failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a hook failure wrapping `source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Hook {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

fn join_failures(failures: &[HookFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for lifecycle operations and hooks.
pub type LifecycleResult<T = ()> = Result<T, LifecycleError>;

/// A registered hook.
pub type LifecycleHook =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = LifecycleResult> + Send>> + Send + Sync>;

/// Runs the lifecycle state machine and its hooks.
#[must_use]
pub struct LifecycleManager {
    state: RwLock<LifecycleState>,
    startup_hooks: Vec<(String, LifecycleHook)>,
    shutdown_hooks: Vec<(String, LifecycleHook)>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("state", &self.state())
            .field("startup_hooks", &self.startup_hook_names())
            .field("shutdown_hooks", &self.shutdown_hook_names())
            .finish()
    }
}

impl LifecycleManager {
    /// Creates an `Idle` manager with no hooks.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LifecycleState::Idle),
            startup_hooks: Vec::new(),
            shutdown_hooks: Vec::new(),
        }
    }

    /// Registers a startup hook. Hooks run in registration order.
    pub fn on_startup<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        let hook: LifecycleHook = Arc::new(move || Box::pin(hook()));
        self.startup_hooks.push((name.into(), hook));
        self
    }

    /// Registers a shutdown hook. Hooks run in reverse registration order.
    pub fn on_shutdown<F, Fut>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        let hook: LifecycleHook = Arc::new(move || Box::pin(hook()));
        self.shutdown_hooks.push((name.into(), hook));
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Returns `true` while requests may be processed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Startup hook names in execution order.
    #[must_use]
    pub fn startup_hook_names(&self) -> Vec<&str> {
        self.startup_hooks.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Shutdown hook names in execution order.
    #[must_use]
    pub fn shutdown_hook_names(&self) -> Vec<&str> {
        self.shutdown_hooks
            .iter()
            .rev()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Performs `Starting` with no verification step.
    ///
    /// # Errors
    ///
    /// See [`start_with`](Self::start_with).
    pub async fn start(&self) -> LifecycleResult {
        self.start_with(|| Ok(())).await
    }

    /// Performs `Starting`: runs `verify`, then the startup hooks in order.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidState`] unless the manager is `Idle`.
    /// - [`LifecycleError::Startup`] carrying the verification error or a
    ///   [`SolonError::LifecycleHookFailure`]. The manager is then `Stopped`.
    pub async fn start_with<F>(&self, verify: F) -> LifecycleResult
    where
        F: FnOnce() -> SolonResult<()>,
    {
        self.transition("start", LifecycleState::Idle, LifecycleState::Starting)?;
        info!(hooks = self.startup_hooks.len(), "Starting");

        if let Err(e) = verify() {
            error!(error = %e, "Startup verification failed");
            self.set(LifecycleState::Stopped);
            return Err(LifecycleError::Startup(e));
        }

        for (name, hook) in &self.startup_hooks {
            debug!(hook = %name, "Running startup hook");
            if let Err(e) = hook().await {
                error!(hook = %name, error = %e, "Startup hook failed");
                record_hook_failure("startup");
                self.set(LifecycleState::Stopped);
                return Err(LifecycleError::Startup(SolonError::LifecycleHookFailure {
                    hook: name.clone(),
                    message: e.to_string(),
                }));
            }
            debug!(hook = %name, "Startup hook completed");
        }

        self.set(LifecycleState::Running);
        info!("Running");
        Ok(())
    }

    /// Performs `Stopping`: runs every shutdown hook in reverse order.
    ///
    /// Stopping an `Idle` manager goes straight to `Stopped`; stopping a
    /// `Stopped` one does nothing.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidState`] while `Starting` or `Stopping`.
    /// - [`LifecycleError::Shutdown`] listing every failed hook. The manager
    ///   is `Stopped` regardless.
    pub async fn stop(&self) -> LifecycleResult {
        {
            let mut state = self.state.write();
            match *state {
                LifecycleState::Running => *state = LifecycleState::Stopping,
                LifecycleState::Idle => {
                    *state = LifecycleState::Stopped;
                    return Ok(());
                }
                LifecycleState::Stopped => return Ok(()),
                other => {
                    return Err(LifecycleError::InvalidState {
                        action: "stop",
                        state: other,
                    })
                }
            }
        }
        info!(hooks = self.shutdown_hooks.len(), "Stopping");

        let mut failures = Vec::new();
        for (name, hook) in self.shutdown_hooks.iter().rev() {
            debug!(hook = %name, "Running shutdown hook");
            match hook().await {
                Ok(()) => debug!(hook = %name, "Shutdown hook completed"),
                Err(e) => {
                    error!(hook = %name, error = %e, "Shutdown hook failed");
                    record_hook_failure("shutdown");
                    failures.push(HookFailure {
                        hook: name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.set(LifecycleState::Stopped);
        info!("Stopped");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::Shutdown(failures))
        }
    }

    fn transition(
        &self,
        action: &'static str,
        from: LifecycleState,
        to: LifecycleState,
    ) -> LifecycleResult {
        let mut state = self.state.write();
        if *state != from {
            return Err(LifecycleError::InvalidState {
                action,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    fn set(&self, state: LifecycleState) {
        *self.state.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    fn recording(journal: &Journal, entry: &str) -> impl Fn() -> std::future::Ready<LifecycleResult> {
        let journal = Arc::clone(journal);
        let entry = entry.to_string();
        move || {
            journal.lock().push(entry.clone());
            std::future::ready(Ok(()))
        }
    }

    fn failing(journal: &Journal, entry: &str) -> impl Fn() -> std::future::Ready<LifecycleResult> {
        let journal = Arc::clone(journal);
        let entry = entry.to_string();
        move || {
            journal.lock().push(entry.clone());
            std::future::ready(Err(LifecycleError::new(format!("{entry} exploded"))))
        }
    }

    #[tokio::test]
    async fn test_empty_lifecycle_runs_through() {
        let lifecycle = LifecycleManager::new();
        assert_eq!(lifecycle.state(), LifecycleState::Idle);

        lifecycle.start().await.unwrap();
        assert!(lifecycle.is_running());

        lifecycle.stop().await.unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_startup_hooks_run_in_order() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new()
            .on_startup("a", recording(&journal, "a"))
            .on_startup("b", recording(&journal, "b"))
            .on_startup("c", recording(&journal, "c"));

        lifecycle.start().await.unwrap();
        assert_eq!(*journal.lock(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_first_startup_failure_aborts() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new()
            .on_startup("a", failing(&journal, "a"))
            .on_startup("b", recording(&journal, "b"));

        let err = lifecycle.start().await.unwrap_err();
        match err {
            LifecycleError::Startup(SolonError::LifecycleHookFailure { hook, message }) => {
                assert_eq!(hook, "a");
                assert_eq!(message, "a exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*journal.lock(), vec!["a"]);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_verification_failure_skips_hooks() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new().on_startup("a", recording(&journal, "a"));

        let err = lifecycle
            .start_with(|| {
                Err(SolonError::UnboundOperation {
                    operation_id: "getUser".to_string(),
                    message: "no handler bound".to_string(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::Startup(SolonError::UnboundOperation { .. })
        ));
        assert!(journal.lock().is_empty());
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_hooks_run_in_reverse() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new()
            .on_shutdown("c", recording(&journal, "c"))
            .on_shutdown("d", recording(&journal, "d"));
        assert_eq!(lifecycle.shutdown_hook_names(), vec!["d", "c"]);

        lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
        assert_eq!(*journal.lock(), vec!["d", "c"]);
    }

    #[tokio::test]
    async fn test_shutdown_failure_does_not_stop_remaining_hooks() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new()
            .on_shutdown("first", recording(&journal, "first"))
            .on_shutdown("second", failing(&journal, "second"));

        lifecycle.start().await.unwrap();
        let err = lifecycle.stop().await.unwrap_err();

        assert_eq!(*journal.lock(), vec!["second", "first"]);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
        match err {
            LifecycleError::Shutdown(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].hook, "second");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid() {
        let lifecycle = LifecycleManager::new();
        lifecycle.start().await.unwrap();

        let err = lifecycle.start().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                action: "start",
                state: LifecycleState::Running
            }
        ));
    }

    #[tokio::test]
    async fn test_stopped_is_final() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new().on_shutdown("d", recording(&journal, "d"));

        lifecycle.start().await.unwrap();
        lifecycle.stop().await.unwrap();
        lifecycle.stop().await.unwrap();
        assert_eq!(*journal.lock(), vec!["d"]);

        assert!(lifecycle.start().await.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_from_idle_skips_hooks() {
        let journal = Journal::default();
        let lifecycle = LifecycleManager::new().on_shutdown("d", recording(&journal, "d"));

        lifecycle.stop().await.unwrap();
        assert!(journal.lock().is_empty());
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_shutdown_error_message_lists_failures() {
        let err = LifecycleError::Shutdown(vec![
            HookFailure {
                hook: "db".to_string(),
                message: "timeout".to_string(),
            },
            HookFailure {
                hook: "cache".to_string(),
                message: "refused".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "shutdown hooks failed: db: timeout; cache: refused"
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LifecycleState::Running.to_string(), "running");
        assert_eq!(LifecycleState::Stopping.as_str(), "stopping");
    }
}
