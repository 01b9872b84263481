// Compensating actions for multi-resource mutations

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;

use log::{error, warn};

use crate::upload::error::{UploadError, UploadResult};

type RollbackFuture = Pin<Box<dyn Future<Output = UploadResult<()>> + Send>>;
type RollbackAction = Box<dyn FnOnce() -> RollbackFuture + Send>;

/// Undo actions in the order their steps succeeded
#[derive(Default)]
struct RollbackGuard {
    actions: Vec<RollbackAction>,
}

impl RollbackGuard {
    fn take(&mut self) -> Vec<RollbackAction> {
        mem::take(&mut self.actions)
    }
}

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        let actions = self.take();
        if actions.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("unconfirmed operation dropped; rolling back {} step(s)", actions.len());
                handle.spawn(run_rollbacks(actions));
            }
            Err(_) => error!(
                "unconfirmed operation dropped outside a runtime; {} rollback step(s) lost",
                actions.len()
            ),
        }
    }
}

/// Run undo actions newest first, collecting every failure
async fn run_rollbacks(actions: Vec<RollbackAction>) -> Vec<UploadError> {
    let mut failures = Vec::new();
    for action in actions.into_iter().rev() {
        if let Err(e) = action().await {
            error!("rollback step failed: {}", e);
            failures.push(e);
        }
    }
    failures
}

/// A value produced by a step that has already mutated some resource,
/// paired with the action that undoes the mutation.
///
/// The undo action runs unless [`confirm`](Self::confirm) is called. An
/// explicit [`rollback`](Self::rollback) awaits it; dropping the operation
/// without confirming spawns it on the current tokio runtime, so early
/// returns through `?` still compensate.
///
/// ```
/// # use soundscape_ingest::reversible::ReversibleOperation;
/// # async fn demo() {
/// let created = ReversibleOperation::new(42, || async { Ok(()) });
/// let stored = ReversibleOperation::new("row", || async { Ok(()) });
///
/// // Undo of `stored` runs before undo of `created`
/// let both = created.combine(stored);
/// assert_eq!(both.confirm(), (42, "row"));
/// # }
/// ```
pub struct ReversibleOperation<T> {
    value: T,
    guard: RollbackGuard,
}

impl<T> ReversibleOperation<T> {
    pub fn new<F, Fut>(value: T, rollback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UploadResult<()>> + Send + 'static,
    {
        let action: RollbackAction = Box::new(move || Box::pin(rollback()));
        ReversibleOperation {
            value,
            guard: RollbackGuard {
                actions: vec![action],
            },
        }
    }

    /// A step with nothing to undo
    pub fn irreversible(value: T) -> Self {
        ReversibleOperation {
            value,
            guard: RollbackGuard::default(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Number of undo actions still armed
    pub fn pending_rollbacks(&self) -> usize {
        self.guard.actions.len()
    }

    /// Keep the mutation and discard the undo actions
    pub fn confirm(self) -> T {
        let ReversibleOperation { value, mut guard } = self;
        guard.take();
        value
    }

    /// Undo every step, newest first. All actions run even if one fails.
    pub async fn rollback(self) -> Result<(), Vec<UploadError>> {
        let ReversibleOperation { value: _, mut guard } = self;
        let failures = run_rollbacks(guard.take()).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// Roll back, then wrap the error that caused it
    pub async fn unwind(self, step: &'static str, cause: UploadError) -> UploadError {
        let rollback_failures = self.rollback().await.err().unwrap_or_default();
        UploadError::Commit {
            step,
            source: Box::new(cause),
            rollback_failures,
        }
    }

    /// Join a later step; its undo actions run before this one's
    pub fn combine<U>(self, other: ReversibleOperation<U>) -> ReversibleOperation<(T, U)> {
        let ReversibleOperation { value: first, guard: mut first_guard } = self;
        let ReversibleOperation { value: second, guard: mut second_guard } = other;

        let mut actions = first_guard.take();
        actions.extend(second_guard.take());

        ReversibleOperation {
            value: (first, second),
            guard: RollbackGuard { actions },
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ReversibleOperation<U> {
        let ReversibleOperation { value, mut guard } = self;
        ReversibleOperation {
            value: f(value),
            guard: RollbackGuard {
                actions: guard.take(),
            },
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReversibleOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversibleOperation")
            .field("value", &self.value)
            .field("pending_rollbacks", &self.pending_rollbacks())
            .finish()
    }
}
