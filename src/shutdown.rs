use crate::error::GameError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Requests termination. Cheap to clone, idempotent to fire.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn request(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes termination. Every blocking wait in the engine selects on
/// `cancelled()` next to its real wake source.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once termination is requested or the trigger side is gone.
    pub async fn cancelled(&mut self) {
        // An Err means the sender was dropped, which counts as termination
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

/// Owns the termination signal and every spawned task.
///
/// `shutdown_all` fires the signal and joins the tasks one by one. A task
/// that ignores the signal past the grace period is aborted, and the abort is
/// awaited too, so no task outlives the call.
pub struct ShutdownCoordinator {
    tx: Arc<watch::Sender<bool>>,
    tasks: Vec<(String, JoinHandle<()>)>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(grace: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            tasks: Vec::new(),
            grace,
        }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            tx: Arc::clone(&self.tx),
        }
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Spawn a task whose exit will be awaited on shutdown
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(task = %name, "Spawning tracked task");
        self.tasks.push((name, tokio::spawn(task)));
    }

    pub fn tracked(&self) -> usize {
        self.tasks.len()
    }

    /// Fire the signal, then join every task in spawn order.
    pub async fn shutdown_all(self) -> Result<(), GameError> {
        info!(tasks = self.tasks.len(), "Initiating shutdown of all tasks...");
        self.tx.send_replace(true);

        let mut first_error = None;
        for (name, mut handle) in self.tasks {
            let joined = match timeout(self.grace, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(task = %name, grace_ms = self.grace.as_millis() as u64, "Task ignored shutdown, aborting");
                    handle.abort();
                    handle.await
                }
            };

            match joined {
                Ok(()) => debug!(task = %name, "Task joined"),
                Err(e) if e.is_cancelled() => debug!(task = %name, "Task aborted"),
                Err(e) => {
                    warn!(task = %name, error = %e, "Task panicked");
                    first_error.get_or_insert(GameError::TaskJoin {
                        task: name,
                        source: e,
                    });
                }
            }
        }

        info!("Shutdown completed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("requested", &self.is_requested())
            .field(
                "tasks",
                &self.tasks.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("grace", &self.grace)
            .finish()
    }
}
