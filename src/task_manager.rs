//! Tracks the long-running tasks (stream listener, delivery worker) and
//! waits for them on shutdown.
use futures::future::join_all;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A named task the manager is waiting on.
struct ManagedTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Owns the `JoinHandle` of every spawned task and the shutdown signal they
/// all listen to.
#[derive(Debug)]
pub struct TaskManager {
    tasks: Vec<ManagedTask>,
    shutdown_rx: watch::Receiver<bool>,
}

impl std::fmt::Debug for ManagedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedTask")
            .field("name", &self.name)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

impl TaskManager {
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            tasks: Vec::new(),
            shutdown_rx,
        }
    }

    /// Spawns `future` on the runtime and keeps its handle under `name`.
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        self.tasks.push(ManagedTask {
            name,
            handle: tokio::spawn(future),
        });
    }

    /// A fresh receiver for the shared shutdown signal.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Names of the tasks spawned so far, in spawn order.
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name).collect()
    }

    /// Waits for every managed task to return. Returns the number of tasks
    /// that panicked.
    pub async fn shutdown(self) -> usize {
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            self.tasks.len()
        );

        let (names, handles): (Vec<_>, Vec<_>) = self
            .tasks
            .into_iter()
            .map(|task| (task.name, task.handle))
            .unzip();
        let results = join_all(handles).await;

        let mut panicked = 0;
        for (task_name, result) in names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    panicked += 1;
                    error!(task_name, error = %e, "Task panicked.");
                }
            }
        }

        if panicked == 0 {
            info!("All tasks shut down gracefully.");
        }
        panicked
    }
}
