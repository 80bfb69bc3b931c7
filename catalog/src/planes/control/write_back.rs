use crate::ports::{WriteBack, WriteBackScheduler};
use parking_lot::Mutex;
use shared::config::WriteBackSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteBackConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub job_timeout: Duration,
}

impl From<&WriteBackSettings> for WriteBackConfig {
    fn from(settings: &WriteBackSettings) -> Self {
        Self {
            workers: settings.workers,
            queue_capacity: settings.queue_capacity,
            job_timeout: settings.job_timeout.as_duration(),
        }
    }
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<WriteBack>>>;

/// Bounded pool that runs cache write-backs off the request path.
///
/// Jobs are queued with `try_send`; when the queue is full the job is dropped
/// and the entry is simply filled again by a later miss.
pub struct BackgroundWriter {
    sender: Mutex<Option<mpsc::Sender<WriteBack>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundWriter {
    /// Spawns the workers on the current tokio runtime.
    pub fn start(config: WriteBackConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|id| tokio::spawn(worker_loop(id, rx.clone(), config.job_timeout)))
            .collect();

        info!(
            workers = config.workers,
            queue = config.queue_capacity,
            "cache write-back pool started"
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Closes the queue and waits until every accepted job has run.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().take());
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "write-back worker panicked");
            }
        }
        info!("cache write-back pool drained");
    }
}

impl WriteBackScheduler for BackgroundWriter {
    fn schedule(&self, job: WriteBack) {
        let operation = job.operation;
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            warn!(operation, "write-back pool is shut down, dropping cache write");
            return;
        };
        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(operation, "write-back queue is full, dropping cache write");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(operation, "write-back queue is closed, dropping cache write");
            }
        }
    }
}

async fn worker_loop(id: usize, rx: SharedReceiver, job_timeout: Duration) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        let operation = job.operation;
        // Each job runs in its own task so a panic cannot take the worker down.
        let mut task = tokio::spawn(job.run());
        match tokio::time::timeout(job_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => debug!(worker = id, operation, "cache write-back done"),
            Ok(Ok(Err(e))) => error!(worker = id, operation, error = %e, "cache write-back failed"),
            Ok(Err(e)) => error!(worker = id, operation, error = %e, "cache write-back panicked"),
            Err(_) => {
                task.abort();
                error!(worker = id, operation, "cache write-back timed out");
            }
        }
    }
    debug!(worker = id, "write-back worker stopped");
}
