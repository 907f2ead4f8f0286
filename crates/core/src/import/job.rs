//! Handle to a running bulk import.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::types::{ImportError, JobProgress, JobReport};

/// Handle returned when a bulk import is accepted.
///
/// Dropping the handle does not stop the job.
#[derive(Debug)]
pub struct ImportJobHandle {
    id: Uuid,
    cancel: CancellationToken,
    progress: watch::Receiver<JobProgress>,
    task: JoinHandle<JobReport>,
}

impl ImportJobHandle {
    pub(crate) fn new(
        id: Uuid,
        cancel: CancellationToken,
        progress: watch::Receiver<JobProgress>,
        task: JoinHandle<JobReport>,
    ) -> Self {
        Self {
            id,
            cancel,
            progress,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cooperative cancellation of the whole batch.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Latest progress snapshot.
    pub fn progress(&self) -> JobProgress {
        self.progress.borrow().clone()
    }

    /// Receiver that is notified on every progress change.
    pub fn subscribe(&self) -> watch::Receiver<JobProgress> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to finish and return its report.
    pub async fn wait(self) -> Result<JobReport, ImportError> {
        let id = self.id;
        self.task
            .await
            .map_err(|e| ImportError::Internal(format!("import job {} failed: {}", id, e)))
    }
}
