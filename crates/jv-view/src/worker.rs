//! Off-thread ownership of a `JournalView`.
//!
//! The view lives on a dedicated thread and runs one job at a time, so
//! every mutation stays serialized while async callers await results.
//! Each job captures the handle's current cancellation token when it is
//! queued and runs under a child of it, so `cancel()` reaches the running
//! scan and every job still waiting behind it.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use jv_journal::{Direction, LogEntry};

use crate::error::{ViewError, ViewResult};
use crate::model::JournalView;
use crate::window::Edge;

type Job = Box<dyn FnOnce(&mut JournalView) + Send>;

/// Cloneable async handle to a view running on its worker thread.
#[derive(Clone)]
pub struct ViewHandle {
    jobs: mpsc::UnboundedSender<Job>,
    /// Parent token for jobs queued from now on; replaced on `cancel()`.
    cancel: Arc<Mutex<CancellationToken>>,
}

impl ViewHandle {
    /// Move `view` onto a new worker thread. The thread exits once every
    /// handle has been dropped.
    pub fn spawn(view: JournalView) -> ViewResult<Self> {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        thread::Builder::new()
            .name("jv-view".to_string())
            .spawn(move || {
                let mut view = view;
                tracing::debug!("view worker started");
                while let Some(job) = rx.blocking_recv() {
                    job(&mut view);
                }
                tracing::debug!("view worker stopped");
            })
            .map_err(|e| ViewError::Worker(format!("failed to spawn view worker: {e}")))?;
        Ok(Self {
            jobs,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        })
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `f` against the view and await its result.
    pub async fn call<R, F>(&self, f: F) -> ViewResult<R>
    where
        F: FnOnce(&mut JournalView) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let parent = self.current_token();
        let job: Job = Box::new(move |view| {
            view.set_cancel_token(parent.child_token());
            let _ = tx.send(f(view));
        });
        self.jobs.send(job).map_err(|_| ViewError::WorkerClosed)?;
        rx.await.map_err(|_| ViewError::WorkerClosed)
    }

    /// Stop the running scan and every job queued so far. Jobs queued
    /// afterwards run normally.
    pub fn cancel(&self) {
        let mut current = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
        tracing::debug!("view jobs cancelled");
    }

    pub async fn seek_head(&self) -> ViewResult<bool> {
        self.call(|v| v.seek_head()).await
    }

    pub async fn seek_tail(&self) -> ViewResult<bool> {
        self.call(|v| v.seek_tail()).await
    }

    pub async fn fetch_more(&self, edge: Edge) -> ViewResult<usize> {
        self.call(move |v| v.fetch_more(edge)).await
    }

    pub async fn row_count(&self) -> ViewResult<usize> {
        self.call(|v| v.row_count()).await
    }

    /// Copies of up to `count` rows starting at `start`.
    pub async fn rows(&self, start: usize, count: usize) -> ViewResult<Vec<LogEntry>> {
        self.call(move |v| v.rows().skip(start).take(count).cloned().collect())
            .await
    }

    pub async fn search(
        &self,
        query: impl Into<String>,
        start_row: usize,
        direction: Direction,
    ) -> ViewResult<Option<usize>> {
        let query = query.into();
        self.call(move |v| v.search(&query, start_row, direction))
            .await
    }

    pub async fn closest_index_for_data(&self, at: DateTime<Utc>) -> ViewResult<Option<usize>> {
        self.call(move |v| v.closest_index_for_data(at)).await
    }
}
