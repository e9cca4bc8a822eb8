//! The render queue: FIFO, single-worker, single-flight per slideshow.
//!
//! One [`RenderQueue`] exists per process. It owns the FIFO list, the
//! outstanding-job map, and the per-job listener sets behind a single
//! mutex; only [`RenderQueue::admit`] and the drain task mutate them.
//! Exactly one slideshow renders at a time process-wide -- concurrent
//! canvas compositing is memory-intensive, and a single worker keeps
//! per-user progress reporting unambiguous.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, Mutex};

use slidereel_core::ports::{ObjectStore, RenderStore};
use slidereel_core::types::DbId;

use crate::compositor::SlideCompositor;
use crate::error::RenderError;
use crate::executor;

/// One progress update during a render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderProgress {
    pub slideshow_id: DbId,
    /// Index of the slide just attempted.
    pub slide_index: i32,
    /// Frames successfully uploaded so far.
    pub completed: usize,
    /// Total slides in the job.
    pub total: usize,
    /// Storage key of the frame, when the slide succeeded.
    pub frame_path: Option<String>,
}

/// Listener half for progress fan-out.
pub type ProgressSender = mpsc::UnboundedSender<RenderProgress>;

/// Bookkeeping for one outstanding (pending or in-flight) job.
struct JobEntry {
    compositor: Arc<dyn SlideCompositor>,
    listeners: Vec<ProgressSender>,
    waiters: Vec<oneshot::Sender<Result<(), RenderError>>>,
}

struct QueueState {
    fifo: VecDeque<DbId>,
    jobs: HashMap<DbId, JobEntry>,
    draining: bool,
}

/// The per-process render queue. Construct once and share via `Arc`.
pub struct RenderQueue {
    state: Mutex<QueueState>,
    pub(crate) store: Arc<dyn RenderStore>,
    pub(crate) objects: Arc<dyn ObjectStore>,
}

impl RenderQueue {
    pub fn new(store: Arc<dyn RenderStore>, objects: Arc<dyn ObjectStore>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(QueueState {
                fifo: VecDeque::new(),
                jobs: HashMap::new(),
                draining: false,
            }),
            store,
            objects,
        })
    }

    /// Admit a render job for `slideshow_id` and await its outcome.
    ///
    /// Admission rules, in order:
    /// 1. If a job is already outstanding for this id, register the
    ///    progress listener on it and share its outcome -- never a
    ///    second job.
    /// 2. Otherwise persist the `queued` transition first; on failure,
    ///    reject without enqueueing.
    /// 3. Push to the FIFO tail and record the job for coalescing.
    /// 4. Kick the drain worker (idempotent).
    pub async fn admit(
        self: &Arc<Self>,
        slideshow_id: DbId,
        compositor: Arc<dyn SlideCompositor>,
        progress: Option<ProgressSender>,
    ) -> Result<(), RenderError> {
        let waiter = self.enqueue(slideshow_id, compositor, progress).await?;
        waiter.await.unwrap_or(Err(RenderError::WorkerGone))
    }

    /// Admit without awaiting the outcome: admission rules (including
    /// the persist-before-visible check) still apply synchronously,
    /// but completion is only observable through progress listeners
    /// and the persisted status. Used by the HTTP layer to return 202.
    pub async fn admit_detached(
        self: &Arc<Self>,
        slideshow_id: DbId,
        compositor: Arc<dyn SlideCompositor>,
        progress: Option<ProgressSender>,
    ) -> Result<(), RenderError> {
        self.enqueue(slideshow_id, compositor, progress)
            .await
            .map(drop)
    }

    async fn enqueue(
        self: &Arc<Self>,
        slideshow_id: DbId,
        compositor: Arc<dyn SlideCompositor>,
        progress: Option<ProgressSender>,
    ) -> Result<oneshot::Receiver<Result<(), RenderError>>, RenderError> {
        let waiter = {
            let mut state = self.state.lock().await;

            if let Some(job) = state.jobs.get_mut(&slideshow_id) {
                if let Some(listener) = progress {
                    job.listeners.push(listener);
                }
                let (tx, rx) = oneshot::channel();
                job.waiters.push(tx);
                tracing::debug!(slideshow_id = %slideshow_id, "Admission coalesced");
                rx
            } else {
                // The state lock is held across this await on purpose:
                // it serializes admissions, so two concurrent admits
                // for the same id cannot both observe "absent".
                self.store
                    .mark_queued(slideshow_id)
                    .await
                    .map_err(|e| RenderError::Admission(e.to_string()))?;

                let (tx, rx) = oneshot::channel();
                state.jobs.insert(
                    slideshow_id,
                    JobEntry {
                        compositor,
                        listeners: progress.into_iter().collect(),
                        waiters: vec![tx],
                    },
                );
                state.fifo.push_back(slideshow_id);
                tracing::info!(slideshow_id = %slideshow_id, "Render job admitted");

                if !state.draining {
                    state.draining = true;
                    tokio::spawn(Arc::clone(self).drain());
                }
                rx
            }
        };

        Ok(waiter)
    }

    /// Register a progress listener on an outstanding job. Returns
    /// `None` when no job is pending or in flight for the id.
    pub async fn attach_listener(
        &self,
        slideshow_id: DbId,
    ) -> Option<mpsc::UnboundedReceiver<RenderProgress>> {
        let mut state = self.state.lock().await;
        let job = state.jobs.get_mut(&slideshow_id)?;
        let (tx, rx) = mpsc::unbounded_channel();
        job.listeners.push(tx);
        Some(rx)
    }

    /// Whether a job is pending or in flight for the id.
    pub async fn is_outstanding(&self, slideshow_id: DbId) -> bool {
        self.state.lock().await.jobs.contains_key(&slideshow_id)
    }

    /// Deliver a progress update to every listener registered for the
    /// job. Dropped receivers are skipped silently.
    pub(crate) async fn fan_out(&self, slideshow_id: DbId, progress: RenderProgress) {
        let state = self.state.lock().await;
        if let Some(job) = state.jobs.get(&slideshow_id) {
            for listener in &job.listeners {
                let _ = listener.send(progress.clone());
            }
        }
    }

    /// The single drain worker: one job at a time, FIFO, until the
    /// queue is empty. Spawned by `admit` when not already running.
    async fn drain(self: Arc<Self>) {
        loop {
            let next = {
                let mut state = self.state.lock().await;
                match state.fifo.pop_front() {
                    Some(id) => state
                        .jobs
                        .get(&id)
                        .map(|job| (id, Arc::clone(&job.compositor))),
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            let Some((slideshow_id, compositor)) = next else {
                continue;
            };

            tracing::info!(slideshow_id = %slideshow_id, "Render job started");
            let result =
                executor::run_render(&self, slideshow_id, compositor.as_ref()).await;
            match &result {
                Ok(()) => tracing::info!(slideshow_id = %slideshow_id, "Render job completed"),
                Err(e) => {
                    tracing::error!(slideshow_id = %slideshow_id, error = %e, "Render job failed")
                }
            }

            // Fan the shared outcome out to every coalesced waiter and
            // drop all bookkeeping for the id.
            let mut state = self.state.lock().await;
            if let Some(job) = state.jobs.remove(&slideshow_id) {
                for waiter in job.waiters {
                    let _ = waiter.send(result.clone());
                }
            }
        }
    }
}
