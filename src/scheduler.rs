//! Update scheduling: one bounded queue + worker task per active chat.
//! Updates of one chat run in arrival order; different chats run concurrently.
//! Idle workers retire; the next update for that chat starts a fresh one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bot::Dispatcher;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::session::ChatId;
use crate::telegram::client::TelegramClient;
use crate::telegram::{TelegramError, Update};

/// Pending updates per chat before submitters wait.
pub const CHAT_QUEUE_CAPACITY: usize = 32;
/// A worker with nothing to do for this long exits.
pub const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// Pause after a failed poll before asking again.
pub const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Consumer of scheduled updates.
#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    async fn handle(&self, update: Update);
}

#[async_trait]
impl UpdateHandler for Dispatcher {
    async fn handle(&self, update: Update) {
        self.dispatch(update).await;
    }
}

/// Source of inbound updates (long polling).
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn poll(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn poll(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        self.get_updates(offset, timeout).await
    }
}

#[derive(Debug)]
struct ChatTask {
    update: Update,
    enqueued_at: Instant,
}

struct Worker {
    id: u64,
    tx: mpsc::Sender<ChatTask>,
    handle: JoinHandle<()>,
}

type WorkerMap = Arc<Mutex<HashMap<ChatId, Worker>>>;

pub struct ChatScheduler {
    handler: Arc<dyn UpdateHandler>,
    workers: WorkerMap,
    next_worker_id: AtomicU64,
    idle_timeout: Duration,
    metrics: Arc<MetricsRegistry>,
}

impl ChatScheduler {
    pub fn new(handler: Arc<dyn UpdateHandler>, metrics: Arc<MetricsRegistry>) -> Self {
        Self::with_idle_timeout(handler, metrics, WORKER_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        handler: Arc<dyn UpdateHandler>,
        metrics: Arc<MetricsRegistry>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            workers: Arc::new(Mutex::new(HashMap::new())),
            next_worker_id: AtomicU64::new(1),
            idle_timeout,
            metrics,
        }
    }

    /// Number of chats with a live worker.
    pub fn active_chats(&self) -> usize {
        self.workers.lock().len()
    }

    /// Queue an update behind earlier updates of the same chat.
    /// Waits only when that chat's queue is full.
    pub async fn submit(&self, update: Update) {
        let Some(chat_id) = update.chat_id() else {
            debug!(update_id = update.update_id, "update without chat dropped");
            return;
        };
        let task = ChatTask {
            update,
            enqueued_at: Instant::now(),
        };

        // try_send happens under the lock so a retiring worker cannot miss it.
        let pending = {
            let mut workers = self.workers.lock();
            if workers.get(&chat_id).map_or(true, |w| w.tx.is_closed()) {
                let worker = self.spawn_worker(chat_id);
                workers.insert(chat_id, worker);
            }
            let sent = workers[&chat_id].tx.try_send(task);
            match sent {
                Ok(()) => None,
                Err(mpsc::error::TrySendError::Full(task)) => {
                    Some((workers[&chat_id].tx.clone(), task))
                }
                Err(mpsc::error::TrySendError::Closed(task)) => {
                    // The worker died between the check and the send.
                    let worker = self.spawn_worker(chat_id);
                    if worker.tx.try_send(task).is_err() {
                        error!(chat_id, "fresh chat queue rejected update");
                    }
                    workers.insert(chat_id, worker);
                    None
                }
            }
        };

        if let Some((tx, task)) = pending {
            warn!(chat_id, "chat queue full, awaiting slot");
            if tx.send(task).await.is_err() {
                error!(chat_id, "chat queue closed while waiting, update lost");
            }
        }
    }

    fn spawn_worker(&self, chat_id: ChatId) -> Worker {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CHAT_QUEUE_CAPACITY);
        let handle = tokio::spawn(run_worker(
            chat_id,
            id,
            rx,
            Arc::clone(&self.handler),
            Arc::clone(&self.workers),
            Arc::clone(&self.metrics),
            self.idle_timeout,
        ));
        debug!(chat_id, worker = id, "chat worker started");
        Worker { id, tx, handle }
    }

    /// Stop accepting work and wait until every queued update has been handled.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self.workers.lock().drain().map(|(_, w)| w).collect();
        info!(workers = workers.len(), "draining chat workers");
        for worker in workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                error!(error = %e, worker = worker.id, "chat worker panicked");
            }
        }
    }
}

async fn run_worker(
    chat_id: ChatId,
    id: u64,
    mut rx: mpsc::Receiver<ChatTask>,
    handler: Arc<dyn UpdateHandler>,
    workers: WorkerMap,
    metrics: Arc<MetricsRegistry>,
    idle_timeout: Duration,
) {
    loop {
        let task = match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(task)) => task,
            Ok(None) => break,
            Err(_) => match retire(&workers, chat_id, id, &mut rx) {
                Some(task) => task,
                None => break,
            },
        };
        metrics.record(
            metric_names::QUEUE_WAIT,
            task.enqueued_at.elapsed().as_micros() as f64,
        );
        handler.handle(task.update).await;
    }
    debug!(chat_id, worker = id, "chat worker stopped");
}

/// Deregister an idle worker unless an update slipped in; returns that update.
fn retire(
    workers: &WorkerMap,
    chat_id: ChatId,
    id: u64,
    rx: &mut mpsc::Receiver<ChatTask>,
) -> Option<ChatTask> {
    let mut workers = workers.lock();
    if let Ok(task) = rx.try_recv() {
        return Some(task);
    }
    if workers.get(&chat_id).is_some_and(|w| w.id == id) {
        workers.remove(&chat_id);
    }
    rx.close();
    None
}

/// Long-poll `source` and feed every update into `scheduler` until `shutdown` fires.
/// Queued updates are drained before returning.
pub async fn run_polling(
    source: Arc<dyn UpdateSource>,
    scheduler: Arc<ChatScheduler>,
    poll_timeout: Duration,
    shutdown: CancellationToken,
) {
    info!(poll_timeout_secs = poll_timeout.as_secs(), "polling started");
    let mut offset: Option<i64> = None;
    loop {
        let polled = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = source.poll(offset, poll_timeout) => polled,
        };
        match polled {
            Ok(updates) => {
                for update in updates {
                    offset = Some(offset.map_or(update.update_id + 1, |o| o.max(update.update_id + 1)));
                    scheduler.submit(update).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "polling failed, retrying");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                }
            }
        }
    }
    info!("polling stopped");
    scheduler.shutdown().await;
}
