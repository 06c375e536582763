pub mod stream;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::EventCache;
use crate::event::Event;
use crate::queue::{ChangeKind, QueueJob, RateLimiterConfig, WorkQueue};
use crate::sink::Sink;

pub use stream::JsonStreamWatcher;
pub use watch::{ListerWatcher, Notification};

/// An event is attempted at most this many times before it is dropped.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Watches one namespace's event stream and drives it through the cache,
/// the work queue and the sinks. Cluster scope is a single controller
/// watching `""`; namespaced scope is one controller per namespace, all
/// sharing the same sink list.
pub struct EventController<W> {
    namespace: String,
    lister_watcher: Arc<W>,
    sinks: Arc<Vec<Arc<dyn Sink>>>,
    cache: Arc<EventCache>,
    queue: Arc<WorkQueue>,
}

impl<W: ListerWatcher> EventController<W> {
    pub fn new(
        namespace: impl Into<String>,
        lister_watcher: Arc<W>,
        sinks: Arc<Vec<Arc<dyn Sink>>>,
        limiter: RateLimiterConfig,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            lister_watcher,
            sinks,
            cache: Arc::new(EventCache::new()),
            queue: WorkQueue::new(limiter),
        }
    }

    /// Runs the controller until cancellation: one watch task (the sole
    /// cache writer), then `workers` worker tasks once the initial sync
    /// marker arrives. Returns after the queue has drained and every task
    /// has exited.
    pub async fn run(&self, workers: usize, token: CancellationToken) -> Result<()> {
        let rx = self
            .lister_watcher
            .watch(&self.namespace, token.clone())
            .await
            .with_context(|| format!("starting watch for namespace {:?}", self.namespace))?;

        let (synced_tx, synced_rx) = oneshot::channel();
        let watch_task = tokio::spawn(watch_loop(
            self.namespace.clone(),
            rx,
            Arc::clone(&self.cache),
            Arc::clone(&self.queue),
            token.clone(),
            synced_tx,
        ));

        // Workers start only after the initial list has been applied.
        tokio::select! {
            _ = token.cancelled() => {
                self.queue.shut_down();
            }
            result = synced_rx => {
                if result.is_err() {
                    // Watch ended before sync; the queue is already shut.
                    debug!(namespace = %self.namespace, "watch closed before initial sync");
                }
            }
        }

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let cache = Arc::clone(&self.cache);
            let queue = Arc::clone(&self.queue);
            let sinks = Arc::clone(&self.sinks);
            handles.push(tokio::spawn(worker_loop(id, cache, queue, sinks)));
        }

        for handle in handles {
            handle.await.context("joining worker task")?;
        }
        watch_task.await.context("joining watch task")?;
        info!(namespace = %self.namespace, "controller stopped");
        Ok(())
    }

    #[cfg(test)]
    fn cache(&self) -> &EventCache {
        &self.cache
    }
}

/// Consumes watch notifications, keeping the cache current and feeding
/// the queue. Shuts the queue down when the stream ends so workers drain
/// and exit.
async fn watch_loop(
    namespace: String,
    mut rx: tokio::sync::mpsc::Receiver<Notification>,
    cache: Arc<EventCache>,
    queue: Arc<WorkQueue>,
    token: CancellationToken,
    synced_tx: oneshot::Sender<()>,
) {
    let mut synced_tx = Some(synced_tx);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            notification = rx.recv() => {
                let Some(notification) = notification else {
                    if synced_tx.is_some() {
                        error!(namespace = %namespace, "watch stream closed before initial sync");
                    }
                    break;
                };
                match notification {
                    Notification::Synced => {
                        info!(namespace = %namespace, "initial sync complete");
                        if let Some(tx) = synced_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                    Notification::Apply(change, event) => apply(&cache, &queue, change, event),
                }
            }
        }
    }
    queue.shut_down();
}

/// Applies one change: cache write plus enqueue. A modification whose
/// resource version is unchanged is a resync echo and is skipped.
fn apply(cache: &EventCache, queue: &Arc<WorkQueue>, change: ChangeKind, event: Event) {
    let key = event.key();
    if change == ChangeKind::Modified
        && cache.resource_version(&key).as_deref() == Some(event.metadata.resource_version.as_str())
    {
        debug!(key = %key, "unchanged resource version, skipping");
        return;
    }
    cache.insert(key.clone(), event);
    queue.enqueue_rate_limited(QueueJob { key, change });
}

async fn worker_loop(
    id: usize,
    cache: Arc<EventCache>,
    queue: Arc<WorkQueue>,
    sinks: Arc<Vec<Arc<dyn Sink>>>,
) {
    debug!(worker = id, "worker started");
    while let Some(job) = queue.dequeue().await {
        process(&cache, &queue, &sinks, &job);
        queue.ack(&job);
    }
    debug!(worker = id, "worker stopped");
}

/// One delivery attempt for one job, with the bounded-retry policy:
/// success forgets the key and drops its cache entry; failure requeues
/// with backoff until the attempt limit, then drops with a warning.
fn process(
    cache: &EventCache,
    queue: &Arc<WorkQueue>,
    sinks: &[Arc<dyn Sink>],
    job: &QueueJob,
) {
    let Some(event) = cache.get(&job.key) else {
        // Already processed or never cached; nothing to deliver.
        queue.forget(&job.key);
        return;
    };

    match deliver_all(sinks, &event) {
        Ok(()) => {
            cache.remove(&job.key);
            queue.forget(&job.key);
        }
        Err(e) => {
            if queue.num_requeues(&job.key) + 1 < MAX_DELIVERY_ATTEMPTS {
                warn!(key = %job.key, error = %e, "delivery failed, will retry");
                queue.requeue_with_backoff(job.clone());
            } else {
                warn!(
                    key = %job.key,
                    error = %e,
                    attempts = MAX_DELIVERY_ATTEMPTS,
                    "delivery failed, dropping event"
                );
                queue.forget(&job.key);
            }
        }
    }
}

/// Delivers to every sink even when one fails, then joins the failures
/// into a single error for retry accounting.
fn deliver_all(sinks: &[Arc<dyn Sink>], event: &Event) -> Result<()> {
    let mut failures = Vec::new();
    for sink in sinks {
        if let Err(e) = sink.deliver(event) {
            failures.push(format!("{}: {e:#}", sink.name()));
        }
    }
    if failures.is_empty() {
        return Ok(());
    }
    bail!("sink delivery failed: {}", failures.join("; "))
}
