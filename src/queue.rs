use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

/// Kind of change that put a key on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
}

/// One unit of work: a cache key and the change that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueJob {
    pub key: String,
    pub change: ChangeKind,
}

/// Rate limiter parameters for the queue: per-item exponential backoff
/// combined with an overall token bucket, taking the larger of the two
/// delays.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub bucket_qps: f64,
    pub bucket_burst: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(1000),
            bucket_qps: 10.0,
            bucket_burst: 100.0,
        }
    }
}

/// Token bucket issuing reservations: callers may overdraw and are told
/// how long to wait for their token.
#[derive(Debug)]
struct TokenBucket {
    qps: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(qps: f64, burst: f64) -> Self {
        Self {
            qps,
            burst,
            tokens: burst,
            last_refill: Instant::now(),
        }
    }

    /// Reserves one token and returns how long the caller must wait for it.
    fn reserve(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.qps).min(self.burst);
        self.last_refill = now;

        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.qps)
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Keys ready to be handed to a worker, in arrival order.
    ready: VecDeque<String>,
    /// Latest change kind per key awaiting processing. Membership here is
    /// what makes repeated enqueues of the same key coalesce.
    dirty: HashMap<String, ChangeKind>,
    /// Keys currently held by a worker. A key in this set is not
    /// redelivered until acked; a concurrent enqueue is deferred instead.
    processing: HashSet<String>,
    /// Consecutive failed attempts per key.
    requeues: HashMap<String, u32>,
    shutting_down: bool,
}

/// Deduplicating, rate-limited, retry-aware queue of `(key, change)` jobs
/// between watch ingestion and worker processing.
///
/// Guarantees: at most one pending job per key, at most one in-flight job
/// per key, and per-key strictly sequential processing. Safe for
/// concurrent enqueue from the watch loop and dequeue/ack from N workers.
pub struct WorkQueue {
    inner: Mutex<Inner>,
    bucket: Mutex<TokenBucket>,
    notify: Notify,
    cfg: RateLimiterConfig,
}

impl WorkQueue {
    pub fn new(cfg: RateLimiterConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            bucket: Mutex::new(TokenBucket::new(cfg.bucket_qps, cfg.bucket_burst)),
            notify: Notify::new(),
            cfg,
        })
    }

    /// Exponential delay for the given consecutive-failure count,
    /// capped at the configured maximum.
    fn backoff_delay(&self, failures: u32) -> Duration {
        let exp = self
            .cfg
            .base_delay
            .saturating_mul(2u32.saturating_pow(failures));
        exp.min(self.cfg.max_delay)
    }

    /// Enqueue a job after the rate limiter's delay. Repeated enqueues of
    /// a pending key coalesce to one job carrying the latest change kind.
    pub fn enqueue_rate_limited(self: &Arc<Self>, job: QueueJob) {
        let delay = {
            let failures = self.inner.lock().requeues.get(&job.key).copied().unwrap_or(0);
            let backoff = self.backoff_delay(failures);
            let bucket = self.bucket.lock().reserve(Instant::now());
            backoff.max(bucket)
        };
        self.enqueue_after(job, delay);
    }

    /// Re-add a failed job with an increased backoff delay, incrementing
    /// its retry state.
    pub fn requeue_with_backoff(self: &Arc<Self>, job: QueueJob) {
        let delay = {
            let failures = {
                let mut inner = self.inner.lock();
                let failures = inner.requeues.entry(job.key.clone()).or_insert(0);
                *failures += 1;
                *failures
            };
            let backoff = self.backoff_delay(failures);
            let bucket = self.bucket.lock().reserve(Instant::now());
            backoff.max(bucket)
        };
        self.enqueue_after(job, delay);
    }

    fn enqueue_after(self: &Arc<Self>, job: QueueJob, delay: Duration) {
        if delay.is_zero() {
            self.insert(job);
            return;
        }

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.insert(job);
        });
    }

    fn insert(&self, job: QueueJob) {
        let mut inner = self.inner.lock();
        if inner.shutting_down {
            return;
        }
        if inner.dirty.insert(job.key.clone(), job.change).is_some() {
            // Already pending; the change kind was coalesced above.
            return;
        }
        if inner.processing.contains(&job.key) {
            // Deferred: re-queued when the worker acks.
            return;
        }
        inner.ready.push_back(job.key);
        drop(inner);
        self.notify.notify_one();
    }

    /// Blocks until a job is available or the queue shuts down. Returns
    /// `None` once shutting down and drained.
    pub async fn dequeue(&self) -> Option<QueueJob> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock();
                if let Some(key) = inner.ready.pop_front() {
                    let change = inner
                        .dirty
                        .remove(&key)
                        .unwrap_or(ChangeKind::Added);
                    inner.processing.insert(key.clone());
                    // Wake the next waiter in case more keys are ready.
                    if !inner.ready.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(QueueJob { key, change });
                }
                if inner.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Marks a job's processing complete. If the key was re-enqueued
    /// while in flight, it becomes ready again now.
    pub fn ack(&self, job: &QueueJob) {
        let mut inner = self.inner.lock();
        inner.processing.remove(&job.key);
        if inner.dirty.contains_key(&job.key) && !inner.shutting_down {
            inner.ready.push_back(job.key.clone());
            drop(inner);
            self.notify.notify_one();
        }
    }

    /// Consecutive failed attempts recorded for a key.
    pub fn num_requeues(&self, key: &str) -> u32 {
        self.inner.lock().requeues.get(key).copied().unwrap_or(0)
    }

    /// Clears a key's retry state.
    pub fn forget(&self, key: &str) {
        self.inner.lock().requeues.remove(key);
    }

    /// Stops accepting new jobs and wakes all blocked dequeuers.
    pub fn shut_down(&self) {
        {
            let mut inner = self.inner.lock();
            inner.shutting_down = true;
        }
        debug!("work queue shutting down");
        self.notify.notify_waiters();
    }

    /// Number of keys ready for dequeue (pending, not in flight).
    pub fn len(&self) -> usize {
        self.inner.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(key: &str, change: ChangeKind) -> QueueJob {
        QueueJob {
            key: key.to_string(),
            change,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_same_key_coalesces() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        queue.enqueue_rate_limited(job("ns/a", ChangeKind::Added));
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.enqueue_rate_limited(job("ns/a", ChangeKind::Modified));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let first = queue.dequeue().await.expect("one job");
        assert_eq!(first.key, "ns/a");
        // The pending job carries the latest change kind.
        assert_eq!(first.change, ChangeKind::Modified);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_key_is_deferred_not_duplicated() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        queue.enqueue_rate_limited(job("ns/a", ChangeKind::Added));
        tokio::task::yield_now().await;

        let in_flight = queue.dequeue().await.expect("job");

        // A notification for the same key while a worker holds it must
        // not become ready until the worker acks.
        queue.enqueue_rate_limited(job("ns/a", ChangeKind::Modified));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.is_empty());

        queue.ack(&in_flight);
        let redelivered = queue.dequeue().await.expect("deferred job");
        assert_eq!(redelivered.key, "ns/a");
        assert_eq!(redelivered.change, ChangeKind::Modified);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeue_increments_and_forget_resets() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        assert_eq!(queue.num_requeues("ns/a"), 0);

        queue.requeue_with_backoff(job("ns/a", ChangeKind::Added));
        queue.requeue_with_backoff(job("ns/a", ChangeKind::Added));
        assert_eq!(queue.num_requeues("ns/a"), 2);

        queue.forget("ns/a");
        assert_eq!(queue.num_requeues("ns/a"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_failures_then_drop_policy() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        queue.enqueue_rate_limited(job("ns/a", ChangeKind::Added));

        // Drive the controller's failure policy by hand: every attempt
        // fails; the third failure drops the key for good.
        for attempt in 1..=3u32 {
            let current = queue.dequeue().await.expect("job");
            if queue.num_requeues(&current.key) + 1 < 3 {
                queue.requeue_with_backoff(current.clone());
                assert_eq!(queue.num_requeues("ns/a"), attempt);
            } else {
                queue.forget(&current.key);
                assert_eq!(queue.num_requeues("ns/a"), 0);
            }
            queue.ack(&current);
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(queue.is_empty(), "a dropped key must not be redelivered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delay_grows_and_caps() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        assert_eq!(queue.backoff_delay(0), Duration::from_millis(5));
        assert_eq!(queue.backoff_delay(1), Duration::from_millis(10));
        assert_eq!(queue.backoff_delay(3), Duration::from_millis(40));
        assert_eq!(queue.backoff_delay(31), Duration::from_secs(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeued_job_arrives_after_delay() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        queue.requeue_with_backoff(job("ns/a", ChangeKind::Added));

        // First retry backoff is base_delay * 2; paused time auto-advances.
        let retried = queue.dequeue().await.expect("retried job");
        assert_eq!(retried.key, "ns/a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_wakes_blocked_dequeuer() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue().await })
        };
        tokio::task::yield_now().await;

        queue.shut_down();
        let result = waiter.await.expect("join");
        assert!(result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_new_jobs() {
        let queue = WorkQueue::new(RateLimiterConfig::default());
        queue.shut_down();
        queue.enqueue_rate_limited(job("ns/a", ChangeKind::Added));
        tokio::task::yield_now().await;
        assert!(queue.dequeue().await.is_none());
    }

    #[test]
    fn test_token_bucket_reserves_beyond_burst() {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime")
            .block_on(async {
                let mut bucket = TokenBucket::new(10.0, 2.0);
                let now = Instant::now();
                assert_eq!(bucket.reserve(now), Duration::ZERO);
                assert_eq!(bucket.reserve(now), Duration::ZERO);
                // Third caller overdraws and waits for the next token.
                let wait = bucket.reserve(now);
                assert!(wait > Duration::ZERO);
                assert!(wait <= Duration::from_millis(100));
            });
    }
}
