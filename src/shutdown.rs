use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

/// A named asynchronous cleanup action.
pub struct Finalizer {
    pub name: &'static str,
    pub action: Pin<Box<dyn Future<Output = Result<()>> + Send>>,
}

impl Finalizer {
    pub fn new<F>(name: &'static str, action: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name,
            action: Box::pin(action),
        }
    }
}

/// Runs the finalizers sequentially under one overall deadline. If they
/// do not all finish in time, a timeout error is returned; an action
/// already running is not cancelled mid-flight by its successors, only by
/// the process exiting.
pub async fn shutdown(timeout: Duration, finalizers: Vec<Finalizer>) -> Result<()> {
    info!(
        count = finalizers.len(),
        timeout = ?timeout,
        "shutting down"
    );
    // Run on a separate task so a timeout stops the wait without
    // cancelling whatever finalizer is still in flight.
    let task = tokio::spawn(async move {
        for finalizer in finalizers {
            debug!(finalizer = finalizer.name, "running finalizer");
            finalizer
                .action
                .await
                .with_context(|| format!("finalizer {}", finalizer.name))?;
        }
        Ok::<_, anyhow::Error>(())
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.context("joining shutdown task")?,
        Err(_) => anyhow::bail!("shutdown timed out after {timeout:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_runs_finalizers_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let finalizers = ["first", "second"]
            .into_iter()
            .map(|name| {
                let order = Arc::clone(&order);
                Finalizer::new(name, async move {
                    order.lock().push(name);
                    Ok(())
                })
            })
            .collect();

        shutdown(Duration::from_secs(1), finalizers)
            .await
            .expect("shutdown");
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_an_error() {
        let finalizers = vec![Finalizer::new("stuck", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })];
        let result = shutdown(Duration::from_secs(1), finalizers).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_finalizer_stops_the_chain() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counted = {
            let ran = Arc::clone(&ran);
            Finalizer::new("counted", async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        let finalizers = vec![
            Finalizer::new("failing", async { anyhow::bail!("cleanup failed") }),
            counted,
        ];

        assert!(shutdown(Duration::from_secs(1), finalizers).await.is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
