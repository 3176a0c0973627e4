//! Bounded pool of isolated browser workers.
//!
//! Every browser job gets its own OS thread running a current-thread tokio
//! runtime, so long waits inside a job never stall the caller's scheduler.
//! A semaphore caps how many jobs (and so browser processes) run at once.
//! On timeout or caller cancellation the worker runtime is shut down, which
//! drops the browser and kills its process; the slot is released only
//! after that teardown.

use crate::config::MAX_TIMEOUT;
use crate::error::FetchError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long a cancelled worker gets to finish its shutdown.
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct BrowserPool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl BrowserPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held by a job or a tearing-down worker.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Run `job` on an isolated worker within `budget` (admission wait
    /// included). The job's future does not need to be `Send`.
    pub async fn run<T, F, Fut>(&self, budget: Duration, job: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + 'static,
        T: Send + 'static,
    {
        let deadline = Instant::now() + budget.min(MAX_TIMEOUT);

        let permit = match tokio::time::timeout_at(deadline, Arc::clone(&self.slots).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(FetchError::Automation("browser pool is closed".into())),
            Err(_) => {
                warn!("no browser slot became free within {}s", budget.as_secs());
                return Err(FetchError::Timeout(budget));
            }
        };

        let (result_tx, result_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        std::thread::Builder::new()
            .name("filingscope-browser".into())
            .spawn(move || {
                let _permit = permit;
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = result_tx.send(Err(FetchError::Automation(format!(
                            "failed to start browser runtime: {e}"
                        ))));
                        return;
                    }
                };

                let outcome = runtime.block_on(async move {
                    tokio::select! {
                        result = job() => Some(result),
                        _ = cancel_rx => None,
                    }
                });
                runtime.shutdown_timeout(TEARDOWN_GRACE);
                debug!("browser worker torn down");

                if let Some(result) = outcome {
                    let _ = result_tx.send(result);
                }
            })
            .map_err(|e| FetchError::Automation(format!("failed to spawn browser worker: {e}")))?;

        match tokio::time::timeout_at(deadline, result_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FetchError::Automation(
                "browser worker exited without a result".into(),
            )),
            Err(_) => {
                warn!("browser job exceeded {}s, tearing down", budget.as_secs());
                let _ = cancel_tx.send(());
                Err(FetchError::Timeout(budget))
            }
        }
    }
}
