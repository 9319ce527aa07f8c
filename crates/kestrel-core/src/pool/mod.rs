//! Bounded browser pool with fair acquisition.
//!
//! `acquire` hands out an idle handle, creates one while under
//! capacity, and otherwise queues the caller. Waiters are served
//! strictly first-come-first-served: a release wakes the waiter that
//! has been queued longest. `release` resets the handle (closing
//! non-default contexts and leftover pages) before returning it to the
//! idle set; a handle that fails its reset is discarded and the pool
//! shrinks.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::browser::{Browser, BrowserBuilder};
use crate::error::PoolError;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

struct PoolState<T> {
    idle: VecDeque<T>,
    waiters: VecDeque<oneshot::Sender<T>>,
    total: usize,
    closed: bool,
}

/// Generic bounded pool; [`BrowserPool`] is the public instantiation.
struct Pool<T> {
    state: tokio::sync::Mutex<PoolState<T>>,
    capacity: usize,
    create: Box<dyn Fn() -> BoxFuture<Result<T, PoolError>> + Send + Sync>,
    /// Reset a handle for reuse; `None` discards it.
    reset: Box<dyn Fn(T) -> BoxFuture<Option<T>> + Send + Sync>,
    /// Tear down a handle that cannot return to the pool.
    dispose: Box<dyn Fn(T) -> BoxFuture<()> + Send + Sync>,
}

impl<T: Send + 'static> Pool<T> {
    fn new(
        capacity: usize,
        create: impl Fn() -> BoxFuture<Result<T, PoolError>> + Send + Sync + 'static,
        reset: impl Fn(T) -> BoxFuture<Option<T>> + Send + Sync + 'static,
        dispose: impl Fn(T) -> BoxFuture<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: tokio::sync::Mutex::new(PoolState {
                idle: VecDeque::new(),
                waiters: VecDeque::new(),
                total: 0,
                closed: false,
            }),
            capacity,
            create: Box::new(create),
            reset: Box::new(reset),
            dispose: Box::new(dispose),
        }
    }

    async fn acquire(&self, deadline: Option<Duration>) -> Result<T, PoolError> {
        let rx = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(PoolError::Closed);
            }
            if let Some(handle) = state.idle.pop_front() {
                return Ok(handle);
            }
            if state.total < self.capacity {
                state.total += 1;
                drop(state);
                return match (self.create)().await {
                    Ok(handle) => Ok(handle),
                    Err(e) => {
                        self.state.lock().await.total -= 1;
                        Err(e)
                    }
                };
            }
            // At capacity: queue in FIFO order.
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        match deadline {
            None => rx.await.map_err(|_| PoolError::Closed),
            Some(deadline) => {
                let mut rx = rx;
                match tokio::time::timeout(deadline, &mut rx).await {
                    Ok(Ok(handle)) => Ok(handle),
                    Ok(Err(_)) => Err(PoolError::Closed),
                    Err(_) => {
                        // A release may have fulfilled the slot in the
                        // same instant the deadline fired.
                        match rx.try_recv() {
                            Ok(handle) => Ok(handle),
                            Err(_) => Err(PoolError::Timeout(deadline)),
                        }
                    }
                }
            }
        }
    }

    async fn release(&self, handle: T) {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                state.total -= 1;
                drop(state);
                // The pool is gone; tear the handle down like close()
                // does instead of leaking it.
                (self.dispose)(handle).await;
                return;
            }
        }

        let handle = match (self.reset)(handle).await {
            Some(handle) => handle,
            None => {
                // Unusable: the pool shrinks.
                let mut state = self.state.lock().await;
                state.total -= 1;
                debug!(total = state.total, "Discarded pool handle after failed reset");
                return;
            }
        };

        let mut state = self.state.lock().await;
        if state.closed {
            // Closed while the reset ran.
            state.total -= 1;
            drop(state);
            (self.dispose)(handle).await;
            return;
        }
        let mut handle = handle;
        // Serve the longest-queued live waiter; senders whose callers
        // timed out fail the send and are skipped.
        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(handle) {
                Ok(()) => return,
                Err(returned) => handle = returned,
            }
        }
        state.idle.push_back(handle);
    }

    async fn close(&self) -> usize {
        let drained: Vec<T> = {
            let mut state = self.state.lock().await;
            state.closed = true;
            state.waiters.clear();
            let drained: Vec<T> = state.idle.drain(..).collect();
            state.total -= drained.len();
            drained
        };
        let count = drained.len();
        for handle in drained {
            (self.dispose)(handle).await;
        }
        count
    }

    async fn counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.total, state.idle.len())
    }
}

/// A bounded set of browsers for concurrent use.
pub struct BrowserPool {
    pool: Pool<Arc<Browser>>,
}

impl std::fmt::Debug for BrowserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserPool").finish_non_exhaustive()
    }
}

impl BrowserPool {
    /// A pool of up to `capacity` browsers, each launched via a clone
    /// of the settings produced by `builder`.
    pub fn new(capacity: usize, builder: impl Fn() -> BrowserBuilder + Send + Sync + 'static) -> Self {
        let create_builder = Arc::new(builder);

        let pool = Pool::new(
            capacity,
            move || {
                let builder = create_builder.clone();
                Box::pin(async move {
                    let browser = builder()
                        .launch()
                        .await
                        .map_err(|e| PoolError::CreateFailed(e.to_string()))?;
                    info!("Pool launched a browser");
                    Ok(Arc::new(browser))
                }) as BoxFuture<Result<Arc<Browser>, PoolError>>
            },
            |browser: Arc<Browser>| {
                Box::pin(async move {
                    if !browser.is_connected() {
                        warn!("Pooled browser lost its connection, discarding");
                        let _ = browser.close().await;
                        return None;
                    }
                    if let Err(e) = reset_browser(&browser).await {
                        warn!(error = %e, "Pooled browser failed its reset, discarding");
                        let _ = browser.close().await;
                        return None;
                    }
                    Some(browser)
                }) as BoxFuture<Option<Arc<Browser>>>
            },
            |browser: Arc<Browser>| {
                Box::pin(async move {
                    let _ = browser.close().await;
                }) as BoxFuture<()>
            },
        );

        Self { pool }
    }

    /// Acquire a browser, waiting up to `deadline` when the pool is
    /// exhausted. `None` waits indefinitely.
    #[instrument(level = "debug", skip(self))]
    pub async fn acquire(&self, deadline: Option<Duration>) -> Result<Arc<Browser>, PoolError> {
        self.pool.acquire(deadline).await
    }

    /// Return a browser to the pool.
    pub async fn release(&self, browser: Arc<Browser>) {
        self.pool.release(browser).await;
    }

    /// Close every pooled browser and refuse further acquisitions.
    ///
    /// Browsers currently checked out are closed when released back.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// `(total, idle)` handle counts.
    pub async fn counts(&self) -> (usize, usize) {
        self.pool.counts().await
    }
}

/// Reset a browser for reuse: close every non-default context and every
/// page left in the default context.
async fn reset_browser(browser: &Arc<Browser>) -> Result<(), crate::error::BrowserError> {
    for context in browser.contexts().await {
        context
            .close()
            .await
            .map_err(|e| crate::error::BrowserError::LaunchFailed(e.to_string()))?;
    }
    for page in browser.default_context().pages().await {
        page.close()
            .await
            .map_err(|e| crate::error::BrowserError::LaunchFailed(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
