//! Deduplicating refresh coordinator.
//!
//! A [`RefreshCoordinator`] owns the latest value produced by an async
//! refresh function. Concurrent refresh requests share one in-flight run;
//! readers get the last completed value without waiting.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};

type RefreshFn<T> = Arc<dyn Fn() -> BoxFuture<'static, T> + Send + Sync>;
type InFlight<T> = Shared<BoxFuture<'static, Arc<T>>>;

struct State<T> {
    current: Option<Arc<T>>,
    /// The running refresh and its generation.
    in_flight: Option<(u64, InFlight<T>)>,
    generation: u64,
    closed: bool,
}

struct Inner<T> {
    refresh_fn: RefreshFn<T>,
    state: Mutex<State<T>>,
    periodic: Mutex<Option<JoinHandle<()>>>,
}

/// Runs an async refresh function at most once at a time.
///
/// Cloning is cheap; clones share the same value and in-flight refresh.
pub struct RefreshCoordinator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RefreshCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> RefreshCoordinator<T> {
    /// Creates a coordinator with no value yet.
    pub fn new<F, Fut>(refresh_fn: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let refresh_fn: RefreshFn<T> = Arc::new(move || refresh_fn().boxed());
        Self {
            inner: Arc::new(Inner {
                refresh_fn,
                state: Mutex::new(State {
                    current: None,
                    in_flight: None,
                    generation: 0,
                    closed: false,
                }),
                periodic: Mutex::new(None),
            }),
        }
    }

    /// Refreshes the value, joining the refresh already in flight if any.
    ///
    /// The refresh runs on its own task, so dropping the returned future
    /// does not cancel it.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Shutdown`] after [`shutdown`](Self::shutdown).
    pub async fn refresh(&self) -> ServerResult<Arc<T>> {
        let in_flight = {
            let mut state = self.inner.state.lock().await;
            if state.closed {
                return Err(ServerError::Shutdown);
            }
            let running = state.in_flight.as_ref().map(|(g, shared)| (*g, shared.clone()));
            match running {
                Some((generation, shared)) => {
                    debug!(generation, "Joining in-flight refresh");
                    shared
                }
                None => {
                    state.generation += 1;
                    let generation = state.generation;
                    let shared = self.start(generation);
                    state.in_flight = Some((generation, shared.clone()));
                    shared
                }
            }
        };

        Ok(in_flight.await)
    }

    fn start(&self, generation: u64) -> InFlight<T> {
        debug!(generation, "Starting refresh");
        let inner = Arc::downgrade(&self.inner);
        let work = (self.inner.refresh_fn)();

        let shared = async move {
            let value = Arc::new(work.await);
            if let Some(inner) = inner.upgrade() {
                let mut state = inner.state.lock().await;
                state.current = Some(Arc::clone(&value));
                if state.in_flight.as_ref().is_some_and(|(g, _)| *g == generation) {
                    state.in_flight = None;
                }
            }
            debug!(generation, "Refresh completed");
            value
        }
        .boxed()
        .shared();

        tokio::spawn(shared.clone());
        shared
    }

    /// Returns the last completed value without waiting.
    pub async fn current(&self) -> Option<Arc<T>> {
        self.inner.state.lock().await.current.clone()
    }

    /// Returns the last completed value, refreshing first if there is none.
    pub async fn get_or_refresh(&self) -> ServerResult<Arc<T>> {
        if let Some(current) = self.current().await {
            return Ok(current);
        }
        self.refresh().await
    }

    /// Returns true while a refresh is running.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.state.lock().await.in_flight.is_some()
    }

    /// Refreshes every `period` in the background until shutdown. The first
    /// run happens one period from now. Replaces any earlier periodic task.
    pub async fn spawn_periodic(&self, period: Duration) -> ServerResult<()> {
        if period.is_zero() {
            return Err(ServerError::config("refresh interval must be greater than zero"));
        }
        if self.inner.state.lock().await.closed {
            return Err(ServerError::Shutdown);
        }

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if (RefreshCoordinator { inner }).refresh().await.is_err() {
                    break;
                }
            }
            debug!("Periodic refresh stopped");
        });

        info!(period_secs = period.as_secs(), "Periodic refresh enabled");
        if let Some(previous) = self.inner.periodic.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Stops the periodic task, waits for the in-flight refresh and refuses
    /// further refreshes. The last value stays readable.
    pub async fn shutdown(&self) {
        let pending = {
            let mut state = self.inner.state.lock().await;
            state.closed = true;
            state.in_flight.as_ref().map(|(_, shared)| shared.clone())
        };

        if let Some(handle) = self.inner.periodic.lock().await.take() {
            handle.abort();
        }
        if let Some(pending) = pending {
            debug!("Waiting for in-flight refresh");
            pending.await;
        }
        info!("Refresh coordinator shut down");
    }
}
