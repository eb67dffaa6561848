use std::{
    error, fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use cogspeech_clock::{Clock, DurationSecs, System};
use tokio::{sync::oneshot, task::JoinHandle};

use crate::{
    renew::{IntervalTimer, RenewTimer},
    sources::{FetchResponse, TokenFetcher},
    AccessToken, TokenError, TokenStore,
};

/// How long an issued token is considered valid
pub const TOKEN_LIFETIME: DurationSecs = DurationSecs(600);

/// The default auto-renew period, 90% of [`TOKEN_LIFETIME`]
pub const DEFAULT_RENEW_INTERVAL: Duration = Duration::from_secs(540);

/// The outcome delivered to a caller waiting on a token
pub type TokenResult<E> = Result<AccessToken, TokenError<E>>;

type Callback<E> = Box<dyn FnOnce(TokenResult<E>) + Send + 'static>;

struct State<E> {
    store: TokenStore,
    requesting: bool,
    queue: Vec<Callback<E>>,
}

struct Shared<F: TokenFetcher, C> {
    fetcher: F,
    clock: C,
    state: Mutex<State<F::Error>>,
    renewal: Mutex<Option<JoinHandle<()>>>,
}

/// Acquires, caches, and shares a single bearer token between concurrent callers
///
/// At most one fetch is in flight at any time. Callers arriving while a fetch is
/// outstanding wait for that fetch instead of starting another. Handles are cheap to
/// clone and all clones share the same token.
///
/// All operations must be called from within a tokio runtime.
pub struct TokenLifecycleManager<F: TokenFetcher, C = System> {
    shared: Arc<Shared<F, C>>,
}

impl<F: TokenFetcher, C> Clone for TokenLifecycleManager<F, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F, C> fmt::Debug for TokenLifecycleManager<F, C>
where
    F: TokenFetcher + fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("TokenLifecycleManager")
            .field("fetcher", &self.shared.fetcher)
            .field("clock", &self.shared.clock)
            .field("store", &state.store)
            .field("requesting", &state.requesting)
            .field("waiting", &state.queue.len())
            .finish()
    }
}

impl<F: TokenFetcher> TokenLifecycleManager<F, System> {
    /// Constructs a new manager that obtains tokens from `fetcher`
    pub fn new(fetcher: F) -> Self {
        Self::with_clock(fetcher, System)
    }
}

impl<F, C> TokenLifecycleManager<F, C>
where
    F: TokenFetcher,
    C: Clock + Send + Sync + 'static,
{
    /// Constructs a new manager that decides token validity using `clock`
    ///
    /// Useful for testing purposes
    pub fn with_clock(fetcher: F, clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                clock,
                state: Mutex::new(State {
                    store: TokenStore::new(),
                    requesting: false,
                    queue: Vec::new(),
                }),
                renewal: Mutex::new(None),
            }),
        }
    }

    /// Requests a usable token, delivering the outcome to `callback`
    ///
    /// A valid cached token is delivered without any network access. Otherwise the
    /// caller either joins the fetch already in flight or starts a new one. The callback
    /// is always invoked from a spawned task, never before this function returns.
    ///
    /// Fetch failures are reported only to the callback that started the fetch. Callbacks
    /// that joined a failing fetch are dropped without being invoked.
    pub fn get_token<G>(&self, callback: G)
    where
        G: FnOnce(TokenResult<F::Error>) + Send + 'static,
    {
        let now = self.shared.clock.now();
        let mut state = self.shared.lock_state();

        if let Some(token) = state.store.valid_token(now) {
            let token = token.to_owned();
            drop(state);

            tracing::trace!("using cached token");
            tokio::spawn(async move { callback(Ok(token)) });
            return;
        }

        if state.requesting {
            state.queue.push(Box::new(callback));
            tracing::debug!(
                waiting = state.queue.len(),
                "joining in-flight token fetch"
            );
            return;
        }

        state.requesting = true;
        drop(state);

        tracing::debug!("no valid token held, fetching a new one");
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut in_flight = InFlight::new(Arc::clone(&shared));
            let outcome = shared.fetcher.fetch_token().await;
            in_flight.disarm();
            shared.receive_token(outcome, Box::new(callback));
        });
    }

    /// Obtains a usable token
    ///
    /// Equivalent to [`get_token()`][Self::get_token()], resolving to
    /// [`TokenError::Abandoned`] if this caller joined a fetch that failed.
    pub async fn token(&self) -> TokenResult<F::Error> {
        let (tx, rx) = oneshot::channel();
        self.get_token(move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(TokenError::Abandoned))
    }

    /// Gets the cached token if it is still valid, without fetching
    pub fn cached_token(&self) -> Option<AccessToken> {
        let now = self.shared.clock.now();
        self.shared
            .lock_state()
            .store
            .valid_token(now)
            .map(ToOwned::to_owned)
    }

    /// Starts renewing the token every `interval`
    ///
    /// Does nothing if auto-renew is already running.
    pub fn start_auto_renew(&self, interval: Duration) {
        let mut renewal = self.shared.lock_renewal();
        if is_running(&renewal) {
            tracing::trace!("auto-renew already running");
            return;
        }

        let timer = IntervalTimer::new(interval);
        *renewal = Some(tokio::spawn(renew_forever(
            Arc::downgrade(&self.shared),
            timer,
        )));
        tracing::info!(interval_ms = interval.as_millis() as u64, "started token auto-renew");
    }

    /// Starts renewing the token on each tick of `timer`
    ///
    /// Does nothing if auto-renew is already running, in which case `timer` is dropped.
    pub fn start_auto_renew_with<T: RenewTimer>(&self, timer: T) {
        let mut renewal = self.shared.lock_renewal();
        if is_running(&renewal) {
            tracing::trace!("auto-renew already running");
            return;
        }

        *renewal = Some(tokio::spawn(renew_forever(
            Arc::downgrade(&self.shared),
            timer,
        )));
        tracing::info!("started token auto-renew");
    }

    /// Stops auto-renew
    ///
    /// A fetch that is already in flight is not cancelled.
    pub fn stop_auto_renew(&self) {
        if let Some(handle) = self.shared.lock_renewal().take() {
            handle.abort();
            tracing::info!("stopped token auto-renew");
        }
    }

    /// Whether auto-renew is currently running
    pub fn is_auto_renewing(&self) -> bool {
        is_running(&self.shared.lock_renewal())
    }
}

fn is_running(renewal: &Option<JoinHandle<()>>) -> bool {
    renewal.as_ref().map_or(false, |h| !h.is_finished())
}

impl<F: TokenFetcher, C> Shared<F, C> {
    fn lock_state(&self) -> MutexGuard<'_, State<F::Error>> {
        // The state is never left half-updated, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_renewal(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.renewal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn abandon_fetch(&self) {
        let mut state = self.lock_state();
        state.requesting = false;
        let dropped = std::mem::take(&mut state.queue);
        drop(state);

        tracing::warn!(
            dropped = dropped.len(),
            "token fetch ended without an outcome"
        );
    }
}

/// Clears the in-flight fetch if its task ends before an outcome is received
struct InFlight<F: TokenFetcher, C> {
    shared: Arc<Shared<F, C>>,
    armed: bool,
}

impl<F: TokenFetcher, C> InFlight<F, C> {
    fn new(shared: Arc<Shared<F, C>>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<F: TokenFetcher, C> Drop for InFlight<F, C> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.abandon_fetch();
        }
    }
}

impl<F: TokenFetcher, C: Clock> Shared<F, C> {
    fn receive_token(
        &self,
        outcome: Result<FetchResponse, F::Error>,
        callback: Callback<F::Error>,
    ) {
        let mut state = self.lock_state();
        state.requesting = false;

        let error = match outcome {
            Ok(FetchResponse { status: 200, body }) if !body.is_empty() => {
                let token = AccessToken::new(body);
                state.store.set(token.clone(), TOKEN_LIFETIME, self.clock.now());

                let mut callbacks = Vec::with_capacity(state.queue.len() + 1);
                callbacks.push(callback);
                callbacks.append(&mut state.queue);

                tracing::info!(
                    expiry = state.store.expires_at().map(|t| t.0),
                    waiting = callbacks.len() - 1,
                    "received new token"
                );
                drop(state);

                tokio::spawn(async move {
                    for callback in callbacks {
                        let token = token.clone();
                        if panic::catch_unwind(AssertUnwindSafe(move || callback(Ok(token))))
                            .is_err()
                        {
                            tracing::error!("token callback panicked");
                        }
                    }
                });
                return;
            }
            Ok(FetchResponse { status: 200, .. }) => TokenError::MissingToken,
            Ok(FetchResponse { status, .. }) => TokenError::Http { status },
            Err(error) => TokenError::Transport(error),
        };

        let dropped = std::mem::take(&mut state.queue);
        drop(state);

        tracing::warn!(
            error = (&error as &dyn error::Error),
            dropped = dropped.len(),
            "token fetch failed"
        );
        drop(dropped);

        tokio::spawn(async move { callback(Err(error)) });
    }
}

impl<F: TokenFetcher, C> Drop for Shared<F, C> {
    fn drop(&mut self) {
        let renewal = self
            .renewal
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = renewal.take() {
            handle.abort();
        }
    }
}

async fn renew_forever<F, C, T>(manager: Weak<Shared<F, C>>, mut timer: T)
where
    F: TokenFetcher,
    C: Clock + Send + Sync + 'static,
    T: RenewTimer,
{
    while timer.tick().await {
        let Some(shared) = manager.upgrade() else {
            tracing::info!("token manager dropped, halting auto-renew");
            return;
        };

        tracing::debug!("scheduled token renewal");
        TokenLifecycleManager { shared }.get_token(|result| {
            if let Err(error) = result {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "scheduled token renewal failed"
                );
            }
        });
    }

    tracing::debug!("renewal schedule ended");
}
