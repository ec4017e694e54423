use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use showcrawl::BrowserError;
use tokio::sync::{Mutex, RwLock};

/// A remote browser session that has to be quit explicitly.
#[async_trait]
pub trait Session: Clone + Send + Sync + 'static {
    async fn quit(self) -> Result<(), BrowserError>;
}

struct State<S> {
    closed: bool,
    sessions: HashMap<u64, S>,
}

/// Tracks every open session so that [`SessionRegistry::close`] can quit them all.
///
/// Sessions are created on a spawned task that registers them itself. A caller
/// dropped mid-creation (Ctrl-C) therefore never leaves an untracked session.
pub struct SessionRegistry<S> {
    state: Arc<Mutex<State<S>>>,
    // read: a creation in flight, write: `close` waiting for them
    in_flight: Arc<RwLock<()>>,
    next_id: AtomicU64,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                closed: false,
                sessions: HashMap::new(),
            })),
            in_flight: Arc::default(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<S: Session> SessionRegistry<S> {
    /// Creates and registers a session, returning it with its registry id.
    pub async fn open<F>(&self, create: F) -> Result<(u64, S), BrowserError>
    where
        F: Future<Output = Result<S, BrowserError>> + Send + 'static,
    {
        let guard = self.in_flight.clone().read_owned().await;
        if self.state.lock().await.closed {
            return Err(BrowserError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let state = self.state.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            let session = create.await?;

            let mut state = state.lock().await;
            if state.closed {
                drop(state);
                log::debug!("Browser closed while session {id} was starting, quitting it.");
                session.quit().await?;
                return Err(BrowserError::Closed);
            }
            state.sessions.insert(id, session.clone());
            Ok(session)
        });

        let session = task
            .await
            .map_err(|err| BrowserError::Driver(err.to_string()))??;
        Ok((id, session))
    }

    /// Quits one session. Missing ids were already torn down by `close`.
    pub async fn release(&self, id: u64) -> Result<(), BrowserError> {
        let session = self.state.lock().await.sessions.remove(&id);
        match session {
            Some(session) => session.quit().await,
            None => Ok(()),
        }
    }

    /// Refuses new sessions, waits for creations in flight and quits everything open.
    pub async fn close(&self) -> Result<(), BrowserError> {
        self.state.lock().await.closed = true;
        let _settled = self.in_flight.write().await;

        let drained: Vec<S> = self
            .state
            .lock()
            .await
            .sessions
            .drain()
            .map(|(_, session)| session)
            .collect();
        if !drained.is_empty() {
            log::info!("Closing {} open browser sessions.", drained.len());
        }

        let mut first_error = None;
        for session in drained {
            if let Err(err) = session.quit().await {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
