//! Owns one session loop per active game.

use super::{SessionLoop, SessionSummary};
use crate::error::TransportError;
use crate::ledger::LedgerStore;
use crate::oracle::MoveOracle;
use crate::session::GameId;
use crate::transport::Transport;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Operator-facing switches shared between the console and the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorControl {
    matchmaking: Arc<AtomicBool>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SupervisorControl {
    /// Creates controls with matchmaking on or off.
    pub fn new(matchmaking: bool) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            matchmaking: Arc::new(AtomicBool::new(matchmaking)),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Allows or forbids new sessions. Running sessions are unaffected.
    #[instrument(skip(self))]
    pub fn set_matchmaking(&self, enabled: bool) {
        info!("Matchmaking {}", if enabled { "enabled" } else { "disabled" });
        self.matchmaking.store(enabled, Ordering::SeqCst);
    }

    /// Whether new sessions may start.
    pub fn matchmaking(&self) -> bool {
        self.matchmaking.load(Ordering::SeqCst)
    }

    /// Asks the supervisor loop to stop polling.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.send_replace(true);
    }

    /// Whether shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(super) fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Polls active games and starts a session loop for each new one.
pub struct Supervisor<T, O, L> {
    transport: Arc<T>,
    session_loop: Arc<SessionLoop<T, O, L>>,
    control: SupervisorControl,
    poll_interval: Duration,
    running: Arc<Mutex<HashSet<GameId>>>,
    tasks: Mutex<JoinSet<SessionSummary>>,
}

impl<T, O, L> Supervisor<T, O, L>
where
    T: Transport,
    O: MoveOracle,
    L: LedgerStore,
{
    /// Creates a supervisor.
    #[instrument(skip(transport, session_loop, control))]
    pub fn new(
        transport: Arc<T>,
        session_loop: Arc<SessionLoop<T, O, L>>,
        control: SupervisorControl,
        poll_interval: Duration,
    ) -> Self {
        info!("Creating supervisor");
        Self {
            transport,
            session_loop,
            control,
            poll_interval,
            running: Arc::new(Mutex::new(HashSet::new())),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Fetches active games once and starts loops for games not yet owned.
    ///
    /// Returns the ids of the sessions started. Starts nothing while
    /// matchmaking is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the game list cannot be fetched.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<Vec<GameId>, TransportError> {
        self.reap().await;

        if !self.control.matchmaking() {
            debug!("Matchmaking disabled; not starting sessions");
            return Ok(Vec::new());
        }

        let games = self.transport.active_games().await?;
        let mut started = Vec::new();

        for game in games {
            {
                let mut running = self.running.lock().await;
                if !running.insert(game.game_id.clone()) {
                    debug!(game_id = %game.game_id, "Session already running");
                    continue;
                }
            }

            info!(game_id = %game.game_id, opponent = %game.opponent, "Starting session");
            let session_loop = Arc::clone(&self.session_loop);
            let running = Arc::clone(&self.running);
            let game_id = game.game_id.clone();
            self.tasks.lock().await.spawn(async move {
                let summary = session_loop.run(game_id.clone()).await;
                running.lock().await.remove(&game_id);
                summary
            });
            started.push(game.game_id);
        }

        Ok(started)
    }

    /// Polls until shutdown is requested.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(poll_interval_secs = self.poll_interval.as_secs(), "Supervisor running");
        let mut shutdown = self.control.subscribe();

        while !self.control.is_shutdown() {
            match self.poll_once().await {
                Ok(started) if !started.is_empty() => {
                    info!(started = ?started, "Sessions started");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Polling active games failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        let in_flight = self.running_games().await;
        info!(in_flight = ?in_flight, "Supervisor stopped");
    }

    /// Ids of games with a running loop.
    pub async fn running_games(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.running.lock().await.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Waits for every running loop to finish.
    #[instrument(skip(self))]
    pub async fn wait_for_sessions(&self) -> Vec<SessionSummary> {
        let mut tasks = self.tasks.lock().await;
        let mut summaries = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!(error = %e, "Session task failed"),
            }
        }
        summaries
    }

    /// Collects loops that already finished.
    async fn reap(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.try_join_next() {
            match joined {
                Ok(summary) => debug!(game_id = %summary.game_id, end = ?summary.end, "Session reaped"),
                Err(e) => warn!(error = %e, "Session task failed"),
            }
        }
    }
}
