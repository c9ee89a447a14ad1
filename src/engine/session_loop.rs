//! Drives one game from its event stream to the end.

use crate::error::{MoveError, ProtocolError, SubmitError};
use crate::ledger::{LedgerEntry, LedgerStore};
use crate::oracle::MoveOracle;
use crate::session::{GameId, Session, SyncReport};
use crate::stream::{EventStream, GameEvent, StreamReader};
use crate::submit::MoveSubmitter;
use crate::transport::Transport;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// What the engine did after synchronizing on one event.
#[derive(Debug, Clone)]
pub enum Action {
    /// Not the bot's turn, or nothing to decide.
    Waiting,
    /// Bot's turn but the position has no legal move.
    NoLegalMoves,
    /// The oracle had nothing to offer this tick.
    NoSuggestion,
    /// The oracle's move was not legal and was dropped.
    Discarded(MoveError),
    /// A move was accepted and recorded.
    Submitted(LedgerEntry),
    /// Submission failed; local state unchanged.
    Failed(SubmitError),
}

/// Result of handling one event.
#[derive(Debug, Clone)]
pub struct Tick {
    /// Synchronization result, for events that carry moves.
    pub sync: Option<SyncReport>,
    /// What the engine did afterwards.
    pub action: Action,
    /// Whether the game is over.
    pub finished: bool,
}

impl Tick {
    fn idle(finished: bool) -> Self {
        Self {
            sync: None,
            action: Action::Waiting,
            finished,
        }
    }
}

/// Why a session loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server reported the game over.
    GameOver(String),
    /// The stream closed, failed or went idle before the game ended.
    StreamClosed,
    /// The stream could not be opened.
    ConnectFailed(String),
}

/// Summary of one session loop run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Game id.
    pub game_id: GameId,
    /// Opponent, if the game was ever assigned.
    pub opponent: Option<String>,
    /// Moves on the board when the loop stopped.
    pub moves_applied: usize,
    /// Moves this loop submitted.
    pub moves_submitted: usize,
    /// Payloads skipped as undecodable.
    pub protocol_errors: usize,
    /// Why the loop stopped.
    pub end: SessionEnd,
}

impl SessionSummary {
    fn connect_failed(game_id: GameId, reason: String) -> Self {
        Self {
            game_id,
            opponent: None,
            moves_applied: 0,
            moves_submitted: 0,
            protocol_errors: 0,
            end: SessionEnd::ConnectFailed(reason),
        }
    }
}

/// Pause before re-deciding a turn that produced no move.
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// What woke the loop up.
enum Wakeup {
    Event(Option<Result<GameEvent, ProtocolError>>),
    Retry,
}

/// Per-game orchestration: synchronize, decide, ask, submit.
pub struct SessionLoop<T, O, L> {
    transport: Arc<T>,
    oracle: Arc<O>,
    submitter: MoveSubmitter<T, L>,
    reader: StreamReader,
    open_timeout: Duration,
    retry_interval: Duration,
}

impl<T, O, L> SessionLoop<T, O, L>
where
    T: Transport,
    O: MoveOracle,
    L: LedgerStore,
{
    /// Creates a session loop.
    #[instrument(skip_all)]
    pub fn new(
        transport: Arc<T>,
        oracle: Arc<O>,
        submitter: MoveSubmitter<T, L>,
        reader: StreamReader,
        open_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            oracle,
            submitter,
            reader,
            open_timeout,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Sets how long to wait before deciding again when the bot's turn
    /// produced no accepted move. The server sends nothing while it waits
    /// for us, so this timer is the only thing that retries.
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Plays one game until it ends or its stream goes away.
    #[instrument(skip(self))]
    pub async fn run(&self, game_id: GameId) -> SessionSummary {
        info!("Session loop starting");
        let opened = tokio::time::timeout(self.open_timeout, self.transport.stream_game(&game_id)).await;
        let lines = match opened {
            Ok(Ok(lines)) => lines,
            Ok(Err(e)) => {
                warn!(error = %e, "Could not open game stream");
                return SessionSummary::connect_failed(game_id, e.to_string());
            }
            Err(_) => {
                warn!("Opening game stream timed out");
                return SessionSummary::connect_failed(game_id, "timed out opening stream".to_string());
            }
        };

        let events = self.reader.events(lines);
        self.drive(Session::new(game_id), events).await
    }

    /// Consumes an event stream for a session.
    ///
    /// While it is the bot's turn and no move has been accepted, the turn is
    /// decided again every retry interval even if no event arrives.
    #[instrument(skip(self, session, events), fields(game_id = %session.game_id()))]
    pub async fn drive(&self, mut session: Session, mut events: EventStream) -> SessionSummary {
        let mut moves_submitted = 0;
        let mut protocol_errors = 0;
        let mut end = SessionEnd::StreamClosed;
        let mut retry_pending = false;

        loop {
            let wakeup = if retry_pending {
                tokio::select! {
                    item = events.next() => Wakeup::Event(item),
                    _ = tokio::time::sleep(self.retry_interval) => Wakeup::Retry,
                }
            } else {
                Wakeup::Event(events.next().await)
            };

            let item = match wakeup {
                Wakeup::Retry => {
                    debug!("Retrying turn decision");
                    if matches!(self.act(&mut session).await, Action::Submitted(_)) {
                        moves_submitted += 1;
                    }
                    retry_pending = awaiting_move(&session);
                    continue;
                }
                Wakeup::Event(None) => break,
                Wakeup::Event(Some(item)) => item,
            };

            let event = match item {
                Ok(event) => event,
                Err(_) => {
                    protocol_errors += 1;
                    continue;
                }
            };

            let reason = match &event {
                GameEvent::End { reason } => Some(reason.clone()),
                GameEvent::State(update) => Some(update.status.as_str().to_string()),
                GameEvent::Full(full) => Some(full.status.as_str().to_string()),
                GameEvent::Chat(_) | GameEvent::OpponentGone { .. } => None,
            };

            let tick = self.handle_event(&mut session, event).await;
            if matches!(tick.action, Action::Submitted(_)) {
                moves_submitted += 1;
            }
            if tick.finished {
                end = SessionEnd::GameOver(reason.unwrap_or_default());
                break;
            }
            retry_pending = awaiting_move(&session);
        }

        let summary = SessionSummary {
            game_id: session.game_id().to_string(),
            opponent: session.opponent().map(str::to_string),
            moves_applied: session.applied_count(),
            moves_submitted,
            protocol_errors,
            end,
        };
        info!(summary = ?summary, "Session loop finished");
        summary
    }

    /// Handles one event: synchronize the board, then act if it is our turn.
    #[instrument(skip(self, session, event), fields(game_id = %session.game_id()))]
    pub async fn handle_event(&self, session: &mut Session, event: GameEvent) -> Tick {
        match event {
            GameEvent::Full(full) => {
                session.assign(
                    full.assigned_color,
                    full.opponent.clone(),
                    full.initial_fen.as_deref(),
                );
                let sync = session.synchronize(&full.moves);
                if !full.status.is_ongoing() {
                    info!(status = full.status.as_str(), "Game already over");
                    return Tick {
                        sync: Some(sync),
                        action: Action::Waiting,
                        finished: true,
                    };
                }
                let action = self.act(session).await;
                Tick {
                    sync: Some(sync),
                    action,
                    finished: false,
                }
            }
            GameEvent::State(update) => {
                let sync = session.synchronize(&update.moves);
                if !update.status.is_ongoing() {
                    info!(status = update.status.as_str(), "Game over");
                    return Tick {
                        sync: Some(sync),
                        action: Action::Waiting,
                        finished: true,
                    };
                }
                if let Some(hint) = update.is_my_turn
                    && hint != session.is_bot_turn()
                {
                    warn!(hint, local = session.is_bot_turn(), "Server turn hint disagrees with board");
                }
                let action = self.act(session).await;
                Tick {
                    sync: Some(sync),
                    action,
                    finished: false,
                }
            }
            GameEvent::Chat(line) => {
                info!(username = %line.username, room = %line.room, text = %line.text, "Chat message");
                Tick::idle(false)
            }
            GameEvent::OpponentGone {
                gone,
                claim_win_in_seconds,
            } => {
                info!(gone, claim_win_in_seconds = ?claim_win_in_seconds, "Opponent presence changed");
                Tick::idle(false)
            }
            GameEvent::End { reason } => {
                info!(reason = %reason, "Game ended");
                Tick::idle(true)
            }
        }
    }

    /// Turn decision, oracle call and submission.
    async fn act(&self, session: &mut Session) -> Action {
        if !session.is_bot_turn() {
            debug!("Not our turn");
            return Action::Waiting;
        }
        if session.board().is_finished() {
            debug!("No legal moves");
            return Action::NoLegalMoves;
        }

        let fen = session.board().position_fingerprint();
        let Some(token) = self.oracle.suggest_move(&fen).await else {
            info!(fen = %fen, "No suggestion this tick");
            return Action::NoSuggestion;
        };

        if let Err(e) = session.board().parse_move(token.as_str()) {
            warn!(token = %token, error = %e, "Oracle suggested an unusable move; discarding");
            return Action::Discarded(e);
        }

        match self.submitter.submit(session, &token).await {
            Ok(entry) => Action::Submitted(entry),
            Err(e) => {
                warn!(error = %e, "Submission failed; turn will be decided again");
                Action::Failed(e)
            }
        }
    }
}

/// Bot's turn in a live position with no move accepted yet.
fn awaiting_move(session: &Session) -> bool {
    session.is_bot_turn() && !session.board().is_finished()
}
