//! Live state of one game: board, assignment and synchronization.

use crate::error::{MoveError, ProtocolError};
use crate::games::chess::{Board, Color, MoveToken};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game.
pub type GameId = String;

/// Who the bot is in a game; known once the full snapshot has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Color the bot plays.
    pub color: Color,
    /// Opponent's display name (ledger key).
    pub opponent: String,
}

/// Outcome of reconciling the board with a server move list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Moves applied from this list.
    pub applied: usize,
    /// First move that was refused, if any. Later moves were not tried.
    pub rejected: Option<MoveError>,
}

/// Session for exactly one in-progress game.
///
/// The board is owned here and nowhere else; the number of applied moves is
/// read from the board itself, so it can never disagree with it.
#[derive(Debug, Clone)]
pub struct Session {
    game_id: GameId,
    assignment: Option<Assignment>,
    board: Board,
}

impl Session {
    /// Creates a session at the standard starting position.
    #[instrument]
    pub fn new(game_id: GameId) -> Self {
        info!(game_id = %game_id, "Creating session");
        Self {
            game_id,
            assignment: None,
            board: Board::new(),
        }
    }

    /// Records the bot's color and opponent from a full snapshot.
    ///
    /// A snapshot with a custom starting position resets an empty board to
    /// that position; once moves have been applied the board is kept.
    #[instrument(skip(self), fields(game_id = %self.game_id))]
    pub fn assign(&mut self, color: Color, opponent: String, initial_fen: Option<&str>) {
        if let Some(previous) = &self.assignment
            && previous.color != color
        {
            warn!(previous = %previous.color, current = %color, "Assigned color changed between snapshots");
        }

        if let Some(fen) = initial_fen
            && self.board.moves().is_empty()
        {
            match Board::from_fen(fen) {
                Ok(board) => self.board = board,
                Err(e) => warn!(error = %e, "Ignoring unusable initial position"),
            }
        }

        info!(color = %color, opponent = %opponent, "Session assigned");
        self.assignment = Some(Assignment { color, opponent });
    }

    /// Applies the unseen tail of a complete server move list.
    ///
    /// The delta is `moves[applied_count..]`. Applying stops at the first move
    /// the board refuses; the next event's list recomputes the delta from
    /// whatever was actually applied.
    #[instrument(skip(self, moves), fields(game_id = %self.game_id, reported = moves.len(), applied_before = self.applied_count()))]
    pub fn synchronize(&mut self, moves: &[MoveToken]) -> SyncReport {
        let applied_count = self.applied_count();
        if moves.len() < applied_count {
            warn!("Server move list is shorter than local history; ignoring");
            return SyncReport::default();
        }

        let mut report = SyncReport::default();
        for token in &moves[applied_count..] {
            match self.board.apply_move(token.as_str()) {
                Ok(_) => report.applied += 1,
                Err(e) => {
                    let error = ProtocolError::new(format!(
                        "Server move {} rejected at ply {}: {}",
                        token,
                        self.applied_count(),
                        e
                    ));
                    warn!(error = %error, "Discarding rest of delta");
                    report.rejected = Some(e);
                    break;
                }
            }
        }

        debug!(applied = report.applied, applied_count = self.applied_count(), "Synchronized");
        report
    }

    /// Whether the bot must move now.
    ///
    /// True exactly when the session is assigned and the side to move is the
    /// assigned color.
    pub fn is_bot_turn(&self) -> bool {
        self.assignment
            .as_ref()
            .is_some_and(|a| self.board.side_to_move() == a.color)
    }

    /// Game id.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Assignment, once known.
    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    /// Opponent name, once known.
    pub fn opponent(&self) -> Option<&str> {
        self.assignment.as_ref().map(|a| a.opponent.as_str())
    }

    /// Number of moves applied to the board.
    pub fn applied_count(&self) -> usize {
        self.board.moves().len()
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable board access for confirmed moves.
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }
}
