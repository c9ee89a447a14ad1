//! Canonical chess position plus ordered move history.
//!
//! All derived state (position, side to move, clocks) is produced by
//! replaying moves from the initial position, one `apply_move` at a time.
//! Two boards built from the same initial position and the same tokens are
//! always equal.

use super::{Color, Move, MoveToken};
use crate::error::MoveError;
use chess::{BoardStatus, ChessMove, File, Piece, Rank, Square};
use std::str::FromStr;
use tracing::{debug, instrument};

/// Chess board with move history.
#[derive(Clone)]
pub struct Board {
    initial_fen: String,
    position: chess::Board,
    moves: Vec<Move>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Board {
    /// Creates a board at the standard starting position.
    #[instrument]
    pub fn new() -> Self {
        let initial = chess::Board::default();
        Self {
            initial_fen: fen_of(&initial, 0, 1),
            position: initial,
            moves: Vec::new(),
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Creates a board from a FEN string.
    ///
    /// Halfmove clock and fullmove number are read from the FEN when present.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Parse`] if the FEN does not describe a position.
    #[instrument]
    pub fn from_fen(fen: &str) -> Result<Self, MoveError> {
        let initial = chess::Board::from_str(fen)
            .map_err(|_| MoveError::Parse(format!("invalid FEN: {}", fen)))?;

        let fields: Vec<&str> = fen.split_whitespace().collect();
        let halfmove_clock = fields.get(4).and_then(|f| f.parse().ok()).unwrap_or(0);
        let fullmove_number = fields
            .get(5)
            .and_then(|f| f.parse().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1);

        Ok(Self {
            initial_fen: fen_of(&initial, halfmove_clock, fullmove_number),
            position: initial,
            moves: Vec::new(),
            halfmove_clock,
            fullmove_number,
        })
    }

    /// Builds a board by applying tokens in one batch, starting from
    /// `initial_fen` (standard start when `None`).
    ///
    /// # Errors
    ///
    /// Returns the first token that fails to apply.
    #[instrument(skip(tokens))]
    pub fn replay<'a>(
        initial_fen: Option<&str>,
        tokens: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, MoveError> {
        let mut board = match initial_fen {
            Some(fen) => Self::from_fen(fen)?,
            None => Self::new(),
        };
        for token in tokens {
            board.apply_move(token)?;
        }
        Ok(board)
    }

    /// Parses a token and checks it against the current position.
    ///
    /// Coordinate notation is tried first. Only tokens that are not shaped like
    /// coordinates fall back to SAN. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// [`MoveError::Illegal`] for a well-formed move that cannot be played
    /// here, [`MoveError::Parse`] for a token in neither notation.
    #[instrument(skip(self), fields(fen = %self.position_fingerprint()))]
    pub fn parse_move(&self, token: &str) -> Result<Move, MoveError> {
        let token = token.trim();

        let candidate = match parse_coordinates(token) {
            Some(mv) => mv,
            None => self.parse_san(token)?,
        };

        if !self.position.legal(candidate) {
            debug!(token, "Move is not legal in current position");
            return Err(self.illegal(token));
        }

        Ok(Move::from_chess(candidate))
    }

    /// SAN fallback for tokens that are not coordinate notation.
    fn parse_san(&self, token: &str) -> Result<ChessMove, MoveError> {
        if !looks_like_san(token) {
            return Err(MoveError::Parse(token.to_string()));
        }
        ChessMove::from_san(&self.position, token).map_err(|_| {
            debug!(token, "SAN token matches no legal move");
            self.illegal(token)
        })
    }

    fn illegal(&self, token: &str) -> MoveError {
        MoveError::Illegal {
            token: token.to_string(),
            fen: self.position_fingerprint(),
        }
    }

    /// Applies a move token, appending it to the history.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError`] and leaves the board untouched if the token is
    /// unparsable or illegal.
    #[instrument(skip(self), fields(ply = self.moves.len()))]
    pub fn apply_move(&mut self, token: &str) -> Result<Move, MoveError> {
        let mv = self.parse_move(token)?;
        let chess_move = mv.as_chess();

        let moving = self.position.piece_on(chess_move.get_source());
        let is_pawn = moving == Some(Piece::Pawn);
        let is_capture = self.position.piece_on(chess_move.get_dest()).is_some()
            || (is_pawn && chess_move.get_source().get_file() != chess_move.get_dest().get_file());
        let mover = self.position.side_to_move();

        self.position = self.position.make_move_new(chess_move);
        self.moves.push(mv);
        self.halfmove_clock = if is_pawn || is_capture {
            0
        } else {
            self.halfmove_clock + 1
        };
        if mover == chess::Color::Black {
            self.fullmove_number += 1;
        }

        debug!(token = %mv, "Move applied");
        Ok(mv)
    }

    /// Deterministic FEN of the current position.
    pub fn position_fingerprint(&self) -> String {
        fen_of(&self.position, self.halfmove_clock, self.fullmove_number)
    }

    /// FEN of the position before any move was applied.
    pub fn initial_fingerprint(&self) -> &str {
        &self.initial_fen
    }

    /// Side to move in the current position.
    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move().into()
    }

    /// Moves applied so far, in order.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Canonical tokens of the applied moves.
    pub fn tokens(&self) -> Vec<MoveToken> {
        self.moves.iter().map(Move::token).collect()
    }

    /// Whether the side to move has no legal move (mate or stalemate).
    pub fn is_finished(&self) -> bool {
        self.position.status() != BoardStatus::Ongoing
    }

    /// Whether the given token is legal right now.
    pub fn is_legal(&self, token: &str) -> bool {
        self.parse_move(token).is_ok()
    }

    /// Legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<Move> {
        chess::MoveGen::new_legal(&self.position)
            .map(Move::from_chess)
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.initial_fen == other.initial_fen
            && self.moves == other.moves
            && self.position_fingerprint() == other.position_fingerprint()
    }
}

impl Eq for Board {}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("fen", &self.position_fingerprint())
            .field("moves", &self.moves.iter().map(|m| m.to_string()).collect::<Vec<_>>())
            .finish()
    }
}

/// Full FEN: the library renders the first four fields, the clocks are ours.
fn fen_of(position: &chess::Board, halfmove_clock: u32, fullmove_number: u32) -> String {
    let rendered = position.to_string();
    let head: Vec<&str> = rendered.split_whitespace().take(4).collect();
    format!("{} {} {}", head.join(" "), halfmove_clock, fullmove_number)
}

/// Parses `e2e4` / `e7e8q` style tokens. `None` when the token is not shaped
/// like coordinate notation at all.
fn parse_coordinates(token: &str) -> Option<ChessMove> {
    let bytes = token.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return None;
    }

    let square = |file: u8, rank: u8| -> Option<Square> {
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return None;
        }
        Some(Square::make_square(
            Rank::from_index((rank - b'1') as usize),
            File::from_index((file - b'a') as usize),
        ))
    };

    let source = square(bytes[0], bytes[1])?;
    let dest = square(bytes[2], bytes[3])?;
    let promotion = match bytes.get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return None,
    };

    Some(ChessMove::new(source, dest, promotion))
}

fn looks_like_san(token: &str) -> bool {
    let leading = token
        .chars()
        .next()
        .is_some_and(|c| "KQRBN".contains(c) || ('a'..='h').contains(&c));
    token.starts_with("O-O")
        || (leading && token.chars().all(|c| c.is_ascii_alphanumeric() || "x=+#".contains(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_shapes() {
        assert!(parse_coordinates("e2e4").is_some());
        assert!(parse_coordinates("e7e8q").is_some());
        assert!(parse_coordinates("a1a1").is_some());
        assert!(parse_coordinates("e2e9").is_none());
        assert!(parse_coordinates("Nf3").is_none());
        assert!(parse_coordinates("e7e8k").is_none());
    }

    #[test]
    fn test_san_shapes() {
        assert!(looks_like_san("Nf3"));
        assert!(looks_like_san("exd5"));
        assert!(looks_like_san("O-O-O"));
        assert!(looks_like_san("e8=Q+"));
        assert!(!looks_like_san(""));
        assert!(!looks_like_san("zz"));
        assert!(!looks_like_san("??"));
    }
}
