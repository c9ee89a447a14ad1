//! First-class move type.
//!
//! A move is a domain value: it is parsed and checked against a position
//! before it ever touches the board, and it always knows its canonical token.

use super::MoveToken;
use chess::{ChessMove, Piece, Square};

/// A legal move in some position: source, destination, optional promotion.
///
/// Immutable once constructed. The canonical token is coordinate notation
/// (`e2e4`, `e7e8q`), whatever notation the move was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    inner: ChessMove,
}

impl Move {
    pub(super) fn from_chess(inner: ChessMove) -> Self {
        Self { inner }
    }

    pub(super) fn as_chess(&self) -> ChessMove {
        self.inner
    }

    /// Square the piece moves from.
    pub fn source(&self) -> Square {
        self.inner.get_source()
    }

    /// Square the piece moves to.
    pub fn dest(&self) -> Square {
        self.inner.get_dest()
    }

    /// Piece a pawn promotes to, if any.
    pub fn promotion(&self) -> Option<Piece> {
        self.inner.get_promotion()
    }

    /// Canonical coordinate-notation token.
    pub fn token(&self) -> MoveToken {
        MoveToken::new(self.to_string())
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.source(), self.dest())?;
        if let Some(piece) = self.promotion() {
            write!(f, "{}", piece.to_string(chess::Color::Black))?;
        }
        Ok(())
    }
}
