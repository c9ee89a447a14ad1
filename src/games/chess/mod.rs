//! Chess board model: move tokens, legality and position fingerprints.

mod action;
mod board;
mod types;

pub use action::Move;
pub use board::Board;
pub use types::{Color, MoveToken};
