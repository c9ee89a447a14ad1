//! Event streams: per-game decoding and reading, plus account notices.

mod account;
mod event;
mod reader;

pub use account::{AccountEvent, IncomingChallenge, decode_account_event};
pub use event::{ChatLine, FullGame, GameEvent, GameStatus, GameUpdate, decode_event};
pub use reader::{EventStream, StreamReader};
