//! Typed game events and their decoding from stream payloads.

use crate::error::ProtocolError;
use crate::games::chess::{Color, MoveToken};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Server-side game status as carried by state updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStatus(String);

impl GameStatus {
    /// Wraps a raw status string.
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Whether the game can still receive moves.
    pub fn is_ongoing(&self) -> bool {
        matches!(self.0.as_str(), "created" | "started")
    }

    /// Raw status string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        Self::new("started")
    }
}

/// Full snapshot of a game, sent first on every stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullGame {
    /// Every move played so far.
    pub moves: Vec<MoveToken>,
    /// Color the bot account plays.
    pub assigned_color: Color,
    /// Opponent's display name.
    pub opponent: String,
    /// Starting FEN when the game did not start from the standard position.
    pub initial_fen: Option<String>,
    /// Server status at snapshot time.
    pub status: GameStatus,
}

/// Incremental state update; still carries the complete move list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameUpdate {
    /// Every move played so far.
    pub moves: Vec<MoveToken>,
    /// Server's turn hint, when present. Never authoritative.
    pub is_my_turn: Option<bool>,
    /// Server status.
    pub status: GameStatus,
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Author.
    pub username: String,
    /// Chat room (`player` or `spectator`).
    pub room: String,
    /// Message text.
    pub text: String,
}

/// One decoded event from a game stream.
///
/// Closed set: adding a kind means adding a handler in the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Full game snapshot.
    Full(FullGame),
    /// State update.
    State(GameUpdate),
    /// Chat line; ignored by the engine.
    Chat(ChatLine),
    /// Opponent left (or came back).
    OpponentGone {
        /// Whether the opponent is currently gone.
        gone: bool,
        /// Seconds until a win can be claimed.
        claim_win_in_seconds: Option<u32>,
    },
    /// Game over.
    End {
        /// Why the game ended.
        reason: String,
    },
}

impl GameEvent {
    /// Whether no further events will follow this one.
    pub fn is_terminal(&self) -> bool {
        match self {
            GameEvent::End { .. } => true,
            GameEvent::State(update) => !update.status.is_ongoing(),
            GameEvent::Full(full) => !full.status.is_ongoing(),
            GameEvent::Chat(_) | GameEvent::OpponentGone { .. } => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Wire format
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Payload {
    GameFull(WireFull),
    GameState(WireState),
    ChatLine(WireChat),
    #[serde(rename_all = "camelCase")]
    OpponentGone {
        gone: bool,
        #[serde(default)]
        claim_win_in_seconds: Option<u32>,
    },
    GameEnd {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFull {
    white: WirePlayer,
    black: WirePlayer,
    #[serde(default)]
    initial_fen: Option<String>,
    state: WireState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WirePlayer {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ai_level: Option<u8>,
}

impl WirePlayer {
    pub(super) fn is_account(&self, account_id: &str) -> bool {
        self.id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(account_id))
    }

    pub(super) fn display_name(&self) -> String {
        if let Some(level) = self.ai_level {
            return format!("AI level {}", level);
        }
        self.name
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireState {
    #[serde(default)]
    moves: String,
    #[serde(default)]
    is_my_turn: Option<bool>,
    #[serde(default)]
    status: Option<String>,
}

impl WireState {
    fn tokens(&self) -> Vec<MoveToken> {
        self.moves.split_whitespace().map(MoveToken::from).collect()
    }

    fn status(&self) -> GameStatus {
        self.status.clone().map(GameStatus::new).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct WireChat {
    #[serde(default)]
    username: String,
    #[serde(default)]
    room: String,
    #[serde(default)]
    text: String,
}

/// Decodes one payload line.
///
/// The bot's color comes from matching `account_id` against the player ids
/// of a `gameFull` payload.
///
/// # Errors
///
/// Returns [`ProtocolError`] for malformed JSON, unknown event types, or a
/// `gameFull` in which the account plays neither side.
#[instrument(skip(line), fields(len = line.len()))]
pub fn decode_event(line: &str, account_id: &str) -> Result<GameEvent, ProtocolError> {
    let payload: Payload = serde_json::from_str(line)
        .map_err(|e| ProtocolError::new(format!("Undecodable payload ({}): {}", e, line)))?;

    let event = match payload {
        Payload::GameFull(full) => {
            let (assigned_color, opponent) = if full.white.is_account(account_id) {
                (Color::White, &full.black)
            } else if full.black.is_account(account_id) {
                (Color::Black, &full.white)
            } else {
                return Err(ProtocolError::new(format!(
                    "Account {} plays neither side of this game",
                    account_id
                )));
            };
            GameEvent::Full(FullGame {
                moves: full.state.tokens(),
                assigned_color,
                opponent: opponent.display_name(),
                initial_fen: full.initial_fen.clone().filter(|fen| fen != "startpos"),
                status: full.state.status(),
            })
        }
        Payload::GameState(state) => GameEvent::State(GameUpdate {
            moves: state.tokens(),
            is_my_turn: state.is_my_turn,
            status: state.status(),
        }),
        Payload::ChatLine(chat) => GameEvent::Chat(ChatLine {
            username: chat.username,
            room: chat.room,
            text: chat.text,
        }),
        Payload::OpponentGone {
            gone,
            claim_win_in_seconds,
        } => GameEvent::OpponentGone {
            gone,
            claim_win_in_seconds,
        },
        Payload::GameEnd { reason } => GameEvent::End {
            reason: reason.unwrap_or_else(|| "gameEnd".to_string()),
        },
    };

    debug!(event = ?event, "Decoded event");
    Ok(event)
}
