//! Account-wide events: challenges and game lifecycle notices.

use super::event::WirePlayer;
use crate::error::ProtocolError;
use crate::session::GameId;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Challenge seen on the account stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingChallenge {
    /// Challenge id, used to accept or decline it.
    pub id: String,
    /// Challenger's display name.
    pub challenger: String,
    /// Whether the bot account sent this challenge itself.
    pub outgoing: bool,
    /// Variant key (`standard`, `fromPosition`, `chess960`, ...).
    pub variant: String,
    /// Whether the game would be rated.
    pub rated: bool,
    /// Speed category, when the server names one.
    pub speed: Option<String>,
}

/// One decoded event from the account stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    /// A challenge was created.
    Challenge(IncomingChallenge),
    /// A challenge was canceled or declined before it started.
    ChallengeClosed {
        /// Challenge id.
        id: String,
    },
    /// A game involving the account started.
    GameStarted {
        /// Game id.
        game_id: GameId,
    },
    /// A game involving the account finished.
    GameFinished {
        /// Game id.
        game_id: GameId,
    },
    /// Event kind the bot does not act on.
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum AccountPayload {
    Challenge { challenge: WireChallenge },
    ChallengeCanceled { challenge: WireChallengeRef },
    ChallengeDeclined { challenge: WireChallengeRef },
    GameStart { game: WireGameRef },
    GameFinish { game: WireGameRef },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireChallenge {
    id: String,
    challenger: WirePlayer,
    #[serde(default)]
    variant: Option<WireVariant>,
    #[serde(default)]
    rated: bool,
    #[serde(default)]
    speed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireVariant {
    key: String,
}

#[derive(Debug, Deserialize)]
struct WireChallengeRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGameRef {
    #[serde(default)]
    game_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl WireGameRef {
    fn into_id(self) -> Result<GameId, ProtocolError> {
        self.game_id
            .or(self.id)
            .ok_or_else(|| ProtocolError::new("Game notice without a game id"))
    }
}

/// Decodes one account stream payload.
///
/// A challenge is marked outgoing when `account_id` is the challenger.
///
/// # Errors
///
/// Returns [`ProtocolError`] for malformed JSON or a game notice without an
/// id. Unknown event kinds decode to [`AccountEvent::Other`].
#[instrument(skip(line), fields(len = line.len()))]
pub fn decode_account_event(line: &str, account_id: &str) -> Result<AccountEvent, ProtocolError> {
    let payload: AccountPayload = serde_json::from_str(line)
        .map_err(|e| ProtocolError::new(format!("Undecodable account payload ({}): {}", e, line)))?;

    let event = match payload {
        AccountPayload::Challenge { challenge } => AccountEvent::Challenge(IncomingChallenge {
            outgoing: challenge.challenger.is_account(account_id),
            challenger: challenge.challenger.display_name(),
            id: challenge.id,
            variant: challenge
                .variant
                .map(|v| v.key)
                .unwrap_or_else(|| "standard".to_string()),
            rated: challenge.rated,
            speed: challenge.speed,
        }),
        AccountPayload::ChallengeCanceled { challenge }
        | AccountPayload::ChallengeDeclined { challenge } => {
            AccountEvent::ChallengeClosed { id: challenge.id }
        }
        AccountPayload::GameStart { game } => AccountEvent::GameStarted {
            game_id: game.into_id()?,
        },
        AccountPayload::GameFinish { game } => AccountEvent::GameFinished {
            game_id: game.into_id()?,
        },
        AccountPayload::Other => AccountEvent::Other,
    };

    debug!(event = ?event, "Decoded account event");
    Ok(event)
}
