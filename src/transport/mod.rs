//! Remote service boundary.
//!
//! The engine never talks HTTP directly; every remote call goes through
//! [`Transport`], so tests can script the service and the Lichess client
//! stays a thin adapter.

mod lichess;
mod types;

pub use lichess::LichessClient;
pub use types::{
    ActiveGame, Analysis, ChallengeColor, ChallengeRequest, DeclineReason, PrincipalVariation,
    TimeControl,
};

use crate::error::TransportError;
use futures::stream::BoxStream;

/// Lazy sequence of raw payload lines from a game or account stream.
pub type LineStream = BoxStream<'static, Result<String, TransportError>>;

/// Remote calls the engine depends on.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens the newline-delimited event stream of one game.
    async fn stream_game(&self, game_id: &str) -> Result<LineStream, TransportError>;

    /// Submits a move; `Ok` means the service accepted it.
    async fn submit_move(&self, game_id: &str, token: &str) -> Result<(), TransportError>;

    /// Lists games currently in progress for the authenticated account.
    async fn active_games(&self) -> Result<Vec<ActiveGame>, TransportError>;

    /// Requests ranked variations for a position.
    async fn analyse(&self, fen: &str, variations: u8) -> Result<Analysis, TransportError>;

    /// Challenges a player; returns the challenge id.
    async fn create_challenge(&self, request: &ChallengeRequest) -> Result<String, TransportError>;

    /// Opens the newline-delimited event stream of the authenticated account.
    async fn stream_events(&self) -> Result<LineStream, TransportError>;

    /// Accepts a challenge sent to the account.
    async fn accept_challenge(&self, challenge_id: &str) -> Result<(), TransportError>;

    /// Declines a challenge sent to the account.
    async fn decline_challenge(
        &self,
        challenge_id: &str,
        reason: DeclineReason,
    ) -> Result<(), TransportError>;

    /// Id of the authenticated account.
    async fn account_id(&self) -> Result<String, TransportError>;
}
