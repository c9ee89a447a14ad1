//! Move oracle: the external service that picks moves.

use crate::games::chess::MoveToken;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Source of move suggestions.
///
/// `None` means "no action this tick", never a reason to abort the game.
#[async_trait::async_trait]
pub trait MoveOracle: Send + Sync + 'static {
    /// Suggests a move for the position described by `fen`.
    async fn suggest_move(&self, fen: &str) -> Option<MoveToken>;
}

/// Oracle backed by the transport's analysis endpoint.
#[derive(Debug)]
pub struct CloudEvalOracle<T> {
    transport: Arc<T>,
    variations: u8,
}

impl<T: Transport> CloudEvalOracle<T> {
    /// Creates an oracle asking for `variations` ranked lines per position.
    #[instrument(skip(transport))]
    pub fn new(transport: Arc<T>, variations: u8) -> Self {
        info!("Creating cloud evaluation oracle");
        Self {
            transport,
            variations: variations.max(1),
        }
    }
}

#[async_trait::async_trait]
impl<T: Transport> MoveOracle for CloudEvalOracle<T> {
    #[instrument(skip(self))]
    async fn suggest_move(&self, fen: &str) -> Option<MoveToken> {
        let analysis = match self.transport.analyse(fen, self.variations).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, status = ?e.status, "Analysis request failed");
                return None;
            }
        };

        let Some(best) = analysis.pvs.first() else {
            warn!("Analysis returned no principal variations");
            return None;
        };

        match best.first_move() {
            Some(token) => {
                debug!(token, cp = ?best.cp, mate = ?best.mate, depth = ?analysis.depth, "Oracle suggestion");
                Some(MoveToken::new(token))
            }
            None => {
                warn!("Top variation has no moves");
                None
            }
        }
    }
}
