//! Move submission with re-validation, bounded retry and ledger recording.

use crate::error::{StaleSuggestion, SubmitError, TransportError};
use crate::games::chess::MoveToken;
use crate::ledger::{LedgerEntry, LedgerStore};
use crate::session::Session;
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Retry policy for move posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Sends moves and advances local state only on confirmed acceptance.
pub struct MoveSubmitter<T, L> {
    transport: Arc<T>,
    ledger: Arc<L>,
    retry: RetryPolicy,
}

impl<T: Transport, L: LedgerStore> MoveSubmitter<T, L> {
    /// Creates a submitter.
    #[instrument(skip(transport, ledger))]
    pub fn new(transport: Arc<T>, ledger: Arc<L>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            ledger,
            retry,
        }
    }

    /// Submits `token` for the session's game.
    ///
    /// The token is re-checked against the board first; a token that is no
    /// longer legal is never sent. The move is posted and recorded in
    /// coordinate notation whatever notation the token used. After the service accepts the move it is
    /// applied to the board and recorded in the ledger with the position it
    /// was chosen in. A ledger write failure is logged and does not fail the
    /// submission.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Stale`] when the token is not legal now,
    /// [`SubmitError::Transport`] when the service never confirmed the move
    /// (the board is untouched), [`SubmitError::Desync`] if the board refuses
    /// a move the service accepted.
    #[instrument(skip(self, session), fields(game_id = %session.game_id(), token = %token))]
    pub async fn submit(
        &self,
        session: &mut Session,
        token: &MoveToken,
    ) -> Result<LedgerEntry, SubmitError> {
        let canonical = match session.board().parse_move(token.as_str()) {
            Ok(mv) => mv.token(),
            Err(reason) => {
                warn!(reason = %reason, "Suggestion no longer legal; not submitting");
                return Err(StaleSuggestion {
                    token: token.to_string(),
                    reason,
                }
                .into());
            }
        };
        if canonical != *token {
            debug!(canonical = %canonical, "Suggestion normalized to coordinate notation");
        }

        let position = session.board().position_fingerprint();
        self.post_with_retry(session.game_id(), &canonical).await?;

        session.board_mut().apply_move(canonical.as_str()).map_err(|e| {
            error!(error = %e, "Accepted move refused by local board");
            SubmitError::Desync(e)
        })?;

        let entry = LedgerEntry::new(position, canonical.to_string(), chrono::Utc::now());
        let opponent = session.opponent().unwrap_or("unknown").to_string();
        if let Err(e) = self.ledger.append(&opponent, entry.clone()).await {
            warn!(error = %e, opponent = %opponent, "Ledger write failed; continuing with in-memory record");
        }

        info!(applied_count = session.applied_count(), "Move submitted and recorded");
        Ok(entry)
    }

    async fn post_with_retry(&self, game_id: &str, token: &MoveToken) -> Result<(), TransportError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transport.submit_move(game_id, token.as_str()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(error = %e, attempt, attempts, "Move post failed; retrying");
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(error = %e, attempt, "Move post failed for good");
                    return Err(e);
                }
            }
        }
    }
}
