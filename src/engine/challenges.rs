//! Answers challenges sent to the bot account.

use super::SupervisorControl;
use crate::stream::{AccountEvent, IncomingChallenge, decode_account_event};
use crate::transport::{DeclineReason, LineStream, Transport};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Variants the board model can play.
const PLAYABLE_VARIANTS: [&str; 2] = ["standard", "fromPosition"];

/// What to do with an incoming challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeDecision {
    /// Accept it; the game is picked up by the next active-game poll.
    Accept,
    /// Decline it with a reason.
    Decline(DeclineReason),
}

/// What one connection to the account stream did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenReport {
    /// Ids of accepted challenges.
    pub accepted: Vec<String>,
    /// Ids of declined challenges.
    pub declined: Vec<String>,
    /// Challenges the account sent itself.
    pub ignored: usize,
    /// Answers the server refused.
    pub failed: usize,
    /// Payloads that could not be decoded.
    pub protocol_errors: usize,
}

/// Listens on the account stream and answers every challenge addressed to
/// the bot.
pub struct ChallengeListener<T> {
    transport: Arc<T>,
    control: SupervisorControl,
    account_id: String,
    idle_timeout: Duration,
    reconnect_delay: Duration,
}

impl<T: Transport> ChallengeListener<T> {
    /// Creates a listener.
    #[instrument(skip(transport, control))]
    pub fn new(
        transport: Arc<T>,
        control: SupervisorControl,
        account_id: String,
        idle_timeout: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        info!("Creating challenge listener");
        Self {
            transport,
            control,
            account_id,
            idle_timeout,
            reconnect_delay,
        }
    }

    /// Decides a challenge; `None` for the account's own challenges.
    ///
    /// Challenges are declined while matchmaking is off, since no session
    /// would be started for the game.
    pub fn decide(&self, challenge: &IncomingChallenge) -> Option<ChallengeDecision> {
        if challenge.outgoing {
            return None;
        }
        if !PLAYABLE_VARIANTS.contains(&challenge.variant.as_str()) {
            return Some(ChallengeDecision::Decline(DeclineReason::Variant));
        }
        if !self.control.matchmaking() {
            return Some(ChallengeDecision::Decline(DeclineReason::Later));
        }
        Some(ChallengeDecision::Accept)
    }

    /// Consumes one connection's lines until it closes or goes silent.
    #[instrument(skip(self, lines))]
    pub async fn listen(&self, mut lines: LineStream) -> ListenReport {
        let mut report = ListenReport::default();
        loop {
            let line = match tokio::time::timeout(self.idle_timeout, lines.next()).await {
                Err(_) => {
                    warn!(timeout_secs = self.idle_timeout.as_secs(), "Account stream idle, closing");
                    break;
                }
                Ok(None) => {
                    info!("Account stream closed by server");
                    break;
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Account stream failed");
                    break;
                }
                Ok(Some(Ok(line))) => line,
            };

            if line.trim().is_empty() {
                continue;
            }

            match decode_account_event(&line, &self.account_id) {
                Ok(AccountEvent::Challenge(challenge)) => self.answer(&challenge, &mut report).await,
                Ok(AccountEvent::GameStarted { game_id }) => info!(game_id = %game_id, "Game started"),
                Ok(event) => debug!(event = ?event, "Account event"),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed account payload");
                    report.protocol_errors += 1;
                }
            }
        }
        report
    }

    /// Reconnects to the account stream until shutdown is requested.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!("Challenge listener running");
        let mut shutdown = self.control.subscribe();

        while !self.control.is_shutdown() {
            match self.transport.stream_events().await {
                Ok(lines) => {
                    tokio::select! {
                        report = self.listen(lines) => {
                            info!(
                                accepted = report.accepted.len(),
                                declined = report.declined.len(),
                                failed = report.failed,
                                "Account stream ended"
                            );
                        }
                        _ = shutdown.changed() => break,
                    }
                }
                Err(e) => warn!(error = %e, "Opening account stream failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!("Challenge listener stopped");
    }

    #[instrument(skip(self, challenge, report), fields(challenge_id = %challenge.id, challenger = %challenge.challenger))]
    async fn answer(&self, challenge: &IncomingChallenge, report: &mut ListenReport) {
        let Some(decision) = self.decide(challenge) else {
            debug!("Own challenge");
            report.ignored += 1;
            return;
        };

        let result = match decision {
            ChallengeDecision::Accept => self.transport.accept_challenge(&challenge.id).await,
            ChallengeDecision::Decline(reason) => {
                info!(variant = %challenge.variant, reason = %reason, "Declining challenge");
                self.transport
                    .decline_challenge(&challenge.id, reason)
                    .await
            }
        };

        match (result, decision) {
            (Ok(()), ChallengeDecision::Accept) => report.accepted.push(challenge.id.clone()),
            (Ok(()), ChallengeDecision::Decline(_)) => report.declined.push(challenge.id.clone()),
            (Err(e), _) => {
                warn!(error = %e, "Answering challenge failed");
                report.failed += 1;
            }
        }
    }
}
