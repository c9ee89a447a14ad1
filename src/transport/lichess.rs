//! Lichess Bot API transport over reqwest.

use super::{
    ActiveGame, Analysis, ChallengeRequest, DeclineReason, LineStream, Transport,
};
use crate::error::TransportError;
use crate::games::chess::Color;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// HTTP client for the Lichess Bot API.
#[derive(Debug, Clone)]
pub struct LichessClient {
    base_url: String,
    token: String,
    analysis_path: String,
    request_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NowPlaying {
    #[serde(default)]
    now_playing: Vec<PlayingGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayingGame {
    game_id: String,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    is_my_turn: bool,
    #[serde(default)]
    opponent: Option<PlayingOpponent>,
}

#[derive(Debug, Deserialize)]
struct PlayingOpponent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeCreated {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    challenge: Option<ChallengeId>,
}

#[derive(Debug, Deserialize)]
struct ChallengeId {
    id: String,
}

impl LichessClient {
    /// Creates a client for the given API root (e.g. `https://lichess.org`).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be built.
    #[instrument(skip(token))]
    pub fn new(
        base_url: &str,
        token: String,
        analysis_path: &str,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        info!("Creating Lichess client");
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("strictly_chess/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::new(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            analysis_path: analysis_path.to_string(),
            request_timeout,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Opens a newline-delimited stream and splits it into lines.
    ///
    /// No request timeout applies; the reader decides when a silent stream
    /// is dead.
    async fn open_lines(&self, path: &str) -> Result<LineStream, TransportError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let mut bytes = response.bytes_stream();
        let lines = async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| {
                    error!(error = %e, "Stream read failed");
                    TransportError::new(format!("Stream read failed: {}", e))
                })?;
                buffer.extend_from_slice(&chunk);
                while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let text = String::from_utf8_lossy(&line[..newline]);
                    yield text.trim_end_matches('\r').to_string();
                }
            }
            if !buffer.is_empty() {
                yield String::from_utf8_lossy(&buffer).to_string();
            }
        };

        Ok(Box::pin(lines))
    }

    /// Fails with the status and body of a non-success response.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Lichess returned an error");
        Err(TransportError::with_status(
            status.as_u16(),
            format!("Lichess error {}: {}", status, body),
        ))
    }
}

#[async_trait::async_trait]
impl Transport for LichessClient {
    #[instrument(skip(self))]
    async fn stream_game(&self, game_id: &str) -> Result<LineStream, TransportError> {
        info!("Opening game stream");
        self.open_lines(&format!("/api/bot/game/stream/{}", game_id))
            .await
    }

    #[instrument(skip(self))]
    async fn stream_events(&self) -> Result<LineStream, TransportError> {
        info!("Opening account event stream");
        self.open_lines("/api/stream/event").await
    }

    #[instrument(skip(self))]
    async fn submit_move(&self, game_id: &str, token: &str) -> Result<(), TransportError> {
        debug!("Posting move");
        let response = self
            .client
            .post(self.url(&format!("/api/bot/game/{}/move/{}", game_id, token)))
            .bearer_auth(&self.token)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(response).await?;
        info!("Move accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn active_games(&self) -> Result<Vec<ActiveGame>, TransportError> {
        let response = self
            .client
            .get(self.url("/api/account/playing"))
            .bearer_auth(&self.token)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let playing: NowPlaying = Self::check(response).await?.json().await?;

        let games: Vec<ActiveGame> = playing
            .now_playing
            .into_iter()
            .map(|game| {
                let opponent = game
                    .opponent
                    .and_then(|o| o.username.or(o.id))
                    .unwrap_or_else(|| "unknown".to_string());
                ActiveGame::new(game.game_id, opponent, game.color, game.is_my_turn)
            })
            .collect();
        debug!(count = games.len(), "Fetched active games");
        Ok(games)
    }

    #[instrument(skip(self))]
    async fn analyse(&self, fen: &str, variations: u8) -> Result<Analysis, TransportError> {
        let multi_pv = variations.max(1).to_string();
        let response = self
            .client
            .get(self.url(&self.analysis_path))
            .bearer_auth(&self.token)
            .query(&[("fen", fen), ("multiPv", multi_pv.as_str())])
            .timeout(self.request_timeout)
            .send()
            .await?;
        let analysis: Analysis = Self::check(response).await?.json().await?;
        debug!(variations = analysis.pvs.len(), "Fetched analysis");
        Ok(analysis)
    }

    #[instrument(skip(self), fields(username = %request.username()))]
    async fn create_challenge(&self, request: &ChallengeRequest) -> Result<String, TransportError> {
        info!(time_control = %request.time_control(), color = %request.color(), rated = request.rated(), "Sending challenge");
        let form = [
            ("clock.limit", request.time_control().limit_seconds().to_string()),
            ("clock.increment", request.time_control().increment_seconds().to_string()),
            ("rated", request.rated().to_string()),
            ("color", request.color().to_string()),
        ];
        let response = self
            .client
            .post(self.url(&format!("/api/challenge/{}", request.username())))
            .bearer_auth(&self.token)
            .form(&form)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let created: ChallengeCreated = Self::check(response).await?.json().await?;

        let id = created
            .challenge
            .map(|c| c.id)
            .or(created.id)
            .ok_or_else(|| TransportError::new("Challenge response carried no id"))?;
        info!(challenge_id = %id, "Challenge created");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn accept_challenge(&self, challenge_id: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url(&format!("/api/challenge/{}/accept", challenge_id)))
            .bearer_auth(&self.token)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(response).await?;
        info!("Challenge accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn decline_challenge(
        &self,
        challenge_id: &str,
        reason: DeclineReason,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url(&format!("/api/challenge/{}/decline", challenge_id)))
            .bearer_auth(&self.token)
            .form(&[("reason", reason.to_string())])
            .timeout(self.request_timeout)
            .send()
            .await?;
        Self::check(response).await?;
        info!("Challenge declined");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn account_id(&self) -> Result<String, TransportError> {
        let response = self
            .client
            .get(self.url("/api/account"))
            .bearer_auth(&self.token)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let account: Account = Self::check(response).await?.json().await?;
        debug!(account_id = %account.id, "Fetched account");
        Ok(account.id)
    }
}
