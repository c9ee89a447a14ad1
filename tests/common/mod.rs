//! Scripted transport and oracle shared by the integration tests.

#![allow(dead_code)]

use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use strictly_chess::{
    ActiveGame, Analysis, ChallengeRequest, DeclineReason, LineStream, MoveOracle, MoveToken, PrincipalVariation,
    TransportError, Transport,
};

pub const ACCOUNT: &str = "strictlybot";

/// `gameFull` payload with the bot on `color` and the given moves.
pub fn game_full(color: &str, moves: &str) -> String {
    let (white, black) = if color == "white" {
        (ACCOUNT, "rival")
    } else {
        ("rival", ACCOUNT)
    };
    format!(
        r#"{{"type":"gameFull","id":"g1","white":{{"id":"{white}","name":"{white}"}},"black":{{"id":"{black}","name":"{black}"}},"initialFen":"startpos","state":{{"type":"gameState","moves":"{moves}","status":"started"}}}}"#
    )
}

/// `challenge` payload on the account stream.
pub fn challenge(id: &str, challenger: &str, variant: &str) -> String {
    format!(
        r#"{{"type":"challenge","challenge":{{"id":"{id}","status":"created","challenger":{{"id":"{challenger}","name":"{challenger}"}},"destUser":{{"id":"{ACCOUNT}","name":"{ACCOUNT}"}},"variant":{{"key":"{variant}","name":"{variant}"}},"rated":true,"speed":"blitz"}}}}"#
    )
}

/// `gameState` payload.
pub fn game_state(moves: &str, status: &str) -> String {
    format!(r#"{{"type":"gameState","moves":"{moves}","status":"{status}"}}"#)
}

/// Transport whose every answer is scripted.
#[derive(Default)]
pub struct FakeTransport {
    streams: Mutex<HashMap<String, Vec<String>>>,
    hold_open: Mutex<bool>,
    fail_stream: Mutex<bool>,
    submit_failures: Mutex<VecDeque<TransportError>>,
    submissions: Mutex<Vec<(String, String)>>,
    active: Mutex<Vec<ActiveGame>>,
    analysis: Mutex<Option<Analysis>>,
    challenges: Mutex<Vec<ChallengeRequest>>,
    fail_challenges: Mutex<bool>,
    account_events: Mutex<Vec<String>>,
    fail_answers: Mutex<bool>,
    accepted: Mutex<Vec<String>>,
    declined: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines served when `game_id` is streamed.
    pub fn script_stream(&self, game_id: &str, lines: Vec<String>) {
        self.streams
            .lock()
            .unwrap()
            .insert(game_id.to_string(), lines);
    }

    /// Keep streams open after the scripted lines instead of closing them.
    pub fn hold_streams_open(&self) {
        *self.hold_open.lock().unwrap() = true;
    }

    pub fn fail_streams(&self) {
        *self.fail_stream.lock().unwrap() = true;
    }

    /// Queue an error for the next move post.
    pub fn fail_next_submit(&self, error: TransportError) {
        self.submit_failures.lock().unwrap().push_back(error);
    }

    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn set_active(&self, games: Vec<ActiveGame>) {
        *self.active.lock().unwrap() = games;
    }

    /// Analysis answer whose best line starts with `moves`.
    pub fn set_analysis(&self, moves: Option<&str>) {
        *self.analysis.lock().unwrap() = moves.map(|moves| Analysis {
            pvs: vec![PrincipalVariation {
                moves: moves.to_string(),
                cp: Some(20),
                mate: None,
            }],
            depth: Some(30),
        });
    }

    pub fn challenges(&self) -> Vec<ChallengeRequest> {
        self.challenges.lock().unwrap().clone()
    }

    pub fn fail_challenges(&self) {
        *self.fail_challenges.lock().unwrap() = true;
    }

    /// Lines served on the account event stream.
    pub fn script_account_events(&self, lines: Vec<String>) {
        *self.account_events.lock().unwrap() = lines;
    }

    /// Refuse every accept and decline.
    pub fn fail_answers(&self) {
        *self.fail_answers.lock().unwrap() = true;
    }

    pub fn accepted(&self) -> Vec<String> {
        self.accepted.lock().unwrap().clone()
    }

    /// Declined challenge ids with the reason sent.
    pub fn declined(&self) -> Vec<(String, String)> {
        self.declined.lock().unwrap().clone()
    }

    fn lines(&self, lines: Vec<String>) -> LineStream {
        let scripted = futures::stream::iter(lines.into_iter().map(Ok));
        if *self.hold_open.lock().unwrap() {
            scripted.chain(futures::stream::pending()).boxed()
        } else {
            scripted.boxed()
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn stream_game(&self, game_id: &str) -> Result<LineStream, TransportError> {
        if *self.fail_stream.lock().unwrap() {
            return Err(TransportError::with_status(404, "No such game"));
        }
        let lines = self
            .streams
            .lock()
            .unwrap()
            .get(game_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.lines(lines))
    }

    async fn stream_events(&self) -> Result<LineStream, TransportError> {
        if *self.fail_stream.lock().unwrap() {
            return Err(TransportError::with_status(401, "No token"));
        }
        let lines = self.account_events.lock().unwrap().clone();
        Ok(self.lines(lines))
    }

    async fn accept_challenge(&self, challenge_id: &str) -> Result<(), TransportError> {
        if *self.fail_answers.lock().unwrap() {
            return Err(TransportError::with_status(404, "No such challenge"));
        }
        self.accepted.lock().unwrap().push(challenge_id.to_string());
        Ok(())
    }

    async fn decline_challenge(
        &self,
        challenge_id: &str,
        reason: DeclineReason,
    ) -> Result<(), TransportError> {
        if *self.fail_answers.lock().unwrap() {
            return Err(TransportError::with_status(404, "No such challenge"));
        }
        self.declined
            .lock()
            .unwrap()
            .push((challenge_id.to_string(), reason.to_string()));
        Ok(())
    }

    async fn submit_move(&self, game_id: &str, token: &str) -> Result<(), TransportError> {
        if let Some(error) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.submissions
            .lock()
            .unwrap()
            .push((game_id.to_string(), token.to_string()));
        Ok(())
    }

    async fn active_games(&self) -> Result<Vec<ActiveGame>, TransportError> {
        Ok(self.active.lock().unwrap().clone())
    }

    async fn analyse(&self, _fen: &str, _variations: u8) -> Result<Analysis, TransportError> {
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::with_status(404, "Position not evaluated"))
    }

    async fn create_challenge(&self, request: &ChallengeRequest) -> Result<String, TransportError> {
        if *self.fail_challenges.lock().unwrap() {
            return Err(TransportError::with_status(400, "Bad challenge"));
        }
        self.challenges.lock().unwrap().push(request.clone());
        Ok(format!("ch{}", self.challenges.lock().unwrap().len()))
    }

    async fn account_id(&self) -> Result<String, TransportError> {
        Ok(ACCOUNT.to_string())
    }
}

/// Oracle answering from a queue; `None` once the queue is empty.
#[derive(Default)]
pub struct ScriptedOracle {
    answers: Mutex<VecDeque<Option<MoveToken>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(answers: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(MoveToken::from)).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Positions the oracle was asked about.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MoveOracle for ScriptedOracle {
    async fn suggest_move(&self, fen: &str) -> Option<MoveToken> {
        self.asked.lock().unwrap().push(fen.to_string());
        self.answers.lock().unwrap().pop_front().flatten()
    }
}
