//! Request and response types shared by all transports.

use crate::games::chess::Color;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A game in progress for the bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct ActiveGame {
    /// Game id.
    pub game_id: String,
    /// Opponent's display name.
    pub opponent: String,
    /// Color reported by the listing. Informational only; the session takes
    /// its color from the game stream.
    pub color: Option<Color>,
    /// Server's turn hint.
    pub is_my_turn: bool,
}

/// One ranked line from the decision service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalVariation {
    /// Space-separated move tokens, best first.
    pub moves: String,
    /// Centipawn score, if reported.
    #[serde(default)]
    pub cp: Option<i32>,
    /// Mate distance, if reported.
    #[serde(default)]
    pub mate: Option<i32>,
}

impl PrincipalVariation {
    /// First move of the line.
    pub fn first_move(&self) -> Option<&str> {
        self.moves.split_whitespace().next()
    }
}

/// Decision service response for one position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Ranked variations, best first.
    #[serde(default)]
    pub pvs: Vec<PrincipalVariation>,
    /// Search depth, if reported.
    #[serde(default)]
    pub depth: Option<u32>,
}

/// Color preference for a challenge.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ChallengeColor {
    /// Play white.
    White,
    /// Play black.
    Black,
    /// Let the server decide.
    #[default]
    Random,
}

/// Reason sent when declining a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DeclineReason {
    /// No specific reason.
    Generic,
    /// Not taking games right now.
    Later,
    /// The variant is not played.
    Variant,
}

/// Clock settings: initial time and increment, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct TimeControl {
    limit_seconds: u32,
    increment_seconds: u32,
}

impl TimeControl {
    /// Creates a time control from seconds.
    pub fn new(limit_seconds: u32, increment_seconds: u32) -> Self {
        Self {
            limit_seconds,
            increment_seconds,
        }
    }
}

impl std::fmt::Display for TimeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.limit_seconds % 60 == 0 {
            write!(f, "{}+{}", self.limit_seconds / 60, self.increment_seconds)
        } else {
            write!(f, "{}+{}", self.limit_seconds as f64 / 60.0, self.increment_seconds)
        }
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(180, 2)
    }
}

impl FromStr for TimeControl {
    type Err = String;

    /// Parses `minutes+increment`, e.g. `3+2` or `0.5+0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (minutes, increment) = s
            .split_once('+')
            .ok_or_else(|| format!("time control must look like 3+2, got {:?}", s))?;
        let minutes: f64 = minutes
            .trim()
            .parse()
            .map_err(|_| format!("invalid minutes in time control {:?}", s))?;
        let increment: u32 = increment
            .trim()
            .parse()
            .map_err(|_| format!("invalid increment in time control {:?}", s))?;
        if !(0.0..=180.0).contains(&minutes) {
            return Err(format!("minutes out of range in time control {:?}", s));
        }
        Ok(Self::new((minutes * 60.0).round() as u32, increment))
    }
}

/// A challenge to send to a named opponent.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, derive_new::new)]
pub struct ChallengeRequest {
    username: String,
    time_control: TimeControl,
    color: ChallengeColor,
    rated: bool,
}
