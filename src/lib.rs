//! Strictly Chess - unattended Lichess bot engine
//!
//! Follows each active game through its event stream, keeps a local board
//! in lock-step with the server, asks an external oracle for a move when it
//! is the bot's turn, submits it, and records every decision in a ledger.
//!
//! # Architecture
//!
//! - **Board**: chess position plus move history, legality checks
//! - **Stream**: NDJSON game stream decoded into [`GameEvent`]s
//! - **Session**: per-game board synchronization and turn decision
//! - **Oracle / Submitter**: move suggestion, re-validation, submission
//! - **Ledger**: durable per-opponent record of submitted moves
//! - **Engine**: [`SessionLoop`] per game, [`Supervisor`] over all games,
//!   [`ChallengeListener`] answering incoming challenges
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use strictly_chess::{
//!     CloudEvalOracle, LichessClient, MemoryLedger, MoveSubmitter, RetryPolicy, SessionLoop,
//!     StreamReader, Supervisor, SupervisorControl,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = Arc::new(LichessClient::new(
//!     "https://lichess.org",
//!     "token".to_string(),
//!     "/api/cloud-eval",
//!     Duration::from_secs(15),
//! )?);
//! let oracle = Arc::new(CloudEvalOracle::new(Arc::clone(&transport), 1));
//! let ledger = Arc::new(MemoryLedger::new());
//! let submitter = MoveSubmitter::new(Arc::clone(&transport), ledger, RetryPolicy::default());
//! let reader = StreamReader::new("my_bot".to_string(), Duration::from_secs(60));
//! let session_loop = Arc::new(SessionLoop::new(
//!     Arc::clone(&transport),
//!     oracle,
//!     submitter,
//!     reader,
//!     Duration::from_secs(15),
//! ));
//! let supervisor = Supervisor::new(
//!     transport,
//!     session_loop,
//!     SupervisorControl::new(true),
//!     Duration::from_secs(10),
//! );
//! supervisor.run().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod console;
mod engine;
mod error;
mod games;
mod ledger;
mod oracle;
mod review;
mod session;
mod stream;
mod submit;
mod transport;

// Crate-level exports - Configuration
pub use config::{BotConfig, TOKEN_ENV};

// Crate-level exports - Errors
pub use error::{
    ConfigError, MoveError, PersistenceError, ProtocolError, StaleSuggestion, SubmitError,
    TransportError,
};

// Crate-level exports - Board model
pub use games::chess::{Board, Color, Move, MoveToken};

// Crate-level exports - Event stream
pub use stream::{
    AccountEvent, ChatLine, EventStream, FullGame, GameEvent, GameStatus, GameUpdate,
    IncomingChallenge, StreamReader, decode_account_event, decode_event,
};

// Crate-level exports - Session
pub use session::{Assignment, GameId, Session, SyncReport};

// Crate-level exports - Oracle and submission
pub use oracle::{CloudEvalOracle, MoveOracle};
pub use submit::{MoveSubmitter, RetryPolicy};

// Crate-level exports - Ledger
pub use ledger::{JsonFileLedger, Ledger, LedgerEntry, LedgerStore, MemoryLedger};

// Crate-level exports - Engine
pub use engine::{
    Action, ChallengeDecision, ChallengeListener, ListenReport, SessionEnd, SessionLoop,
    SessionSummary, Supervisor, SupervisorControl, Tick,
};

// Crate-level exports - Transport
pub use transport::{
    ActiveGame, Analysis, ChallengeColor, ChallengeRequest, DeclineReason, LichessClient,
    LineStream, PrincipalVariation, TimeControl, Transport,
};

// Crate-level exports - Operator surface
pub use console::{Command, CommandKind, Console, help_text, parse_command};
pub use review::{Disagreement, ReviewReport, review_ledger};
