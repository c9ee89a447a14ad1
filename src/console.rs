//! Operator console: a line-based command prompt next to the supervisor.
//!
//! Commands only flip supervisor switches or send challenges; they never
//! reach into a running session.

use crate::engine::SupervisorControl;
use crate::transport::{ChallengeColor, ChallengeRequest, TimeControl, Transport};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

/// Command names with their help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CommandKind {
    /// Challenge a player.
    Challenge,
    /// Start picking up games.
    Matchmaking,
    /// Stop picking up games.
    Stop,
    /// Repeat the last challenge.
    Rechallenge,
    /// Show commands.
    Help,
    /// Exit.
    Quit,
}

impl CommandKind {
    /// One-line usage text.
    pub fn usage(self) -> &'static str {
        match self {
            CommandKind::Challenge => "Challenge a player: challenge USERNAME [TIME] [COLOR] [RATED]",
            CommandKind::Matchmaking => "Start automated matchmaking",
            CommandKind::Stop => "Stop matchmaking",
            CommandKind::Rechallenge => "Rematch last opponent",
            CommandKind::Help => "Show command list",
            CommandKind::Quit => "Exit the bot",
        }
    }
}

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send a challenge.
    Challenge(ChallengeRequest),
    /// Enable matchmaking.
    Matchmaking,
    /// Disable matchmaking.
    Stop,
    /// Repeat the previous challenge.
    Rechallenge,
    /// Print help.
    Help,
    /// Shut down.
    Quit,
}

/// Parses one input line.
///
/// `challenge USERNAME [TIME] [COLOR] [RATED]`: TIME is `minutes+increment`,
/// COLOR is `white`, `black` or `random`, RATED is `rated` or `casual`.
/// Returns `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns a message describing what was wrong with the line.
#[instrument]
pub fn parse_command(line: &str, default_time: TimeControl) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(None);
    };

    let command = match name.to_lowercase().as_str() {
        "challenge" => {
            let username = parts
                .next()
                .ok_or_else(|| "challenge needs a USERNAME".to_string())?
                .to_string();
            let time_control = match parts.next() {
                Some(time) => time.parse()?,
                None => default_time,
            };
            let color = match parts.next() {
                Some(color) => color
                    .parse::<ChallengeColor>()
                    .map_err(|_| format!("unknown color {:?} (white, black, random)", color))?,
                None => ChallengeColor::Random,
            };
            let rated = match parts.next().map(str::to_lowercase).as_deref() {
                None | Some("rated") | Some("true") => true,
                Some("casual") | Some("unrated") | Some("false") => false,
                Some(other) => return Err(format!("expected rated or casual, got {:?}", other)),
            };
            if let Some(extra) = parts.next() {
                return Err(format!("unexpected argument {:?}", extra));
            }
            Command::Challenge(ChallengeRequest::new(username, time_control, color, rated))
        }
        "matchmaking" => Command::Matchmaking,
        "stop" => Command::Stop,
        "rechallenge" => Command::Rechallenge,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {}", other)),
    };

    Ok(Some(command))
}

/// Help text listing every command.
pub fn help_text() -> String {
    let mut text = String::from("Available commands:\n");
    for kind in CommandKind::iter() {
        let name: &'static str = kind.into();
        text.push_str(&format!("{:12} {}\n", name, kind.usage()));
    }
    text
}

/// Interactive console bound to a supervisor's controls.
pub struct Console<T> {
    transport: Arc<T>,
    control: SupervisorControl,
    default_time: TimeControl,
    last_challenge: Option<ChallengeRequest>,
}

impl<T: Transport> Console<T> {
    /// Creates a console.
    #[instrument(skip(transport, control))]
    pub fn new(transport: Arc<T>, control: SupervisorControl, default_time: TimeControl) -> Self {
        Self {
            transport,
            control,
            default_time,
            last_challenge: None,
        }
    }

    /// Last challenge the server accepted, if any.
    pub fn last_challenge(&self) -> Option<&ChallengeRequest> {
        self.last_challenge.as_ref()
    }

    /// Reads commands until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from the input or output.
    #[instrument(skip_all)]
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            output.write_all(b"bot> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("Console input closed");
                return Ok(());
            };

            let reply = match parse_command(&line, self.default_time) {
                Ok(None) => continue,
                Ok(Some(Command::Quit)) => {
                    self.control.shutdown();
                    output.write_all(b"Shutting down\n").await?;
                    return Ok(());
                }
                Ok(Some(command)) => self.execute(command).await,
                Err(message) => format!("Invalid command: {}", message),
            };
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
    }

    /// Executes a command and returns the text to show the operator.
    #[instrument(skip(self))]
    pub async fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Challenge(request) => self.challenge(request).await,
            Command::Rechallenge => match self.last_challenge.clone() {
                Some(request) => self.challenge(request).await,
                None => "No previous challenge".to_string(),
            },
            Command::Matchmaking => {
                self.control.set_matchmaking(true);
                "Matchmaking started...".to_string()
            }
            Command::Stop => {
                self.control.set_matchmaking(false);
                "Matchmaking stopped".to_string()
            }
            Command::Help => help_text(),
            Command::Quit => {
                self.control.shutdown();
                "Shutting down".to_string()
            }
        }
    }

    async fn challenge(&mut self, request: ChallengeRequest) -> String {
        info!(username = %request.username(), time_control = %request.time_control(), "Challenging");
        match self.transport.create_challenge(&request).await {
            Ok(id) => {
                let reply = format!(
                    "Challenged {} ({}, {}): {}",
                    request.username(),
                    request.time_control(),
                    request.color(),
                    id
                );
                self.last_challenge = Some(request);
                reply
            }
            Err(e) => {
                warn!(error = %e, "Challenge failed");
                format!("Challenge failed: {}", e.message)
            }
        }
    }
}
