//! Strictly Chess - command-line entry point
//!
//! Wires configuration, the Lichess client, the ledger and the session
//! engine together.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use std::sync::Arc;
use strictly_chess::{
    BotConfig, ChallengeColor, ChallengeListener, ChallengeRequest, CloudEvalOracle, Console, JsonFileLedger,
    LedgerStore, LichessClient, MoveSubmitter, SessionLoop, StreamReader, Supervisor,
    SupervisorControl, TimeControl, Transport, review_ledger,
};
use tokio::io::BufReader;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_chess=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = BotConfig::load_or_default(&cli.config)?;
    if let Some(ledger) = cli.ledger {
        config = config.with_ledger_path(ledger);
    }

    match cli.command {
        Command::Run { paused, no_console } => {
            let config = if paused {
                config.with_matchmaking(false)
            } else {
                config
            };
            run_bot(config, !no_console).await
        }
        Command::Challenge {
            username,
            time,
            color,
            rated,
        } => run_challenge(config, username, time, color, rated).await,
        Command::Review => run_review(config).await,
    }
}

/// Builds the Lichess client from configuration and environment.
fn connect(config: &BotConfig) -> Result<Arc<LichessClient>> {
    let token = config.api_token()?;
    let client = LichessClient::new(
        config.api_url(),
        token,
        config.analysis_path(),
        config.request_timeout(),
    )?;
    Ok(Arc::new(client))
}

/// Plays games until the operator quits.
#[instrument(skip(config))]
async fn run_bot(config: BotConfig, with_console: bool) -> Result<()> {
    info!("Starting Strictly Chess bot");

    let transport = connect(&config)?;
    let account_id = match config.bot_id() {
        Some(id) => id.clone(),
        None => transport
            .account_id()
            .await
            .context("Failed to resolve bot account id")?,
    };
    info!(account_id = %account_id, "Playing as");

    let ledger = Arc::new(JsonFileLedger::open_or_recover(config.ledger_path()).await);
    let oracle = Arc::new(CloudEvalOracle::new(
        Arc::clone(&transport),
        *config.oracle_variations(),
    ));
    let submitter = MoveSubmitter::new(
        Arc::clone(&transport),
        Arc::clone(&ledger),
        config.retry_policy(),
    );
    let reader = StreamReader::new(account_id.clone(), config.stream_idle_timeout());
    let session_loop = Arc::new(
        SessionLoop::new(
            Arc::clone(&transport),
            oracle,
            submitter,
            reader,
            config.request_timeout(),
        )
        .with_retry_interval(config.retry_interval()),
    );

    let control = SupervisorControl::new(*config.matchmaking());
    let supervisor = Supervisor::new(
        Arc::clone(&transport),
        session_loop,
        control.clone(),
        config.poll_interval(),
    );

    if *config.accept_challenges() {
        let listener = ChallengeListener::new(
            Arc::clone(&transport),
            control.clone(),
            account_id,
            config.stream_idle_timeout(),
            config.poll_interval(),
        );
        tokio::spawn(async move { listener.run().await });
    }

    if with_console {
        let mut console = Console::new(Arc::clone(&transport), control.clone(), config.time_control()?);
        tokio::spawn(async move {
            let input = BufReader::new(tokio::io::stdin());
            if let Err(e) = console.run(input, tokio::io::stdout()).await {
                warn!(error = %e, "Console stopped");
            }
        });
    }

    supervisor.run().await;

    let in_flight = supervisor.running_games().await;
    if !in_flight.is_empty() {
        info!(games = ?in_flight, "Leaving games in progress");
    }
    if let Err(e) = ledger.flush().await {
        warn!(error = %e, "Final ledger flush failed");
    }

    info!("Bot stopped");
    Ok(())
}

/// Sends one challenge.
#[instrument(skip(config))]
async fn run_challenge(
    config: BotConfig,
    username: String,
    time: Option<String>,
    color: Option<String>,
    rated: Option<String>,
) -> Result<()> {
    let time_control: TimeControl = match time {
        Some(time) => time.parse().map_err(anyhow::Error::msg)?,
        None => config.time_control()?,
    };
    let color: ChallengeColor = match color {
        Some(color) => color
            .parse()
            .with_context(|| format!("Unknown color {:?}", color))?,
        None => ChallengeColor::Random,
    };
    let rated = match rated.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("rated") => true,
        Some("casual") => false,
        Some(other) => anyhow::bail!("Expected rated or casual, got {:?}", other),
    };

    let transport = connect(&config)?;
    let request = ChallengeRequest::new(username, time_control, color, rated);
    let id = transport.create_challenge(&request).await?;
    println!("Challenged {} ({}): {}", request.username(), request.time_control(), id);
    Ok(())
}

/// Re-asks the oracle about every recorded move and prints disagreements.
#[instrument(skip(config))]
async fn run_review(config: BotConfig) -> Result<()> {
    let transport = connect(&config)?;
    let ledger = JsonFileLedger::open(config.ledger_path())
        .await
        .context("Failed to open ledger for review")?;
    let oracle = CloudEvalOracle::new(transport, *config.oracle_variations());

    let entries = ledger.load().await?;
    let report = review_ledger(&entries, &oracle).await;

    println!(
        "Reviewed {} moves, {} without an answer, {} disagreements",
        report.reviewed,
        report.unanswered,
        report.disagreements.len()
    );
    for d in &report.disagreements {
        println!(
            "  vs {}: played {}, now {} ({})",
            d.opponent, d.played, d.suggested, d.position
        );
    }
    Ok(())
}
