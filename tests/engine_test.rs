//! Tests for the session loop, submitter and supervisor.

mod common;

use common::{ACCOUNT, FakeTransport, ScriptedOracle, game_full, game_state};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{
    Action, ActiveGame, Color, LedgerStore, MemoryLedger, MoveSubmitter, MoveToken, RetryPolicy,
    Session, SessionEnd, SessionLoop, StreamReader, SubmitError, Supervisor, SupervisorControl,
    TransportError, decode_event,
};

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

type Engine = SessionLoop<FakeTransport, ScriptedOracle, MemoryLedger>;

fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        delay: Duration::from_millis(1),
    }
}

fn engine(
    transport: &Arc<FakeTransport>,
    oracle: &Arc<ScriptedOracle>,
    ledger: &Arc<MemoryLedger>,
) -> Engine {
    let submitter = MoveSubmitter::new(Arc::clone(transport), Arc::clone(ledger), quick_retry());
    SessionLoop::new(
        Arc::clone(transport),
        Arc::clone(oracle),
        submitter,
        StreamReader::new(ACCOUNT.to_string(), Duration::from_secs(5)),
        Duration::from_secs(5),
    )
}

fn fixtures(answers: &[Option<&str>]) -> (Arc<FakeTransport>, Arc<ScriptedOracle>, Arc<MemoryLedger>) {
    (
        Arc::new(FakeTransport::new()),
        Arc::new(ScriptedOracle::new(answers)),
        Arc::new(MemoryLedger::new()),
    )
}

#[tokio::test]
async fn test_bot_replies_on_its_turn() {
    let (transport, oracle, ledger) = fixtures(&[Some("e7e5")]);
    let engine = engine(&transport, &oracle, &ledger);
    let mut session = Session::new("g1".to_string());

    let event = decode_event(&game_full("black", "e2e4"), ACCOUNT).unwrap();
    let tick = engine.handle_event(&mut session, event).await;

    let Action::Submitted(entry) = tick.action else {
        panic!("expected a submission");
    };
    assert_eq!(entry.position, AFTER_E4);
    assert_eq!(entry.chosen_move, "e7e5");
    assert_eq!(session.applied_count(), 2);
    assert_eq!(transport.submissions(), vec![("g1".to_string(), "e7e5".to_string())]);

    let entries = ledger.snapshot().await;
    assert_eq!(entries["rival"].len(), 1);
    assert_eq!(entries["rival"][0].position, AFTER_E4);
}

#[tokio::test]
async fn test_delta_without_oracle_call_when_not_our_turn() {
    let (transport, oracle, ledger) = fixtures(&[Some("d2d4")]);
    let engine = engine(&transport, &oracle, &ledger);

    let mut session = Session::new("g1".to_string());
    session.assign(Color::White, "rival".to_string(), None);
    session.synchronize(&[MoveToken::from("e2e4")]);

    let event = decode_event(&game_state("e2e4 e7e5 g1f3", "started"), ACCOUNT).unwrap();
    let tick = engine.handle_event(&mut session, event).await;

    assert_eq!(tick.sync.map(|s| s.applied), Some(2));
    assert!(matches!(tick.action, Action::Waiting));
    assert_eq!(session.applied_count(), 3);
    assert!(oracle.asked().is_empty());
    assert!(transport.submissions().is_empty());
}

#[tokio::test]
async fn test_illegal_suggestion_is_discarded() {
    let (transport, oracle, ledger) = fixtures(&[Some("a1a1")]);
    let engine = engine(&transport, &oracle, &ledger);
    let mut session = Session::new("g1".to_string());

    let event = decode_event(&game_full("white", ""), ACCOUNT).unwrap();
    let tick = engine.handle_event(&mut session, event).await;

    assert!(matches!(tick.action, Action::Discarded(_)));
    assert_eq!(session.applied_count(), 0);
    assert!(transport.submissions().is_empty());
    assert!(ledger.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_no_suggestion_is_retried_on_next_event() {
    let (transport, oracle, ledger) = fixtures(&[None, Some("e2e4")]);
    let engine = engine(&transport, &oracle, &ledger);
    let mut session = Session::new("g1".to_string());

    let tick = engine
        .handle_event(&mut session, decode_event(&game_full("white", ""), ACCOUNT).unwrap())
        .await;
    assert!(matches!(tick.action, Action::NoSuggestion));
    assert!(!tick.finished);

    let tick = engine
        .handle_event(&mut session, decode_event(&game_state("", "started"), ACCOUNT).unwrap())
        .await;
    assert!(matches!(tick.action, Action::Submitted(_)));
    assert_eq!(oracle.asked().len(), 2);
}

#[tokio::test]
async fn test_no_suggestion_is_retried_while_stream_is_quiet() {
    let (transport, oracle, ledger) = fixtures(&[None, Some("e2e4")]);
    let engine = engine(&transport, &oracle, &ledger).with_retry_interval(Duration::from_millis(10));

    let mut lines = vec![game_full("white", "")];
    lines.extend(std::iter::repeat_n(String::new(), 20));
    let paced = futures::stream::iter(lines)
        .then(|line| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(line)
        })
        .boxed();
    let events = StreamReader::new(ACCOUNT.to_string(), Duration::from_secs(5)).events(paced);

    let summary = engine.drive(Session::new("g1".to_string()), events).await;

    assert_eq!(oracle.asked().len(), 2);
    assert_eq!(transport.submissions(), vec![("g1".to_string(), "e2e4".to_string())]);
    assert_eq!(summary.moves_submitted, 1);
    assert_eq!(summary.end, SessionEnd::StreamClosed);
}

#[tokio::test]
async fn test_suggestion_is_sent_in_coordinate_notation() {
    let (transport, oracle, ledger) = fixtures(&[Some("Nf3")]);
    let engine = engine(&transport, &oracle, &ledger);
    let mut session = Session::new("g1".to_string());

    let tick = engine
        .handle_event(&mut session, decode_event(&game_full("white", ""), ACCOUNT).unwrap())
        .await;

    let Action::Submitted(entry) = tick.action else {
        panic!("expected a submission");
    };
    assert_eq!(entry.chosen_move, "g1f3");
    assert_eq!(transport.submissions(), vec![("g1".to_string(), "g1f3".to_string())]);
    assert_eq!(ledger.snapshot().await["rival"][0].chosen_move, "g1f3");
}

#[tokio::test]
async fn test_stale_suggestion_is_never_sent() {
    let (transport, _oracle, ledger) = fixtures(&[]);
    let submitter = MoveSubmitter::new(Arc::clone(&transport), Arc::clone(&ledger), quick_retry());

    let mut session = Session::new("g1".to_string());
    session.assign(Color::White, "rival".to_string(), None);
    session.synchronize(&[MoveToken::from("e2e4"), MoveToken::from("e7e5")]);

    let result = submitter.submit(&mut session, &MoveToken::from("e2e4")).await;
    assert!(matches!(result, Err(SubmitError::Stale(_))));
    assert!(transport.submissions().is_empty());
    assert_eq!(session.applied_count(), 2);
}

#[tokio::test]
async fn test_rejected_submission_leaves_state_untouched() {
    let (transport, oracle, ledger) = fixtures(&[Some("e2e4")]);
    transport.fail_next_submit(TransportError::with_status(400, "Not your turn"));
    let engine = engine(&transport, &oracle, &ledger);
    let mut session = Session::new("g1".to_string());

    let tick = engine
        .handle_event(&mut session, decode_event(&game_full("white", ""), ACCOUNT).unwrap())
        .await;

    assert!(matches!(tick.action, Action::Failed(SubmitError::Transport(_))));
    assert_eq!(session.applied_count(), 0);
    assert!(transport.submissions().is_empty());
    assert!(ledger.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let (transport, oracle, ledger) = fixtures(&[Some("e2e4")]);
    transport.fail_next_submit(TransportError::with_status(503, "Unavailable"));
    transport.fail_next_submit(TransportError::new("connection reset"));
    let engine = engine(&transport, &oracle, &ledger);
    let mut session = Session::new("g1".to_string());

    let tick = engine
        .handle_event(&mut session, decode_event(&game_full("white", ""), ACCOUNT).unwrap())
        .await;

    assert!(matches!(tick.action, Action::Submitted(_)));
    assert_eq!(transport.submissions().len(), 1);
    assert_eq!(session.applied_count(), 1);
}

#[tokio::test]
async fn test_run_plays_a_game_to_the_end() {
    let (transport, oracle, ledger) = fixtures(&[Some("e2e4"), Some("g1f3")]);
    transport.script_stream(
        "g1",
        vec![
            game_full("white", ""),
            game_state("e2e4", "started"),
            "{garbage".to_string(),
            game_state("e2e4 e7e5", "started"),
            game_state("e2e4 e7e5 g1f3", "started"),
            game_state("e2e4 e7e5 g1f3 b8c6", "resign"),
            game_state("e2e4 e7e5 g1f3 b8c6 f1b5", "started"),
        ],
    );
    let engine = engine(&transport, &oracle, &ledger);

    let summary = engine.run("g1".to_string()).await;

    assert_eq!(summary.end, SessionEnd::GameOver("resign".to_string()));
    assert_eq!(summary.opponent.as_deref(), Some("rival"));
    assert_eq!(summary.moves_applied, 4);
    assert_eq!(summary.moves_submitted, 2);
    assert_eq!(summary.protocol_errors, 1);
    assert_eq!(transport.submissions().len(), 2);
    assert_eq!(ledger.snapshot().await["rival"].len(), 2);
}

#[tokio::test]
async fn test_run_reports_unreachable_stream() {
    let (transport, oracle, ledger) = fixtures(&[]);
    transport.fail_streams();
    let engine = engine(&transport, &oracle, &ledger);

    let summary = engine.run("g1".to_string()).await;
    assert!(matches!(summary.end, SessionEnd::ConnectFailed(_)));
    assert_eq!(summary.game_id, "g1");
    assert!(summary.opponent.is_none());
    assert_eq!(summary.moves_applied, 0);
    assert_eq!(summary.moves_submitted, 0);
}

#[tokio::test]
async fn test_run_ends_when_stream_closes() {
    let (transport, oracle, ledger) = fixtures(&[]);
    transport.script_stream("g1", vec![game_full("black", "")]);
    let engine = engine(&transport, &oracle, &ledger);

    let summary = engine.run("g1".to_string()).await;
    assert_eq!(summary.end, SessionEnd::StreamClosed);
}

fn supervisor(
    transport: &Arc<FakeTransport>,
    matchmaking: bool,
) -> (
    Supervisor<FakeTransport, ScriptedOracle, MemoryLedger>,
    SupervisorControl,
) {
    let (_, oracle, ledger) = fixtures(&[]);
    let session_loop = Arc::new(engine(transport, &oracle, &ledger));
    let control = SupervisorControl::new(matchmaking);
    let supervisor = Supervisor::new(
        Arc::clone(transport),
        session_loop,
        control.clone(),
        Duration::from_millis(10),
    );
    (supervisor, control)
}

#[tokio::test]
async fn test_supervisor_starts_one_session_per_game() {
    let transport = Arc::new(FakeTransport::new());
    transport.hold_streams_open();
    transport.script_stream("g1", vec![game_full("black", "")]);
    transport.script_stream("g2", vec![game_full("black", "")]);
    transport.set_active(vec![
        ActiveGame::new("g1".to_string(), "rival".to_string(), None, false),
        ActiveGame::new("g2".to_string(), "other".to_string(), None, false),
    ]);
    let (supervisor, _control) = supervisor(&transport, true);

    let started = supervisor.poll_once().await.unwrap();
    assert_eq!(started, vec!["g1".to_string(), "g2".to_string()]);

    let started = supervisor.poll_once().await.unwrap();
    assert!(started.is_empty());
    assert_eq!(supervisor.running_games().await, vec!["g1".to_string(), "g2".to_string()]);
}

#[tokio::test]
async fn test_supervisor_respects_matchmaking_switch() {
    let transport = Arc::new(FakeTransport::new());
    transport.hold_streams_open();
    transport.set_active(vec![ActiveGame::new(
        "g1".to_string(),
        "rival".to_string(),
        None,
        false,
    )]);
    let (supervisor, control) = supervisor(&transport, false);

    assert!(supervisor.poll_once().await.unwrap().is_empty());
    assert!(supervisor.running_games().await.is_empty());

    control.set_matchmaking(true);
    assert_eq!(supervisor.poll_once().await.unwrap(), vec!["g1".to_string()]);
}

#[tokio::test]
async fn test_supervisor_restarts_finished_games() {
    let transport = Arc::new(FakeTransport::new());
    transport.script_stream("g1", vec![game_full("black", "")]);
    transport.set_active(vec![ActiveGame::new(
        "g1".to_string(),
        "rival".to_string(),
        None,
        false,
    )]);
    let (supervisor, _control) = supervisor(&transport, true);

    assert_eq!(supervisor.poll_once().await.unwrap(), vec!["g1".to_string()]);
    let summaries = supervisor.wait_for_sessions().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].end, SessionEnd::StreamClosed);
    assert!(supervisor.running_games().await.is_empty());

    assert_eq!(supervisor.poll_once().await.unwrap(), vec!["g1".to_string()]);
}

#[tokio::test]
async fn test_supervisor_stops_on_shutdown() {
    let transport = Arc::new(FakeTransport::new());
    let (supervisor, control) = supervisor(&transport, true);

    control.shutdown();
    tokio::time::timeout(Duration::from_secs(5), supervisor.run())
        .await
        .expect("supervisor must stop after shutdown");
    assert!(control.is_shutdown());
}
