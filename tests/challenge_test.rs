//! Tests for the account stream and the challenge listener.

mod common;

use common::{ACCOUNT, FakeTransport, challenge};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{
    AccountEvent, ChallengeDecision, ChallengeListener, DeclineReason, SupervisorControl,
    decode_account_event,
};

fn listener(
    transport: &Arc<FakeTransport>,
    control: &SupervisorControl,
) -> ChallengeListener<FakeTransport> {
    ChallengeListener::new(
        Arc::clone(transport),
        control.clone(),
        ACCOUNT.to_string(),
        Duration::from_secs(5),
        Duration::from_millis(10),
    )
}

fn lines(lines: Vec<String>) -> strictly_chess::LineStream {
    futures::stream::iter(lines.into_iter().map(Ok)).boxed()
}

#[test]
fn test_decode_incoming_challenge() {
    let event = decode_account_event(&challenge("c1", "rival", "standard"), ACCOUNT).unwrap();
    let AccountEvent::Challenge(incoming) = event else {
        panic!("expected a challenge");
    };
    assert_eq!(incoming.id, "c1");
    assert_eq!(incoming.challenger, "rival");
    assert_eq!(incoming.variant, "standard");
    assert!(incoming.rated);
    assert_eq!(incoming.speed.as_deref(), Some("blitz"));
    assert!(!incoming.outgoing);

    let event = decode_account_event(&challenge("c2", "StrictlyBot", "standard"), ACCOUNT).unwrap();
    let AccountEvent::Challenge(own) = event else {
        panic!("expected a challenge");
    };
    assert!(own.outgoing);
}

#[test]
fn test_decode_game_and_closing_notices() {
    let start = r#"{"type":"gameStart","game":{"gameId":"g7","id":"g7","color":"white"}}"#;
    assert_eq!(
        decode_account_event(start, ACCOUNT).unwrap(),
        AccountEvent::GameStarted {
            game_id: "g7".to_string()
        }
    );

    let finish = r#"{"type":"gameFinish","game":{"id":"g7"}}"#;
    assert_eq!(
        decode_account_event(finish, ACCOUNT).unwrap(),
        AccountEvent::GameFinished {
            game_id: "g7".to_string()
        }
    );

    let canceled = r#"{"type":"challengeCanceled","challenge":{"id":"c1"}}"#;
    assert_eq!(
        decode_account_event(canceled, ACCOUNT).unwrap(),
        AccountEvent::ChallengeClosed {
            id: "c1".to_string()
        }
    );
}

#[test]
fn test_decode_unknown_and_malformed_payloads() {
    let unknown = r#"{"type":"somethingNew","data":1}"#;
    assert_eq!(decode_account_event(unknown, ACCOUNT).unwrap(), AccountEvent::Other);

    assert!(decode_account_event("{broken", ACCOUNT).is_err());
    assert!(decode_account_event(r#"{"type":"gameStart","game":{}}"#, ACCOUNT).is_err());
}

#[tokio::test]
async fn test_challenge_from_another_player_is_accepted() {
    let transport = Arc::new(FakeTransport::new());
    let control = SupervisorControl::new(true);
    let listener = listener(&transport, &control);

    let report = listener
        .listen(lines(vec![
            String::new(),
            challenge("c1", "rival", "standard"),
            String::new(),
        ]))
        .await;

    assert_eq!(report.accepted, vec!["c1".to_string()]);
    assert_eq!(transport.accepted(), vec!["c1".to_string()]);
    assert!(transport.declined().is_empty());
}

#[tokio::test]
async fn test_unplayable_variant_is_declined() {
    let transport = Arc::new(FakeTransport::new());
    let control = SupervisorControl::new(true);
    let listener = listener(&transport, &control);

    let report = listener
        .listen(lines(vec![challenge("c1", "rival", "chess960")]))
        .await;

    assert_eq!(report.declined, vec!["c1".to_string()]);
    assert!(transport.accepted().is_empty());
    assert_eq!(
        transport.declined(),
        vec![("c1".to_string(), "variant".to_string())]
    );
}

#[tokio::test]
async fn test_challenges_are_declined_while_matchmaking_is_off() {
    let transport = Arc::new(FakeTransport::new());
    let control = SupervisorControl::new(false);
    let listener = listener(&transport, &control);

    listener
        .listen(lines(vec![challenge("c1", "rival", "fromPosition")]))
        .await;
    assert_eq!(
        transport.declined(),
        vec![("c1".to_string(), "later".to_string())]
    );

    control.set_matchmaking(true);
    listener
        .listen(lines(vec![challenge("c2", "rival", "fromPosition")]))
        .await;
    assert_eq!(transport.accepted(), vec!["c2".to_string()]);
}

#[tokio::test]
async fn test_own_challenges_and_noise_are_left_alone() {
    let transport = Arc::new(FakeTransport::new());
    let control = SupervisorControl::new(true);
    let listener = listener(&transport, &control);

    let report = listener
        .listen(lines(vec![
            challenge("c1", ACCOUNT, "standard"),
            "{garbage".to_string(),
            r#"{"type":"gameStart","game":{"gameId":"g1"}}"#.to_string(),
        ]))
        .await;

    assert_eq!(report.ignored, 1);
    assert_eq!(report.protocol_errors, 1);
    assert!(transport.accepted().is_empty());
    assert!(transport.declined().is_empty());
}

#[tokio::test]
async fn test_refused_answer_is_counted() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_answers();
    let control = SupervisorControl::new(true);
    let listener = listener(&transport, &control);

    let report = listener
        .listen(lines(vec![challenge("c1", "rival", "standard")]))
        .await;

    assert_eq!(report.failed, 1);
    assert!(report.accepted.is_empty());
}

#[test]
fn test_decide() {
    let transport = Arc::new(FakeTransport::new());
    let control = SupervisorControl::new(true);
    let listener = listener(&transport, &control);

    let AccountEvent::Challenge(incoming) =
        decode_account_event(&challenge("c1", "rival", "atomic"), ACCOUNT).unwrap()
    else {
        panic!("expected a challenge");
    };
    assert_eq!(
        listener.decide(&incoming),
        Some(ChallengeDecision::Decline(DeclineReason::Variant))
    );
}

#[tokio::test]
async fn test_run_answers_until_shutdown() {
    let transport = Arc::new(FakeTransport::new());
    transport.hold_streams_open();
    transport.script_account_events(vec![challenge("c1", "rival", "standard")]);
    let control = SupervisorControl::new(true);
    let listener = Arc::new(listener(&transport, &control));

    let running = tokio::spawn({
        let listener = Arc::clone(&listener);
        async move { listener.run().await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.accepted().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("challenge should be accepted");

    control.shutdown();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("listener must stop after shutdown")
        .unwrap();
    assert_eq!(transport.accepted(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn test_run_keeps_trying_when_stream_cannot_open() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_streams();
    let control = SupervisorControl::new(true);
    let listener = listener(&transport, &control);

    let stop = control.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.shutdown();
    });

    tokio::time::timeout(Duration::from_secs(5), listener.run())
        .await
        .expect("listener must stop after shutdown");
    assert!(transport.accepted().is_empty());
}
