//! Tests for session transitions driven by decoded frames.

use layernet_protocol::{ClaimCountdown, Phase, RoundTwoOutcome, SessionState, decode};

fn countdown_from(raw: &str) -> ClaimCountdown {
    let frame = decode(raw).expect("valid").expect("matched");
    let (_, countdown) = frame
        .home_data()
        .and_then(|data| data.game_data())
        .expect("game data");
    countdown
}

#[test]
fn test_claim_scenario_from_home_data_frame() {
    let countdown = countdown_from(
        r#"430[{"userRank":{"role":"Newbie","profitPerHour":1},"claimCountdown":{"minutes":5,"seconds":30},"gold":0,"dogs":0}]"#,
    );
    let mut session = SessionState::new("1001", 5);
    session.begin_authenticating();
    session.mark_connected();

    assert!(session.should_claim(&countdown));
    assert!(session.begin_claim());
    assert_eq!(session.phase(), Phase::Claiming);
    assert!(!session.should_claim(&countdown));
    assert!(!session.begin_claim());
}

#[test]
fn test_far_countdown_does_not_claim() {
    let countdown = countdown_from(
        r#"430[{"userRank":{"role":"Newbie"},"claimCountdown":{"minutes":45,"seconds":0}}]"#,
    );
    let session = SessionState::new("1001", 5);
    assert!(!session.should_claim(&countdown));
}

#[test]
fn test_full_cycle_to_ceiling() {
    let mut session = SessionState::new("1001", 3);
    session.mark_connected();

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        assert!(session.begin_start());
        session.mark_game_started();
        assert!(session.holds_invariants());
        session.enter_round_two();
        assert_eq!(session.phase(), Phase::PlayingRound2);
        outcomes.push(session.complete_round_two());
        assert!(session.holds_invariants());
    }

    assert_eq!(
        outcomes,
        vec![
            RoundTwoOutcome::Restart { completed: 2 },
            RoundTwoOutcome::CeilingReached { completed: 3 },
        ]
    );
}

#[test]
fn test_exception_frame_stops_round_two() {
    let mut session = SessionState::new("1001", 5);
    session.begin_start();
    session.mark_game_started();
    session.enter_round_two();

    let frame = decode(r#"42["exception",{"message":"Game not started"}]"#)
        .expect("valid")
        .expect("matched");
    assert!(frame.is_game_not_started());
    assert!(session.abort_round_two());
    assert!(!session.round2_active());
    assert!(session.holds_invariants());
}

#[test]
fn test_other_exception_is_not_game_not_started() {
    let frame = decode(r#"42["exception",{"message":"Too many requests"}]"#)
        .expect("valid")
        .expect("matched");
    assert_eq!(frame.exception_message(), Some("Too many requests"));
    assert!(!frame.is_game_not_started());
}
