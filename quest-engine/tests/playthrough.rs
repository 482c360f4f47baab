use std::sync::Arc;

use quest_engine::{
    ActionOutcome, Adventure, DecisionReceipt, ManualClock, PlayerAction, QuestSession, Resolution,
    SceneStatus, SessionProgress, SessionRegistry,
};

const TEAM: [&str; 3] = ["ada", "grace", "linus"];

fn new_session() -> QuestSession {
    let adventure = Arc::new(Adventure::midnight_express().unwrap());
    QuestSession::new(adventure, TEAM.iter().map(ToString::to_string).collect(), 0)
}

fn solve(session: &mut QuestSession, answers: &[(&str, &str)], now: u64) {
    for (puzzle, answer) in answers {
        let verdict = session.submit_answer(puzzle, answer, now).unwrap();
        assert!(verdict.accepted, "{puzzle} should accept {answer:?}");
    }
}

/// Plays every scene up to the final accusation.
fn reach_engine_room(session: &mut QuestSession, trust: &str) {
    solve(session, &[("ticket-cipher", "midnight"), ("station-clock", "11:47")], 300);
    assert_eq!(
        session.scene_status("dining-car").unwrap(),
        SceneStatus::Available
    );

    solve(session, &[("wine-list", "Bordeaux 1923"), ("menu-riddle", " Bee ")], 900);
    let receipt = session
        .submit_decision("trust-stranger", trust, "ada", 950)
        .unwrap();
    assert!(matches!(
        receipt,
        DecisionReceipt::Resolved(ref r) if r.resolution == Resolution::Single
    ));
    assert_eq!(
        session.scene_status("dining-car").unwrap(),
        SceneStatus::Completed
    );

    solve(session, &[("luggage-lock", "4721"), ("diary-page", "conductor")], 1_500);
    solve(session, &[("brake-code", "emergency stop"), ("signal-lamp", "Green")], 2_100);
}

fn accuse(session: &mut QuestSession, votes: [&str; 3]) -> DecisionReceipt {
    let mut last = None;
    for (player, option) in TEAM.iter().zip(votes) {
        last = Some(
            session
                .submit_decision("final-accusation", option, player, 2_400)
                .unwrap(),
        );
    }
    last.unwrap()
}

#[test]
fn unanimous_team_reaches_justice() {
    let mut session = new_session();
    reach_engine_room(&mut session, "trust");
    assert_eq!(session.progress().score, 950);

    let first = session
        .submit_decision("final-accusation", "conductor", "ada", 2_300)
        .unwrap();
    assert_eq!(
        first,
        DecisionReceipt::Pending {
            decision: "final-accusation".into(),
            votes_cast: 1,
            votes_needed: 3,
        }
    );
    let dup = session
        .submit_decision("final-accusation", "countess", "ada", 2_310)
        .unwrap_err();
    assert_eq!(dup.rejection_code(), Some("already_voted"));

    session
        .submit_decision("final-accusation", "conductor", "grace", 2_320)
        .unwrap();
    let last = session
        .submit_decision("final-accusation", "conductor", "linus", 2_330)
        .unwrap();
    let DecisionReceipt::Resolved(record) = last else {
        panic!("consensus should resolve once every player voted");
    };
    assert_eq!(record.resolution, Resolution::Unanimous { votes: 3 });
    assert_eq!(
        session.scene_status("engine-room").unwrap(),
        SceneStatus::Completed
    );

    let outcome = session.end_session(45 * 60).unwrap();
    assert_eq!(outcome.ending.id, "justice");
    assert!(outcome.ending.disclosure.is_none());
    assert_eq!(outcome.ending.candidates[0], "justice");
    assert_eq!(outcome.completed_puzzles, 8);
    assert_eq!(outcome.score.base, 800);
    assert_eq!(outcome.score.hint_bonus, 500);
    assert_eq!(outcome.score.time_bonus, 300);
    assert_eq!(outcome.score.ending_bonus, 1000);
    assert_eq!(outcome.score.total, 2600);
}

#[test]
fn split_vote_falls_back_to_majority_and_is_disclosed() {
    let mut session = new_session();
    reach_engine_room(&mut session, "refuse");
    let receipt = accuse(&mut session, ["conductor", "countess", "conductor"]);
    let DecisionReceipt::Resolved(record) = receipt else {
        panic!("expected resolution");
    };
    assert_eq!(record.option, "conductor");
    assert_eq!(
        record.resolution,
        Resolution::Majority {
            votes_for: 2,
            total: 3
        }
    );

    let outcome = session.end_session(70 * 60).unwrap();
    assert_eq!(outcome.ending.id, "uneasy-justice");
    assert_eq!(outcome.ending.majority_decisions, ["final-accusation"]);
    assert_eq!(
        outcome.ending.disclosure.as_deref(),
        Some("ending.majority_disclosure")
    );
    assert_eq!(outcome.score.time_bonus, 100);
}

#[test]
fn unfinished_vote_is_settled_by_majority_at_the_end() {
    let mut session = new_session();
    reach_engine_room(&mut session, "refuse");
    for (player, at) in [("ada", 2_300), ("grace", 2_320)] {
        let receipt = session
            .submit_decision("final-accusation", "conductor", player, at)
            .unwrap();
        assert!(matches!(receipt, DecisionReceipt::Pending { .. }));
    }

    let outcome = session.end_session(50 * 60).unwrap();
    assert_eq!(outcome.ending.id, "uneasy-justice");
    assert!(!outcome.ending.defaulted);
    assert_eq!(outcome.ending.majority_decisions, ["final-accusation"]);
    assert!(outcome.ending.disclosure.is_some());
    assert!(session.progress().pending_votes.is_empty());
}

#[test]
fn ally_without_accusation_befriends_the_stranger() {
    let mut session = new_session();
    reach_engine_room(&mut session, "trust");
    accuse(&mut session, ["nobody", "nobody", "nobody"]);
    let outcome = session.end_session(80 * 60).unwrap();
    assert_eq!(outcome.ending.id, "stranger-ally");
    assert_eq!(outcome.score.time_bonus, 0);
    assert_eq!(outcome.score.total, 800 + 500 + 800);
}

#[test]
fn refusing_help_with_no_accusation_defaults() {
    let mut session = new_session();
    reach_engine_room(&mut session, "refuse");
    accuse(&mut session, ["nobody", "countess", "nobody"]);
    let outcome = session.end_session(3_000).unwrap();
    assert_eq!(outcome.ending.id, "lost-in-the-night");
    assert!(outcome.ending.defaulted);
}

#[test]
fn locked_scenes_refuse_interaction() {
    let mut session = new_session();
    let err = session.submit_answer("brake-code", "emergency stop", 10).unwrap_err();
    assert_eq!(err.rejection_code(), Some("scene_locked"));
    let err = session
        .submit_decision("trust-stranger", "trust", "ada", 10)
        .unwrap_err();
    assert_eq!(err.rejection_code(), Some("scene_locked"));

    solve(&mut session, &[("ticket-cipher", "midnight"), ("station-clock", "1147")], 20);
    let err = session
        .submit_decision("trust-stranger", "trust", "mallory", 30)
        .unwrap_err();
    assert!(err.rejection_code().is_none());
    assert!(session.progress().decision("trust-stranger").is_none());
}

#[test]
fn hint_ladder_escalates_with_attempts() {
    let mut session = new_session();
    assert!(session.request_hint("ticket-cipher", 5).unwrap().is_none());

    session.submit_answer("ticket-cipher", "noon", 10).unwrap();
    let subtle = session.request_hint("ticket-cipher", 20).unwrap().unwrap();
    assert_eq!(subtle.cost_charged, 1);
    assert_eq!(subtle.tokens_remaining, 9);

    session.submit_answer("ticket-cipher", "dawn", 30).unwrap();
    let cooling = session.request_hint("ticket-cipher", 40).unwrap_err();
    assert_eq!(cooling.rejection_code(), Some("hint_cooldown"));

    let obvious = session.request_hint("ticket-cipher", 60).unwrap().unwrap();
    assert_eq!(obvious.cost_charged, 2);
    assert_eq!(session.progress().total_hints_used(), 2);
    assert_eq!(session.progress().hint_tokens, 7);
}

#[test]
fn progress_survives_json_round_trip() {
    let mut session = new_session();
    solve(&mut session, &[("ticket-cipher", "MIDNIGHT")], 120);
    session.submit_answer("station-clock", "noon", 130).unwrap();
    session.request_hint("station-clock", 140).unwrap();

    let saved = serde_json::to_string(session.progress()).unwrap();
    let restored: SessionProgress = serde_json::from_str(&saved).unwrap();
    assert_eq!(&restored, session.progress());

    let adventure = Arc::new(Adventure::midnight_express().unwrap());
    let resumed = QuestSession::from_progress(adventure, restored).unwrap();
    assert_eq!(
        resumed.scene_status("platform").unwrap(),
        SceneStatus::InProgress
    );
}

#[test]
fn registry_drives_a_session_through_json_actions() {
    let registry = SessionRegistry::new(ManualClock::starting_at(0));
    registry.register_adventure(Adventure::midnight_express().unwrap());
    let id = registry
        .start_session("midnight-express", vec!["solo".into()])
        .unwrap();

    registry.clock().advance(60);
    let action = PlayerAction::from_json(
        r#"{ "action": "submit_answer", "puzzle": "ticket-cipher", "text": "Midnight" }"#,
    )
    .unwrap();
    let ActionOutcome::Answer { verdict, .. } = registry.dispatch(&id, action).unwrap() else {
        panic!("expected an answer outcome");
    };
    assert!(verdict.accepted);

    registry.clock().advance(60);
    let ActionOutcome::Ended { outcome } = registry.dispatch(&id, PlayerAction::EndSession).unwrap()
    else {
        panic!("expected the session to end");
    };
    assert_eq!(outcome.elapsed_secs, 120);
    assert_eq!(outcome.ending.id, "lost-in-the-night");
    assert_eq!(outcome.score.base, 100);

    let outcome = registry.end_session(&id).unwrap_err();
    assert_eq!(outcome.rejection_code(), Some("session_ended"));
}
