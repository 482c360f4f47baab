use std::sync::Arc;

use quest_engine::{
    Adventure, DecisionRecord, HintLevel, QuestSession, Resolution, ResolvedEnding, SceneStatus,
    ScoreBreakdown, SessionProgress, compute_score, get_hint, is_unlocked, resolve_ending,
    validate,
};

fn bundled() -> Adventure {
    Adventure::midnight_express().unwrap()
}

fn mixed_case(text: &str) -> String {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            if i % 2 == 0 {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

#[test]
fn case_only_differences_are_accepted_when_case_insensitive() {
    let adventure = bundled();
    for puzzle in adventure.puzzles().iter().filter(|p| !p.case_sensitive) {
        for answer in &puzzle.answers {
            for variant in [
                answer.to_uppercase(),
                answer.to_lowercase(),
                mixed_case(answer),
            ] {
                assert!(
                    validate(puzzle, &variant).accepted,
                    "{} rejected {variant:?}",
                    puzzle.id
                );
            }
        }
    }
}

#[test]
fn acceptance_counts_once_per_puzzle() {
    let adventure = Arc::new(bundled());
    let mut session = QuestSession::new(Arc::clone(&adventure), Vec::new(), 0);

    let before = session.progress().completed_puzzles();
    let verdict = session.submit_answer("station-clock", "1147", 10).unwrap();
    assert!(verdict.accepted);
    assert_eq!(session.progress().completed_puzzles(), before + 1);
    let score = session.progress().score;

    for attempt in ["1147", "11:47", "wrong"] {
        let err = session.submit_answer("station-clock", attempt, 20).unwrap_err();
        assert_eq!(err.rejection_code(), Some("puzzle_completed"));
    }
    assert_eq!(session.progress().completed_puzzles(), before + 1);
    assert_eq!(session.progress().score, score);
}

#[test]
fn unlock_is_monotonic_and_immediate() {
    let adventure = Arc::new(bundled());
    let mut session = QuestSession::new(Arc::clone(&adventure), Vec::new(), 0);

    assert!(!is_unlocked(&adventure, "dining-car", session.progress()).unwrap());
    session.submit_answer("ticket-cipher", "midnight", 10).unwrap();
    assert!(!is_unlocked(&adventure, "dining-car", session.progress()).unwrap());
    assert_eq!(
        session.scene_status("dining-car").unwrap(),
        SceneStatus::Locked
    );

    session.submit_answer("station-clock", "11:47", 20).unwrap();
    assert!(is_unlocked(&adventure, "dining-car", session.progress()).unwrap());
    assert_eq!(
        session.scene_status("dining-car").unwrap(),
        SceneStatus::Available
    );

    session.submit_answer("menu-riddle", "wasp", 30).unwrap();
    assert!(is_unlocked(&adventure, "dining-car", session.progress()).unwrap());
    assert!(is_unlocked(&adventure, "platform", session.progress()).unwrap());
}

#[test]
fn ladder_starts_subtle_and_saturates_at_direct() {
    let adventure = bundled();
    for puzzle in adventure.puzzles() {
        let subtle = adventure.hint(&puzzle.id, HintLevel::Subtle).unwrap();
        assert_eq!(get_hint(&adventure, &puzzle.id, 1).unwrap(), subtle);
        assert_eq!(
            get_hint(&adventure, &puzzle.id, 3).unwrap(),
            get_hint(&adventure, &puzzle.id, 99).unwrap()
        );
    }
}

#[test]
fn ending_resolution_is_deterministic() {
    let adventure = bundled();
    let decisions = vec![
        DecisionRecord {
            decision: "trust-stranger".into(),
            option: "trust".into(),
            resolution: Resolution::Single,
            decided_at: 100,
        },
        DecisionRecord {
            decision: "final-accusation".into(),
            option: "conductor".into(),
            resolution: Resolution::Unanimous { votes: 2 },
            decided_at: 200,
        },
    ];
    let first = resolve_ending(&adventure, &decisions, 8);
    for _ in 0..10 {
        assert_eq!(resolve_ending(&adventure, &decisions, 8), first);
    }
    assert_eq!(first.id, "justice");
    assert_eq!(first.candidates, ["justice", "uneasy-justice", "stranger-ally"]);
}

#[test]
fn reference_score_example() {
    let adventure = bundled();
    let mut progress = SessionProgress::new(&adventure, Vec::new(), 0);
    let solved = [
        "ticket-cipher",
        "station-clock",
        "wine-list",
        "menu-riddle",
        "luggage-lock",
        "diary-page",
    ];
    for id in solved {
        progress.puzzles.get_mut(id).unwrap().completed = true;
    }
    progress.puzzles.get_mut("wine-list").unwrap().hints_used = 1;
    progress.puzzles.get_mut("diary-page").unwrap().hints_used = 1;
    progress.elapsed_secs = u64::from(adventure.meta().target_minutes) * 60;

    let ending = ResolvedEnding {
        id: "justice".into(),
        title: "Justice at Dawn".into(),
        narrative: String::new(),
        reward: 1000,
        defaulted: false,
        candidates: vec!["justice".into()],
        majority_decisions: Vec::new(),
        disclosure: None,
    };
    let score = compute_score(&progress, adventure.meta().target_minutes, &ending);
    assert_eq!(
        score,
        ScoreBreakdown {
            base: 600,
            hint_bonus: 200,
            time_bonus: 300,
            ending_bonus: 1000,
            bonus: 1500,
            total: 2100,
        }
    );
}

#[test]
fn padded_mixed_case_answer_scores_puzzle_points() {
    let adventure = Arc::new(bundled());
    let mut session = QuestSession::new(Arc::clone(&adventure), Vec::new(), 0);
    solve_platform(&mut session);
    let before = session.progress().score;

    let verdict = session.submit_answer("menu-riddle", " Bee ", 60).unwrap();
    assert!(verdict.accepted);
    let points = adventure.puzzle("menu-riddle").unwrap().points;
    assert_eq!(verdict.points_awarded, points);
    assert_eq!(session.progress().score, before + points);
}

fn solve_platform(session: &mut QuestSession) {
    session.submit_answer("ticket-cipher", "midnight", 10).unwrap();
    session.submit_answer("station-clock", "11:47", 20).unwrap();
}

const TWO_ENDINGS: &str = r#"{
    "meta": { "id": "two-endings", "title": "Two Endings" },
    "scenes": [{ "id": "s", "order": 1, "puzzles": ["p1"] }],
    "puzzles": [{ "id": "p1", "scene": "s", "answers": ["one"] }],
    "decisions": [{
        "id": "D1",
        "scene": "s",
        "options": [
            { "id": "optionX", "label": "X" },
            { "id": "optionY", "label": "Y" }
        ]
    }],
    "endings": [
        { "id": "fallback", "title": "Fallback", "default": true },
        {
            "id": "B",
            "title": "B",
            "requirements": [
                { "kind": "puzzles_completed", "at_least": 6 },
                { "kind": "decision", "decision": "D1", "option": "optionY" }
            ]
        },
        {
            "id": "A",
            "title": "A",
            "requirements": [
                { "kind": "puzzles_completed", "at_least": 6 },
                { "kind": "decision", "decision": "D1", "option": "optionX" }
            ]
        }
    ]
}"#;

#[test]
fn only_fully_satisfied_ending_is_chosen() {
    let chose_x = [DecisionRecord {
        decision: "D1".into(),
        option: "optionX".into(),
        resolution: Resolution::Single,
        decided_at: 0,
    }];

    let adventure = Adventure::from_json(TWO_ENDINGS).unwrap();
    let resolved = resolve_ending(&adventure, &chose_x, 7);
    assert_eq!(resolved.id, "A");
    assert_eq!(resolved.candidates, ["A"]);

    let mut data = adventure.data().clone();
    data.endings.reverse();
    let reordered = Adventure::from_data(data).unwrap();
    assert_eq!(resolve_ending(&reordered, &chose_x, 7).id, "A");
    assert!(resolve_ending(&reordered, &chose_x, 5).defaulted);
}
