use anyhow::{Context, Result, ensure};

use super::{ScenarioPlan, Step, TestScenario};
use crate::logic::BotStrategy;
use crate::logic::policy::SOLO_PLAYER;
use crate::logic::runner::RunSummary;

const TEAM: [&str; 3] = ["ada", "grace", "linus"];
const SOLO: [&str; 0] = [];

/// Every scenario the harness knows, in listing order.
#[must_use]
pub fn scenario_catalog() -> Vec<TestScenario> {
    let mut scenarios = vec![
        perfect_run(),
        hint_heavy(),
        split_vote(),
        scapegoat(),
        unfinished_vote(),
        locked_scene(),
    ];
    let teams: [&[&str]; 3] = [&TEAM, &SOLO, &TEAM[..2]];
    scenarios.extend(
        BotStrategy::ALL
            .into_iter()
            .zip(teams)
            .map(|(strategy, team)| sweep(strategy, team)),
    );
    scenarios
}

#[must_use]
pub fn find_scenario(key: &str) -> Option<TestScenario> {
    scenario_catalog()
        .into_iter()
        .find(|scenario| scenario.key.eq_ignore_ascii_case(key))
}

fn ending_of(summary: &RunSummary) -> Result<&str> {
    summary
        .outcome
        .as_ref()
        .map(|outcome| outcome.ending.id.as_str())
        .context("session finished without an outcome")
}

fn expect_ending(expected: &'static str) -> impl Fn(&RunSummary) -> Result<()> + Send + Sync {
    move |summary: &RunSummary| {
        let ending = ending_of(summary)?;
        ensure!(ending == expected, "expected ending {expected}, got {ending}");
        Ok(())
    }
}

fn expect_total(expected: u32) -> impl Fn(&RunSummary) -> Result<()> + Send + Sync {
    move |summary: &RunSummary| {
        let total = summary
            .outcome
            .as_ref()
            .map(|outcome| outcome.score.total)
            .context("session finished without an outcome")?;
        ensure!(total == expected, "expected total score {expected}, got {total}");
        Ok(())
    }
}

fn expect_majority_disclosed(summary: &RunSummary) -> Result<()> {
    let outcome = summary.outcome.as_ref().context("no outcome")?;
    ensure!(
        outcome.ending.disclosure.is_some(),
        "majority fallback was not disclosed"
    );
    ensure!(
        outcome.ending.majority_decisions == ["final-accusation"],
        "unexpected majority decisions {:?}",
        outcome.ending.majority_decisions
    );
    Ok(())
}

fn expect_no_rejections(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.rejections.is_empty(),
        "unexpected rejections: {:?}",
        summary.rejections
    );
    Ok(())
}

fn expect_known_ending(summary: &RunSummary) -> Result<()> {
    let ending = ending_of(summary)?;
    summary
        .session
        .adventure()
        .ending(ending)
        .with_context(|| format!("bot reached unknown ending {ending}"))?;
    Ok(())
}

/// Correct answers for every puzzle, scene by scene.
fn solve_platform() -> Vec<Step> {
    vec![
        Step::answer("ticket-cipher", "midnight"),
        Step::answer("station-clock", "11:47"),
    ]
}

fn solve_dining_car(trust: &str, player: &str) -> Vec<Step> {
    vec![
        Step::answer("wine-list", "bordeaux 1923"),
        Step::answer("menu-riddle", "bee"),
        Step::decide("trust-stranger", trust, player),
    ]
}

fn solve_back_half() -> Vec<Step> {
    vec![
        Step::answer("luggage-lock", "4721"),
        Step::answer("diary-page", "the conductor"),
        Step::answer("brake-code", "emergency stop"),
        Step::answer("signal-lamp", "Green"),
    ]
}

fn solve_to_engine_room(trust: &str, player: &str) -> Vec<Step> {
    let mut steps = solve_platform();
    steps.extend(solve_dining_car(trust, player));
    steps.extend(solve_back_half());
    steps
}

fn accuse(votes: &[(&str, &str)]) -> Vec<Step> {
    votes
        .iter()
        .map(|(player, option)| Step::decide("final-accusation", option, player))
        .collect()
}

fn perfect_run() -> TestScenario {
    let mut steps = solve_to_engine_room("trust", "ada");
    steps.extend(accuse(&[
        ("ada", "conductor"),
        ("grace", "conductor"),
        ("linus", "conductor"),
    ]));
    TestScenario::new(
        "perfect-run",
        "Three players solve everything and agree on the conductor",
        ScenarioPlan::scripted(&TEAM, steps)
            .with_expectation(expect_ending("justice"))
            .with_expectation(expect_total(2600))
            .with_expectation(expect_no_rejections),
    )
}

fn hint_heavy() -> TestScenario {
    let mut steps = vec![
        Step::guess("ticket-cipher", "noon train"),
        Step::hint("ticket-cipher"),
        Step::guess("ticket-cipher", "last train"),
        Step::hint("ticket-cipher").after(5).rejected("hint_cooldown"),
        Step::hint("ticket-cipher").after(60),
        Step::answer("ticket-cipher", "midnight"),
        Step::guess("station-clock", "noon"),
        Step::hint("station-clock"),
        Step::answer("station-clock", "1147"),
        Step::guess("menu-riddle", "wasp"),
        Step::hint("menu-riddle"),
    ];
    steps.extend([
        Step::answer("menu-riddle", "bee"),
        Step::answer("wine-list", "bordeaux 1923"),
        Step::decide("trust-stranger", "trust", SOLO_PLAYER),
    ]);
    steps.extend(solve_back_half());
    steps.extend(accuse(&[(SOLO_PLAYER, "conductor")]));

    TestScenario::new(
        "hint-heavy",
        "Solo player climbs the hint ladder and trips a cooldown",
        ScenarioPlan::scripted(&SOLO, steps)
            .with_expectation(expect_ending("justice"))
            .with_expectation(|summary: &RunSummary| -> Result<()> {
                let outcome = summary.outcome.as_ref().context("no outcome")?;
                ensure!(outcome.hints_used == 4, "hints used {}", outcome.hints_used);
                ensure!(
                    outcome.score.hint_bonus == 0,
                    "hint bonus {}",
                    outcome.score.hint_bonus
                );
                let tokens = summary.session.progress().hint_tokens;
                ensure!(tokens == 5, "expected 5 hint tokens left, got {tokens}");
                Ok(())
            }),
    )
}

fn split_vote() -> TestScenario {
    let mut steps = solve_to_engine_room("refuse", "grace");
    steps.extend(accuse(&[
        ("ada", "conductor"),
        ("grace", "countess"),
        ("linus", "conductor"),
    ]));
    TestScenario::new(
        "split-vote",
        "Divided accusation resolves by majority and is disclosed",
        ScenarioPlan::scripted(&TEAM, steps)
            .with_expectation(expect_ending("uneasy-justice"))
            .with_expectation(expect_majority_disclosed),
    )
}

fn scapegoat() -> TestScenario {
    let mut steps = solve_to_engine_room("refuse", "ada");
    steps.extend(accuse(&[("ada", "countess"), ("grace", "conductor")]));
    TestScenario::new(
        "scapegoat",
        "Tied accusation goes to the first option voted for",
        ScenarioPlan::scripted(&TEAM[..2], steps)
            .with_expectation(expect_ending("scapegoat"))
            .with_expectation(expect_majority_disclosed),
    )
}

fn unfinished_vote() -> TestScenario {
    let mut steps = solve_to_engine_room("refuse", "grace");
    steps.extend(accuse(&[("ada", "conductor"), ("grace", "conductor")]));
    TestScenario::new(
        "unfinished-vote",
        "Session ends before the last vote; the votes cast decide",
        ScenarioPlan::scripted(&TEAM, steps)
            .with_expectation(expect_ending("uneasy-justice"))
            .with_expectation(expect_majority_disclosed)
            .with_expectation(expect_no_rejections),
    )
}

fn locked_scene() -> TestScenario {
    let mut steps = vec![
        Step::answer("brake-code", "emergency stop").rejected("scene_locked"),
        Step::decide("trust-stranger", "trust", SOLO_PLAYER).rejected("scene_locked"),
        Step::hint("wine-list").rejected("scene_locked"),
    ];
    steps.extend(solve_platform());
    steps.push(Step::answer("ticket-cipher", "midnight").rejected("puzzle_completed"));
    TestScenario::new(
        "locked-scene",
        "Locked content refuses play and the session ends early",
        ScenarioPlan::scripted(&SOLO, steps)
            .finishing_after(120)
            .with_expectation(expect_ending("lost-in-the-night"))
            .with_expectation(expect_total(1000)),
    )
}

fn sweep(strategy: BotStrategy, team: &[&str]) -> TestScenario {
    let (key, description) = match strategy {
        BotStrategy::Diligent => ("sweep-diligent", "Seeded diligent bots, three-player team"),
        BotStrategy::Careless => ("sweep-careless", "Seeded careless solo bots"),
        BotStrategy::HintHungry => ("sweep-hint-hungry", "Seeded hint-hungry bots, two players"),
    };
    TestScenario::new(
        key,
        description,
        ScenarioPlan::bot(team, strategy)
            .with_max_actions(300)
            .with_expectation(expect_known_ending),
    )
}
