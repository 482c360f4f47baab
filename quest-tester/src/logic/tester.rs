use colored::Colorize;
use quest_engine::QuestEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::runner::{QuestRunner, RunSummary};
use super::storage::{ContentSource, JsonDirStorage};
use crate::scenario::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// How often each ending was reached across iterations.
    pub endings: BTreeMap<String, u32>,
    pub mean_total: f64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Saves each finished run and reloads it through the engine facade.
pub struct SnapshotCheck {
    engine: QuestEngine<ContentSource, JsonDirStorage>,
}

impl SnapshotCheck {
    #[must_use]
    pub const fn new(source: ContentSource, storage: JsonDirStorage) -> Self {
        Self {
            engine: QuestEngine::new(source, storage),
        }
    }

    fn verify(&self, slot: &str, summary: &RunSummary) -> anyhow::Result<()> {
        self.engine.save_session(slot, &summary.session)?;
        let restored = self
            .engine
            .load_session(slot)?
            .ok_or_else(|| anyhow::anyhow!("snapshot {slot} vanished after saving"))?;
        anyhow::ensure!(
            restored.progress() == summary.session.progress(),
            "snapshot {slot} did not restore identical progress"
        );
        Ok(())
    }
}

pub struct LogicTester {
    runner: QuestRunner,
    snapshots: Option<SnapshotCheck>,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(runner: QuestRunner, snapshots: Option<SnapshotCheck>, verbose: bool) -> Self {
        Self {
            runner,
            snapshots,
            verbose,
        }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {seed})",
                    scenario.key.bright_white(),
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut endings: BTreeMap<String, u32> = BTreeMap::new();
        let mut total_score = 0_u64;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let summary = self.runner.run_plan(&scenario.plan, iteration_seed);

            if let Some(ending) = summary.ending_id() {
                *endings.entry(ending.to_string()).or_default() += 1;
            }
            total_score += u64::from(summary.total_score());

            let mut problem = evaluate(scenario, &summary);
            if problem.is_none()
                && let Some(check) = &self.snapshots
            {
                let slot = format!("{}-{iteration_seed}", scenario.key);
                problem = check.verify(&slot, &summary).err().map(|err| format!("{err:#}"));
            }

            if let Some(err) = problem {
                failures.push(format!(
                    "Iteration {} (driver {}, seed {}, actions {}, ending '{}', score {}): {err} | rejections: {}",
                    i + 1,
                    summary.driver,
                    summary.seed,
                    summary.actions,
                    summary.ending_id().unwrap_or("-"),
                    summary.total_score(),
                    summarize_rejections(&summary),
                ));
                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) actions:{} ending:{} score:{}",
                        i + 1,
                        iterations,
                        summary.actions,
                        summary.ending_id().unwrap_or("-"),
                        summary.total_score(),
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_total = if iterations == 0 {
            0.0
        } else {
            total_score as f64 / iterations as f64
        };

        ScenarioResult {
            scenario_name: scenario.key.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            endings,
            mean_total,
            average_duration,
            performance_data,
        }
    }
}

/// First problem with a run: script deviations, then invariant
/// violations, then scenario expectations.
fn evaluate(scenario: &TestScenario, summary: &RunSummary) -> Option<String> {
    if let Some(error) = summary.script_errors.first() {
        return Some(error.to_string());
    }
    if let Some(violation) = summary.violations.first() {
        return Some(format!("invariant violated: {violation}"));
    }
    scenario
        .plan
        .expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| format!("{err:#}"))
}

fn summarize_rejections(summary: &RunSummary) -> String {
    if summary.rejections.is_empty() {
        return "none".to_string();
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for code in &summary.rejections {
        *counts.entry(code.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(code, count)| format!("{code} x{count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u128::deserialize(deserializer)?;
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        durations
            .iter()
            .map(Duration::as_micros)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Vec::<u128>::deserialize(deserializer)?
            .into_iter()
            .map(|m| Duration::from_micros(u64::try_from(m).unwrap_or(u64::MAX)))
            .collect())
    }
}
