//! Post-hoc trajectory judgment.
//!
//! [`score`] only checks for a terminal `done` action. It says the agent
//! believed it finished, not that the goal was achieved, and must not be
//! read as a correctness check. [`task_success`] and [`efficiency`] grade a
//! finished run against an expected outcome.

use serde::{Deserialize, Serialize};

use rvla_protocols::types::Action;

const DEFAULT_IDEAL_STEPS: usize = 10;
const EFFICIENT_RATIO: f32 = 0.7;

/// Verdict of [`score`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub success: bool,
    pub steps: usize,
}

/// `success` iff any action is `done`; `steps` is the trajectory length.
pub fn score(trajectory: &[Action]) -> Score {
    Score {
        success: trajectory.iter().any(Action::is_done),
        steps: trajectory.len(),
    }
}

/// What a finished run reported, as seen by the evaluators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub steps: usize,
    /// Rendered event lines.
    pub events: Vec<String>,
}

/// Checks a run must satisfy. Absent checks are not counted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_steps: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,

    /// Substrings that must all appear somewhere in the events (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_events: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal_steps: Option<usize>,
}

impl TaskTarget {
    fn check_count(&self) -> usize {
        [
            self.min_steps.is_some(),
            self.max_steps.is_some(),
            self.required_events.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSuccess {
    pub success: bool,
    pub checks_passed: usize,
    pub total_checks: usize,
}

/// Success requires the agent to report success and at least half the checks
/// to pass. Without checks the agent's own report decides.
pub fn task_success(target: &TaskTarget, outcome: &RunOutcome) -> TaskSuccess {
    let total = target.check_count();
    if total == 0 {
        return TaskSuccess {
            success: outcome.success,
            checks_passed: usize::from(outcome.success),
            total_checks: 1,
        };
    }

    let mut passed = 0;
    if let Some(min) = target.min_steps {
        if outcome.steps >= min {
            passed += 1;
        }
    }
    if let Some(max) = target.max_steps {
        if outcome.steps <= max {
            passed += 1;
        }
    }
    if let Some(required) = &target.required_events {
        let haystack = outcome.events.join("\n").to_lowercase();
        if required.iter().all(|r| haystack.contains(&r.to_lowercase())) {
            passed += 1;
        }
    }

    TaskSuccess {
        success: outcome.success && passed * 2 >= total,
        checks_passed: passed,
        total_checks: total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Efficiency {
    pub efficient: bool,
    /// `min(1, ideal_steps / steps)`.
    pub steps_ratio: f32,
}

/// Step efficiency of a successful run; unsuccessful or empty runs score zero.
pub fn efficiency(target: &TaskTarget, outcome: &RunOutcome) -> Efficiency {
    if !outcome.success || outcome.steps == 0 {
        return Efficiency {
            efficient: false,
            steps_ratio: 0.0,
        };
    }

    let ideal = target.ideal_steps.unwrap_or(DEFAULT_IDEAL_STEPS);
    let ratio = ideal as f32 / outcome.steps as f32;
    Efficiency {
        efficient: ratio >= EFFICIENT_RATIO,
        steps_ratio: ratio.min(1.0),
    }
}
