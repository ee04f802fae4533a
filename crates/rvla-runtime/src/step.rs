//! Step Engine: one plan decision per call.

use std::sync::Arc;

use tracing::{debug, warn};

use rvla_config::Config;
use rvla_protocols::error::AgentError;
use rvla_protocols::examiner::SnippetExaminer;
use rvla_protocols::oracle::{DecisionOracle, PlanDecision, PlanRequest};
use rvla_protocols::types::{
    truncate_chars, ActRequest, Action, AgentState, BrowserCommand, EventKind, Observation,
    Screenshot,
};

use crate::context_examiner::ContextExaminer;
use crate::event_log::EventLog;
use crate::visual_examiner::VisualExaminer;

/// Number of trailing history lines worth sending to a planner.
///
/// 10 by default, 15 inside a child branch, 20 once the history passes 50 lines.
pub fn adaptive_context_window(depth: u32, history_len: usize) -> usize {
    if history_len > 50 {
        20
    } else if depth > 0 {
        15
    } else {
        10
    }
}

/// Thresholds the Step Engine applies before planning.
#[derive(Debug, Clone)]
pub struct StepSettings {
    pub examination_threshold: usize,
    pub recent_window: usize,
    pub summary_chars: usize,
    pub screenshot_threshold: usize,
}

impl StepSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            examination_threshold: config.context.examination_threshold,
            recent_window: config.context.recent_window,
            summary_chars: config.context.summary_chars,
            screenshot_threshold: config.visual.screenshot_threshold,
        }
    }
}

impl Default for StepSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The single-step state transition.
pub struct StepEngine {
    oracle: Arc<dyn DecisionOracle>,
    examiner: Arc<dyn SnippetExaminer>,
    context: ContextExaminer,
    visual: VisualExaminer,
    settings: StepSettings,
}

impl StepEngine {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        examiner: Arc<dyn SnippetExaminer>,
        config: &Config,
    ) -> Self {
        Self {
            context: ContextExaminer::new(examiner.clone(), &config.context),
            visual: VisualExaminer::new(examiner.clone(), &config.visual),
            oracle,
            examiner,
            settings: StepSettings::from_config(config),
        }
    }

    pub fn with_settings(mut self, settings: StepSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    pub fn context_examiner(&self) -> &ContextExaminer {
        &self.context
    }

    /// Plan the next action for `state`.
    ///
    /// Appends `step`, optionally `rlm_examination` and `visual_rlm` or
    /// `analysis`, then `plan` to `events`, and advances `state.step_count`.
    /// Examiner failures fall back to the unexamined input; an oracle failure
    /// is returned as [`AgentError::Planning`].
    pub async fn step(
        &self,
        state: &mut AgentState,
        events: &mut EventLog,
        observation: Option<&Observation>,
    ) -> Result<Action, AgentError> {
        let n = state.step_count;
        events.record(EventKind::Step, format!("{}:{}", n, state.goal));

        let context_summary = if events.len() > self.settings.examination_threshold {
            self.examine_history(state, events).await
        } else {
            String::new()
        };

        let screenshot = match observation {
            Some(observation) => self.examine_observation(state, events, observation).await,
            None => None,
        };

        let summarized = !context_summary.is_empty();
        let history = if !summarized {
            events.lines()
        } else {
            let mut history = Vec::with_capacity(self.settings.recent_window + 1);
            history.push(context_summary);
            history.extend(
                events
                    .tail(self.settings.recent_window)
                    .iter()
                    .map(|e| e.to_string()),
            );
            history
        };

        let request = PlanRequest {
            goal: state.goal.clone(),
            observation: observation.map(Observation::without_screenshot),
            summarized,
            history,
            depth: state.depth,
            screenshot,
        };
        let decision = self.oracle.plan_next_action(request).await?;

        events.record(EventKind::Plan, format!("{}:{}", n, decision.reasoning));
        let action = translate(decision, &state.goal);
        debug!(step = n, depth = state.depth, action = %action.kind(), "Planned action");

        state.step_count += 1;
        Ok(action)
    }

    async fn examine_history(&self, state: &AgentState, events: &mut EventLog) -> String {
        let query = format!("What is relevant to achieving: {}?", state.goal);
        let summary = match self.context.examine(&events.render(), &query, &state.goal).await {
            Ok(examination) => examination.summary().to_string(),
            Err(e) => {
                warn!("History examination failed, planning on the raw log: {}", e);
                String::new()
            }
        };
        events.record(
            EventKind::RlmExamination,
            format!(
                "{}:{}",
                state.step_count,
                truncate_chars(&summary, self.settings.summary_chars)
            ),
        );
        summary
    }

    /// Returns the screenshot to forward to the oracle.
    async fn examine_observation(
        &self,
        state: &AgentState,
        events: &mut EventLog,
        observation: &Observation,
    ) -> Option<Screenshot> {
        let screenshot = observation.screenshot.as_ref()?;

        if screenshot.encoded_len() > self.settings.screenshot_threshold {
            let query = format!("What is relevant to: {}?", state.goal);
            let report = self
                .visual
                .examine_screenshot(screenshot, &query, &state.goal)
                .await;
            events.record(
                EventKind::VisualRlm,
                format!(
                    "{}:{}",
                    state.step_count,
                    truncate_chars(&report.combined_description, self.settings.summary_chars)
                ),
            );
            return None;
        }

        match self
            .examiner
            .analyze_observation(&state.goal, screenshot, &observation.url)
            .await
        {
            Ok(analysis) => events.record(
                EventKind::Analysis,
                format!(
                    "{}:{}",
                    state.step_count,
                    truncate_chars(&analysis.description, self.settings.summary_chars)
                ),
            ),
            Err(e) => warn!("Observation analysis failed: {}", e),
        }
        Some(screenshot.clone())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turn an oracle decision into a typed action.
pub fn translate(decision: PlanDecision, goal: &str) -> Action {
    let PlanDecision {
        action_type,
        reasoning,
        task,
        command,
        target,
        text,
        followup_tasks,
    } = decision;

    match action_type.trim().to_ascii_lowercase().as_str() {
        "subcall" => Action::Subcall {
            task: non_empty(task).unwrap_or_else(|| format!("subtask for: {}", goal)),
            reasoning,
        },
        "done" => Action::Done {
            reason: if reasoning.is_empty() {
                "Task complete".to_string()
            } else {
                reasoning.clone()
            },
            reasoning,
            followups: followup_tasks,
        },
        _ => Action::Act(ActRequest {
            command: command
                .as_deref()
                .map(BrowserCommand::from)
                .unwrap_or_default(),
            target: non_empty(target),
            text: non_empty(text),
            reasoning,
        }),
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
