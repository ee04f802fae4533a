//! Run Loop: drives Step Engine decisions against the browser.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use rvla_config::{CompactionConfig, Config};
use rvla_protocols::browser::BrowserDriver;
use rvla_protocols::delegation::Delegator;
use rvla_protocols::error::AgentError;
use rvla_protocols::examiner::SnippetExaminer;
use rvla_protocols::model::Summarizer;
use rvla_protocols::oracle::DecisionOracle;
use rvla_protocols::types::{
    ActRequest, Action, AgentState, Event, EventKind, FollowupTask, Observation,
};

use crate::decomposer::{DecompositionNode, LeafExecutor};
use crate::event_log::EventLog;
use crate::recursion::RecursionEngine;
use crate::scorer::{score, RunOutcome, Score};
use crate::step::StepEngine;
use crate::telemetry::{StepTrace, TelemetryHandle};
use crate::workspace::Workspace;

/// Why a branch stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Termination {
    /// The planner emitted `done`.
    Done { reason: String },
    /// The iteration ceiling was reached first.
    Exhausted { iterations: u32 },
}

impl Termination {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Result of a top-level run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trajectory: Vec<Action>,
    pub score: Score,
    pub events: Vec<Event>,
    pub last_observation: Option<Observation>,
    pub termination: Termination,
}

impl RunReport {
    /// The run as seen by the evaluation scorers.
    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            success: self.score.success,
            steps: self.score.steps,
            events: self.events.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Result of a driven child branch.
#[derive(Debug, Clone)]
pub struct SubcallReport {
    /// `subcall:<task>:<type>[:<reason>]`.
    pub summary: String,
    pub last_observation: Option<Observation>,
    pub steps: usize,
    pub termination: Termination,
}

/// One branch being driven: its state, its log and what it has done.
struct Branch<'a> {
    state: AgentState,
    events: EventLog,
    last_observation: Option<Observation>,
    trajectory: Vec<Action>,
    /// Only the root branch is persisted.
    workspace: Option<&'a Workspace>,
}

/// A browsing agent wired to its collaborators.
pub struct Agent {
    step_engine: StepEngine,
    recursion: RecursionEngine,
    browser: Arc<dyn BrowserDriver>,
    delegator: Option<Arc<dyn Delegator>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    telemetry: Option<TelemetryHandle>,
    max_iterations: u32,
    max_depth: u32,
    compaction: CompactionConfig,
}

impl Agent {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        examiner: Arc<dyn SnippetExaminer>,
        browser: Arc<dyn BrowserDriver>,
        config: &Config,
    ) -> Self {
        Self {
            step_engine: StepEngine::new(oracle, examiner, config),
            recursion: RecursionEngine::new(config),
            browser,
            delegator: None,
            summarizer: None,
            telemetry: None,
            max_iterations: config.agent.max_iterations,
            max_depth: config.agent.max_depth,
            compaction: config.compaction.clone(),
        }
    }

    /// Hand `done` follow-up tasks to `delegator`.
    pub fn with_delegator(mut self, delegator: Arc<dyn Delegator>) -> Self {
        self.delegator = Some(delegator);
        self
    }

    /// Summarizer used for event log compaction.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryHandle) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn step_engine(&self) -> &StepEngine {
        &self.step_engine
    }

    /// Run `goal` to `done` or to the iteration ceiling.
    ///
    /// Resumes from any events already in `workspace` and persists the log
    /// after every mutation. Only planning failures are returned as errors.
    pub async fn run(&self, goal: &str, workspace: &Workspace) -> Result<RunReport, AgentError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        self.run_inner(run_id, goal, workspace).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        goal: &str,
        workspace: &Workspace,
    ) -> Result<RunReport, AgentError> {
        info!(goal, max_iterations = self.max_iterations, "Starting run");

        let prior = match workspace.load_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("Failed to load prior events, starting fresh: {}", e);
                Vec::new()
            }
        };
        if !prior.is_empty() {
            debug!("Resuming with {} prior events", prior.len());
        }

        let mut branch = Branch {
            state: AgentState::with_max_depth(goal, self.max_depth),
            events: EventLog::from_events(prior),
            last_observation: None,
            trajectory: Vec::new(),
            workspace: Some(workspace),
        };

        let observation = self.observe("about:blank").await;
        branch
            .events
            .record(EventKind::Observe, observation.url.clone());
        branch.last_observation = Some(observation);
        self.persist(&branch).await;

        let termination = self.drive(&mut branch, self.max_iterations).await?;
        let score = score(&branch.trajectory);
        info!(
            steps = score.steps,
            success = score.success,
            termination = ?termination,
            "Run finished"
        );

        Ok(RunReport {
            run_id,
            score,
            trajectory: branch.trajectory,
            events: branch.events.into_events(),
            last_observation: branch.last_observation,
            termination,
        })
    }

    /// Drive a child branch for `task` below `parent`.
    ///
    /// The child sees a compressed copy of `events`, starts from
    /// `observation` and runs until `done` or its step budget is used up.
    /// Fails with [`AgentError::DepthLimitReached`] at the recursion ceiling.
    pub fn subcall<'a>(
        &'a self,
        task: &'a str,
        parent: &'a AgentState,
        events: &'a EventLog,
        observation: Option<Observation>,
    ) -> BoxFuture<'a, Result<SubcallReport, AgentError>> {
        Box::pin(async move {
            let state = self.recursion.child_state(parent, task)?;
            debug!(task, depth = state.depth, "Entering subcall");

            let mut child = Branch {
                events: self.recursion.compress_for_child(&parent.goal, events),
                state,
                last_observation: observation,
                trajectory: Vec::new(),
                workspace: None,
            };
            let termination = self.drive(&mut child, self.recursion.step_budget()).await?;

            Ok(SubcallReport {
                summary: RecursionEngine::summarize(task, child.trajectory.last()),
                last_observation: child.last_observation,
                steps: child.trajectory.len(),
                termination,
            })
        })
    }

    /// Leaf executor that drives each decomposition leaf as a child branch
    /// of a fresh root for `goal`.
    pub fn leaf_executor(&self, goal: &str) -> SubcallExecutor<'_> {
        let parent = AgentState::with_max_depth(goal, self.max_depth);
        SubcallExecutor::new(self, parent, EventLog::new())
    }

    async fn drive(&self, branch: &mut Branch<'_>, budget: u32) -> Result<Termination, AgentError> {
        for _ in 0..budget {
            let step = branch.state.step_count;
            let started = Instant::now();
            let planned = self
                .step_engine
                .step(
                    &mut branch.state,
                    &mut branch.events,
                    branch.last_observation.as_ref(),
                )
                .await;
            self.trace(&branch.state, step, &planned, started);
            let action = planned?;
            self.persist(branch).await;

            branch.trajectory.push(action.clone());
            match action {
                Action::Act(request) => self.perform(branch, &request).await,
                Action::Subcall { task, .. } => self.run_subcall(branch, &task).await?,
                Action::Done {
                    reason, followups, ..
                } => {
                    branch.events.record(EventKind::Done, reason.clone());
                    self.persist(branch).await;
                    if branch.state.depth == 0 {
                        self.delegate_followups(branch, &followups).await;
                    }
                    return Ok(Termination::Done { reason });
                }
            }

            self.compact(branch).await;
        }

        debug!(depth = branch.state.depth, budget, "Iteration ceiling reached");
        Ok(Termination::Exhausted { iterations: budget })
    }

    async fn perform(&self, branch: &mut Branch<'_>, request: &ActRequest) {
        let last_url = current_url(branch);

        if request.command.is_observe() {
            let observation = self.observe(&last_url).await;
            branch
                .events
                .record(EventKind::Observe, observation.url.clone());
            branch.last_observation = Some(observation);
            self.persist(branch).await;
            return;
        }

        if let Err(e) = self.browser.act(request).await {
            warn!("Browser action '{}' failed: {}", request.command, e);
        }
        branch.events.record(
            EventKind::Act,
            format!(
                "{}:{}",
                request.command,
                request.target.as_deref().unwrap_or("")
            ),
        );
        self.persist(branch).await;

        let observation = self.observe(&last_url).await;
        branch
            .events
            .record(EventKind::ObserveAfter, observation.url.clone());
        branch.last_observation = Some(observation);
        self.persist(branch).await;
    }

    async fn run_subcall(&self, branch: &mut Branch<'_>, task: &str) -> Result<(), AgentError> {
        let result = self
            .subcall(
                task,
                &branch.state,
                &branch.events,
                branch.last_observation.clone(),
            )
            .await;

        match result {
            Ok(report) => {
                branch
                    .events
                    .record(EventKind::SubcallResult, report.summary);
                if report.last_observation.is_some() {
                    branch.last_observation = report.last_observation;
                }
            }
            Err(AgentError::DepthLimitReached { depth, max_depth }) => {
                warn!(task, depth, max_depth, "Subcall refused at depth ceiling");
                branch.events.record(
                    EventKind::SubcallRefused,
                    format!("{}:depth {}/{}", task, depth, max_depth),
                );
            }
            Err(e) => return Err(e),
        }
        self.persist(branch).await;
        Ok(())
    }

    async fn delegate_followups(&self, branch: &mut Branch<'_>, followups: &[FollowupTask]) {
        let Some(delegator) = &self.delegator else {
            if !followups.is_empty() {
                debug!("{} follow-up tasks dropped, no delegator", followups.len());
            }
            return;
        };

        for followup in followups {
            let status = match delegator.delegate(followup).await {
                Ok(receipt) => receipt.status,
                Err(e) => {
                    warn!("Delegating '{}' failed: {}", followup.task, e);
                    "failed".to_string()
                }
            };
            branch
                .events
                .record(EventKind::Delegated, format!("{}:{}", followup.task, status));
            self.persist(branch).await;
        }
    }

    async fn compact(&self, branch: &mut Branch<'_>) {
        if !self.compaction.enabled {
            return;
        }
        let Some(summarizer) = &self.summarizer else {
            return;
        };
        if branch
            .events
            .compact(
                summarizer.as_ref(),
                self.compaction.threshold,
                self.compaction.keep_recent,
            )
            .await
        {
            self.persist(branch).await;
        }
    }

    /// Observe the page, degrading to a metadata-only observation on failure.
    async fn observe(&self, fallback_url: &str) -> Observation {
        match self.browser.observe().await {
            Ok(observation) => observation,
            Err(e) => {
                warn!("Observation failed, continuing degraded: {}", e);
                Observation::degraded(fallback_url, e.to_string())
            }
        }
    }

    async fn persist(&self, branch: &Branch<'_>) {
        let Some(workspace) = branch.workspace else {
            return;
        };
        if let Err(e) = workspace.save_events(branch.events.events()).await {
            warn!("Failed to persist events: {}", e);
        }
    }

    fn trace(
        &self,
        state: &AgentState,
        step: u32,
        planned: &Result<Action, AgentError>,
        started: Instant,
    ) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };
        let (action, error) = match planned {
            Ok(action) => (Some(action.kind()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        telemetry.record(&StepTrace {
            depth: state.depth,
            step,
            action,
            error,
            duration: started.elapsed(),
        });
    }
}

fn current_url(branch: &Branch<'_>) -> String {
    branch
        .last_observation
        .as_ref()
        .map(|o| o.url.clone())
        .unwrap_or_else(|| "about:blank".to_string())
}

/// Runs decomposition leaves through [`Agent::subcall`].
///
/// Leaves share one parent log: each leaf's `subcall_result` line is
/// recorded before the next leaf starts, and the browser position carries
/// over from one leaf to the next.
pub struct SubcallExecutor<'a> {
    agent: &'a Agent,
    parent: AgentState,
    progress: Mutex<Progress>,
}

struct Progress {
    events: EventLog,
    observation: Option<Observation>,
}

impl<'a> SubcallExecutor<'a> {
    pub fn new(agent: &'a Agent, parent: AgentState, events: EventLog) -> Self {
        Self {
            agent,
            parent,
            progress: Mutex::new(Progress {
                events,
                observation: None,
            }),
        }
    }

    /// Start the first leaf from `observation`.
    pub fn with_observation(self, observation: Observation) -> Self {
        self.progress.lock().observation = Some(observation);
        self
    }

    /// Parent log including one `subcall_result` per finished leaf.
    pub fn events(&self) -> EventLog {
        self.progress.lock().events.clone()
    }

    pub fn last_observation(&self) -> Option<Observation> {
        self.progress.lock().observation.clone()
    }
}

#[async_trait]
impl LeafExecutor for SubcallExecutor<'_> {
    async fn execute(&self, node: &DecompositionNode) -> Result<String, AgentError> {
        let (events, observation) = {
            let progress = self.progress.lock();
            (progress.events.clone(), progress.observation.clone())
        };

        let report = self
            .agent
            .subcall(&node.task, &self.parent, &events, observation)
            .await?;
        debug!(task = %node.task, steps = report.steps, "Leaf finished");

        let mut progress = self.progress.lock();
        progress
            .events
            .record(EventKind::SubcallResult, report.summary.clone());
        if report.last_observation.is_some() {
            progress.observation = report.last_observation;
        }
        Ok(report.summary)
    }
}

#[cfg(test)]
#[path = "run_loop_tests.rs"]
mod tests;
