//! Recursion Engine: context hand-off across a subcall boundary.
//!
//! The engine decides what a child branch gets to see and how its result is
//! reported back. Driving the child itself is done by the run loop so the
//! child runs through the same act/subcall/done state machine as its parent.

use rvla_config::Config;
use rvla_protocols::error::AgentError;
use rvla_protocols::types::{truncate_chars, Action, AgentState, Event};

use crate::event_log::EventLog;

const REASON_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct RecursionEngine {
    compression_threshold: usize,
    keep_recent: usize,
    step_budget: u32,
}

impl RecursionEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            compression_threshold: config.recursion.compression_threshold,
            keep_recent: config.recursion.keep_recent,
            step_budget: config.agent.subcall_step_budget,
        }
    }

    pub fn with_step_budget(mut self, step_budget: u32) -> Self {
        self.step_budget = step_budget;
        self
    }

    /// Maximum steps a child branch may take.
    pub fn step_budget(&self) -> u32 {
        self.step_budget
    }

    /// Fresh state for a child branch, refused at the depth ceiling.
    pub fn child_state(&self, parent: &AgentState, task: &str) -> Result<AgentState, AgentError> {
        parent.child(task)
    }

    /// Copy of the parent's events for a child branch.
    ///
    /// Above the compression threshold the child only sees the last
    /// `keep_recent` events behind a `[compressed_context]` marker.
    pub fn compress_for_child(&self, parent_goal: &str, events: &EventLog) -> EventLog {
        if events.len() <= self.compression_threshold {
            return events.clone();
        }

        let recent = events.tail(self.keep_recent);
        let mut compressed = Vec::with_capacity(recent.len() + 1);
        compressed.push(Event::compressed_context(parent_goal));
        compressed.extend(recent.iter().cloned());
        EventLog::from_events(compressed)
    }

    /// `subcall:<task>:<type>[:<reason>]` line reported to the parent.
    ///
    /// The reason is only present for `done` and cut to 50 characters. A child
    /// that never planned reports the type `none`.
    pub fn summarize(task: &str, last_action: Option<&Action>) -> String {
        match last_action {
            Some(Action::Done { reason, .. }) => format!(
                "subcall:{}:done:{}",
                task,
                truncate_chars(reason, REASON_CHARS)
            ),
            Some(action) => format!("subcall:{}:{}", task, action.kind()),
            None => format!("subcall:{}:none", task),
        }
    }
}

impl Default for RecursionEngine {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
