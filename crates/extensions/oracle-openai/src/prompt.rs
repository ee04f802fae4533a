//! Prompt text for each oracle call.

use rvla_protocols::oracle::PlanRequest;
use rvla_protocols::types::{ContextSnippet, Event, VisualSnippet};
use rvla_runtime::adaptive_context_window;

pub const PLANNER_SYSTEM: &str = "You are an expert web navigation agent. Analyze screenshots carefully and plan precise actions. Always respond with valid JSON.";

pub const TEXT_EXAMINER_SYSTEM: &str =
    "You are a context examiner. Analyze snippets programmatically. Always respond with valid JSON.";

pub const VISUAL_EXAMINER_SYSTEM: &str = "You are a visual context examiner. Analyze image snippets programmatically. Always respond with valid JSON.";

pub const ANALYSIS_SYSTEM: &str = "You are an expert at analyzing web pages. Provide detailed, actionable insights. Always respond with valid JSON.";

pub const DECOMPOSER_SYSTEM: &str = "You are an expert at task decomposition. Break complex tasks into manageable subtasks. Always respond with valid JSON.";

pub const SUMMARIZER_SYSTEM: &str = "You are a helpful summarizer. Create concise summaries.";

/// Returned without calling the model when there is nothing to summarize.
pub const EMPTY_SUMMARY: &str = "No events to summarize.";

/// Token allowance quoted in the summary prompt.
pub const SUMMARY_TOKENS: usize = 200;

/// Planning prompt: goal, windowed history, page state and the response schema.
pub fn plan_prompt(request: &PlanRequest) -> String {
    let history = if request.history.is_empty() {
        "No history yet.".to_string()
    } else {
        windowed_history(request).join("\n")
    };

    let (url, metadata) = match &request.observation {
        Some(observation) => (
            observation.url.as_str(),
            serde_json::to_string(&observation.metadata).unwrap_or_default(),
        ),
        None => ("unknown", "{}".to_string()),
    };

    format!(
        r#"Goal: {goal}

Recent history:
{history}

Current URL: {url}
Page metadata: {metadata}
Current depth: {depth}

Decide the next action. Respond with JSON:
{{
  "action_type": "act" | "subcall" | "done",
  "reasoning": "why this action moves toward the goal",
  "task": "subtask description (only for subcall)",
  "command": "observe" | "click" | "type" | "scroll" | "navigate",
  "target": "selector or URL (for act)",
  "text": "text to type (for type)"
}}"#,
        goal = request.goal,
        depth = request.depth,
    )
}

/// Trailing history lines that fit the adaptive window. An examined summary
/// at the head is always kept and not counted against the window.
fn windowed_history(request: &PlanRequest) -> Vec<&str> {
    let (summary, events) = match request.history.split_first() {
        Some((first, rest)) if request.summarized => (Some(first.as_str()), rest),
        _ => (None, request.history.as_slice()),
    };
    let window = adaptive_context_window(request.depth, events.len());
    let skip = events.len().saturating_sub(window);
    summary
        .into_iter()
        .chain(events[skip..].iter().map(String::as_str))
        .collect()
}

pub fn text_exam_prompt(snippet: &ContextSnippet, query: &str, goal: &str) -> String {
    format!(
        r#"Goal: {goal}
Query: {query}

Context Snippet (indices {start}-{end}):
{content}

Examine this snippet and respond with JSON:
{{
  "relevant": true | false,
  "summary": "what this snippet says about the query",
  "key_findings": ["..."],
  "suggested_actions": ["..."],
  "confidence": 0.0-1.0
}}"#,
        start = snippet.start,
        end = snippet.end,
        content = snippet.content,
    )
}

pub fn visual_exam_prompt(snippet: &VisualSnippet, query: &str, goal: &str) -> String {
    let region = match snippet.grid_position {
        Some((row, col)) => format!("Grid region: row {row}, column {col}\n"),
        None => String::new(),
    };
    format!(
        r#"Examine this visual snippet in the context of the goal: {goal}
Query: {query}
{region}
Respond with JSON:
{{
  "relevant": true | false,
  "description": "what is visible in this region",
  "elements": ["interactive or notable elements"],
  "suggested_actions": ["..."],
  "confidence": 0.0-1.0
}}"#
    )
}

pub fn analysis_prompt(goal: &str, url: &str) -> String {
    format!(
        r#"Goal: {goal}
Current URL: {url}

Analyze this screenshot of the page and respond with JSON:
{{
  "description": "what the page shows",
  "relevant_elements": ["elements that matter for the goal"],
  "suggested_actions": ["..."],
  "page_type": "search results, article, form, ..."
}}"#
    )
}

pub fn decomposition_prompt(task: &str, context_summary: &str, depth: u32, max_depth: u32) -> String {
    format!(
        r#"Current Task: {task}
Context Summary: {context_summary}
Current Depth: {depth}/{max_depth}

Decide whether this task should be broken into subtasks. Use 2-4 subtasks when decomposing.
Respond with JSON:
{{
  "should_decompose": true | false,
  "reasoning": "...",
  "subtasks": ["..."],
  "next_action": "first concrete step when not decomposing"
}}"#
    )
}

pub fn summary_prompt(events: &[Event]) -> String {
    let lines: Vec<String> = events.iter().map(ToString::to_string).collect();
    format!(
        "Summarize these events into a concise representation (max {SUMMARY_TOKENS} tokens):\n\n{}\n\n\
         Focus on:\n- Key actions taken\n- Important observations\n- Progress toward goals\n- Any failures or issues",
        lines.join("\n")
    )
}
