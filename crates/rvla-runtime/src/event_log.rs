//! Ordered event memory of one branch.
//!
//! Events are only ever appended. The one permitted rewrite is
//! [`EventLog::compact`], which replaces a contiguous prefix with a single
//! summary event.

use tracing::{debug, warn};

use rvla_protocols::model::{Embedder, Summarizer};
use rvla_protocols::types::{Event, EventKind};

/// Append-only sequence of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Append an event built from `kind` and `content`.
    pub fn record(&mut self, kind: EventKind, content: impl Into<String>) {
        self.push(Event::new(kind, content));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// The last `n` events, oldest first.
    pub fn tail(&self, n: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Rendered `type:content` lines.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }

    /// Newline-joined rendering, the text the Context Examiner works on.
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Case-insensitive substring search over rendered events.
    pub fn search(&self, query: &str) -> Vec<&Event> {
        let needle = query.to_lowercase();
        self.events
            .iter()
            .filter(|e| e.to_string().to_lowercase().contains(&needle))
            .collect()
    }

    /// Replace everything but the last `keep_recent` events with one summary.
    ///
    /// Only runs when the log holds more than `threshold` events. Returns
    /// whether the log changed; a failing summarizer leaves it untouched.
    pub async fn compact(
        &mut self,
        summarizer: &dyn Summarizer,
        threshold: usize,
        keep_recent: usize,
    ) -> bool {
        if self.events.len() <= threshold {
            return false;
        }

        let split_point = self.events.len().saturating_sub(keep_recent);
        if split_point == 0 {
            return false;
        }

        let summary = match summarizer.summarize(&self.events[..split_point]).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Event log compaction skipped: {}", e);
                return false;
            }
        };

        let recent = self.events.split_off(split_point);
        let compacted = self.events.len();
        self.events = Vec::with_capacity(recent.len() + 1);
        self.events.push(
            Event::new(EventKind::Summary, summary)
                .with_metadata("compacted_events", serde_json::Value::from(compacted)),
        );
        self.events.extend(recent);

        debug!(
            "Compacted {} events into summary + {} recent events",
            compacted,
            self.events.len() - 1
        );
        true
    }

    /// Rank events against a query embedding.
    ///
    /// Events carrying an embedding are scored by cosine similarity; the rest
    /// fall back to their importance. Ties keep log order.
    pub fn retrieve_relevant(&self, query_embedding: &[f32], top_k: usize) -> Vec<&Event> {
        let mut scored: Vec<(f32, &Event)> = self
            .events
            .iter()
            .map(|event| {
                let score = match &event.embedding {
                    Some(embedding) => cosine_similarity(query_embedding, embedding),
                    None => event.importance_or_default(),
                };
                (score, event)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(top_k).map(|(_, e)| e).collect()
    }

    /// Embed events whose importance exceeds `min_importance`.
    ///
    /// Returns how many events gained an embedding. Embedding failures are
    /// logged and skipped.
    pub async fn embed_important(&mut self, embedder: &dyn Embedder, min_importance: f32) -> usize {
        let mut embedded = 0;
        for event in &mut self.events {
            if event.embedding.is_some() || event.importance_or_default() <= min_importance {
                continue;
            }
            match embedder.embed(&event.content).await {
                Ok(vector) => {
                    event.embedding = Some(vector);
                    embedded += 1;
                }
                Err(e) => warn!("Failed to embed {} event: {}", event.kind, e),
            }
        }
        embedded
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self::from_events(events)
    }
}

/// Cosine similarity of two vectors; zero for mismatched or zero-length input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
