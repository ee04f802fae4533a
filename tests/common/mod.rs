//! Collaborators shared by the end-to-end suites.

#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use rvla::{
    ActRequest, BrowserCommand, BrowserDriver, BrowserError, ContextSnippet, ExaminerError,
    Observation, ObservationAnalysis, OracleError, PlanDecision, PlanRequest, Screenshot,
    SnippetExaminer, TextExamination, VisualExamination, VisualSnippet,
};

/// Oracle replaying decisions in order, then finishing.
pub struct ReplayOracle {
    script: Mutex<VecDeque<PlanDecision>>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl ReplayOracle {
    pub fn new(decisions: Vec<PlanDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn depths(&self) -> Vec<u32> {
        self.requests.lock().iter().map(|r| r.depth).collect()
    }

    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl rvla::DecisionOracle for ReplayOracle {
    fn id(&self) -> &str {
        "replay"
    }

    async fn plan_next_action(&self, request: PlanRequest) -> Result<PlanDecision, OracleError> {
        self.requests.lock().push(request);
        Ok(self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| PlanDecision::done("script finished")))
    }
}

/// Examiner that never finds anything relevant.
pub struct BlankExaminer;

#[async_trait]
impl SnippetExaminer for BlankExaminer {
    fn id(&self) -> &str {
        "blank"
    }

    async fn examine_text(
        &self,
        snippet: &ContextSnippet,
        _query: &str,
        _goal: &str,
    ) -> Result<TextExamination, ExaminerError> {
        Ok(TextExamination::new(false, format!("chunk {}", snippet.chunk_id), 0.1))
    }

    async fn examine_image(
        &self,
        _snippet: &VisualSnippet,
        _query: &str,
        _goal: &str,
    ) -> Result<VisualExamination, ExaminerError> {
        Ok(VisualExamination::new(false, "nothing", 0.0))
    }

    async fn analyze_observation(
        &self,
        _goal: &str,
        _screenshot: &Screenshot,
        url: &str,
    ) -> Result<ObservationAnalysis, ExaminerError> {
        Ok(ObservationAnalysis {
            description: format!("page at {url}"),
            ..Default::default()
        })
    }
}

/// Browser whose location follows `navigate` commands.
pub struct PageBrowser {
    url: Mutex<String>,
    acts: Mutex<Vec<ActRequest>>,
    offline: bool,
}

impl PageBrowser {
    pub fn at(url: &str) -> Self {
        Self {
            url: Mutex::new(url.to_string()),
            acts: Mutex::new(Vec::new()),
            offline: false,
        }
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::at("about:blank")
        }
    }

    pub fn acts(&self) -> Vec<ActRequest> {
        self.acts.lock().clone()
    }
}

#[async_trait]
impl BrowserDriver for PageBrowser {
    fn id(&self) -> &str {
        "page"
    }

    async fn observe(&self) -> Result<Observation, BrowserError> {
        if self.offline {
            return Err(BrowserError::Unavailable("no browser attached".to_string()));
        }
        Ok(Observation::new(self.url.lock().clone()))
    }

    async fn act(&self, request: &ActRequest) -> Result<(), BrowserError> {
        self.acts.lock().push(request.clone());
        if self.offline {
            return Err(BrowserError::Unavailable("no browser attached".to_string()));
        }
        if request.command == BrowserCommand::Navigate {
            if let Some(target) = &request.target {
                *self.url.lock() = target.clone();
            }
        }
        Ok(())
    }
}
