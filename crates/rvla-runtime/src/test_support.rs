//! Hand-written collaborators shared by the runtime test suites.

use std::collections::VecDeque;
use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;

use rvla_protocols::browser::BrowserDriver;
use rvla_protocols::error::{BrowserError, ExaminerError, OracleError};
use rvla_protocols::examiner::{
    ObservationAnalysis, SnippetExaminer, TextExamination, VisualExamination,
};
use rvla_protocols::oracle::{DecisionOracle, PlanDecision, PlanRequest};
use rvla_protocols::types::{ActRequest, ContextSnippet, Observation, Screenshot, VisualSnippet};

/// Oracle replaying a fixed script, then repeating a fallback decision.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<PlanDecision, OracleError>>>,
    fallback: PlanDecision,
    requests: Mutex<Vec<PlanRequest>>,
}

impl ScriptedOracle {
    pub fn new(decisions: Vec<PlanDecision>) -> Self {
        Self {
            script: Mutex::new(decisions.into_iter().map(Ok).collect()),
            fallback: PlanDecision::act("observe").with_reasoning("keep looking"),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: PlanDecision) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn then_fail(self, error: OracleError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn plan_next_action(&self, request: PlanRequest) -> Result<PlanDecision, OracleError> {
        self.requests.lock().push(request);
        match self.script.lock().pop_front() {
            Some(next) => next,
            None => Ok(self.fallback.clone()),
        }
    }
}

type ImageRule = Box<dyn Fn(&VisualSnippet) -> VisualExamination + Send + Sync>;

/// Examiner that finds text snippets containing a keyword relevant.
pub struct KeywordExaminer {
    keyword: String,
    fail_text: bool,
    fail_chunk: Option<usize>,
    image_rule: Option<ImageRule>,
    text_calls: Mutex<Vec<ContextSnippet>>,
    image_calls: Mutex<Vec<VisualSnippet>>,
    analyses: Mutex<Vec<String>>,
}

impl KeywordExaminer {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            fail_text: false,
            fail_chunk: None,
            image_rule: None,
            text_calls: Mutex::new(Vec::new()),
            image_calls: Mutex::new(Vec::new()),
            analyses: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_text: true,
            ..Self::new("")
        }
    }

    pub fn failing_on_chunk(mut self, chunk_id: usize) -> Self {
        self.fail_chunk = Some(chunk_id);
        self
    }

    pub fn with_image_rule(
        mut self,
        rule: impl Fn(&VisualSnippet) -> VisualExamination + Send + Sync + 'static,
    ) -> Self {
        self.image_rule = Some(Box::new(rule));
        self
    }

    pub fn text_calls(&self) -> Vec<ContextSnippet> {
        self.text_calls.lock().clone()
    }

    pub fn image_calls(&self) -> Vec<VisualSnippet> {
        self.image_calls.lock().clone()
    }

    pub fn analyses(&self) -> Vec<String> {
        self.analyses.lock().clone()
    }
}

#[async_trait]
impl SnippetExaminer for KeywordExaminer {
    fn id(&self) -> &str {
        "keyword"
    }

    async fn examine_text(
        &self,
        snippet: &ContextSnippet,
        _query: &str,
        _goal: &str,
    ) -> Result<TextExamination, ExaminerError> {
        self.text_calls.lock().push(snippet.clone());
        if self.fail_text || self.fail_chunk == Some(snippet.chunk_id) {
            return Err(ExaminerError::Backend("examiner offline".to_string()));
        }

        let relevant = !self.keyword.is_empty() && snippet.content.contains(&self.keyword);
        let confidence = if relevant { 0.9 } else { 0.1 };
        Ok(TextExamination::new(
            relevant,
            format!("window {} mentions {}", snippet.chunk_id, relevant),
            confidence,
        ))
    }

    async fn examine_image(
        &self,
        snippet: &VisualSnippet,
        _query: &str,
        _goal: &str,
    ) -> Result<VisualExamination, ExaminerError> {
        self.image_calls.lock().push(snippet.clone());
        match &self.image_rule {
            Some(rule) => Ok(rule(snippet)),
            None => Ok(VisualExamination::new(false, "nothing here", 0.5)),
        }
    }

    async fn analyze_observation(
        &self,
        _goal: &str,
        _screenshot: &Screenshot,
        url: &str,
    ) -> Result<ObservationAnalysis, ExaminerError> {
        self.analyses.lock().push(url.to_string());
        Ok(ObservationAnalysis {
            description: format!("page at {}", url),
            ..Default::default()
        })
    }
}

/// Browser walking through a list of URLs, one per observation.
pub struct MockBrowser {
    urls: Mutex<VecDeque<String>>,
    current: Mutex<String>,
    screenshot: Option<Screenshot>,
    fail_observe: bool,
    fail_act: bool,
    acts: Mutex<Vec<ActRequest>>,
    observations: Mutex<usize>,
}

impl MockBrowser {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            urls: Mutex::new(VecDeque::new()),
            current: Mutex::new(start_url.into()),
            screenshot: None,
            fail_observe: false,
            fail_act: false,
            acts: Mutex::new(Vec::new()),
            observations: Mutex::new(0),
        }
    }

    pub fn then_visit(self, url: impl Into<String>) -> Self {
        self.urls.lock().push_back(url.into());
        self
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn unreachable() -> Self {
        Self {
            fail_observe: true,
            fail_act: true,
            ..Self::new("about:blank")
        }
    }

    pub fn acts(&self) -> Vec<ActRequest> {
        self.acts.lock().clone()
    }

    pub fn observations(&self) -> usize {
        *self.observations.lock()
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    fn id(&self) -> &str {
        "mock"
    }

    async fn observe(&self) -> Result<Observation, BrowserError> {
        *self.observations.lock() += 1;
        if self.fail_observe {
            return Err(BrowserError::ObserveFailed("no page".to_string()));
        }
        let url = self.current.lock().clone();
        let mut observation = Observation::new(url);
        if let Some(screenshot) = &self.screenshot {
            observation = observation.with_screenshot(screenshot.clone());
        }
        Ok(observation)
    }

    async fn act(&self, request: &ActRequest) -> Result<(), BrowserError> {
        self.acts.lock().push(request.clone());
        if self.fail_act {
            return Err(BrowserError::ActionFailed {
                command: request.command.to_string(),
                message: "detached".to_string(),
            });
        }
        if let Some(next) = self.urls.lock().pop_front() {
            *self.current.lock() = next;
        }
        Ok(())
    }
}

/// Solid-color PNG of the given size.
pub fn png_screenshot(width: u32, height: u32) -> Screenshot {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .unwrap();
    Screenshot::from_png_bytes(&bytes.into_inner())
}

/// A screenshot whose encoded payload exceeds `len`, built from noise so it
/// does not compress away.
pub fn large_png_screenshot(min_encoded_len: usize) -> Screenshot {
    let mut side = 64;
    loop {
        let image = RgbaImage::from_fn(side, side, |x, y| {
            let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77);
            h ^= h >> 15;
            h = h.wrapping_mul(0x2C1B_3C6D);
            h ^= h >> 12;
            Rgba([h as u8, (h >> 8) as u8, (h >> 16) as u8, 255])
        });
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        let screenshot = Screenshot::from_png_bytes(&bytes.into_inner());
        if screenshot.encoded_len() > min_encoded_len {
            return screenshot;
        }
        side *= 2;
    }
}
