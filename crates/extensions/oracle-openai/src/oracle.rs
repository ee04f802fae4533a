//! OpenAI-compatible oracle implementation.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use rvla_config::OracleConfig;
use rvla_protocols::error::{ExaminerError, OracleError};
use rvla_protocols::examiner::{
    ObservationAnalysis, SnippetExaminer, TextExamination, VisualExamination,
};
use rvla_protocols::model::{Decomposition, Embedder, Summarizer, TaskDecomposer};
use rvla_protocols::oracle::{DecisionOracle, PlanDecision, PlanRequest};
use rvla_protocols::types::{ContextSnippet, Event, Screenshot, VisualSnippet};

use crate::api::{
    ApiMessage, ApiRequest, ApiResponse, EmbeddingRequest, EmbeddingResponse, MessageContent,
    ResponseFormat,
};
use crate::prompt;

const PLAN_MAX_TOKENS: u32 = 1000;
const EXAM_MAX_TOKENS: u32 = 500;
const DECOMPOSE_MAX_TOKENS: u32 = 800;
const ANALYSIS_TEMPERATURE: f32 = 0.1;
const AUXILIARY_TEMPERATURE: f32 = 0.3;

/// One chat completion call.
struct Chat<'a> {
    model: &'a str,
    system: &'a str,
    content: MessageContent,
    max_tokens: Option<u32>,
    temperature: f32,
    json: bool,
}

/// Planner, examiner, summarizer, decomposer and embedder backed by one
/// OpenAI-compatible endpoint.
pub struct OpenAIOracle {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    planning_model: String,
    examiner_model: String,
    vision_model: String,
    embedding_model: String,
    temperature: f32,
}

impl OpenAIOracle {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            planning_model: config.planning_model.clone(),
            examiner_model: config.examiner_model.clone(),
            vision_model: config.vision_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
        }
    }

    /// Point the oracle at another OpenAI-compatible API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_request<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, OracleError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status,
                message: text,
            });
        }

        Ok(response)
    }

    async fn complete(&self, chat: Chat<'_>) -> Result<String, OracleError> {
        let request = ApiRequest {
            model: chat.model.to_string(),
            messages: vec![ApiMessage::system(chat.system), ApiMessage::user(chat.content)],
            max_tokens: chat.max_tokens,
            temperature: Some(chat.temperature),
            response_format: chat.json.then(ResponseFormat::json_object),
        };
        debug!(model = chat.model, "Sending chat completion");

        let response: ApiResponse = self
            .send_request("/chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        match response.into_content() {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(OracleError::EmptyResponse),
        }
    }

    async fn complete_json<T: DeserializeOwned>(&self, chat: Chat<'_>) -> Result<T, OracleError> {
        let content = self.complete(chat).await?;
        parse_json(&content)
    }
}

fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, OracleError> {
    serde_json::from_str(content.trim()).map_err(|e| OracleError::Malformed(e.to_string()))
}

fn with_optional_image(text: String, screenshot: Option<&Screenshot>) -> MessageContent {
    match screenshot {
        Some(shot) => MessageContent::with_image(text, shot.data_url()),
        None => MessageContent::Text(text),
    }
}

#[async_trait]
impl DecisionOracle for OpenAIOracle {
    fn id(&self) -> &str {
        "openai"
    }

    async fn plan_next_action(&self, request: PlanRequest) -> Result<PlanDecision, OracleError> {
        let text = prompt::plan_prompt(&request);
        self.complete_json(Chat {
            model: &self.planning_model,
            system: prompt::PLANNER_SYSTEM,
            content: with_optional_image(text, request.screenshot.as_ref()),
            max_tokens: Some(PLAN_MAX_TOKENS),
            temperature: self.temperature,
            json: true,
        })
        .await
    }
}

#[async_trait]
impl SnippetExaminer for OpenAIOracle {
    fn id(&self) -> &str {
        "openai"
    }

    async fn examine_text(
        &self,
        snippet: &ContextSnippet,
        query: &str,
        goal: &str,
    ) -> Result<TextExamination, ExaminerError> {
        let mut exam: TextExamination = self
            .complete_json(Chat {
                model: &self.examiner_model,
                system: prompt::TEXT_EXAMINER_SYSTEM,
                content: MessageContent::Text(prompt::text_exam_prompt(snippet, query, goal)),
                max_tokens: Some(EXAM_MAX_TOKENS),
                temperature: self.temperature,
                json: true,
            })
            .await?;
        exam.confidence = exam.confidence.clamp(0.0, 1.0);
        Ok(exam)
    }

    async fn examine_image(
        &self,
        snippet: &VisualSnippet,
        query: &str,
        goal: &str,
    ) -> Result<VisualExamination, ExaminerError> {
        let text = prompt::visual_exam_prompt(snippet, query, goal);
        let mut exam: VisualExamination = self
            .complete_json(Chat {
                model: &self.vision_model,
                system: prompt::VISUAL_EXAMINER_SYSTEM,
                content: MessageContent::with_image(text, snippet.image.data_url()),
                max_tokens: Some(EXAM_MAX_TOKENS),
                temperature: self.temperature,
                json: true,
            })
            .await?;
        exam.confidence = exam.confidence.clamp(0.0, 1.0);
        Ok(exam)
    }

    async fn analyze_observation(
        &self,
        goal: &str,
        screenshot: &Screenshot,
        url: &str,
    ) -> Result<ObservationAnalysis, ExaminerError> {
        let text = prompt::analysis_prompt(goal, url);
        Ok(self
            .complete_json(Chat {
                model: &self.vision_model,
                system: prompt::ANALYSIS_SYSTEM,
                content: MessageContent::with_image(text, screenshot.data_url()),
                max_tokens: Some(EXAM_MAX_TOKENS),
                temperature: ANALYSIS_TEMPERATURE,
                json: true,
            })
            .await?)
    }
}

#[async_trait]
impl Summarizer for OpenAIOracle {
    async fn summarize(&self, events: &[Event]) -> Result<String, OracleError> {
        if events.is_empty() {
            return Ok(prompt::EMPTY_SUMMARY.to_string());
        }
        let summary = self
            .complete(Chat {
                model: &self.examiner_model,
                system: prompt::SUMMARIZER_SYSTEM,
                content: MessageContent::Text(prompt::summary_prompt(events)),
                max_tokens: None,
                temperature: AUXILIARY_TEMPERATURE,
                json: false,
            })
            .await?;
        Ok(summary.trim().to_string())
    }
}

#[async_trait]
impl TaskDecomposer for OpenAIOracle {
    async fn decompose_task(
        &self,
        task: &str,
        context_summary: &str,
        depth: u32,
        max_depth: u32,
    ) -> Result<Decomposition, OracleError> {
        self.complete_json(Chat {
            model: &self.planning_model,
            system: prompt::DECOMPOSER_SYSTEM,
            content: MessageContent::Text(prompt::decomposition_prompt(
                task,
                context_summary,
                depth,
                max_depth,
            )),
            max_tokens: Some(DECOMPOSE_MAX_TOKENS),
            temperature: AUXILIARY_TEMPERATURE,
            json: true,
        })
        .await
    }
}

#[async_trait]
impl Embedder for OpenAIOracle {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };
        let response: EmbeddingResponse = self
            .send_request("/embeddings", &request)
            .await?
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(OracleError::EmptyResponse)
    }
}

#[cfg(test)]
#[path = "oracle_tests.rs"]
mod tests;
