use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ExperienceLevel, ResumeAnalysis, TOP_COMPANIES};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Authentication rejected (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Model '{model}' unavailable (status {status}): {message}")]
    EngineUnavailable {
        model: String,
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Analysis service request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Analysis failed: Empty response from AI engine. Check your API key and network.")]
    EmptyResponse,

    #[error("Analysis failed: Could not parse response. {0}")]
    MalformedResponse(String),
}

/// The user-facing buckets an analysis failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Authentication,
    EngineUnavailable,
    Network,
    Other,
}

impl AnalysisError {
    pub fn category(&self) -> FailureCategory {
        match self {
            AnalysisError::Authentication { .. } => FailureCategory::Authentication,
            AnalysisError::EngineUnavailable { .. } => FailureCategory::EngineUnavailable,
            AnalysisError::Network(_) => FailureCategory::Network,
            _ => FailureCategory::Other,
        }
    }
}

// --- Provider trait ---

pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub schema: &'a Value,
}

pub trait CompletionProvider {
    /// Returns the reply text, or `None` when the service sent no content.
    fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, AnalysisError>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    let (model_id, short_name) = match name {
        "flash" | "gemini-3-flash" | "gemini-3-flash-preview" => ("gemini-3-flash-preview", "flash"),
        "pro" | "gemini-3-pro" | "gemini-3-pro-preview" => ("gemini-3-pro-preview", "pro"),
        "2.5-flash" | "gemini-2.5-flash" => ("gemini-2.5-flash", "2.5-flash"),
        "2.5-pro" | "gemini-2.5-pro" => ("gemini-2.5-pro", "2.5-pro"),
        _ => {
            return Err(anyhow!(
                "Unknown model '{}'. Available: flash (default), pro, 2.5-flash, 2.5-pro",
                name
            ));
        }
    };
    Ok(ModelSpec {
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    })
}

// --- Gemini provider ---

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    model_id: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: &ModelSpec, endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            model_id: model.model_id.clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let model = resolve_model(&config.model)?;
        let api_key = config.require_api_key()?.to_string();
        Self::new(api_key, &model, &config.endpoint, config.timeout)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model_id)
    }

    fn classify_failure(&self, status: u16, body: String) -> AnalysisError {
        let message = serde_json::from_str::<GeminiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        match status {
            401 | 403 => AnalysisError::Authentication { status, message },
            400 if message.to_lowercase().contains("api key") => {
                AnalysisError::Authentication { status, message }
            }
            404 => AnalysisError::EngineUnavailable {
                model: self.model_id.clone(),
                status,
                message,
            },
            _ => AnalysisError::Api { status, message },
        }
    }
}

impl CompletionProvider for GeminiProvider {
    fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, AnalysisError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: request.prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.schema,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(self.classify_failure(status.as_u16(), error_text));
        }

        let api_response: GeminiResponse = response.json().map_err(|e| {
            AnalysisError::MalformedResponse(format!("Unreadable response body: {}", e))
        })?;
        Ok(api_response.text())
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Prompt and schema ---

pub fn build_prompt(resume_text: &str, target_role: &str, level: ExperienceLevel) -> String {
    format!(
        "Act as an Enterprise-Level ATS Evaluation Engine for top tech companies ({companies}).\n\
        Analyze the following resume for the role of {target_role} at the {level} level.\n\n\
        RESUME CONTENT:\n{resume_text}\n\n\
        INSTRUCTIONS:\n\
        1. Perform deep semantic analysis, not just keyword matching.\n\
        2. Calculate a realistic ATS score (0-100) based on industry standards.\n\
        3. Predict matches for these companies: {companies}.\n\
        4. Provide specific, actionable bullet point upgrades.\n\
        5. Identify readiness level (Beginner, Industry Ready, FAANG Ready).\n\
        6. IMPORTANT: Return ONLY valid JSON matching the specified schema. \
        Do not include markdown formatting, backticks, or \"json\" labels.",
        companies = TOP_COMPANIES.join(", "),
        level = level.label(),
    )
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

/// Output schema the service must conform to; every field is required.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "atsScore": { "type": "NUMBER" },
            "readinessLevel": { "type": "STRING" },
            "shortlistProbability": { "type": "STRING" },
            "breakdown": {
                "type": "OBJECT",
                "properties": {
                    "keywordMatch": { "type": "NUMBER" },
                    "skillsRelevance": { "type": "NUMBER" },
                    "experienceAlignment": { "type": "NUMBER" },
                    "projectImpact": { "type": "NUMBER" },
                    "structureFormatting": { "type": "NUMBER" },
                    "grammarTone": { "type": "NUMBER" }
                },
                "required": [
                    "keywordMatch", "skillsRelevance", "experienceAlignment",
                    "projectImpact", "structureFormatting", "grammarTone"
                ]
            },
            "companyMatches": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "matchPercentage": { "type": "NUMBER" },
                        "status": { "type": "STRING" },
                        "reason": { "type": "STRING" }
                    },
                    "required": ["name", "matchPercentage", "status", "reason"]
                }
            },
            "strengths": string_array(),
            "weaknesses": string_array(),
            "summarySuggestion": {
                "type": "OBJECT",
                "properties": {
                    "current": { "type": "STRING" },
                    "optimized": { "type": "STRING" }
                },
                "required": ["current", "optimized"]
            },
            "skillOptimization": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": { "type": "STRING" },
                        "skills": string_array()
                    },
                    "required": ["category", "skills"]
                }
            },
            "experienceUpgrades": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "original": { "type": "STRING" },
                        "upgraded": { "type": "STRING" },
                        "impactDescription": { "type": "STRING" }
                    },
                    "required": ["original", "upgraded", "impactDescription"]
                }
            },
            "futureSkills": string_array(),
            "rejectionRisks": string_array()
        },
        "required": [
            "atsScore", "readinessLevel", "shortlistProbability", "breakdown",
            "companyMatches", "strengths", "weaknesses", "summarySuggestion",
            "skillOptimization", "experienceUpgrades", "futureSkills", "rejectionRisks"
        ]
    })
}

// --- Response recovery ---

/// Strips a leading ```` ``` ```` / ```` ```json ```` fence and a trailing ```` ``` ```` fence.
fn strip_json_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Slice from the first `{` to the last `}`, if both exist in order.
fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

pub fn recover_analysis(raw: Option<&str>) -> Result<ResumeAnalysis, AnalysisError> {
    let raw = match raw {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(AnalysisError::EmptyResponse),
    };

    let first_err = match serde_json::from_str::<ResumeAnalysis>(strip_json_fences(raw)) {
        Ok(analysis) => return Ok(analysis),
        Err(e) => e,
    };

    let Some(slice) = brace_slice(raw) else {
        return Err(AnalysisError::MalformedResponse(first_err.to_string()));
    };

    warn!("Reply was not clean JSON ({}), retrying with brace slice", first_err);
    serde_json::from_str::<ResumeAnalysis>(slice)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
}

// --- Standalone AI functions ---

pub fn analyze_resume(
    provider: &dyn CompletionProvider,
    resume_text: &str,
    target_role: &str,
    level: ExperienceLevel,
) -> Result<ResumeAnalysis, AnalysisError> {
    let prompt = build_prompt(resume_text, target_role, level);
    let schema = response_schema();

    info!(
        "Requesting analysis from {} (role: {}, level: {}, {} resume chars)",
        provider.model_name(),
        target_role,
        level.label(),
        resume_text.len()
    );

    let reply = provider.complete(&CompletionRequest {
        prompt: &prompt,
        schema: &schema,
    })?;

    debug!("Reply length: {}", reply.as_deref().map_or(0, str::len));
    recover_analysis(reply.as_deref())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{sample_analysis, SAMPLE_ANALYSIS_JSON};
    use std::cell::RefCell;

    /// Provider that replays a scripted reply and records every prompt it saw.
    pub(crate) struct ScriptedProvider {
        reply: RefCell<Option<Result<Option<String>, AnalysisError>>>,
        pub prompts: RefCell<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn replying(reply: Result<Option<String>, AnalysisError>) -> Self {
            Self {
                reply: RefCell::new(Some(reply)),
                prompts: RefCell::new(Vec::new()),
            }
        }

        pub fn with_text(text: &str) -> Self {
            Self::replying(Ok(Some(text.to_string())))
        }

        pub fn calls(&self) -> usize {
            self.prompts.borrow().len()
        }
    }

    impl CompletionProvider for ScriptedProvider {
        fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, AnalysisError> {
            self.prompts.borrow_mut().push(request.prompt.to_string());
            self.reply
                .borrow_mut()
                .take()
                .unwrap_or(Err(AnalysisError::Network("no scripted reply left".to_string())))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn provider_for_test() -> GeminiProvider {
        let model = resolve_model("flash").unwrap();
        GeminiProvider::new(
            "test-key".to_string(),
            &model,
            "https://example.invalid/v1beta/",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_model() {
        let spec = resolve_model("flash").unwrap();
        assert_eq!(spec.model_id, "gemini-3-flash-preview");
        let spec = resolve_model("gemini-2.5-pro").unwrap();
        assert_eq!(spec.short_name, "2.5-pro");
        let err = resolve_model("gpt-4o").unwrap_err().to_string();
        assert!(err.contains("Available"));
    }

    #[test]
    fn test_gemini_url_and_config() {
        let provider = provider_for_test();
        assert_eq!(
            provider.url(),
            "https://example.invalid/v1beta/models/gemini-3-flash-preview:generateContent"
        );
        assert_eq!(provider.model_name(), "gemini-3-flash-preview");

        let missing_key = GeminiProvider::from_config(&Config::default());
        assert!(missing_key.unwrap_err().to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_classify_failure() {
        let provider = provider_for_test();
        let forbidden = provider.classify_failure(
            403,
            r#"{"error":{"code":403,"message":"Permission denied"}}"#.to_string(),
        );
        assert_eq!(forbidden.category(), FailureCategory::Authentication);
        assert!(forbidden.to_string().contains("Permission denied"));

        let bad_key = provider.classify_failure(
            400,
            r#"{"error":{"message":"API key not valid. Please pass a valid API key."}}"#.to_string(),
        );
        assert_eq!(bad_key.category(), FailureCategory::Authentication);

        let missing = provider.classify_failure(404, "not found".to_string());
        assert_eq!(missing.category(), FailureCategory::EngineUnavailable);

        let other = provider.classify_failure(500, "boom".to_string());
        assert!(matches!(other, AnalysisError::Api { status: 500, .. }));
        assert_eq!(other.category(), FailureCategory::Other);
    }

    /// Serves one canned HTTP response on a local port and hands back the raw request head.
    fn serve_once(status: &str, body: &str) -> (String, std::sync::mpsc::Receiver<String>) {
        use std::io::{BufRead, BufReader, Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                head.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
            let _ = tx.send(head);
        });
        (endpoint, rx)
    }

    fn provider_at(endpoint: &str) -> GeminiProvider {
        let model = resolve_model("flash").unwrap();
        GeminiProvider::new("test-key".to_string(), &model, endpoint, Duration::from_secs(5)).unwrap()
    }

    fn send(provider: &GeminiProvider) -> Result<Option<String>, AnalysisError> {
        let schema = response_schema();
        provider.complete(&CompletionRequest {
            prompt: "score this",
            schema: &schema,
        })
    }

    #[test]
    fn test_gemini_success_returns_candidate_text() {
        let (endpoint, requests) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"atsScore\":"},{"text":"78}"}]}}]}"#,
        );
        let reply = send(&provider_at(&endpoint)).unwrap();
        assert_eq!(reply.as_deref(), Some("{\"atsScore\":78}"));

        let head = requests.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(head.starts_with("POST /v1beta/models/gemini-3-flash-preview:generateContent"));
        assert!(head.to_lowercase().contains("x-goog-api-key: test-key"));
    }

    #[test]
    fn test_gemini_forbidden_is_authentication() {
        let (endpoint, _requests) = serve_once(
            "403 Forbidden",
            r#"{"error":{"code":403,"message":"Method doesn't allow unregistered callers"}}"#,
        );
        let err = send(&provider_at(&endpoint)).unwrap_err();
        assert_eq!(err.category(), FailureCategory::Authentication);
        assert!(err.to_string().contains("unregistered callers"));
    }

    #[test]
    fn test_gemini_unknown_model_is_engine_unavailable() {
        let (endpoint, _requests) = serve_once(
            "404 Not Found",
            r#"{"error":{"code":404,"message":"models/gemini-3-flash-preview is not found"}}"#,
        );
        let err = send(&provider_at(&endpoint)).unwrap_err();
        assert_eq!(err.category(), FailureCategory::EngineUnavailable);
    }

    #[test]
    fn test_gemini_undecodable_success_body_is_malformed() {
        let (endpoint, _requests) = serve_once("200 OK", "<html>gateway</html>");
        let err = send(&provider_at(&endpoint)).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
        assert_eq!(err.category(), FailureCategory::Other);
    }

    #[test]
    fn test_gemini_unreachable_is_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());
        drop(listener);

        let err = send(&provider_at(&endpoint)).unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));
        assert_eq!(err.category(), FailureCategory::Network);
    }

    #[test]
    fn test_gemini_request_body_shape() {
        let schema = response_schema();
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &schema,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_gemini_response_text() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}],"role":"model"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));

        let blocked: GeminiResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(blocked.text(), None);

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_prompt_embeds_inputs() {
        let prompt = build_prompt(
            "5 years Go and Kubernetes experience...",
            "Backend Developer",
            ExperienceLevel::Senior,
        );
        assert!(prompt.contains("5 years Go and Kubernetes experience..."));
        assert!(prompt.contains("role of Backend Developer at the Senior (6+ years) level"));
        assert!(prompt.contains("Netflix"));
        assert!(prompt.contains("Return ONLY valid JSON"));
    }

    #[test]
    fn test_schema_requires_every_field() {
        let schema = response_schema();
        let required = schema["required"].as_array().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(required.len(), 12);
        assert_eq!(properties.len(), 12);
        for key in properties.keys() {
            assert!(required.iter().any(|r| r == key.as_str()), "{key} not required");
        }
        assert_eq!(schema["properties"]["breakdown"]["required"].as_array().unwrap().len(), 6);
        assert_eq!(
            schema["properties"]["experienceUpgrades"]["items"]["required"],
            json!(["original", "upgraded", "impactDescription"])
        );
    }

    #[test]
    fn test_strip_json_fences() {
        assert_eq!(strip_json_fences("```json\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("```\n{\"k\": 1}\n```  "), "{\"k\": 1}");
        assert_eq!(strip_json_fences("  {\"k\": 1}\n"), "{\"k\": 1}");
    }

    #[test]
    fn test_fenced_reply_matches_unwrapped() {
        let fenced = format!("```json\n{}\n```", SAMPLE_ANALYSIS_JSON);
        assert_eq!(recover_analysis(Some(&fenced)).unwrap(), sample_analysis());
        assert_eq!(recover_analysis(Some(SAMPLE_ANALYSIS_JSON)).unwrap(), sample_analysis());
    }

    #[test]
    fn test_prose_wrapped_reply_recovered_by_brace_slice() {
        let wrapped = format!(
            "Here is the evaluation you asked for:\n{}\nLet me know if you need more.",
            SAMPLE_ANALYSIS_JSON
        );
        assert_eq!(recover_analysis(Some(&wrapped)).unwrap(), sample_analysis());
    }

    #[test]
    fn test_empty_reply() {
        assert!(matches!(recover_analysis(None), Err(AnalysisError::EmptyResponse)));
        assert!(matches!(recover_analysis(Some("")), Err(AnalysisError::EmptyResponse)));
        assert!(matches!(recover_analysis(Some(" \n")), Err(AnalysisError::EmptyResponse)));
    }

    #[test]
    fn test_malformed_reply_carries_parser_error() {
        let err = recover_analysis(Some("I cannot help with that.")).unwrap_err();
        match err {
            AnalysisError::MalformedResponse(detail) => assert!(detail.contains("expected")),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = recover_analysis(Some("prefix {\"atsScore\": 80} suffix")).unwrap_err();
        match err {
            AnalysisError::MalformedResponse(detail) => assert!(detail.contains("missing field")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_analyze_resume_issues_one_request() {
        let provider = ScriptedProvider::with_text(SAMPLE_ANALYSIS_JSON);
        let analysis = analyze_resume(
            &provider,
            "5 years Go and Kubernetes experience...",
            "Backend Developer",
            ExperienceLevel::Senior,
        )
        .unwrap();
        assert_eq!(analysis.ats_score, 78.0);
        assert_eq!(provider.calls(), 1);
        assert!(provider.prompts.borrow()[0].contains("Backend Developer"));
    }

    #[test]
    fn test_analyze_resume_propagates_provider_error() {
        let provider = ScriptedProvider::replying(Err(AnalysisError::Network(
            "error sending request".to_string(),
        )));
        let err = analyze_resume(&provider, "text", "Data Analyst", ExperienceLevel::Junior)
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::Network);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_analyze_resume_empty_reply() {
        let provider = ScriptedProvider::replying(Ok(None));
        let err = analyze_resume(&provider, "text", "Data Analyst", ExperienceLevel::Junior)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyResponse));
    }
}
