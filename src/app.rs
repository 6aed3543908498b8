use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{self, AnalysisError, CompletionProvider, FailureCategory};
use crate::extract::{self, ExtractError, TextExtractor, Upload};
use crate::models::{ExperienceLevel, ResumeAnalysis, ROLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Analyzing,
    Result,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a resume or paste text into the field.")]
    EmptyResume,

    #[error("An analysis is already in progress.")]
    Busy,
}

/// Inputs captured when an analysis is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInput {
    pub resume_text: String,
    pub target_role: String,
    pub level: ExperienceLevel,
}

pub struct AppState {
    pub step: Step,
    pub resume_text: String,
    pub role_index: usize,
    pub custom_role: String,
    pub level: ExperienceLevel,
    pub analysis: Option<ResumeAnalysis>,
    pub error: Option<String>,
    pub is_parsing: bool,
    model_name: String,
}

impl AppState {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            step: Step::Upload,
            resume_text: String::new(),
            role_index: 0,
            custom_role: String::new(),
            level: ExperienceLevel::default(),
            analysis: None,
            error: None,
            is_parsing: false,
            model_name: model_name.into(),
        }
    }

    /// Custom role text wins when non-empty, otherwise the selected catalog title.
    pub fn effective_role(&self) -> String {
        let custom = self.custom_role.trim();
        if custom.is_empty() {
            ROLES[self.role_index.min(ROLES.len() - 1)].title.to_string()
        } else {
            custom.to_string()
        }
    }

    pub fn next_role(&mut self) {
        self.role_index = (self.role_index + 1) % ROLES.len();
    }

    pub fn prev_role(&mut self) {
        self.role_index = (self.role_index + ROLES.len() - 1) % ROLES.len();
    }

    pub fn clear_resume(&mut self) {
        self.resume_text.clear();
    }

    // --- upload -> analyzing -> result ---

    pub fn begin_analysis(&mut self) -> Result<AnalysisInput, ValidationError> {
        if self.step != Step::Upload {
            return Err(ValidationError::Busy);
        }
        if self.resume_text.trim().is_empty() {
            let err = ValidationError::EmptyResume;
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.error = None;
        self.step = Step::Analyzing;
        Ok(AnalysisInput {
            resume_text: self.resume_text.clone(),
            target_role: self.effective_role(),
            level: self.level,
        })
    }

    pub fn finish_analysis(&mut self, outcome: Result<ResumeAnalysis, AnalysisError>) {
        if self.step != Step::Analyzing {
            warn!("Ignoring analysis outcome outside the analyzing step");
            return;
        }
        match outcome {
            Ok(analysis) => {
                info!("Analysis complete: score {}", analysis.ats_score);
                self.analysis = Some(analysis);
                self.step = Step::Result;
            }
            Err(err) => {
                warn!("Analysis failed: {}", err);
                self.error = Some(failure_message(&err, &self.model_name));
                self.step = Step::Upload;
            }
        }
    }

    /// Runs the whole analysis round-trip on the calling thread.
    pub fn run_analysis(&mut self, provider: &dyn CompletionProvider) -> Result<(), ValidationError> {
        let input = self.begin_analysis()?;
        let outcome =
            ai::analyze_resume(provider, &input.resume_text, &input.target_role, input.level);
        self.finish_analysis(outcome);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.step = Step::Upload;
        self.analysis = None;
        self.error = None;
    }

    // --- file upload ---

    /// Returns false when an extraction is already running.
    pub fn begin_upload(&mut self) -> bool {
        if self.is_parsing || self.step != Step::Upload {
            return false;
        }
        self.error = None;
        self.is_parsing = true;
        true
    }

    pub fn finish_upload(&mut self, outcome: Result<String, ExtractError>) {
        self.is_parsing = false;
        match outcome {
            Ok(text) => self.resume_text = text,
            Err(err) => {
                warn!("File extraction failed: {}", err);
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn load_file(&mut self, extractor: &dyn TextExtractor, upload: &Upload) {
        if !self.begin_upload() {
            return;
        }
        let outcome = extract::extract_text(extractor, upload);
        self.finish_upload(outcome);
    }
}

/// User-facing text for an analysis failure.
pub fn failure_message(err: &AnalysisError, model_name: &str) -> String {
    match err.category() {
        FailureCategory::Authentication => {
            "AUTHENTICATION FAILED: Ensure you have a valid Gemini API key in your environment."
                .to_string()
        }
        FailureCategory::EngineUnavailable => format!(
            "ENGINE UNAVAILABLE: The {} model is not responding. Please check your project settings.",
            model_name
        ),
        FailureCategory::Network => {
            "NETWORK ERROR: Unable to reach the AI engine. Please check your connection.".to_string()
        }
        FailureCategory::Other => err.to_string(),
    }
}
