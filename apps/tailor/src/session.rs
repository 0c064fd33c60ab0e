//! State behind one tailoring session: the uploaded
//! resume, the job description, the selected model and the latest result.
//!
//! State changes are split into `begin_tailoring` / `finish_tailoring` so the
//! loading phase is observable; `tailor` runs both around one API call.

use serde_json::Value;
use tracing::{info, warn};

use crate::api_client::{ApiError, TailorApi, TailorResponse};
use crate::errors::AppError;
use crate::extract::{extract_tailor_result, TailorResult};
use crate::models::ModelId;
use crate::upload::ResumeFile;

/// What the editor panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Loading,
    Output,
    Uploaded,
    Empty,
}

impl ViewMode {
    /// Loading wins over output, output over an uploaded resume.
    pub fn from_flags(has_output: bool, has_resume_content: bool, is_loading: bool) -> Self {
        match (is_loading, has_output, has_resume_content) {
            (true, _, _) => ViewMode::Loading,
            (false, true, _) => ViewMode::Output,
            (false, false, true) => ViewMode::Uploaded,
            (false, false, false) => ViewMode::Empty,
        }
    }

    pub fn panel_title(self) -> &'static str {
        match self {
            ViewMode::Uploaded => "Your resume",
            _ => "Tailored LaTeX",
        }
    }

    /// Shown in place of the editor when there is no text.
    pub fn placeholder(self) -> &'static str {
        match self {
            ViewMode::Loading => "Tailored LaTeX will appear here…",
            _ => "Your LaTeX will appear here.",
        }
    }
}

/// Inputs captured when a tailoring request starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTailor {
    pub resume: String,
    pub job_description: String,
    pub model: ModelId,
}

#[derive(Debug, Default)]
pub struct TailorSession {
    resume: Option<ResumeFile>,
    job_description: String,
    model: ModelId,
    result: TailorResult,
    /// Kept from the last response but never displayed.
    suggestions: Vec<Value>,
    loading: bool,
    error: Option<String>,
}

impl TailorSession {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn set_resume(&mut self, resume: ResumeFile) {
        info!("Resume selected: {} ({} bytes)", resume.file_name, resume.size);
        self.resume = Some(resume);
    }

    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.job_description = text.into();
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn resume_file_name(&self) -> Option<&str> {
        self.resume.as_ref().map(|r| r.file_name.as_str())
    }

    pub fn resume_content(&self) -> &str {
        self.resume.as_ref().map_or("", |r| r.content.as_str())
    }

    pub fn result(&self) -> &TailorResult {
        &self.result
    }

    pub fn suggestions(&self) -> &[Value] {
        &self.suggestions
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && !self.resume_content().is_empty() && !self.job_description.is_empty()
    }

    pub fn view_mode(&self) -> ViewMode {
        ViewMode::from_flags(
            !self.result.document.is_empty(),
            !self.resume_content().is_empty(),
            self.loading,
        )
    }

    /// Text the editor starts from for the current mode.
    pub fn editor_text(&self) -> &str {
        match self.view_mode() {
            ViewMode::Loading | ViewMode::Empty => "",
            ViewMode::Output => &self.result.document,
            ViewMode::Uploaded => self.resume_content(),
        }
    }

    /// Enters the loading state and clears every previous outcome.
    ///
    /// Returns `None` and changes nothing when the session cannot submit.
    pub fn begin_tailoring(&mut self) -> Option<PendingTailor> {
        if !self.can_submit() {
            return None;
        }

        self.loading = true;
        self.error = None;
        self.result = TailorResult::default();
        self.suggestions.clear();

        Some(PendingTailor {
            resume: self.resume_content().to_string(),
            job_description: self.job_description.clone(),
            model: self.model,
        })
    }

    /// Applies the outcome of the request started by `begin_tailoring`.
    pub fn finish_tailoring(&mut self, outcome: Result<TailorResponse, ApiError>) -> Result<(), AppError> {
        self.loading = false;

        match outcome {
            Ok(response) => {
                self.result =
                    extract_tailor_result(&response.tailored_resume.unwrap_or_default());
                self.suggestions = response.suggestions.unwrap_or_default();
                info!(
                    "Tailored resume ready ({} chars, summary: {})",
                    self.result.document.len(),
                    self.result.has_summary()
                );
                Ok(())
            }
            Err(err) => {
                let err = AppError::from(err);
                let message = err.user_message();
                warn!("Tailoring failed: {message}");
                self.error = Some(message);
                Err(err)
            }
        }
    }

    /// Runs one tailoring request end to end.
    pub async fn tailor(&mut self, api: &dyn TailorApi) -> Result<(), AppError> {
        let Some(pending) = self.begin_tailoring() else {
            return Err(AppError::Validation(
                "Upload a .tex resume and paste a job description first".to_string(),
            ));
        };

        let outcome = api
            .tailor_resume(&pending.resume, &pending.job_description, pending.model)
            .await;
        self.finish_tailoring(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::api_client::Operation;

    const RESUME_TEX: &str = "\\documentclass{article}\n\\begin{document}\nJane\n\\end{document}";

    /// Replays one canned outcome and records the request it saw.
    struct FakeTailor {
        outcome: Mutex<Option<Result<TailorResponse, ApiError>>>,
        seen: Mutex<Option<PendingTailor>>,
    }

    impl FakeTailor {
        fn new(outcome: Result<TailorResponse, ApiError>) -> Self {
            Self {
                outcome: Mutex::new(Some(outcome)),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TailorApi for FakeTailor {
        async fn tailor_resume(
            &self,
            resume: &str,
            job_description: &str,
            model: ModelId,
        ) -> Result<TailorResponse, ApiError> {
            *self.seen.lock().unwrap() = Some(PendingTailor {
                resume: resume.to_string(),
                job_description: job_description.to_string(),
                model,
            });
            self.outcome.lock().unwrap().take().expect("called once")
        }
    }

    fn resume() -> ResumeFile {
        ResumeFile {
            file_name: "resume.tex".to_string(),
            size: RESUME_TEX.len() as u64,
            content: RESUME_TEX.to_string(),
        }
    }

    fn ready_session() -> TailorSession {
        let mut session = TailorSession::new(ModelId::DeepseekR1T2);
        session.set_resume(resume());
        session.set_job_description("Senior Rust Engineer");
        session
    }

    #[test]
    fn test_view_mode_truth_table() {
        use ViewMode::*;
        let cases = [
            ((false, false, false), Empty),
            ((false, true, false), Uploaded),
            ((true, false, false), Output),
            ((true, true, false), Output),
            ((false, false, true), Loading),
            ((false, true, true), Loading),
            ((true, false, true), Loading),
            ((true, true, true), Loading),
        ];
        for ((has_output, has_resume, loading), expected) in cases {
            assert_eq!(ViewMode::from_flags(has_output, has_resume, loading), expected);
        }
    }

    #[test]
    fn test_panel_title_and_placeholder() {
        assert_eq!(ViewMode::Uploaded.panel_title(), "Your resume");
        assert_eq!(ViewMode::Output.panel_title(), "Tailored LaTeX");
        assert_eq!(ViewMode::Loading.placeholder(), "Tailored LaTeX will appear here…");
        assert_eq!(ViewMode::Empty.placeholder(), "Your LaTeX will appear here.");
    }

    #[test]
    fn test_empty_session() {
        let session = TailorSession::default();
        assert_eq!(session.model(), ModelId::DeepseekR1_0528);
        assert_eq!(session.view_mode(), ViewMode::Empty);
        assert_eq!(session.editor_text(), "");
        assert!(!session.can_submit());
    }

    #[test]
    fn test_can_submit_requires_resume_and_job_description() {
        let mut session = TailorSession::default();
        session.set_resume(resume());
        assert!(!session.can_submit());
        assert_eq!(session.view_mode(), ViewMode::Uploaded);
        assert_eq!(session.editor_text(), RESUME_TEX);

        session.set_job_description("Rust");
        assert!(session.can_submit());
    }

    #[test]
    fn test_begin_tailoring_enters_loading_and_clears_outcome() {
        let mut session = ready_session();
        session.error = Some("old".to_string());

        let pending = session.begin_tailoring().unwrap();
        assert_eq!(pending.model, ModelId::DeepseekR1T2);
        assert_eq!(pending.job_description, "Senior Rust Engineer");
        assert!(session.loading);
        assert_eq!(session.view_mode(), ViewMode::Loading);
        assert_eq!(session.editor_text(), "");
        assert!(session.error().is_none());
        // A second submit while loading is refused.
        assert!(session.begin_tailoring().is_none());
    }

    #[tokio::test]
    async fn test_tailor_success_extracts_document_and_summary() {
        let raw = format!("<think>plan</think>```latex\n{RESUME_TEX}\n\nAdded Rust keywords.\n```");
        let api = FakeTailor::new(Ok(TailorResponse {
            tailored_resume: Some(raw),
            suggestions: Some(vec![json!("Quantify impact")]),
        }));
        let mut session = ready_session();

        session.tailor(&api).await.unwrap();

        assert!(!session.loading);
        assert_eq!(session.result().document, RESUME_TEX);
        assert_eq!(session.result().summary, "Added Rust keywords.");
        assert_eq!(session.suggestions(), &[json!("Quantify impact")]);
        assert_eq!(session.view_mode(), ViewMode::Output);
        assert_eq!(session.editor_text(), RESUME_TEX);

        let seen = api.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.resume, RESUME_TEX);
        assert_eq!(seen.model, ModelId::DeepseekR1T2);
    }

    #[tokio::test]
    async fn test_tailor_failure_leaves_output_absent() {
        let mut session = ready_session();
        session.result = TailorResult {
            document: "stale".to_string(),
            summary: "stale".to_string(),
        };
        let api = FakeTailor::new(Err(ApiError::Server {
            op: Operation::Tailor,
            status: 500,
            detail: Some("Failed to tailor resume.".to_string()),
        }));

        let err = session.tailor(&api).await.unwrap_err();

        assert!(matches!(err, AppError::Api(_)));
        assert!(!session.loading);
        assert_eq!(session.error(), Some("Failed to tailor resume."));
        assert_eq!(session.result(), &TailorResult::default());
        assert_eq!(session.view_mode(), ViewMode::Uploaded);
    }

    #[tokio::test]
    async fn test_tailor_without_inputs_changes_nothing() {
        let mut session = TailorSession::default();
        let api = FakeTailor::new(Ok(TailorResponse::default()));

        let err = session.tailor(&api).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(api.seen.lock().unwrap().is_none());
        assert!(session.error().is_none());
    }

    #[test]
    fn test_null_tailored_resume_yields_empty_output() {
        let mut session = ready_session();
        session.begin_tailoring().unwrap();
        let response: TailorResponse =
            serde_json::from_str(r#"{"tailored_resume": null, "suggestions": null}"#).unwrap();
        session.finish_tailoring(Ok(response)).unwrap();

        assert!(session.error().is_none());
        assert_eq!(session.result(), &TailorResult::default());
        assert_eq!(session.view_mode().panel_title(), "Your resume");
        assert_eq!(session.editor_text(), RESUME_TEX);
    }

    #[test]
    fn test_missing_tailored_resume_yields_empty_output() {
        let mut session = ready_session();
        session.begin_tailoring().unwrap();
        session.finish_tailoring(Ok(TailorResponse::default())).unwrap();

        assert_eq!(session.result(), &TailorResult::default());
        assert!(session.suggestions().is_empty());
        assert_eq!(session.view_mode(), ViewMode::Uploaded);
    }
}
