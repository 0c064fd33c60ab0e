// JSON bodies exchanged with the tailoring service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ModelId;

#[derive(Debug, Serialize)]
pub struct TailorRequest<'a> {
    pub resume: &'a str,
    pub job_description: &'a str,
    pub model: ModelId,
}

/// Raw tailoring response. `tailored_resume` still carries reasoning
/// blocks, fences and trailing commentary; see `extract`. Missing and
/// `null` both mean no output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TailorResponse {
    #[serde(default)]
    pub tailored_resume: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
pub struct CompileRequest<'a> {
    pub resume: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub resume: &'a str,
    pub job_description: &'a str,
}

/// Error body convention: `{ "detail": "..." }`. FastAPI-style services
/// also send arrays here for request validation failures.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

impl ErrorBody {
    /// The detail string, if the body carried a non-empty one.
    pub(super) fn parse_detail(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()?
            .detail?
            .as_str()
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}
