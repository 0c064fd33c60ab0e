/// API client: the single point of entry for all calls to the tailoring service.
///
/// Every endpoint is one request with no retry. Non-success responses carry
/// `{ "detail": "..." }`, surfaced verbatim; otherwise a per-operation
/// fallback message is used.
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, multipart, Client, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::ModelId;

pub mod wire;

pub use wire::TailorResponse;
use wire::{AnalyzeRequest, CompileRequest, ErrorBody, TailorRequest};

const UPLOAD_PATH: &str = "/api/v1/resume/upload";
const TAILOR_PATH: &str = "/api/v1/tailor/";
const COMPILE_PATH: &str = "/api/v1/tailor/compile";
const ANALYZE_PATH: &str = "/api/v1/resume/analyze";

/// Which call failed. Picks the fallback message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Tailor,
    Compile,
    Analyze,
}

impl Operation {
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Upload => "Failed to upload resume",
            Operation::Tailor => "Failed to tailor resume",
            Operation::Compile => "Failed to compile PDF",
            Operation::Analyze => "Failed to analyze match",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Upload => "upload",
            Operation::Tailor => "tailor",
            Operation::Compile => "compile",
            Operation::Analyze => "analyze",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{op} request failed: {source}")]
    Transport {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{op} request rejected (status {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Server {
        op: Operation,
        status: u16,
        detail: Option<String>,
    },

    #[error("{op} response could not be decoded: {source}")]
    Decode {
        op: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn operation(&self) -> Operation {
        match self {
            ApiError::Transport { op, .. }
            | ApiError::Server { op, .. }
            | ApiError::Decode { op, .. } => *op,
        }
    }

    /// The message a user should see: the server's `detail` when it sent
    /// one, the operation's generic message otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.operation().fallback_message().to_string(),
        }
    }
}

/// Tailoring seam used by the session, so tests can substitute the service.
#[async_trait]
pub trait TailorApi: Send + Sync {
    async fn tailor_resume(
        &self,
        resume: &str,
        job_description: &str,
        model: ModelId,
    ) -> Result<TailorResponse, ApiError>;
}

/// Compilation seam used by the live preview.
#[async_trait]
pub trait CompileApi: Send + Sync {
    async fn compile(&self, latex: &str) -> Result<Bytes, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /api/v1/resume/upload (multipart, field `file`).
    pub async fn upload_resume(&self, file_name: &str, content: Vec<u8>) -> Result<Value, ApiError> {
        let op = Operation::Upload;
        let part = multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|source| ApiError::Transport { op, source })?;

        let value = read_json(op, response).await?;
        info!("Uploaded resume {file_name}");
        Ok(value)
    }

    /// POST /api/v1/resume/analyze
    pub async fn analyze_match(&self, resume: &str, job_description: &str) -> Result<Value, ApiError> {
        let op = Operation::Analyze;
        let response = self
            .client
            .post(self.url(ANALYZE_PATH))
            .json(&AnalyzeRequest {
                resume,
                job_description,
            })
            .send()
            .await
            .map_err(|source| ApiError::Transport { op, source })?;

        read_json(op, response).await
    }
}

#[async_trait]
impl TailorApi for ApiClient {
    /// POST /api/v1/tailor/
    async fn tailor_resume(
        &self,
        resume: &str,
        job_description: &str,
        model: ModelId,
    ) -> Result<TailorResponse, ApiError> {
        let op = Operation::Tailor;
        info!("Requesting tailored resume (model: {model})");

        let response = self
            .client
            .post(self.url(TAILOR_PATH))
            .json(&TailorRequest {
                resume,
                job_description,
                model,
            })
            .send()
            .await
            .map_err(|source| ApiError::Transport { op, source })?;

        let value = read_json(op, response).await?;
        let tailored: TailorResponse =
            serde_json::from_value(value).map_err(|source| ApiError::Decode { op, source })?;

        debug!(
            "Tailoring succeeded: {} chars, {} suggestions",
            tailored.tailored_resume.as_deref().map_or(0, str::len),
            tailored.suggestions.as_ref().map_or(0, Vec::len)
        );
        Ok(tailored)
    }
}

#[async_trait]
impl CompileApi for ApiClient {
    /// POST /api/v1/tailor/compile, returns PDF bytes.
    async fn compile(&self, latex: &str) -> Result<Bytes, ApiError> {
        let op = Operation::Compile;
        let response = self
            .client
            .post(self.url(COMPILE_PATH))
            .header(header::ACCEPT, "application/pdf")
            .json(&CompileRequest { resume: latex })
            .send()
            .await
            .map_err(|source| ApiError::Transport { op, source })?;

        let response = ensure_success(op, response).await?;
        let pdf = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { op, source })?;

        debug!("Compiled {} chars of LaTeX into {} bytes", latex.len(), pdf.len());
        Ok(pdf)
    }
}

/// Converts a non-success response into `ApiError::Server`.
async fn ensure_success(op: Operation, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = ErrorBody::parse_detail(&body);
    warn!("{op} request returned {status}: {}", detail.as_deref().unwrap_or(&body));

    Err(ApiError::Server {
        op,
        status: status.as_u16(),
        detail,
    })
}

async fn read_json(op: Operation, response: Response) -> Result<Value, ApiError> {
    let response = ensure_success(op, response).await?;
    let body = response
        .text()
        .await
        .map_err(|source| ApiError::Transport { op, source })?;
    serde_json::from_str(&body).map_err(|source| ApiError::Decode { op, source })
}
