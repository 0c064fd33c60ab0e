//! Live compilation preview.
//!
//! Every edit restarts a quiescence timer; only when it expires is the text
//! sent for compilation. Each edit bumps a sequence number and an outcome is
//! applied only if it carries the latest one, so a slow response for old
//! text can never overwrite a newer preview. Superseded artifacts are
//! released as soon as they are replaced or discarded.
//!
//! When the quiescence timer fires, the previous error is cleared and the
//! pager rewinds, while the previous PDF stays up until the new one lands.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lopdf::Document;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api_client::CompileApi;

/// Default file name offered when saving the compiled preview.
pub const DEFAULT_DOWNLOAD_NAME: &str = "tailored-resume.pdf";

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Could not store compiled preview: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load PDF file")]
    InvalidPdf(#[source] lopdf::Error),
}

/// A compiled PDF held in a temporary file for as long as it is displayed.
/// Dropping the handle deletes the file.
pub struct ArtifactHandle {
    file: NamedTempFile,
    document: Document,
    page_count: usize,
}

impl ArtifactHandle {
    pub fn create(pdf: &[u8]) -> Result<Self, PreviewError> {
        let document = Document::load_mem(pdf).map_err(PreviewError::InvalidPdf)?;
        let page_count = document.get_pages().len();

        let mut file = tempfile::Builder::new()
            .prefix("tailor-preview-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(pdf)?;
        file.flush()?;

        debug!("Stored {page_count}-page preview at {}", file.path().display());
        Ok(Self {
            file,
            document,
            page_count,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Extracted text of a 1-based page.
    pub fn page_text(&self, page: usize) -> Result<String, PreviewError> {
        let page = u32::try_from(page).unwrap_or(u32::MAX);
        self.document
            .extract_text(&[page])
            .map_err(PreviewError::InvalidPdf)
    }

    /// Copies the PDF to `dest`, returning the number of bytes written.
    pub fn save_to(&self, dest: &Path) -> Result<u64, PreviewError> {
        let written = std::fs::copy(self.path(), dest)?;
        info!("Saved preview to {} ({written} bytes)", dest.display());
        Ok(written)
    }
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("path", &self.file.path())
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        debug!("Released preview artifact {}", self.file.path().display());
    }
}

#[derive(Debug, Default)]
pub enum PreviewState {
    #[default]
    Idle,
    Ready(ArtifactHandle),
    /// Compile or load failure, shown in place of the preview.
    Failed(String),
}

/// Result of one compile request, tagged with the edit it was made for.
#[derive(Debug)]
pub struct CompileOutcome {
    pub seq: u64,
    pub result: Result<ArtifactHandle, String>,
}

#[derive(Debug)]
pub enum PreviewEvent {
    /// The quiescence window for `seq` elapsed and its compile was sent.
    Compiling { seq: u64 },
    Compiled(CompileOutcome),
}

impl PreviewEvent {
    pub fn seq(&self) -> u64 {
        match self {
            PreviewEvent::Compiling { seq } => *seq,
            PreviewEvent::Compiled(outcome) => outcome.seq,
        }
    }
}

impl From<CompileOutcome> for PreviewEvent {
    fn from(outcome: CompileOutcome) -> Self {
        PreviewEvent::Compiled(outcome)
    }
}

/// Debounces edits into compile requests and owns the displayed preview.
///
/// Events arrive on the receiver returned by `new`; feed them back
/// through `apply`.
pub struct PreviewScheduler {
    compiler: Arc<dyn CompileApi>,
    debounce: Duration,
    seq: u64,
    pending: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<PreviewEvent>,
    state: PreviewState,
    current_page: usize,
}

impl PreviewScheduler {
    pub fn new(
        compiler: Arc<dyn CompileApi>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PreviewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            compiler,
            debounce,
            seq: 0,
            pending: None,
            events: tx,
            state: PreviewState::Idle,
            current_page: 1,
        };
        (scheduler, rx)
    }

    /// Sequence number of the most recent edit.
    pub fn latest_seq(&self) -> u64 {
        self.seq
    }

    /// Records an edit. Cancels a compile that has not fired yet; empty text
    /// clears the preview without a request.
    pub fn on_edit(&mut self, text: &str) {
        self.seq += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        if text.is_empty() {
            debug!("Editor cleared; dropping preview");
            self.state = PreviewState::Idle;
            self.current_page = 1;
            return;
        }

        let seq = self.seq;
        let debounce = self.debounce;
        let compiler = Arc::clone(&self.compiler);
        let events = self.events.clone();
        let text = text.to_string();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if events.send(PreviewEvent::Compiling { seq }).is_err() {
                return;
            }
            // Detached so a later edit cannot abort a request already sent.
            tokio::spawn(compile_and_report(compiler, seq, text, events));
        }));
    }

    /// Applies an event if it belongs to the latest edit. Stale events are
    /// dropped, releasing their artifacts. Returns whether it was applied.
    pub fn apply(&mut self, event: impl Into<PreviewEvent>) -> bool {
        let event = event.into();
        if event.seq() != self.seq {
            debug!(
                "Discarding stale preview event {} (latest {})",
                event.seq(),
                self.seq
            );
            return false;
        }

        self.current_page = 1;
        let outcome = match event {
            PreviewEvent::Compiling { .. } => {
                if matches!(self.state, PreviewState::Failed(_)) {
                    self.state = PreviewState::Idle;
                }
                return true;
            }
            PreviewEvent::Compiled(outcome) => outcome,
        };

        self.state = match outcome.result {
            Ok(artifact) => {
                info!("Preview ready: {} page(s)", artifact.page_count());
                PreviewState::Ready(artifact)
            }
            Err(message) => {
                warn!("Preview failed: {message}");
                PreviewState::Failed(message)
            }
        };
        true
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        match &self.state {
            PreviewState::Ready(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            PreviewState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> Option<usize> {
        self.artifact().map(ArtifactHandle::page_count)
    }

    pub fn next_page(&mut self) -> usize {
        if let Some(count) = self.page_count() {
            self.current_page = (self.current_page + 1).min(count.max(1));
        }
        self.current_page
    }

    pub fn prev_page(&mut self) -> usize {
        self.current_page = self.current_page.saturating_sub(1).max(1);
        self.current_page
    }

    pub fn current_page_text(&self) -> Option<Result<String, PreviewError>> {
        self.artifact().map(|a| a.page_text(self.current_page))
    }
}

impl Drop for PreviewScheduler {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

async fn compile_and_report(
    compiler: Arc<dyn CompileApi>,
    seq: u64,
    text: String,
    events: mpsc::UnboundedSender<PreviewEvent>,
) {
    debug!("Compiling preview {seq} ({} chars)", text.len());

    let result = match compiler.compile(&text).await {
        Ok(pdf) => ArtifactHandle::create(&pdf).map_err(|e| e.to_string()),
        Err(err) => Err(err.user_message()),
    };

    if events.send(CompileOutcome { seq, result }.into()).is_err() {
        debug!("Preview receiver closed; dropping outcome {seq}");
    }
}
