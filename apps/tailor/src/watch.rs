//! Live editing: watches a `.tex` file and keeps a compiled PDF next to it
//! in sync through the preview scheduler. Lines typed on stdin page through
//! the current preview (`n`, `p`, `s`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api_client::CompileApi;
use crate::errors::AppError;
use crate::preview::{PreviewError, PreviewEvent, PreviewScheduler, PreviewState};
use crate::upload::load_resume;

/// Watches the parent directory so editors that save by rename are seen too.
pub fn watch_file(path: &Path) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .context("watched path has no file name")?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_)
                ) && event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()));
                if relevant {
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!("File watch error: {e}"),
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!("Watching {}", path.display());
    Ok((watcher, rx))
}

/// What a reload handed to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    Unchanged,
    Edited,
    /// The file is now empty; the preview was cleared on the spot.
    Cleared,
}

/// The file being edited and the last text handed to the scheduler.
pub struct LiveDocument {
    path: PathBuf,
    last_text: Option<String>,
}

impl LiveDocument {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_text: None,
        }
    }

    /// Re-reads the file and records an edit if its text changed.
    pub async fn reload(&mut self, scheduler: &mut PreviewScheduler) -> Result<Reload, AppError> {
        let resume = load_resume(&self.path).await?;
        if self.last_text.as_deref() == Some(resume.content.as_str()) {
            debug!("{} unchanged", self.path.display());
            return Ok(Reload::Unchanged);
        }

        scheduler.on_edit(&resume.content);
        let reload = if resume.content.is_empty() {
            Reload::Cleared
        } else {
            debug!("Edit {} queued", scheduler.latest_seq());
            Reload::Edited
        };
        self.last_text = Some(resume.content);
        Ok(reload)
    }
}

/// What happened to the output file after an applied outcome.
#[derive(Debug, PartialEq, Eq)]
pub enum Published {
    Saved { pages: usize, bytes: u64 },
    Failed(String),
    Cleared,
}

/// Mirrors the scheduler's current preview into `out`. An idle preview
/// removes `out`.
pub fn publish(scheduler: &PreviewScheduler, out: &Path) -> Result<Published, PreviewError> {
    match scheduler.state() {
        PreviewState::Ready(artifact) => {
            let bytes = artifact.save_to(out)?;
            Ok(Published::Saved {
                pages: artifact.page_count(),
                bytes,
            })
        }
        PreviewState::Failed(message) => Ok(Published::Failed(message.clone())),
        PreviewState::Idle => match std::fs::remove_file(out) {
            Ok(()) => Ok(Published::Cleared),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Published::Cleared),
            Err(e) => Err(e.into()),
        },
    }
}

fn report(published: Result<Published, PreviewError>, out: &Path) {
    match published {
        Ok(Published::Saved { pages, bytes }) => {
            println!("Preview updated: {} ({pages} page(s), {bytes} bytes)", out.display());
        }
        Ok(Published::Failed(message)) => eprintln!("Compile failed: {message}"),
        Ok(Published::Cleared) => println!("Preview cleared"),
        Err(e) => error!("Could not write {}: {e}", out.display()),
    }
}

/// A line typed while the preview runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerCommand {
    Next,
    Prev,
    Show,
}

impl PagerCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Some(PagerCommand::Next),
            "p" | "prev" => Some(PagerCommand::Prev),
            "s" | "show" | "" => Some(PagerCommand::Show),
            _ => None,
        }
    }

    /// Moves the pager and renders the page it lands on.
    pub fn run(self, scheduler: &mut PreviewScheduler) -> String {
        match self {
            PagerCommand::Next => {
                scheduler.next_page();
            }
            PagerCommand::Prev => {
                scheduler.prev_page();
            }
            PagerCommand::Show => {}
        }
        page_view(scheduler)
    }
}

/// Text of the current preview page, or why there is none.
pub fn page_view(scheduler: &PreviewScheduler) -> String {
    let (Some(count), Some(text)) = (scheduler.page_count(), scheduler.current_page_text()) else {
        return match scheduler.error() {
            Some(message) => format!("Compile failed: {message}"),
            None => "PDF preview will appear here.".to_string(),
        };
    };

    let header = format!("Showing page {} of {count}", scheduler.current_page());
    match text {
        Ok(text) => format!("{header}\n{}", text.trim_end()),
        Err(e) => format!("{header}\n(no text: {e})"),
    }
}

/// Runs until Ctrl-C: file changes become edits, applied outcomes are
/// written to `out`, stdin lines drive the pager.
pub async fn run_live_preview(
    path: PathBuf,
    out: PathBuf,
    compiler: Arc<dyn CompileApi>,
    debounce: Duration,
) -> Result<()> {
    let (mut scheduler, mut events) = PreviewScheduler::new(compiler, debounce);
    let (_watcher, mut changes) = watch_file(&path)?;
    let mut document = LiveDocument::new(path);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    match document.reload(&mut scheduler).await {
        Ok(Reload::Cleared) => report(publish(&scheduler, &out), &out),
        Ok(_) => {}
        Err(e) => return Err(anyhow::anyhow!(e.user_message())),
    }

    loop {
        tokio::select! {
            Some(()) = changes.recv() => {
                match document.reload(&mut scheduler).await {
                    Ok(Reload::Cleared) => report(publish(&scheduler, &out), &out),
                    Ok(_) => {}
                    Err(e) => warn!("Skipping edit: {}", e.user_message()),
                }
            }
            Some(event) = events.recv() => {
                let compiled = matches!(event, PreviewEvent::Compiled(_));
                if !scheduler.apply(event) {
                    continue;
                }
                if compiled {
                    report(publish(&scheduler, &out), &out);
                    if scheduler.page_count().is_some() {
                        println!("{}", page_view(&scheduler));
                    }
                } else {
                    println!("Compiling…");
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match PagerCommand::parse(&line) {
                        Some(command) => println!("{}", command.run(&mut scheduler)),
                        None => eprintln!("Unknown command {:?} (n = next, p = prev, s = show)", line.trim()),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Stdin closed: {e}");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping live preview");
                break;
            }
        }
    }

    Ok(())
}
