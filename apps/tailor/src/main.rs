mod api_client;
mod config;
mod errors;
mod extract;
mod models;
mod preview;
mod session;
mod upload;
mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api_client::{ApiClient, CompileApi};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::ModelId;
use crate::preview::{ArtifactHandle, DEFAULT_DOWNLOAD_NAME};
use crate::session::{TailorSession, ViewMode};
use crate::upload::{load_resume, read_resume_bytes};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tailor a LaTeX resume to a job description")]
struct Cli {
    /// Base URL of the tailoring service (overrides TAILOR_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tailor a resume to a job description.
    Tailor {
        #[arg(short, long)]
        resume: PathBuf,
        /// Job description file, or `-` for stdin.
        #[arg(short, long)]
        job: String,
        #[arg(short, long, default_value_t = ModelId::default())]
        model: ModelId,
        /// Write the tailored LaTeX here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also compile the tailored LaTeX and save the PDF here.
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Compile a LaTeX file once and save the PDF.
    Compile {
        file: PathBuf,
        #[arg(short, long, default_value = DEFAULT_DOWNLOAD_NAME)]
        out: PathBuf,
    },
    /// Ask the service how well a resume matches a job description.
    Analyze {
        #[arg(short, long)]
        resume: PathBuf,
        #[arg(short, long)]
        job: String,
    },
    /// Upload a resume for parsing.
    Upload { file: PathBuf },
    /// Recompile a LaTeX file whenever it changes.
    Preview {
        file: PathBuf,
        #[arg(short, long, default_value = DEFAULT_DOWNLOAD_NAME)]
        out: PathBuf,
    },
    /// List the models the service accepts.
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }

    // Logs go to stderr so tailored output can be piped.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Resume Tailor v{} (service: {})", env!("CARGO_PKG_VERSION"), config.api_url);

    let client = ApiClient::new(&config).context("Failed to build HTTP client")?;

    match cli.command {
        Command::Tailor {
            resume,
            job,
            model,
            out,
            pdf,
        } => run_tailor(&client, &resume, &job, model, out, pdf).await,
        Command::Compile { file, out } => {
            let resume = load_resume(&file).await.map_err(user_error)?;
            compile_to(&client, &resume.content, &out).await
        }
        Command::Analyze { resume, job } => {
            let resume = load_resume(&resume).await.map_err(user_error)?;
            let job_description = read_job_description(&job).await?;
            let analysis = client
                .analyze_match(&resume.content, &job_description)
                .await
                .map_err(user_error)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            Ok(())
        }
        Command::Upload { file } => {
            let (file_name, bytes) = read_resume_bytes(&file).await.map_err(user_error)?;
            let response = client
                .upload_resume(&file_name, bytes)
                .await
                .map_err(user_error)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Preview { file, out } => {
            watch::run_live_preview(file, out, Arc::new(client), config.preview_debounce).await
        }
        Command::Models => {
            for model in ModelId::ALL {
                println!("{:<34} {}", model.wire_name(), model.label());
            }
            Ok(())
        }
    }
}

async fn run_tailor(
    client: &ApiClient,
    resume_path: &Path,
    job: &str,
    model: ModelId,
    out: Option<PathBuf>,
    pdf: Option<PathBuf>,
) -> Result<()> {
    let mut session = TailorSession::new(model);
    session.set_resume(load_resume(resume_path).await.map_err(user_error)?);
    session.set_job_description(read_job_description(job).await?);

    info!(
        "Tailoring {} with {}",
        session.resume_file_name().unwrap_or("resume"),
        session.model()
    );

    if let Err(err) = session.tailor(client).await {
        let message = match session.error() {
            Some(message) => message.to_string(),
            None => err.user_message(),
        };
        bail!(message);
    }
    debug!("{} suggestion(s) retained", session.suggestions().len());

    let mode = session.view_mode();
    if mode == ViewMode::Uploaded {
        warn!("The service returned no tailored LaTeX; showing your resume unchanged");
    }
    let text = session.editor_text();
    eprintln!("{}", mode.panel_title());
    if text.is_empty() {
        eprintln!("{}", mode.placeholder());
    }

    match &out {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Written to {}", path.display());
        }
        None => println!("{text}"),
    }

    let result = session.result();
    if result.has_summary() {
        eprintln!("\nImprovements Summary\n{}", result.summary);
    }

    if let Some(pdf) = pdf {
        compile_to(client, text, &pdf).await?;
    }

    Ok(())
}

async fn compile_to(client: &ApiClient, latex: &str, out: &Path) -> Result<()> {
    if latex.is_empty() {
        bail!("Nothing to compile");
    }

    let bytes = client.compile(latex).await.map_err(user_error)?;
    let artifact = ArtifactHandle::create(&bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    artifact.save_to(out)?;
    eprintln!(
        "Saved {} ({} page(s))",
        out.display(),
        artifact.page_count()
    );
    Ok(())
}

/// Reads a job description from a file, or from stdin when `source` is `-`.
async fn read_job_description(source: &str) -> Result<String> {
    let text = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read job description from {source}"))?
    };

    if text.trim().is_empty() {
        bail!("Job description cannot be empty");
    }
    Ok(text)
}

fn user_error(err: impl Into<AppError>) -> anyhow::Error {
    anyhow::anyhow!(err.into().user_message())
}
