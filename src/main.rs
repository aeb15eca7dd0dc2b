use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use speakset::api::{ApiClient, AuthToken, TaskSetFilter};
use speakset::capture::{CaptureFactory, CaptureSource};
use speakset::error::RecordError;
use speakset::tracker::SessionOutcome;
use speakset::{Config, RecordingController};

#[derive(Parser)]
#[command(name = "speakset", about = "Record speech, stream it, get a task set back")]
struct Cli {
    /// Config file (defaults to config/speakset.* if present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in to a tenant and print the access token
    Login {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Record from the microphone, stream it, and wait for the task set
    Record {
        /// Raw access token; the streaming endpoint authenticates via
        /// a token query parameter
        #[arg(long)]
        token: String,
        /// Also save the assembled recording as a WAV file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// List the current user's task sets
    TaskSets {
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "Bearer")]
        token_type: String,
        /// Optional status filter (e.g. "completed")
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Login {
            slug,
            username,
            password,
        } => login(&config, &slug, &username, &password).await,
        Command::Record { token, save } => record(&config, &token, save).await,
        Command::TaskSets {
            token,
            token_type,
            status,
        } => task_sets(&config, &token, &token_type, status).await,
    }
}

async fn login(config: &Config, slug: &str, username: &str, password: &str) -> Result<()> {
    let mut api = ApiClient::new(&config.api.base_url);

    if api.tenant_id(slug).await?.is_none() {
        bail!("unknown tenant: {}", slug);
    }

    let response = api.login(slug, username, password).await?;
    println!("{} {}", response.token_type, response.access_token);
    Ok(())
}

async fn record(config: &Config, token: &str, save: Option<PathBuf>) -> Result<()> {
    let capture = CaptureFactory::create(CaptureSource::Microphone);
    let mut controller = RecordingController::new(config, token, capture)?;

    controller.start().await?;
    println!("Recording... press Enter to finish, or type 'cancel' + Enter to abort.");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    if line.trim().eq_ignore_ascii_case("cancel") {
        controller.cancel().await?;
        println!("Recording cancelled.");
        return Ok(());
    }

    let artifact = match controller.stop().await {
        Ok(artifact) => artifact,
        Err(RecordError::NoAudio) => {
            controller.cancel().await?;
            bail!("no audio recorded");
        }
        Err(e) => return Err(e.into()),
    };

    let stats = controller.session_stats();
    info!(
        "Captured {:.1}s in {} chunks ({} dropped)",
        artifact.duration_secs,
        stats.chunk_count,
        controller.dropped_chunks()
    );

    if let Some(path) = save {
        artifact.save(&path)?;
        println!("Saved recording to {}", path.display());
    }

    println!("Waiting for the server to generate your task set...");
    match controller.wait_finished().await? {
        SessionOutcome::Completed { task_set_id } => {
            println!("Task set ready: {}", task_set_id);
        }
        SessionOutcome::Cancelled => println!("Recording was cancelled server-side."),
    }

    Ok(())
}

async fn task_sets(
    config: &Config,
    token: &str,
    token_type: &str,
    status: Option<String>,
) -> Result<()> {
    let api = ApiClient::new(&config.api.base_url).with_token(auth(token, token_type));

    let sets = match status {
        Some(status) => {
            let filter = TaskSetFilter {
                status: Some(status),
                ..TaskSetFilter::default()
            };
            api.filtered_task_sets(&filter).await?
        }
        None => api.user_task_sets().await?,
    };

    if sets.is_empty() {
        println!("No task sets yet.");
        return Ok(());
    }

    for set in sets {
        println!(
            "{}  {}  [{} tasks]  {}",
            set.id,
            set.title.as_deref().unwrap_or("(untitled)"),
            set.tasks.len(),
            set.status.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn auth(token: &str, token_type: &str) -> AuthToken {
    AuthToken {
        access_token: token.to_string(),
        token_type: token_type.to_string(),
    }
}
