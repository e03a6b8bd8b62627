use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use card_grade::capture::FileCapture;
use card_grade::config::{GradeConfig, config::default_db_path};
use card_grade::error::classify;
use card_grade::session::{CancelScope, Presenter, WorkflowOutcome};
use card_grade::store::{ResultStore, UploadRecord};
use clap::{Parser, Subcommand};
use grade_scale::presets::LongSidePreset;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Grade trading card photos with a hosted vision model and browse past results.
#[derive(Parser, Debug)]
#[command(name = "cardgrade")]
#[command(about = "🃏 Estimate a PSA-style grade for a card photo and keep a local history")]
#[command(long_about = "Estimate a PSA-style grade for a trading card photo.
The photo is straightened, shrunk and sent to a chat-completion model; the verdict is stored
locally so past gradings can be listed and shown again. The credential is read from
CARDGRADE_API_KEY (at build time or run time).")]
struct Args {
    /// Upload history database
    #[arg(long, global = true, help = "Path of the upload history database")]
    db: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true, help = "Log debug details to stderr (RUST_LOG overrides)")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Grade a card photo and store the verdict
    Grade {
        /// Photo of the card (JPEG, PNG, ...)
        photo: PathBuf,

        /// Copy the photo into the data directory so the history never loses it
        #[arg(long, help = "Keep a copy of the photo next to the upload history")]
        archive: bool,

        /// Upload size preset
        #[arg(short, long, value_enum, default_value_t = LongSidePreset::Standard,
              help = "Upload size: compact (768px), standard (1024px), detail (1536px)")]
        preset: LongSidePreset,

        /// JPEG quality of the uploaded photo
        #[arg(short, long, default_value_t = 70, help = "JPEG quality 1-100 of the uploaded photo")]
        quality: u8,

        /// Model name
        #[arg(long, help = "Override the chat-completion model")]
        model: Option<String>,

        /// Endpoint URL
        #[arg(long, help = "Override the chat-completion endpoint URL")]
        endpoint: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 60, help = "Deadline for the grading request in seconds")]
        timeout: u64,
    },
    /// List past gradings, newest first
    List {
        /// Show at most this many
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show one past grading
    Show {
        /// Upload id as printed by `list`
        id: i64,
    },
    /// Show the most recent grading
    Latest,
    /// Delete every stored grading
    Clear {
        /// Skip the safety check
        #[arg(long, help = "Really delete the whole history")]
        yes: bool,
    },
}

struct CliPresenter;

impl Presenter for CliPresenter {
    fn show_detail(&self, record: &UploadRecord) {
        print_detail(record);
    }

    fn show_message(&self, message: &str) {
        eprintln!("✗ {}", message);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let db_path = args.db.clone().unwrap_or_else(default_db_path);
    let store = Arc::new(
        ResultStore::open(&db_path)
            .with_context(|| format!("opening upload history {}", db_path.display()))?,
    );

    match args.command {
        Command::Grade {
            photo,
            archive,
            preset,
            quality,
            model,
            endpoint,
            timeout,
        } => {
            let mut config = GradeConfig::from_environment()
                .with_db_path(&db_path)
                .with_max_long_side(preset.max_long_side())
                .with_jpeg_quality(quality)
                .with_timeout_secs(timeout);
            if let Some(model) = model {
                config = config.with_model(model);
            }
            if let Some(endpoint) = endpoint {
                config = config.with_endpoint(endpoint);
            }

            let mut source = FileCapture::new(photo);
            if archive {
                let dir = db_path
                    .parent()
                    .map(|p| p.join("photos"))
                    .unwrap_or_else(|| PathBuf::from("photos"));
                source = source.with_archive_dir(dir);
            }

            let scope = CancelScope::new();
            let on_interrupt = scope.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            println!("Photo taken, grading… please wait");
            let outcome =
                card_grade::grade_photo(source, &config, store, Arc::new(CliPresenter), &scope)
                    .await?;
            if let WorkflowOutcome::Failed { stage, error } = &outcome {
                debug!(%stage, %error, "grade command failed");
            }
            if let Some(line) = unpresented_outcome(&outcome, scope.is_cancelled()) {
                eprintln!("✗ {}", line);
            }
            Ok(if outcome.is_done() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List { limit } => {
            let records = store.get_all()?;
            if records.is_empty() {
                println!("No recent uploads");
                return Ok(ExitCode::SUCCESS);
            }
            for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "#{:<5} {}  {}",
                    record.id,
                    record.created_at,
                    first_line(&record.verdict)
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { id } => match store.get_by_id(id)? {
            Some(record) => {
                print_detail(&record);
                Ok(ExitCode::SUCCESS)
            }
            None => bail!("no upload with id {}", id),
        },
        Command::Latest => match store.get_latest()? {
            Some(record) => {
                print_detail(&record);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                println!("No recent uploads");
                Ok(ExitCode::SUCCESS)
            }
        },
        Command::Clear { yes } => {
            if !yes {
                let count = store.count()?;
                bail!("refusing to delete {} uploads without --yes", count);
            }
            let removed = store.delete_all()?;
            println!("Deleted {} uploads", removed);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// What the presenter stayed silent about. It reports every run except on a
/// cancelled scope, where the user still needs to hear how the run ended.
fn unpresented_outcome(outcome: &WorkflowOutcome, cancelled: bool) -> Option<String> {
    if !cancelled {
        return None;
    }
    match outcome {
        WorkflowOutcome::Done(record) => Some(format!(
            "Cancelled after the request was sent; the verdict was saved as upload #{}",
            record.id
        )),
        WorkflowOutcome::Failed { error, .. } => Some(classify::user_message(error)),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "card_grade=debug,cardgrade=debug"
    } else {
        "card_grade=info,cardgrade=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_detail(record: &UploadRecord) {
    println!("Upload #{}  ({})", record.id, record.created_at);
    if record.image_path.exists() {
        println!("Photo: {}", record.image_path.display());
    } else {
        println!("Photo: {} (missing)", record.image_path.display());
    }
    println!();
    println!("{}", record.verdict);
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
