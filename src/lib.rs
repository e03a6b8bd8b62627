//! # Card Grade Library
//!
//! Photograph a trading card, ask a hosted vision model for a PSA-style grading
//! estimate, and keep every (photo, verdict) pair in a local history.
//!
//! ## Architecture
//!
//! - `capture`: photo sources behind the [`capture::CaptureSource`] trait
//! - `processing`: EXIF orientation, longest-side downscale, JPEG encode
//! - `grading`: the single chat-completion call behind [`grading::Grader`]
//! - `store`: SQLite upload history
//! - `session`: the workflow coordinator tying the steps together
//! - `config`: service, preprocessing and storage settings
//! - `error`: the crate error type
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use card_grade::capture::FileCapture;
//! use card_grade::config::GradeConfig;
//! use card_grade::session::{CancelScope, TracingPresenter};
//! use card_grade::store::ResultStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GradeConfig::from_environment();
//! let store = Arc::new(ResultStore::open(&config.db_path)?);
//!
//! let outcome = card_grade::grade_photo(
//!     FileCapture::new("IMG_0042.jpg"),
//!     &config,
//!     store,
//!     Arc::new(TracingPresenter),
//!     &CancelScope::new(),
//! )
//! .await?;
//!
//! if let Some(record) = outcome.record() {
//!     println!("#{}: {}", record.id, record.verdict);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

pub mod capture;
pub mod config;
pub mod error;
pub mod grading;
pub mod processing;
pub mod session;
pub mod store;

/// Re-export error types for convenience
pub use error::{GradeError, GradeResult, HasRecoverySuggestion, HasSeverity};

use capture::CaptureSource;
use config::GradeConfig;
use grading::ChatCompletionGrader;
use processing::Preprocessor;
use session::{CancelScope, CaptureWorkflow, Presenter, WorkflowOutcome};
use store::ResultStore;

/// Grade one photo from `source` with the hosted model described by `config`.
///
/// Setup problems (invalid configuration, missing credential) are returned as
/// errors. Failures during the run itself are reported through `presenter`
/// and come back as [`WorkflowOutcome::Failed`].
pub async fn grade_photo<S: CaptureSource + 'static>(
    source: S,
    config: &GradeConfig,
    store: Arc<ResultStore>,
    presenter: Arc<dyn Presenter>,
    scope: &CancelScope,
) -> GradeResult<WorkflowOutcome> {
    let grader = ChatCompletionGrader::new(config)?;
    info!(source = source.name(), endpoint = grader.endpoint(), "starting grading run");

    let workflow = CaptureWorkflow::builder()
        .with_capture_source(source)
        .with_preprocessor(Preprocessor::from_config(config))
        .with_grader(grader)
        .with_store(store)
        .with_shared_presenter(presenter)
        .build()?;

    Ok(workflow.run_once(scope).await)
}
