//! # Capture Workflow
//!
//! Sequences one grading run on a single background task:
//!
//! ```text
//! Idle → Capturing → Preprocessing → Calling → Persisting → Done → Idle
//!            └────────────┴────────────┴───────────┴──→ Failed → Idle
//! ```
//!
//! - **CaptureSource** yields the photo
//! - **Preprocessor** orients, shrinks and re-encodes it on a blocking thread
//! - **Grader** performs the single grading call
//! - **ResultStore** appends the (photo path, verdict) record
//! - **Presenter** shows the stored record, or a message when a step failed
//!
//! Every failure ends the run in `Failed` and hands control back to `Idle`;
//! so does dropping the `run_once` future. Nothing is retried automatically.
//! State changes are published on a `tokio::sync::watch` channel for UIs that
//! want to show progress.
//!
//! ## Cancellation
//!
//! A [`CancelScope`] ties a run to the lifetime of whatever started it. It is
//! honoured while capturing and preprocessing. Once the grading call has been
//! issued the run completes and the record is stored, but nothing is presented
//! if the scope was cancelled in the meantime.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capture::CaptureSource;
use crate::error::{GradeError, GradeResult, HasRecoverySuggestion, classify};
use crate::grading::{Grader, Verdict};
use crate::processing::Preprocessor;
use crate::store::{NewUpload, ResultStore, UploadRecord};

/// Stages of a grading run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Capturing,
    Preprocessing,
    Calling,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Capturing => "capturing",
            WorkflowState::Preprocessing => "preprocessing",
            WorkflowState::Calling => "calling",
            WorkflowState::Persisting => "persisting",
            WorkflowState::Done => "done",
            WorkflowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final result of [`CaptureWorkflow::run_once`].
#[derive(Debug)]
pub enum WorkflowOutcome {
    /// The verdict was stored as this record.
    Done(UploadRecord),
    /// `stage` is the state the run was in when it failed.
    Failed {
        stage: WorkflowState,
        error: GradeError,
    },
}

impl WorkflowOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, WorkflowOutcome::Done(_))
    }

    pub fn record(&self) -> Option<&UploadRecord> {
        match self {
            WorkflowOutcome::Done(record) => Some(record),
            WorkflowOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&GradeError> {
        match self {
            WorkflowOutcome::Done(_) => None,
            WorkflowOutcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Where the workflow sends its user-visible output.
/// Called from the background task, never from inside a workflow step.
pub trait Presenter: Send + Sync {
    /// Navigate to the detail view of a freshly stored record.
    fn show_detail(&self, record: &UploadRecord);

    /// Show a short transient message.
    fn show_message(&self, message: &str);
}

/// Presenter that only writes log events.
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn show_detail(&self, record: &UploadRecord) {
        info!(id = record.id, "grading stored");
    }

    fn show_message(&self, message: &str) {
        info!(%message, "workflow message");
    }
}

/// Cancellation handle shared between a workflow run and its owner.
#[derive(Clone, Debug)]
pub struct CancelScope {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel every run using this scope. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so wait_for only ends on a true value
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Coordinates capture, preprocessing, grading, persistence and presentation.
pub struct CaptureWorkflow {
    source: Arc<dyn CaptureSource>,
    preprocessor: Preprocessor,
    grader: Arc<dyn Grader>,
    store: Arc<ResultStore>,
    presenter: Arc<dyn Presenter>,
    state: watch::Sender<WorkflowState>,
    busy: AtomicBool,
}

impl CaptureWorkflow {
    /// Create a new workflow using the builder pattern.
    pub fn builder() -> CaptureWorkflowBuilder {
        CaptureWorkflowBuilder::new()
    }

    /// Current state.
    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Run one capture on its own background task.
    pub fn spawn(self: &Arc<Self>, scope: CancelScope) -> JoinHandle<WorkflowOutcome> {
        let workflow = Arc::clone(self);
        tokio::spawn(async move { workflow.run_once(&scope).await })
    }

    /// Run one capture to completion. A run started while another is in
    /// flight fails immediately with a state error.
    pub async fn run_once(&self, scope: &CancelScope) -> WorkflowOutcome {
        if self.busy.swap(true, Ordering::AcqRel) {
            let current = self.state();
            let error = GradeError::state(
                current.to_string(),
                "run_once",
                "a grading run is already in progress",
            );
            warn!(%current, "rejected overlapping capture");
            self.presenter.show_message(&classify::user_message(&error));
            return WorkflowOutcome::Failed {
                stage: current,
                error,
            };
        }

        let _run = RunGuard { workflow: self };
        match self.drive(scope).await {
            Ok(record) => {
                self.transition(WorkflowState::Done);
                if scope.is_cancelled() {
                    debug!(id = record.id, "scope cancelled, skipping presentation");
                } else {
                    self.presenter.show_detail(&record);
                }
                WorkflowOutcome::Done(record)
            }
            Err((stage, error)) => {
                warn!(%stage, category = error.category(), %error, "grading run failed");
                self.transition(WorkflowState::Failed);
                if !scope.is_cancelled() {
                    self.presenter.show_message(&failure_message(&error));
                }
                WorkflowOutcome::Failed { stage, error }
            }
        }
    }

    async fn drive(&self, scope: &CancelScope) -> Result<UploadRecord, (WorkflowState, GradeError)> {
        // Capturing
        let stage = WorkflowState::Capturing;
        self.transition(stage);
        Self::ensure_live(scope, stage)?;
        let captured = tokio::select! {
            captured = self.source.capture() => captured.map_err(|e| (stage, e))?,
            _ = scope.cancelled() => return Err((stage, GradeError::cancelled(stage.to_string()))),
        };

        // Preprocessing
        let stage = WorkflowState::Preprocessing;
        self.transition(stage);
        Self::ensure_live(scope, stage)?;
        let preprocessor = self.preprocessor;
        let bytes = captured.bytes;
        let job = tokio::task::spawn_blocking(move || preprocessor.preprocess(&bytes));
        let encoded = tokio::select! {
            joined = job => joined
                .map_err(|e| (stage, GradeError::preprocessing("preprocess task", e.to_string())))?
                .map_err(|e| (stage, e))?,
            _ = scope.cancelled() => return Err((stage, GradeError::cancelled(stage.to_string()))),
        };

        // Calling: not cancellable once issued
        let stage = WorkflowState::Calling;
        self.transition(stage);
        Self::ensure_live(scope, stage)?;
        let verdict = match self.grader.grade(&encoded).await.map_err(|e| (stage, e))? {
            Verdict::Graded(text) => text,
            Verdict::NoValidResponse => {
                return Err((
                    stage,
                    GradeError::grading("the grading service returned no usable verdict"),
                ));
            }
        };

        // Persisting
        let stage = WorkflowState::Persisting;
        self.transition(stage);
        let store = Arc::clone(&self.store);
        let upload = NewUpload::new(captured.path, verdict);
        let record = tokio::task::spawn_blocking(move || store.insert(upload))
            .await
            .map_err(|e| {
                (
                    stage,
                    GradeError::state(stage.to_string(), "insert", e.to_string()),
                )
            })?
            .map_err(|e| (stage, e))?;

        info!(id = record.id, "grading run complete");
        Ok(record)
    }

    fn ensure_live(scope: &CancelScope, stage: WorkflowState) -> Result<(), (WorkflowState, GradeError)> {
        if scope.is_cancelled() {
            return Err((stage, GradeError::cancelled(stage.to_string())));
        }
        Ok(())
    }

    fn transition(&self, next: WorkflowState) {
        let previous = self.state.send_replace(next);
        debug!(from = %previous, to = %next, "workflow transition");
    }
}

/// Returns the workflow to `Idle` and releases the single-flight flag when a
/// run ends, including when the `run_once` future is dropped mid-run.
struct RunGuard<'a> {
    workflow: &'a CaptureWorkflow,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.workflow.transition(WorkflowState::Idle);
        self.workflow.busy.store(false, Ordering::Release);
    }
}

fn failure_message(error: &GradeError) -> String {
    let headline = classify::user_message(error);
    match error.recovery_suggestion() {
        Some(suggestion) => format!("{}. {}", headline, suggestion),
        None => headline,
    }
}

/// Builder for [`CaptureWorkflow`]; the composition root injects every
/// collaborator explicitly.
pub struct CaptureWorkflowBuilder {
    source: Option<Arc<dyn CaptureSource>>,
    preprocessor: Preprocessor,
    grader: Option<Arc<dyn Grader>>,
    store: Option<Arc<ResultStore>>,
    presenter: Arc<dyn Presenter>,
}

impl Default for CaptureWorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureWorkflowBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            preprocessor: Preprocessor::default(),
            grader: None,
            store: None,
            presenter: Arc::new(TracingPresenter),
        }
    }

    /// Set the photo source.
    pub fn with_capture_source<S: CaptureSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Replace the default 1024px / quality 70 preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Set the grading backend.
    pub fn with_grader<G: Grader + 'static>(mut self, grader: G) -> Self {
        self.grader = Some(Arc::new(grader));
        self
    }

    /// Set a grading backend that is shared with other owners.
    pub fn with_shared_grader(mut self, grader: Arc<dyn Grader>) -> Self {
        self.grader = Some(grader);
        self
    }

    /// Set the upload history.
    pub fn with_store(mut self, store: Arc<ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the presenter; defaults to log output only.
    pub fn with_presenter<P: Presenter + 'static>(mut self, presenter: P) -> Self {
        self.presenter = Arc::new(presenter);
        self
    }

    /// Set a presenter that is shared with other owners.
    pub fn with_shared_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn build(self) -> GradeResult<CaptureWorkflow> {
        let source = self.source.ok_or_else(|| {
            GradeError::config("capture_source", "<none>", "no capture source specified")
        })?;
        let grader = self
            .grader
            .ok_or_else(|| GradeError::config("grader", "<none>", "no grader specified"))?;
        let store = self
            .store
            .ok_or_else(|| GradeError::config("store", "<none>", "no result store specified"))?;
        let (state, _rx) = watch::channel(WorkflowState::Idle);

        Ok(CaptureWorkflow {
            source,
            preprocessor: self.preprocessor,
            grader,
            store,
            presenter: self.presenter,
            state,
            busy: AtomicBool::new(false),
        })
    }
}
