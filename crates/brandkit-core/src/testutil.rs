//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::error::{AppError, UpstreamReason};
use crate::events::{PipelineEvent, PipelineReporter};
use crate::memory::MemoryStore;
use crate::models::{
    BusinessProfile, ExportFormat, ExportedDocument, FetchedPage, Output, OutputType,
    ProfileFacts,
};
use crate::project::Project;
use crate::prompt::Prompt;
use crate::traits::{
    Cleaner, ExportRenderer, Fetcher, PageParser, ProfileExtractor, ProjectStore, TextBackend,
};

/// Rebuilds an error from its parts so one configured failure can be returned many times.
fn error_parts(error: AppError) -> (UpstreamReason, String) {
    match error {
        AppError::Upstream { reason, message } => (reason, message),
        other => (UpstreamReason::Internal, other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable page.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML page.
    responses: Arc<Mutex<Vec<Result<FetchedPage, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_page(FetchedPage {
            url: "https://example.com/".to_string(),
            body: html.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
        })
    }

    pub fn with_page(page: FetchedPage) -> Self {
        Self::with_responses(vec![Ok(page)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<FetchedPage, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(FetchedPage {
                url: url.to_string(),
                body: "<html><body>default</body></html>".to_string(),
                content_type: Some("text/html".to_string()),
            })
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Mock parser that returns the same facts for every page.
#[derive(Clone)]
pub struct MockParser {
    facts: ProfileFacts,
}

impl MockParser {
    pub fn new(facts: ProfileFacts) -> Self {
        Self { facts }
    }
}

impl PageParser for MockParser {
    fn parse(&self, _url: &str, _html: &str) -> ProfileFacts {
        self.facts.clone()
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that returns the input unchanged, or a one-shot error.
#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Facts of the default extracted profile: complete, named "Example Co".
pub fn example_facts() -> ProfileFacts {
    ProfileFacts {
        name: Some("Example Co".into()),
        description: Some("Neighbourhood bakery".into()),
        email: Some("hello@example.com".into()),
        ..Default::default()
    }
}

pub fn example_profile() -> BusinessProfile {
    BusinessProfile::from_facts("https://example.com/", example_facts(), None)
}

/// Mock profile extractor with a queue of results and an optional delay.
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<BusinessProfile, AppError>>>>,
    delay: Option<Duration>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    /// Returns [`example_profile`] for every call.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_profile(profile: BusinessProfile) -> Self {
        Self::with_responses(vec![Ok(profile)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<BusinessProfile, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            delay: None,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileExtractor for MockExtractor {
    async fn extract(&self, url: &str) -> Result<BusinessProfile, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = {
            let mut responses = self.responses.lock().unwrap();
            (!responses.is_empty()).then(|| responses.remove(0))
        };
        next.unwrap_or_else(|| Ok(example_profile()))
    }
}

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// Mock text backend.
///
/// Answers every prompt with the configured text, unless the prompt is for an
/// output type registered with [`MockBackend::failing_for`].
#[derive(Clone)]
pub struct MockBackend {
    text: Arc<Mutex<String>>,
    failure: Option<(UpstreamReason, String)>,
    failing: Arc<Mutex<HashMap<OutputType, UpstreamReason>>>,
    delay: Option<Duration>,
    pub prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl MockBackend {
    pub fn new(text: &str) -> Self {
        Self {
            text: Arc::new(Mutex::new(text.to_string())),
            failure: None,
            failing: Arc::new(Mutex::new(HashMap::new())),
            delay: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails every call with `error`.
    pub fn with_error(error: AppError) -> Self {
        let mut backend = Self::new("");
        backend.failure = Some(error_parts(error));
        backend
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails prompts for `output_type` with `reason`.
    pub fn failing_for(self, output_type: OutputType, reason: UpstreamReason) -> Self {
        self.failing.lock().unwrap().insert(output_type, reason);
        self
    }

    /// Changes the text returned by subsequent calls.
    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl TextBackend for MockBackend {
    async fn complete(&self, prompt: &Prompt) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((reason, message)) = &self.failure {
            return Err(AppError::upstream(*reason, message.clone()));
        }
        let failing = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| prompt.user.starts_with(t.brief()))
            .map(|(t, reason)| (*t, *reason));
        if let Some((output_type, reason)) = failing {
            return Err(AppError::upstream(
                reason,
                format!("mock failure for {output_type}"),
            ));
        }
        Ok(self.text.lock().unwrap().clone())
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// Mock renderer: one line per output, in the order received after sorting.
#[derive(Clone, Default)]
pub struct MockRenderer {
    pub rendered: Arc<Mutex<Vec<usize>>>,
}

impl ExportRenderer for MockRenderer {
    fn render(
        &self,
        project: &Project,
        outputs: &[Output],
        format: ExportFormat,
    ) -> Result<ExportedDocument, AppError> {
        self.rendered.lock().unwrap().push(outputs.len());
        let mut sorted: Vec<&Output> = outputs.iter().collect();
        sorted.sort_by_key(|o| o.key());

        let body: String = sorted
            .iter()
            .map(|o| format!("{}/{}: {}\n", o.output_type, o.language, o.content))
            .collect();
        Ok(ExportedDocument {
            project_id: project.id,
            format,
            included: sorted.iter().map(|o| o.key()).collect(),
            bytes: body.into_bytes(),
            content_type: format.content_type(),
            file_name: format!("{}.{}", project.name, format.as_str()),
        })
    }
}

// ---------------------------------------------------------------------------
// FailingCommitStore
// ---------------------------------------------------------------------------

/// `MemoryStore` whose multi-entity commits can be made to fail, the way a
/// database rejecting the write would. Plain project updates still succeed.
#[derive(Clone, Default)]
pub struct FailingCommitStore {
    pub inner: MemoryStore,
    fail_profiles: Arc<AtomicBool>,
    fail_outputs: Arc<AtomicBool>,
}

impl FailingCommitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_profile_commits(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    pub fn fail_output_commits(&self, fail: bool) {
        self.fail_outputs.store(fail, Ordering::SeqCst);
    }

    fn rejected() -> AppError {
        AppError::DatabaseError("invalid byte sequence for encoding \"UTF8\": 0x00".into())
    }
}

impl ProjectStore for FailingCommitStore {
    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        self.inner.insert_project(project).await
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        self.inner.get_project(id).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        self.inner.list_projects().await
    }

    async fn update_project(&self, project: &Project) -> Result<(), AppError> {
        self.inner.update_project(project).await
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_project(id).await
    }

    async fn get_profile(&self, project_id: Uuid) -> Result<Option<BusinessProfile>, AppError> {
        self.inner.get_profile(project_id).await
    }

    async fn replace_profile(
        &self,
        project: &Project,
        profile: &BusinessProfile,
    ) -> Result<(), AppError> {
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.inner.replace_profile(project, profile).await
    }

    async fn list_outputs(&self, project_id: Uuid) -> Result<Vec<Output>, AppError> {
        self.inner.list_outputs(project_id).await
    }

    async fn commit_outputs(&self, project: &Project, outputs: &[Output]) -> Result<(), AppError> {
        if self.fail_outputs.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.inner.commit_outputs(project, outputs).await
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock pipeline reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineReporter for MockReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        let label = match &event {
            PipelineEvent::ProjectCreated { .. } => "ProjectCreated".to_string(),
            PipelineEvent::StageChanged { to, .. } => format!("StageChanged:{to}"),
            PipelineEvent::ScanCompleted { .. } => "ScanCompleted".to_string(),
            PipelineEvent::ScanFailed { .. } => "ScanFailed".to_string(),
            PipelineEvent::OutputGenerated { output_type, .. } => {
                format!("OutputGenerated:{output_type}")
            }
            PipelineEvent::OutputFailed { output_type, .. } => {
                format!("OutputFailed:{output_type}")
            }
            PipelineEvent::Exported { format, .. } => format!("Exported:{format}"),
            PipelineEvent::ProjectDeleted { .. } => "ProjectDeleted".to_string(),
            PipelineEvent::Recovered { to, .. } => format!("Recovered:{to}"),
        };
        self.events.lock().unwrap().push(label);
    }
}
