//! Project pipeline: scan → profile → generate → export.
//!
//! The pipeline is the only component that mutates project state. Each project
//! has a gate (an async mutex) that is held only while a stage is marked as
//! started or its result is committed; extractor and generator calls run with
//! the gate released. Stages run in spawned tasks, so a caller that stops
//! waiting never leaves a transition half-done.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{AppError, UpstreamReason};
use crate::events::{PipelineEvent, PipelineReporter, TracingReporter};
use crate::generator::{ContentGenerator, parse_request};
use crate::models::{
    BusinessProfile, Completeness, ExportFormat, ExportedDocument, GenerationFailure,
    GenerationReport, Language, Output, OutputType,
};
use crate::project::{Project, ProjectStage, Stage, StageFailure};
use crate::traits::{ExportRenderer, ProfileExtractor, ProjectStore, TextBackend};

/// In-process view of what is running for one project.
#[derive(Debug)]
struct Activity {
    scanning: bool,
    generating: usize,
    /// Stage the project returns to once nothing is in flight.
    settled: ProjectStage,
}

impl Activity {
    fn is_idle(&self) -> bool {
        !self.scanning && self.generating == 0
    }

    fn stage(&self) -> ProjectStage {
        if self.scanning {
            ProjectStage::Scanning
        } else if self.generating > 0 {
            ProjectStage::Generating
        } else {
            self.settled
        }
    }
}

type Gate = Arc<AsyncMutex<Activity>>;

struct Inner<S, X, B, R>
where
    B: TextBackend,
{
    store: S,
    extractor: X,
    generator: ContentGenerator<B>,
    renderer: R,
    config: PipelineConfig,
    gates: Mutex<HashMap<Uuid, Gate>>,
}

/// Orchestrates the lifecycle of projects.
pub struct ProjectPipeline<S, X, B, R>
where
    B: TextBackend,
{
    inner: Arc<Inner<S, X, B, R>>,
    reporter: Arc<dyn PipelineReporter>,
}

impl<S, X, B, R> Clone for ProjectPipeline<S, X, B, R>
where
    B: TextBackend,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

impl<S, X, B, R> ProjectPipeline<S, X, B, R>
where
    S: ProjectStore,
    X: ProfileExtractor,
    B: TextBackend,
    R: ExportRenderer,
{
    /// The generator's call timeout is taken from `config`.
    pub fn new(
        store: S,
        extractor: X,
        generator: ContentGenerator<B>,
        renderer: R,
        config: PipelineConfig,
    ) -> Self {
        let generator = generator.with_timeout(config.generation_timeout);
        Self {
            inner: Arc::new(Inner {
                store,
                extractor,
                generator,
                renderer,
                config,
                gates: Mutex::new(HashMap::new()),
            }),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn PipelineReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn generator(&self) -> &ContentGenerator<B> {
        &self.inner.generator
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub async fn create_project(&self, url: &str, name: Option<&str>) -> Result<Project, AppError> {
        let project = Project::new(url, name)?;
        self.inner.store.insert_project(&project).await?;
        self.reporter.report(PipelineEvent::ProjectCreated {
            project_id: project.id,
            url: &project.url,
        });
        Ok(project)
    }

    pub async fn get_project(&self, project_id: Uuid) -> Result<Project, AppError> {
        self.inner
            .store
            .get_project(project_id)
            .await?
            .ok_or_else(|| project_not_found(project_id))
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        self.inner.store.list_projects().await
    }

    /// Removes the project together with its profile and outputs.
    ///
    /// A stage still in flight for the project fails with `NotFound` when it
    /// tries to commit.
    pub async fn delete_project(&self, project_id: Uuid) -> Result<(), AppError> {
        let gate = self.gate(project_id);
        let _activity = gate.lock().await;

        let deleted = self.inner.store.delete_project(project_id).await?;
        self.gates().remove(&project_id);
        if !deleted {
            return Err(project_not_found(project_id));
        }
        self.reporter
            .report(PipelineEvent::ProjectDeleted { project_id });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scan
    // -----------------------------------------------------------------------

    /// Scans the project's website and replaces its profile.
    ///
    /// Fails with `Conflict` while another scan of the same project is in
    /// flight. On failure the project returns to its previous stage and the
    /// failure is recorded as `last_failure`.
    pub async fn scan_website(&self, project_id: Uuid) -> Result<BusinessProfile, AppError> {
        let pipeline = self.clone();
        run_detached(async move { pipeline.run_scan(project_id).await }).await
    }

    async fn run_scan(&self, project_id: Uuid) -> Result<BusinessProfile, AppError> {
        // Unknown ids must not leave a gate behind.
        self.get_project(project_id).await?;
        let gate = self.gate(project_id);

        let url = {
            let mut activity = gate.lock().await;
            let mut project = self.get_project(project_id).await?;
            if activity.scanning {
                return Err(AppError::Conflict(format!(
                    "A scan is already in progress for project {project_id}"
                )));
            }
            if activity.is_idle() {
                activity.settled = self.settled_stage(&project).await?;
            }
            let from = activity.stage();
            activity.scanning = true;

            project.transition(activity.stage());
            if let Err(e) = self.inner.store.update_project(&project).await {
                activity.scanning = false;
                return Err(e);
            }
            self.report_stage(project_id, from, project.stage);
            project.url
        };

        let result = self.extract(&url).await;

        let mut activity = gate.lock().await;
        activity.scanning = false;
        let mut project = self.get_project(project_id).await?;
        let from = project.stage;

        match result {
            Ok(profile) => {
                let previous = activity.settled;
                activity.settled = ProjectStage::Profiled;
                project.transition(activity.stage());
                project.last_failure = None;
                if let Err(error) = self.inner.store.replace_profile(&project, &profile).await {
                    activity.settled = previous;
                    project.transition(activity.stage());
                    self.settle_failed_commit(&mut project, Stage::Scan, &error)
                        .await;
                    self.report_stage(project_id, from, project.stage);
                    return Err(error);
                }

                self.reporter.report(PipelineEvent::ScanCompleted {
                    project_id,
                    completeness: &profile.completeness,
                });
                self.report_stage(project_id, from, project.stage);
                Ok(profile)
            }
            Err(error) => {
                project.transition(activity.stage());
                project.last_failure = Some(StageFailure::from_error(Stage::Scan, &error));
                self.inner.store.update_project(&project).await?;

                self.reporter.report(PipelineEvent::ScanFailed {
                    project_id,
                    error: &error,
                });
                self.report_stage(project_id, from, project.stage);
                Err(error)
            }
        }
    }

    /// Runs the extractor under the scan timeout. A profile that carries no
    /// usable facts counts as a failure.
    async fn extract(&self, url: &str) -> Result<BusinessProfile, AppError> {
        let timeout = self.inner.config.scan_timeout;
        let profile = match tokio::time::timeout(timeout, self.inner.extractor.extract(url)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::upstream(
                    UpstreamReason::Timeout,
                    format!("Scan of {url} did not finish within {} seconds", timeout.as_secs()),
                ));
            }
        };

        if let Completeness::Failed { reason } = &profile.completeness {
            return Err(AppError::upstream(
                UpstreamReason::UnusableContent,
                format!("No usable business profile at {url}: {reason}"),
            ));
        }
        Ok(profile)
    }

    /// The current profile, or `None` if the project has never been scanned.
    pub async fn find_profile(&self, project_id: Uuid) -> Result<Option<BusinessProfile>, AppError> {
        self.get_project(project_id).await?;
        self.inner.store.get_profile(project_id).await
    }

    pub async fn get_profile(&self, project_id: Uuid) -> Result<BusinessProfile, AppError> {
        self.find_profile(project_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Project {project_id} has not been scanned yet"))
        })
    }

    // -----------------------------------------------------------------------
    // Generate
    // -----------------------------------------------------------------------

    /// Generates one output per requested type in `language`.
    ///
    /// Types are generated concurrently and independently: the report lists
    /// successes and failures side by side. A failure is stored only where
    /// no succeeded output exists for its key.
    pub async fn generate_outputs(
        &self,
        project_id: Uuid,
        output_types: &[String],
        details: BTreeMap<String, String>,
        language: &str,
    ) -> Result<GenerationReport, AppError> {
        let (types, language) = parse_request(output_types, language)?;
        let pipeline = self.clone();
        run_detached(async move {
            pipeline
                .run_generate(project_id, types, details, language)
                .await
        })
        .await
    }

    async fn run_generate(
        &self,
        project_id: Uuid,
        types: Vec<OutputType>,
        details: BTreeMap<String, String>,
        language: Language,
    ) -> Result<GenerationReport, AppError> {
        self.get_project(project_id).await?;
        let gate = self.gate(project_id);

        let profile = {
            let mut activity = gate.lock().await;
            let mut project = self.get_project(project_id).await?;
            let profile = self.inner.store.get_profile(project_id).await?.ok_or_else(|| {
                AppError::PreconditionFailed(format!(
                    "Project {project_id} has no business profile; scan the website first"
                ))
            })?;
            if activity.is_idle() {
                activity.settled = self.settled_stage(&project).await?;
            }
            let from = activity.stage();
            activity.generating += 1;

            project.transition(activity.stage());
            if let Err(e) = self.inner.store.update_project(&project).await {
                activity.generating -= 1;
                return Err(e);
            }
            self.report_stage(project_id, from, project.stage);
            profile
        };

        let report = self
            .generate_all(project_id, profile, &types, details, language)
            .await;

        let mut activity = gate.lock().await;
        activity.generating -= 1;
        let mut project = self.get_project(project_id).await?;
        let from = project.stage;

        let succeeded: BTreeSet<OutputType> = self
            .inner
            .store
            .list_outputs(project_id)
            .await?
            .into_iter()
            .filter(|o| o.language == language && o.is_succeeded())
            .map(|o| o.output_type)
            .collect();

        let mut commit = Vec::with_capacity(types.len());
        for (output_type, content) in &report.outputs {
            commit.push(Output::succeeded(
                project_id,
                *output_type,
                language,
                content.clone(),
            ));
        }
        for (output_type, failure) in &report.failures {
            if !succeeded.contains(output_type) {
                commit.push(Output::failed(project_id, *output_type, language, failure));
            }
        }

        let previous = activity.settled;
        if report.any_succeeded() {
            activity.settled = ProjectStage::Generated;
            project.last_failure = None;
        } else if let Some(failure) = report.failures.values().next() {
            let error = AppError::upstream(failure.reason, failure.message.clone());
            project.last_failure = Some(StageFailure::from_error(Stage::Generate, &error));
        }
        project.transition(activity.stage());
        if let Err(error) = self.inner.store.commit_outputs(&project, &commit).await {
            activity.settled = previous;
            project.transition(activity.stage());
            self.settle_failed_commit(&mut project, Stage::Generate, &error)
                .await;
            self.report_stage(project_id, from, project.stage);
            return Err(error);
        }
        self.report_stage(project_id, from, project.stage);

        Ok(report)
    }

    /// Generates every type against one profile snapshot, bounded by
    /// `max_parallel_generations`.
    async fn generate_all(
        &self,
        project_id: Uuid,
        profile: BusinessProfile,
        types: &[OutputType],
        details: BTreeMap<String, String>,
        language: Language,
    ) -> GenerationReport {
        let profile = Arc::new(profile);
        let details = Arc::new(details);
        let permits = Arc::new(Semaphore::new(self.inner.config.max_parallel_generations.max(1)));
        let mut tasks = JoinSet::new();

        for &output_type in types {
            let generator = self.inner.generator.clone();
            let profile = Arc::clone(&profile);
            let details = Arc::clone(&details);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = generator
                    .generate_for(&profile, output_type, &details, language)
                    .await;
                (output_type, result)
            });
        }

        let mut report = GenerationReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((output_type, Ok(content))) => {
                    self.reporter.report(PipelineEvent::OutputGenerated {
                        project_id,
                        output_type,
                        language,
                        chars: content.chars().count(),
                    });
                    report.outputs.insert(output_type, content);
                }
                Ok((output_type, Err(error))) => {
                    self.reporter.report(PipelineEvent::OutputFailed {
                        project_id,
                        output_type,
                        language,
                        error: &error,
                    });
                    report
                        .failures
                        .insert(output_type, GenerationFailure::from(&error));
                }
                Err(e) => tracing::error!(error = %e, "Generation task failed"),
            }
        }

        // a panicked task loses its type; report it as an internal failure
        for &output_type in types {
            if !report.outputs.contains_key(&output_type)
                && !report.failures.contains_key(&output_type)
            {
                report.failures.insert(
                    output_type,
                    GenerationFailure {
                        reason: UpstreamReason::Internal,
                        message: "Generation task failed".to_string(),
                    },
                );
            }
        }
        report
    }

    /// Current outputs ordered by (type, language).
    pub async fn get_outputs(&self, project_id: Uuid) -> Result<Vec<Output>, AppError> {
        self.get_project(project_id).await?;
        self.inner.store.list_outputs(project_id).await
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Renders the current succeeded outputs; `format` is `pdf`, `html` or `docx`.
    pub async fn export_project(
        &self,
        project_id: Uuid,
        format: &str,
    ) -> Result<ExportedDocument, AppError> {
        let format: ExportFormat = format.parse()?;
        self.export(project_id, format).await
    }

    pub async fn export(
        &self,
        project_id: Uuid,
        format: ExportFormat,
    ) -> Result<ExportedDocument, AppError> {
        let project = self.get_project(project_id).await?;
        let outputs: Vec<Output> = self
            .inner
            .store
            .list_outputs(project_id)
            .await?
            .into_iter()
            .filter(Output::is_succeeded)
            .collect();

        if outputs.is_empty() {
            return Err(AppError::PreconditionFailed(format!(
                "Project {project_id} has no generated outputs to export"
            )));
        }

        let document = self.inner.renderer.render(&project, &outputs, format)?;
        self.reporter.report(PipelineEvent::Exported {
            project_id,
            format,
            outputs: document.included.len(),
            bytes: document.bytes.len(),
        });
        Ok(document)
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------

    /// Settles projects persisted in a transient stage by a process that
    /// stopped mid-stage. Returns how many projects were recovered.
    pub async fn recover_interrupted(&self) -> Result<usize, AppError> {
        let mut recovered = 0;

        for mut project in self.inner.store.list_projects().await? {
            if !project.stage.is_transient() {
                continue;
            }
            let gate = self.gate(project.id);
            let activity = gate.lock().await;
            if !activity.is_idle() {
                continue;
            }

            let from = project.stage;
            let stage = if from == ProjectStage::Scanning {
                Stage::Scan
            } else {
                Stage::Generate
            };
            let error = AppError::upstream(
                UpstreamReason::Interrupted,
                format!("Service stopped while the {stage} stage was running"),
            );

            project.transition(self.settled_stage(&project).await?);
            project.last_failure = Some(StageFailure::from_error(stage, &error));
            self.inner.store.update_project(&project).await?;

            self.reporter.report(PipelineEvent::Recovered {
                project_id: project.id,
                from,
                to: project.stage,
            });
            recovered += 1;
        }
        Ok(recovered)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn gates(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Gate>> {
        self.inner
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gate(&self, project_id: Uuid) -> Gate {
        Arc::clone(self.gates().entry(project_id).or_insert_with(|| {
            Arc::new(AsyncMutex::new(Activity {
                scanning: false,
                generating: 0,
                settled: ProjectStage::Created,
            }))
        }))
    }

    /// Records a failed commit on the project row so the stored stage never
    /// stays transient. Best effort: a second write error is only logged.
    async fn settle_failed_commit(&self, project: &mut Project, stage: Stage, error: &AppError) {
        project.last_failure = Some(StageFailure::from_error(stage, error));
        if let Err(e) = self.inner.store.update_project(project).await {
            tracing::warn!(
                project_id = %project.id,
                %stage,
                error = %e,
                "Failed to settle project after a failed commit"
            );
        }
    }

    /// The stored stage, or for a transient one, the stage its data supports.
    async fn settled_stage(&self, project: &Project) -> Result<ProjectStage, AppError> {
        if !project.stage.is_transient() {
            return Ok(project.stage);
        }
        let store = &self.inner.store;
        if store
            .list_outputs(project.id)
            .await?
            .iter()
            .any(Output::is_succeeded)
        {
            Ok(ProjectStage::Generated)
        } else if store.get_profile(project.id).await?.is_some() {
            Ok(ProjectStage::Profiled)
        } else {
            Ok(ProjectStage::Created)
        }
    }

    fn report_stage(&self, project_id: Uuid, from: ProjectStage, to: ProjectStage) {
        if from != to {
            self.reporter
                .report(PipelineEvent::StageChanged { project_id, from, to });
        }
    }
}

fn project_not_found(project_id: Uuid) -> AppError {
    AppError::NotFound(format!("Project not found: {project_id}"))
}

/// Runs a stage on its own task so it completes even if the caller goes away.
async fn run_detached<T, F>(stage: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(stage)
        .await
        .map_err(|e| AppError::Internal(format!("Stage task failed: {e}")))?
}
