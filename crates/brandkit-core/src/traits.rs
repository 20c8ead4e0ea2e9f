use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    BusinessProfile, ExportFormat, ExportedDocument, FetchedPage, Output, ProfileFacts,
};
use crate::project::Project;
use crate::prompt::Prompt;

/// Fetches a web page.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// Converts raw HTML into clean Markdown text.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// Pulls business facts out of an HTML document.
///
/// Infallible on purpose: malformed markup yields fewer facts, never an error.
pub trait PageParser: Send + Sync + Clone {
    fn parse(&self, url: &str, html: &str) -> ProfileFacts;
}

/// Produces a [`BusinessProfile`] for a website.
pub trait ProfileExtractor: Send + Sync + Clone + 'static {
    fn extract(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<BusinessProfile, AppError>> + Send;
}

/// Text-generation backend (an LLM behind some API).
pub trait TextBackend: Send + Sync + Clone + 'static {
    fn complete(&self, prompt: &Prompt) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Renders current outputs into a downloadable document.
pub trait ExportRenderer: Send + Sync + Clone + 'static {
    fn render(
        &self,
        project: &Project,
        outputs: &[Output],
        format: ExportFormat,
    ) -> Result<ExportedDocument, AppError>;
}

/// Persists projects, their profile and their current outputs.
///
/// Commits that touch several entities (`replace_profile`, `commit_outputs`,
/// `delete_project`) must be atomic: readers see all of the change or none of it.
pub trait ProjectStore: Send + Sync + Clone + 'static {
    fn insert_project(&self, project: &Project)
    -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_project(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Project>, AppError>> + Send;

    /// All projects, oldest first.
    fn list_projects(&self) -> impl Future<Output = Result<Vec<Project>, AppError>> + Send;

    /// Overwrites the project row. Fails with `NotFound` if it no longer exists.
    fn update_project(&self, project: &Project)
    -> impl Future<Output = Result<(), AppError>> + Send;

    /// Removes the project with its profile and outputs. Returns false if unknown.
    fn delete_project(&self, id: Uuid) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn get_profile(
        &self,
        project_id: Uuid,
    ) -> impl Future<Output = Result<Option<BusinessProfile>, AppError>> + Send;

    /// Swaps in a new profile and updates the project row in one step.
    fn replace_profile(
        &self,
        project: &Project,
        profile: &BusinessProfile,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Current outputs ordered by (type, language).
    fn list_outputs(
        &self,
        project_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Output>, AppError>> + Send;

    /// Replaces the outputs at the given keys and updates the project row in one step.
    fn commit_outputs(
        &self,
        project: &Project,
        outputs: &[Output],
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
