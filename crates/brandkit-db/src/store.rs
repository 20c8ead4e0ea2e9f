use brandkit_core::error::AppError;
use brandkit_core::memory::MemoryStore;
use brandkit_core::models::{BusinessProfile, Output};
use brandkit_core::project::Project;
use brandkit_core::traits::ProjectStore;
use uuid::Uuid;

use crate::repository::ProjectRepository;

/// A project store picked at startup: in-process memory or Postgres.
#[derive(Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    Postgres(ProjectRepository),
}

impl AnyStore {
    pub fn backend(&self) -> &'static str {
        match self {
            AnyStore::Memory(_) => "memory",
            AnyStore::Postgres(_) => "postgres",
        }
    }

    /// Connectivity check; the memory backend is always reachable.
    pub async fn health_check(&self) -> Result<(), AppError> {
        match self {
            AnyStore::Memory(_) => Ok(()),
            AnyStore::Postgres(repo) => repo.health_check().await,
        }
    }
}

impl From<MemoryStore> for AnyStore {
    fn from(store: MemoryStore) -> Self {
        AnyStore::Memory(store)
    }
}

impl From<ProjectRepository> for AnyStore {
    fn from(repo: ProjectRepository) -> Self {
        AnyStore::Postgres(repo)
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyStore::Memory($store) => $call.await,
            AnyStore::Postgres($store) => $call.await,
        }
    };
}

impl ProjectStore for AnyStore {
    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        dispatch!(self, s => s.insert_project(project))
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        dispatch!(self, s => s.get_project(id))
    }

    async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        dispatch!(self, s => s.list_projects())
    }

    async fn update_project(&self, project: &Project) -> Result<(), AppError> {
        dispatch!(self, s => s.update_project(project))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, AppError> {
        dispatch!(self, s => s.delete_project(id))
    }

    async fn get_profile(&self, project_id: Uuid) -> Result<Option<BusinessProfile>, AppError> {
        dispatch!(self, s => s.get_profile(project_id))
    }

    async fn replace_profile(
        &self,
        project: &Project,
        profile: &BusinessProfile,
    ) -> Result<(), AppError> {
        dispatch!(self, s => s.replace_profile(project, profile))
    }

    async fn list_outputs(&self, project_id: Uuid) -> Result<Vec<Output>, AppError> {
        dispatch!(self, s => s.list_outputs(project_id))
    }

    async fn commit_outputs(&self, project: &Project, outputs: &[Output]) -> Result<(), AppError> {
        dispatch!(self, s => s.commit_outputs(project, outputs))
    }
}
