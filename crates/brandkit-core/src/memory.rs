use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{BusinessProfile, Output, OutputKey};
use crate::project::Project;
use crate::traits::ProjectStore;

#[derive(Debug, Clone)]
struct ProjectRecord {
    project: Project,
    profile: Option<Arc<BusinessProfile>>,
    outputs: BTreeMap<OutputKey, Output>,
}

/// Process-local [`ProjectStore`].
///
/// Each project's profile and outputs live next to the project row under one
/// lock, so every commit is a single swap under the write guard.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<Uuid, ProjectRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, ProjectRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, ProjectRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn missing(id: Uuid) -> AppError {
    AppError::NotFound(format!("Project not found: {id}"))
}

impl ProjectStore for MemoryStore {
    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        let mut records = self.write();
        if records.contains_key(&project.id) {
            return Err(AppError::Conflict(format!(
                "Project already exists: {}",
                project.id
            )));
        }
        records.insert(
            project.id,
            ProjectRecord {
                project: project.clone(),
                profile: None,
                outputs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        Ok(self.read().get(&id).map(|r| r.project.clone()))
    }

    async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let mut projects: Vec<_> = self.read().values().map(|r| r.project.clone()).collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn update_project(&self, project: &Project) -> Result<(), AppError> {
        let mut records = self.write();
        let record = records.get_mut(&project.id).ok_or_else(|| missing(project.id))?;
        record.project = project.clone();
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.write().remove(&id).is_some())
    }

    async fn get_profile(&self, project_id: Uuid) -> Result<Option<BusinessProfile>, AppError> {
        Ok(self
            .read()
            .get(&project_id)
            .and_then(|r| r.profile.as_deref().cloned()))
    }

    async fn replace_profile(
        &self,
        project: &Project,
        profile: &BusinessProfile,
    ) -> Result<(), AppError> {
        let mut records = self.write();
        let record = records.get_mut(&project.id).ok_or_else(|| missing(project.id))?;
        record.project = project.clone();
        record.profile = Some(Arc::new(profile.clone()));
        Ok(())
    }

    async fn list_outputs(&self, project_id: Uuid) -> Result<Vec<Output>, AppError> {
        Ok(self
            .read()
            .get(&project_id)
            .map(|r| r.outputs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit_outputs(&self, project: &Project, outputs: &[Output]) -> Result<(), AppError> {
        let mut records = self.write();
        let record = records.get_mut(&project.id).ok_or_else(|| missing(project.id))?;
        record.project = project.clone();
        for output in outputs {
            record.outputs.insert(output.key(), output.clone());
        }
        Ok(())
    }
}
