use brandkit_core::error::{AppError, UpstreamReason};
use brandkit_core::models::{
    BusinessProfile, Completeness, GenerationStatus, Language, Output, OutputType, ProfileFacts,
};
use brandkit_core::project::{Project, ProjectStage, StageFailure};
use brandkit_core::traits::ProjectStore;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// [`ProjectStore`] backed by PostgreSQL.
///
/// Profile replacement and output commits run in one transaction together with
/// the project row update.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> AppError {
    tracing::warn!(error = %e, "Database query failed");
    AppError::DatabaseError(e.to_string())
}

fn missing(id: Uuid) -> AppError {
    AppError::NotFound(format!("Project not found: {id}"))
}

/// Overwrites the mutable columns of a project row, returning the rows touched.
async fn write_project<'e, E: PgExecutor<'e>>(
    executor: E,
    project: &Project,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE projects
        SET name = $2, stage = $3, last_failure = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(project.stage.as_str())
    .bind(project.last_failure.as_ref().map(Json))
    .bind(project.updated_at)
    .execute(executor)
    .await
    .map_err(db_error)?;

    Ok(result.rows_affected())
}

impl ProjectStore for ProjectRepository {
    async fn insert_project(&self, project: &Project) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, url, name, stage, last_failure, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(project.id)
        .bind(&project.url)
        .bind(&project.name)
        .bind(project.stage.as_str())
        .bind(project.last_failure.as_ref().map(Json))
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Project already exists: {}", project.id))
            }
            _ => db_error(e),
        })?;

        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        let row = sqlx::query_as::<_, ProjectRow>(r#"SELECT * FROM projects WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(Project::try_from).transpose()
    }

    async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let rows =
            sqlx::query_as::<_, ProjectRow>(r#"SELECT * FROM projects ORDER BY created_at, id"#)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        rows.into_iter().map(Project::try_from).collect()
    }

    async fn update_project(&self, project: &Project) -> Result<(), AppError> {
        if write_project(&self.pool, project).await? == 0 {
            return Err(missing(project.id));
        }
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, AppError> {
        // profile and outputs go with it via ON DELETE CASCADE
        let result = sqlx::query(r#"DELETE FROM projects WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_profile(&self, project_id: Uuid) -> Result<Option<BusinessProfile>, AppError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT source_url, facts, summary, completeness, fingerprint, extracted_at
            FROM business_profiles
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn replace_profile(
        &self,
        project: &Project,
        profile: &BusinessProfile,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if write_project(&mut *tx, project).await? == 0 {
            return Err(missing(project.id));
        }

        sqlx::query(
            r#"
            INSERT INTO business_profiles
                (project_id, source_url, facts, summary, completeness, fingerprint, extracted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (project_id) DO UPDATE SET
                source_url = EXCLUDED.source_url,
                facts = EXCLUDED.facts,
                summary = EXCLUDED.summary,
                completeness = EXCLUDED.completeness,
                fingerprint = EXCLUDED.fingerprint,
                extracted_at = EXCLUDED.extracted_at
            "#,
        )
        .bind(project.id)
        .bind(&profile.source_url)
        .bind(Json(&profile.facts))
        .bind(profile.summary.as_deref())
        .bind(Json(&profile.completeness))
        .bind(&profile.fingerprint)
        .bind(profile.extracted_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(
            project_id = %project.id,
            completeness = profile.completeness.label(),
            "Replaced business profile"
        );
        Ok(())
    }

    async fn list_outputs(&self, project_id: Uuid) -> Result<Vec<Output>, AppError> {
        let rows = sqlx::query_as::<_, OutputRow>(
            r#"
            SELECT project_id, output_type, language, content, status,
                   failure_reason, failure_message, generated_at
            FROM outputs
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut outputs = rows
            .into_iter()
            .map(Output::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // enum order, not the column's text order
        outputs.sort_by_key(Output::key);
        Ok(outputs)
    }

    async fn commit_outputs(&self, project: &Project, outputs: &[Output]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        if write_project(&mut *tx, project).await? == 0 {
            return Err(missing(project.id));
        }

        for output in outputs {
            let (status, reason, message) = match &output.status {
                GenerationStatus::Succeeded => ("succeeded", None, None),
                GenerationStatus::Failed { reason, message } => {
                    ("failed", Some(reason.as_str()), Some(message.as_str()))
                }
            };

            sqlx::query(
                r#"
                INSERT INTO outputs
                    (project_id, output_type, language, content, status,
                     failure_reason, failure_message, generated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (project_id, output_type, language) DO UPDATE SET
                    content = EXCLUDED.content,
                    status = EXCLUDED.status,
                    failure_reason = EXCLUDED.failure_reason,
                    failure_message = EXCLUDED.failure_message,
                    generated_at = EXCLUDED.generated_at
                "#,
            )
            .bind(project.id)
            .bind(output.output_type.as_str())
            .bind(output.language.code())
            .bind(&output.content)
            .bind(status)
            .bind(reason)
            .bind(message)
            .bind(output.generated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(
            project_id = %project.id,
            outputs = outputs.len(),
            stage = %project.stage,
            "Committed outputs"
        );
        Ok(())
    }
}

// -- Row types --

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    url: String,
    name: String,
    stage: String,
    last_failure: Option<Json<StageFailure>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let stage: ProjectStage = row.stage.parse().map_err(AppError::DatabaseError)?;
        Ok(Project {
            id: row.id,
            url: row.url,
            name: row.name,
            stage,
            last_failure: row.last_failure.map(|Json(f)| f),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    source_url: String,
    facts: Json<ProfileFacts>,
    summary: Option<String>,
    completeness: Json<Completeness>,
    fingerprint: String,
    extracted_at: DateTime<Utc>,
}

impl From<ProfileRow> for BusinessProfile {
    fn from(row: ProfileRow) -> Self {
        BusinessProfile {
            source_url: row.source_url,
            facts: row.facts.0,
            summary: row.summary,
            completeness: row.completeness.0,
            fingerprint: row.fingerprint,
            extracted_at: row.extracted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OutputRow {
    project_id: Uuid,
    output_type: String,
    language: String,
    content: String,
    status: String,
    failure_reason: Option<String>,
    failure_message: Option<String>,
    generated_at: DateTime<Utc>,
}

impl TryFrom<OutputRow> for Output {
    type Error = AppError;

    fn try_from(row: OutputRow) -> Result<Self, Self::Error> {
        let corrupt = |e: AppError| AppError::DatabaseError(format!("Corrupt output row: {e}"));
        let output_type: OutputType = row.output_type.parse().map_err(corrupt)?;
        let language: Language = row.language.parse().map_err(corrupt)?;

        let status = match row.status.as_str() {
            "succeeded" => GenerationStatus::Succeeded,
            "failed" => GenerationStatus::Failed {
                reason: row
                    .failure_reason
                    .as_deref()
                    .unwrap_or("internal")
                    .parse::<UpstreamReason>()
                    .map_err(AppError::DatabaseError)?,
                message: row.failure_message.unwrap_or_default(),
            },
            other => {
                return Err(AppError::DatabaseError(format!(
                    "Unknown output status: {other}"
                )));
            }
        };

        Ok(Output {
            project_id: row.project_id,
            output_type,
            language,
            content: row.content,
            status,
            generated_at: row.generated_at,
        })
    }
}
