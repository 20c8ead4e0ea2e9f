use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandkit_core::models::{
    BusinessProfile, Completeness, GenerationFailure, GenerationReport, GenerationStatus, Output,
    ProfileFacts,
};
use brandkit_core::project::{Project, StageFailure};

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    /// Website to scan, `http` or `https`.
    pub url: String,
    /// Display name; defaults to the URL host.
    pub name: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateProjectResponse {
    pub project_id: Uuid,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StageFailureResponse {
    pub stage: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl From<StageFailure> for StageFailureResponse {
    fn from(failure: StageFailure) -> Self {
        Self {
            stage: failure.stage.to_string(),
            kind: failure.kind,
            reason: failure.reason.map(|r| r.to_string()),
            message: failure.message,
            at: failure.at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub url: String,
    pub name: String,
    pub stage: String,
    pub last_failure: Option<StageFailureResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            url: project.url,
            name: project.name,
            stage: project.stage.to_string(),
            last_failure: project.last_failure.map(Into::into),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProfileFactsResponse {
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub offerings: Vec<String>,
    pub additional: BTreeMap<String, String>,
}

impl From<ProfileFacts> for ProfileFactsResponse {
    fn from(facts: ProfileFacts) -> Self {
        Self {
            name: facts.name,
            description: facts.description,
            email: facts.email,
            phone: facts.phone,
            address: facts.address,
            category: facts.category,
            offerings: facts.offerings,
            additional: facts.additional,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub source_url: String,
    pub facts: ProfileFactsResponse,
    /// `full`, `partial` or `failed`.
    pub completeness: String,
    /// Required facts that could not be found (partial profiles only).
    pub missing: Vec<String>,
    pub summary: Option<String>,
    pub fingerprint: String,
    pub extracted_at: DateTime<Utc>,
}

impl From<BusinessProfile> for ProfileResponse {
    fn from(profile: BusinessProfile) -> Self {
        let missing = match &profile.completeness {
            Completeness::Partial { missing } => missing.clone(),
            _ => Vec::new(),
        };
        Self {
            source_url: profile.source_url,
            facts: profile.facts.into(),
            completeness: profile.completeness.label().to_string(),
            missing,
            summary: profile.summary,
            fingerprint: profile.fingerprint,
            extracted_at: profile.extracted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GenerateRequest {
    /// Output types, e.g. `["ad_copy", "tagline"]`.
    pub output_types: Vec<String>,
    /// Overrides for profile facts; unknown keys become additional facts.
    #[serde(default)]
    pub optional_details: Option<BTreeMap<String, String>>,
    /// ISO 639-1 code, e.g. `en`.
    pub language: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FailureResponse {
    pub reason: String,
    pub message: String,
}

impl From<GenerationFailure> for FailureResponse {
    fn from(failure: GenerationFailure) -> Self {
        Self {
            reason: failure.reason.to_string(),
            message: failure.message,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GenerationReportResponse {
    pub outputs: BTreeMap<String, String>,
    pub failures: BTreeMap<String, FailureResponse>,
}

impl From<GenerationReport> for GenerationReportResponse {
    fn from(report: GenerationReport) -> Self {
        Self {
            outputs: report
                .outputs
                .into_iter()
                .map(|(t, text)| (t.to_string(), text))
                .collect(),
            failures: report
                .failures
                .into_iter()
                .map(|(t, f)| (t.to_string(), f.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OutputResponse {
    pub output_type: String,
    pub language: String,
    pub content: String,
    /// `succeeded` or `failed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureResponse>,
    pub generated_at: DateTime<Utc>,
}

impl From<Output> for OutputResponse {
    fn from(output: Output) -> Self {
        let (status, failure) = match output.status {
            GenerationStatus::Succeeded => ("succeeded", None),
            GenerationStatus::Failed { reason, message } => (
                "failed",
                Some(FailureResponse {
                    reason: reason.to_string(),
                    message,
                }),
            ),
        };
        Self {
            output_type: output.output_type.to_string(),
            language: output.language.to_string(),
            content: output.content,
            status: status.to_string(),
            failure,
            generated_at: output.generated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OutputListResponse {
    pub outputs: Vec<OutputResponse>,
    pub total: usize,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ExportQuery {
    /// `pdf`, `html` or `docx`.
    pub format: Option<String>,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `memory` or `postgres`.
    pub store: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Stable error kind, e.g. `not_found` or `upstream_failure`.
    pub error: String,
    /// Upstream reason, present for upstream failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub message: String,
}
