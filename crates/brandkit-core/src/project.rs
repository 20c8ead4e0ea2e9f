use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{AppError, UpstreamReason};

/// Lifecycle stage of a project.
///
/// `Scanning` and `Generating` are in-flight markers; the rest are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStage {
    Created,
    Scanning,
    Profiled,
    Generating,
    Generated,
}

impl ProjectStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStage::Created => "created",
            ProjectStage::Scanning => "scanning",
            ProjectStage::Profiled => "profiled",
            ProjectStage::Generating => "generating",
            ProjectStage::Generated => "generated",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ProjectStage::Scanning | ProjectStage::Generating)
    }
}

impl fmt::Display for ProjectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(ProjectStage::Created),
            "scanning" => Ok(ProjectStage::Scanning),
            "profiled" => Ok(ProjectStage::Profiled),
            "generating" => Ok(ProjectStage::Generating),
            "generated" => Ok(ProjectStage::Generated),
            _ => Err(format!("Unknown project stage: {s}")),
        }
    }
}

/// Pipeline stage an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Scan,
    Generate,
    Export,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Scan => "scan",
            Stage::Generate => "generate",
            Stage::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The most recent stage failure recorded on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    /// Stable error kind, see [`AppError::kind`].
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<UpstreamReason>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl StageFailure {
    pub fn from_error(stage: Stage, error: &AppError) -> Self {
        Self {
            stage,
            kind: error.kind().to_string(),
            reason: error.upstream_reason(),
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Root entity: one target website moving through scan, generation and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub url: String,
    pub name: String,
    pub stage: ProjectStage,
    pub last_failure: Option<StageFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Builds a new project in `Created`, validating the URL.
    ///
    /// A missing or blank name defaults to the URL host without `www.`.
    pub fn new(url: &str, name: Option<&str>) -> Result<Self, AppError> {
        let parsed = validate_url(url)?;
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => default_name(&parsed),
        };
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            url: parsed.to_string(),
            name,
            stage: ProjectStage::Created,
            last_failure: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the project to `stage`, bumping `updated_at`.
    pub fn transition(&mut self, stage: ProjectStage) {
        self.stage = stage;
        self.updated_at = Utc::now();
    }
}

/// Accepts only absolute `http`/`https` URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url, AppError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL '{raw}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::InvalidInput(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(AppError::InvalidInput(format!("URL '{raw}' has no host"))),
    }
}

/// Derive a project name from a URL host.
///
/// Example: `"https://www.example.com/about"` → `"example.com"`
pub fn default_name(url: &Url) -> String {
    let host = url.host_str().unwrap_or("project");
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
