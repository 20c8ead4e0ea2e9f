use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, UpstreamReason};

// ---------------------------------------------------------------------------
// Business profile
// ---------------------------------------------------------------------------

/// Well-known business facts. Everything else lands in [`ProfileFacts::additional`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Description,
    Email,
    Phone,
    Address,
    Category,
    Offerings,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        ProfileField::Name,
        ProfileField::Description,
        ProfileField::Email,
        ProfileField::Phone,
        ProfileField::Address,
        ProfileField::Category,
        ProfileField::Offerings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Description => "description",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
            ProfileField::Address => "address",
            ProfileField::Category => "category",
            ProfileField::Offerings => "offerings",
        }
    }

    /// Case-insensitive lookup of a well-known field name.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }
}

/// Structured facts extracted from a website.
///
/// Absent facts are `None`/empty, never placeholder values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offerings: Vec<String>,
    /// Facts without a dedicated field (tagline, social links, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, String>,
}

impl ProfileFacts {
    pub fn is_empty(&self) -> bool {
        ProfileField::ALL.iter().all(|f| self.get(*f).is_none()) && self.additional.is_empty()
    }

    /// Returns the value of a well-known field; offerings are comma-joined.
    pub fn get(&self, field: ProfileField) -> Option<String> {
        match field {
            ProfileField::Name => self.name.clone(),
            ProfileField::Description => self.description.clone(),
            ProfileField::Email => self.email.clone(),
            ProfileField::Phone => self.phone.clone(),
            ProfileField::Address => self.address.clone(),
            ProfileField::Category => self.category.clone(),
            ProfileField::Offerings => {
                (!self.offerings.is_empty()).then(|| self.offerings.join(", "))
            }
        }
    }

    /// Replaces a well-known field. `offerings` is split on commas.
    pub fn set(&mut self, field: ProfileField, value: &str) {
        let value = value.trim().to_string();
        match field {
            ProfileField::Name => self.name = Some(value),
            ProfileField::Description => self.description = Some(value),
            ProfileField::Email => self.email = Some(value),
            ProfileField::Phone => self.phone = Some(value),
            ProfileField::Address => self.address = Some(value),
            ProfileField::Category => self.category = Some(value),
            ProfileField::Offerings => {
                self.offerings = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
        }
    }

    /// Applies caller-supplied details on top of the extracted facts.
    ///
    /// Keys naming a well-known field replace that field; any other key is
    /// written to `additional`, replacing an existing entry. Keys are trimmed
    /// and lowercased, blank values are ignored. The extracted facts are not
    /// modified.
    pub fn overlay(&self, details: &BTreeMap<String, String>) -> ProfileFacts {
        let mut facts = self.clone();
        for (key, value) in details {
            if value.trim().is_empty() {
                continue;
            }
            match ProfileField::parse(key) {
                Some(field) => facts.set(field, value),
                None => {
                    let key = key.trim().to_lowercase();
                    if !key.is_empty() {
                        facts.additional.insert(key, value.trim().to_string());
                    }
                }
            }
        }
        facts
    }

    /// Labels of the required-for-full facts that are missing.
    ///
    /// Required: `name`, `description`, and a contact (`email` or `phone`).
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name".to_string());
        }
        if self.description.is_none() {
            missing.push("description".to_string());
        }
        if self.email.is_none() && self.phone.is_none() {
            missing.push("contact".to_string());
        }
        missing
    }

    /// SHA-256 over the canonical JSON form; equal facts give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        compute_hash(&serde_json::to_string(self).unwrap_or_default())
    }
}

/// How much of the profile could be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completeness {
    Full,
    Partial { missing: Vec<String> },
    Failed { reason: String },
}

impl Completeness {
    pub fn assess(facts: &ProfileFacts) -> Self {
        if facts.is_empty() {
            return Completeness::Failed {
                reason: "no business facts found on page".to_string(),
            };
        }
        let missing = facts.missing_required();
        if missing.is_empty() {
            Completeness::Full
        } else {
            Completeness::Partial { missing }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Completeness::Full => "full",
            Completeness::Partial { .. } => "partial",
            Completeness::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Completeness::Failed { .. })
    }
}

/// Structured facts extracted from one website scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub source_url: String,
    pub facts: ProfileFacts,
    /// Cleaned Markdown excerpt of the page body, used as generation context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub completeness: Completeness,
    pub fingerprint: String,
    pub extracted_at: DateTime<Utc>,
}

impl BusinessProfile {
    pub fn from_facts(source_url: &str, facts: ProfileFacts, summary: Option<String>) -> Self {
        Self {
            source_url: source_url.to_string(),
            completeness: Completeness::assess(&facts),
            fingerprint: facts.fingerprint(),
            facts,
            summary,
            extracted_at: Utc::now(),
        }
    }

    /// A profile for a page that was fetched but could not be used.
    pub fn failed(source_url: &str, reason: impl Into<String>) -> Self {
        let facts = ProfileFacts::default();
        Self {
            source_url: source_url.to_string(),
            fingerprint: facts.fingerprint(),
            facts,
            summary: None,
            completeness: Completeness::Failed {
                reason: reason.into(),
            },
            extracted_at: Utc::now(),
        }
    }
}

/// Raw result of fetching a website.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// Pages without a content type are given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().is_none_or(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        })
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Kinds of marketing artifact that can be generated.
///
/// Variants are declared in lexicographic order of their wire names so the
/// derived `Ord` matches the export ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    AdCopy,
    EmailCampaign,
    LandingPage,
    SeoMeta,
    SocialPost,
    Tagline,
}

impl OutputType {
    pub const ALL: [OutputType; 6] = [
        OutputType::AdCopy,
        OutputType::EmailCampaign,
        OutputType::LandingPage,
        OutputType::SeoMeta,
        OutputType::SocialPost,
        OutputType::Tagline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::AdCopy => "ad_copy",
            OutputType::EmailCampaign => "email_campaign",
            OutputType::LandingPage => "landing_page",
            OutputType::SeoMeta => "seo_meta",
            OutputType::SocialPost => "social_post",
            OutputType::Tagline => "tagline",
        }
    }

    /// Human-readable heading used in exported documents.
    pub fn title(&self) -> &'static str {
        match self {
            OutputType::AdCopy => "Ad Copy",
            OutputType::EmailCampaign => "Email Campaign",
            OutputType::LandingPage => "Landing Page",
            OutputType::SeoMeta => "SEO Metadata",
            OutputType::SocialPost => "Social Post",
            OutputType::Tagline => "Tagline",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        OutputType::ALL
            .into_iter()
            .find(|t| t.as_str() == key)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Unsupported output type '{s}' (expected one of: {})",
                    OutputType::ALL.map(|t| t.as_str()).join(", ")
                ))
            })
    }
}

/// Supported generation languages (ISO 639-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    En,
    Es,
    Fr,
    It,
    Nl,
    Pt,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::De,
        Language::En,
        Language::Es,
        Language::Fr,
        Language::It,
        Language::Nl,
        Language::Pt,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::It => "it",
            Language::Nl => "nl",
            Language::Pt => "pt",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Language::De => "German",
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::It => "Italian",
            Language::Nl => "Dutch",
            Language::Pt => "Portuguese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == code)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Unsupported language '{s}' (expected one of: {})",
                    Language::ALL.map(|l| l.code()).join(", ")
                ))
            })
    }
}

/// Identity of a current output within its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputKey {
    pub output_type: OutputType,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationStatus {
    Succeeded,
    Failed {
        reason: UpstreamReason,
        message: String,
    },
}

/// The current generated artifact for one (type, language) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub project_id: Uuid,
    pub output_type: OutputType,
    pub language: Language,
    /// Empty when the generation failed.
    pub content: String,
    pub status: GenerationStatus,
    pub generated_at: DateTime<Utc>,
}

impl Output {
    pub fn succeeded(
        project_id: Uuid,
        output_type: OutputType,
        language: Language,
        content: String,
    ) -> Self {
        Self {
            project_id,
            output_type,
            language,
            content,
            status: GenerationStatus::Succeeded,
            generated_at: Utc::now(),
        }
    }

    pub fn failed(
        project_id: Uuid,
        output_type: OutputType,
        language: Language,
        failure: &GenerationFailure,
    ) -> Self {
        Self {
            project_id,
            output_type,
            language,
            content: String::new(),
            status: GenerationStatus::Failed {
                reason: failure.reason,
                message: failure.message.clone(),
            },
            generated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> OutputKey {
        OutputKey {
            output_type: self.output_type,
            language: self.language,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, GenerationStatus::Succeeded)
    }
}

/// Why one output type could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub reason: UpstreamReason,
    pub message: String,
}

impl From<&AppError> for GenerationFailure {
    fn from(error: &AppError) -> Self {
        Self {
            reason: error.upstream_reason().unwrap_or(UpstreamReason::Internal),
            message: error.to_string(),
        }
    }
}

/// Result of one generate call: successes and failures side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub outputs: BTreeMap<OutputType, String>,
    pub failures: BTreeMap<OutputType, GenerationFailure>,
}

impl GenerationReport {
    pub fn any_succeeded(&self) -> bool {
        !self.outputs.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.outputs.is_empty() && !self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            _ => Err(AppError::InvalidInput(format!(
                "Unsupported export format '{s}' (expected pdf, html or docx)"
            ))),
        }
    }
}

/// A rendered export. Never stored; computed from the current outputs.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub project_id: Uuid,
    pub format: ExportFormat,
    /// Outputs in the order they appear in the document.
    pub included: Vec<OutputKey>,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
