pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod events;
pub mod extractor;
pub mod generator;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod project;
pub mod prompt;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::PipelineConfig;
pub use error::{AppError, UpstreamReason};
pub use events::{PipelineEvent, PipelineReporter, TracingReporter};
pub use extractor::SiteProfileExtractor;
pub use generator::ContentGenerator;
pub use memory::MemoryStore;
pub use models::{
    BusinessProfile, Completeness, ExportFormat, ExportedDocument, FetchedPage,
    GenerationFailure, GenerationReport, GenerationStatus, Language, Output, OutputKey,
    OutputType, ProfileFacts, ProfileField, compute_hash,
};
pub use pipeline::ProjectPipeline;
pub use project::{Project, ProjectStage, Stage, StageFailure};
pub use prompt::Prompt;
pub use traits::{
    Cleaner, ExportRenderer, Fetcher, PageParser, ProfileExtractor, ProjectStore, TextBackend,
};
