use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Completeness, ExportFormat, Language, OutputType};
use crate::project::ProjectStage;

/// Events emitted by the pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    ProjectCreated {
        project_id: Uuid,
        url: &'a str,
    },
    StageChanged {
        project_id: Uuid,
        from: ProjectStage,
        to: ProjectStage,
    },
    ScanCompleted {
        project_id: Uuid,
        completeness: &'a Completeness,
    },
    ScanFailed {
        project_id: Uuid,
        error: &'a AppError,
    },
    OutputGenerated {
        project_id: Uuid,
        output_type: OutputType,
        language: Language,
        chars: usize,
    },
    OutputFailed {
        project_id: Uuid,
        output_type: OutputType,
        language: Language,
        error: &'a AppError,
    },
    Exported {
        project_id: Uuid,
        format: ExportFormat,
        outputs: usize,
        bytes: usize,
    },
    ProjectDeleted {
        project_id: Uuid,
    },
    Recovered {
        project_id: Uuid,
        from: ProjectStage,
        to: ProjectStage,
    },
}

/// Receives pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::ProjectCreated { project_id, url } => {
                tracing::info!(%project_id, %url, "Project created");
            }
            PipelineEvent::StageChanged {
                project_id,
                from,
                to,
            } => {
                tracing::debug!(%project_id, %from, %to, "Stage changed");
            }
            PipelineEvent::ScanCompleted {
                project_id,
                completeness,
            } => {
                tracing::info!(%project_id, completeness = completeness.label(), "Scan completed");
            }
            PipelineEvent::ScanFailed { project_id, error } => {
                tracing::warn!(
                    %project_id,
                    kind = error.kind(),
                    reason = ?error.upstream_reason(),
                    %error,
                    "Scan failed"
                );
            }
            PipelineEvent::OutputGenerated {
                project_id,
                output_type,
                language,
                chars,
            } => {
                tracing::info!(%project_id, %output_type, %language, %chars, "Output generated");
            }
            PipelineEvent::OutputFailed {
                project_id,
                output_type,
                language,
                error,
            } => {
                tracing::warn!(
                    %project_id,
                    %output_type,
                    %language,
                    reason = ?error.upstream_reason(),
                    %error,
                    "Output generation failed"
                );
            }
            PipelineEvent::Exported {
                project_id,
                format,
                outputs,
                bytes,
            } => {
                tracing::info!(%project_id, %format, %outputs, %bytes, "Project exported");
            }
            PipelineEvent::ProjectDeleted { project_id } => {
                tracing::info!(%project_id, "Project deleted");
            }
            PipelineEvent::Recovered {
                project_id,
                from,
                to,
            } => {
                tracing::warn!(%project_id, %from, %to, "Recovered interrupted project");
            }
        }
    }
}
