use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use brandkit_client::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use brandkit_client::{HtmdCleaner, HtmlProfileParser, OpenAiBackend, ReqwestFetcher};
use brandkit_core::{
    ContentGenerator, ExportFormat, GenerationReport, MemoryStore, PipelineConfig,
    ProjectPipeline, SiteProfileExtractor,
};
use brandkit_export::DocumentRenderer;
use uuid::Uuid;

type Pipeline = ProjectPipeline<
    MemoryStore,
    SiteProfileExtractor<ReqwestFetcher, HtmlProfileParser, HtmdCleaner>,
    OpenAiBackend,
    DocumentRenderer,
>;

#[derive(Parser)]
#[command(name = "brandkit", version, about = "Marketing copy from a business website")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a website and print its business profile as JSON
    Profile {
        /// Website to scan
        #[arg(short, long)]
        url: String,
    },

    /// Scan a website, generate copy and print the generation report as JSON
    Generate {
        #[command(flatten)]
        request: GenerateArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Scan, generate and write the result as a PDF, HTML or DOCX document
    Export {
        #[command(flatten)]
        request: GenerateArgs,

        #[command(flatten)]
        llm: LlmArgs,

        /// Document format: pdf, html or docx
        #[arg(short, long, default_value = "pdf")]
        format: String,

        /// Output file (defaults to a name derived from the business name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Website to scan
    #[arg(short, long)]
    url: String,

    /// Output types to generate (repeatable), e.g. ad_copy, tagline
    #[arg(short = 't', long = "type", required = true)]
    output_types: Vec<String>,

    /// ISO 639-1 language code
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Extra facts or overrides as key=value (repeatable)
    #[arg(short, long = "detail", value_parser = parse_detail)]
    details: Vec<(String, String)>,
}

#[derive(Args)]
struct LlmArgs {
    /// LLM model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
    #[arg(short, long, env = "BRANDKIT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(short, long, env = "BRANDKIT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// API key (reads from BRANDKIT_LLM_API_KEY if not provided)
    #[arg(short, long, env = "BRANDKIT_LLM_API_KEY", hide_env_values = true)]
    api_key: String,
}

impl LlmArgs {
    fn backend(&self) -> Result<OpenAiBackend> {
        Ok(OpenAiBackend::with_base_url(
            &self.api_key,
            &self.model,
            &self.base_url,
        )?)
    }
}

fn parse_detail(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // stdout carries the JSON result, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brandkit=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env()?;

    match cli.command {
        Commands::Profile { url } => {
            // a scan never calls the text backend
            let backend = OpenAiBackend::new("", DEFAULT_MODEL)?;
            let pipeline = build_pipeline(backend, config)?;
            cmd_profile(&pipeline, &url).await?;
        }
        Commands::Generate { request, llm } => {
            let pipeline = build_pipeline(llm.backend()?, config)?;
            cmd_generate(&pipeline, &request).await?;
        }
        Commands::Export {
            request,
            llm,
            format,
            out,
        } => {
            let format: ExportFormat = format.parse()?;
            let pipeline = build_pipeline(llm.backend()?, config)?;
            cmd_export(&pipeline, &request, format, out).await?;
        }
    }

    Ok(())
}

fn build_pipeline(backend: OpenAiBackend, config: PipelineConfig) -> Result<Pipeline> {
    // the user controls the machine, so local addresses are fair game
    let fetcher = ReqwestFetcher::new()
        .context("Failed to create HTTP client")?
        .allow_private_urls();
    let extractor = SiteProfileExtractor::new(fetcher, HtmlProfileParser::new(), HtmdCleaner::new())
        .with_summary_chars(config.summary_chars);

    Ok(ProjectPipeline::new(
        MemoryStore::new(),
        extractor,
        ContentGenerator::new(backend),
        DocumentRenderer::new(),
        config,
    ))
}

async fn cmd_profile(pipeline: &Pipeline, url: &str) -> Result<()> {
    let project = pipeline.create_project(url, None).await?;
    let profile = pipeline.scan_website(project.id).await?;

    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn cmd_generate(pipeline: &Pipeline, request: &GenerateArgs) -> Result<()> {
    let report = scan_and_generate(pipeline, request).await?.1;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.any_succeeded() {
        bail!("No output could be generated");
    }
    Ok(())
}

async fn cmd_export(
    pipeline: &Pipeline,
    request: &GenerateArgs,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let (project_id, report) = scan_and_generate(pipeline, request).await?;
    for (output_type, failure) in &report.failures {
        tracing::warn!(%output_type, reason = %failure.reason, "Skipping failed output");
    }

    let document = pipeline.export(project_id, format).await?;
    let path = out.unwrap_or_else(|| PathBuf::from(&document.file_name));
    std::fs::write(&path, &document.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        bytes = document.bytes.len(),
        outputs = document.included.len(),
        "Export written"
    );
    println!("{}", path.display());
    Ok(())
}

/// Runs scan then generation on a fresh in-memory project.
async fn scan_and_generate(
    pipeline: &Pipeline,
    request: &GenerateArgs,
) -> Result<(Uuid, GenerationReport)> {
    let project = pipeline.create_project(&request.url, None).await?;
    let profile = pipeline.scan_website(project.id).await?;
    tracing::info!(
        name = profile.facts.name.as_deref().unwrap_or("unknown"),
        completeness = profile.completeness.label(),
        "Scanned"
    );

    let details: BTreeMap<String, String> = request.details.iter().cloned().collect();
    let report = pipeline
        .generate_outputs(project.id, &request.output_types, details, &request.language)
        .await?;
    Ok((project.id, report))
}
