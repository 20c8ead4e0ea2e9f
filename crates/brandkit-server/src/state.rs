use brandkit_client::{HtmdCleaner, HtmlProfileParser, OpenAiBackend, ReqwestFetcher};
use brandkit_core::{ContentGenerator, PipelineConfig, ProjectPipeline, SiteProfileExtractor};
use brandkit_db::AnyStore;
use brandkit_export::DocumentRenderer;

pub type SiteExtractor = SiteProfileExtractor<ReqwestFetcher, HtmlProfileParser, HtmdCleaner>;

/// The pipeline as wired for the server.
pub type Pipeline = ProjectPipeline<AnyStore, SiteExtractor, OpenAiBackend, DocumentRenderer>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub pipeline: Pipeline,
    /// Bearer token every `/v1` request must present.
    pub api_key: String,
}

impl AppState {
    pub fn new(pipeline: Pipeline, api_key: impl Into<String>) -> Self {
        Self {
            pipeline,
            api_key: api_key.into(),
        }
    }

    pub fn store(&self) -> &AnyStore {
        self.pipeline.store()
    }
}

/// Wires the real adapters into a pipeline over `store`.
pub fn build_pipeline(
    store: AnyStore,
    fetcher: ReqwestFetcher,
    backend: OpenAiBackend,
    config: PipelineConfig,
) -> Pipeline {
    let extractor = SiteProfileExtractor::new(fetcher, HtmlProfileParser::new(), HtmdCleaner::new())
        .with_summary_chars(config.summary_chars);
    ProjectPipeline::new(
        store,
        extractor,
        ContentGenerator::new(backend),
        DocumentRenderer::new(),
        config,
    )
}
