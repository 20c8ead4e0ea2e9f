pub mod cleaner;
pub mod fetcher;
pub mod llm;
pub mod parser;

pub use cleaner::HtmdCleaner;
pub use fetcher::ReqwestFetcher;
pub use llm::{LlmConfig, OpenAiBackend};
pub use parser::HtmlProfileParser;
