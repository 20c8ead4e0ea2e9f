use crate::error::AppError;
use crate::models::BusinessProfile;
use crate::traits::{Cleaner, Fetcher, PageParser, ProfileExtractor};

const DEFAULT_SUMMARY_CHARS: usize = 4_000;

/// Builds a business profile from a live website: fetch → parse → clean → assess.
///
/// Generic over its collaborators so tests can run without the network.
#[derive(Clone)]
pub struct SiteProfileExtractor<F, P, C>
where
    F: Fetcher,
    P: PageParser,
    C: Cleaner,
{
    fetcher: F,
    parser: P,
    cleaner: C,
    summary_chars: usize,
}

impl<F, P, C> SiteProfileExtractor<F, P, C>
where
    F: Fetcher,
    P: PageParser,
    C: Cleaner,
{
    pub fn new(fetcher: F, parser: P, cleaner: C) -> Self {
        Self {
            fetcher,
            parser,
            cleaner,
            summary_chars: DEFAULT_SUMMARY_CHARS,
        }
    }

    pub fn with_summary_chars(mut self, chars: usize) -> Self {
        self.summary_chars = chars;
        self
    }

    fn summarize(&self, html: &str) -> Option<String> {
        match self.cleaner.clean(html) {
            Ok(markdown) => {
                let summary: String = markdown.trim().chars().take(self.summary_chars).collect();
                (!summary.is_empty()).then_some(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not clean page, continuing without summary");
                None
            }
        }
    }
}

impl<F, P, C> ProfileExtractor for SiteProfileExtractor<F, P, C>
where
    F: Fetcher + 'static,
    P: PageParser + 'static,
    C: Cleaner + 'static,
{
    async fn extract(&self, url: &str) -> Result<BusinessProfile, AppError> {
        tracing::info!(%url, "Fetching site");
        let page = self.fetcher.fetch(url).await?;
        tracing::debug!(bytes = page.body.len(), final_url = %page.url, "Fetched site");

        if !page.is_html() {
            let content_type = page.content_type.as_deref().unwrap_or("unknown");
            tracing::warn!(%url, %content_type, "Site did not return HTML");
            return Ok(BusinessProfile::failed(
                url,
                format!("unsupported content type {content_type}"),
            ));
        }

        let facts = self.parser.parse(&page.url, &page.body);
        let summary = self.summarize(&page.body);
        let profile = BusinessProfile::from_facts(url, facts, summary);

        tracing::info!(
            %url,
            completeness = profile.completeness.label(),
            fingerprint = %&profile.fingerprint[..8],
            "Profile extracted"
        );
        Ok(profile)
    }
}
