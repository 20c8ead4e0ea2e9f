use std::sync::Arc;

use brandkit_core::error::AppError;
use brandkit_core::traits::Cleaner;
use htmd::HtmlToMarkdown;

/// HTML-to-Markdown cleaner using htmd.
///
/// Produces the page excerpt handed to the generator, so everything that is
/// not page copy (scripts, navigation, forms, embedded media) is skipped.
#[derive(Clone)]
pub struct HtmdCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl HtmdCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "head", "script", "style", "nav", "footer", "aside", "noscript", "iframe", "svg",
                "form", "button", "img", "video",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }
}

impl Default for HtmdCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::Internal(format!("HTML conversion failed: {e}")))?;
        Ok(collapse_blank_lines(&markdown))
    }
}

/// Squeezes runs of blank lines left behind by skipped tags.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank = false;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !blank && !out.is_empty() {
                out.push('\n');
            }
            blank = true;
        } else {
            out.push_str(line);
            out.push('\n');
            blank = false;
        }
    }
    out.trim_end().to_string()
}
