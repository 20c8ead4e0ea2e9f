//! Prompt construction for content generation.
//!
//! Prompts are a pure function of the output type, language, effective facts
//! and page summary, so identical inputs always produce identical requests.

use std::fmt::Write;

use crate::models::{Language, OutputType, ProfileFacts, ProfileField};

const SYSTEM_PROMPT: &str = "You are a senior marketing copywriter. Write only from the business facts provided; never invent prices, awards, statistics or contact details. Respond with the finished copy only, without preamble, explanations or Markdown code fences.";

/// Upper bound on the page summary forwarded to the backend.
const MAX_SUMMARY_CHARS: usize = 3_000;

/// A chat-style prompt: one system and one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl OutputType {
    /// Writing brief for this artifact.
    pub fn brief(&self) -> &'static str {
        match self {
            OutputType::AdCopy => {
                "Write search/display ad copy: three headlines of at most 30 characters each, then two descriptions of at most 90 characters each. One item per line."
            }
            OutputType::EmailCampaign => {
                "Write a promotional email: a subject line on the first line prefixed with 'Subject:', then a short body of 120-200 words ending with a clear call to action."
            }
            OutputType::LandingPage => {
                "Write landing page text: a hero headline, a one-sentence subheadline, three benefit sections each with a short heading and 2-3 sentences, and a closing call to action."
            }
            OutputType::SeoMeta => {
                "Write SEO metadata: a page title of at most 60 characters on a line prefixed 'Title:' and a meta description of at most 155 characters on a line prefixed 'Description:'."
            }
            OutputType::SocialPost => {
                "Write a social media post of at most 280 characters with an engaging hook and up to three relevant hashtags."
            }
            OutputType::Tagline => {
                "Write five alternative brand taglines of at most eight words each, one per line."
            }
        }
    }
}

/// Builds the generation prompt for one output.
pub fn build_prompt(
    output_type: OutputType,
    language: Language,
    facts: &ProfileFacts,
    summary: Option<&str>,
) -> Prompt {
    let mut user = String::new();

    let _ = writeln!(user, "{}", output_type.brief());
    let _ = writeln!(
        user,
        "Write in {} ({}).",
        language.english_name(),
        language.code()
    );
    let _ = writeln!(user);
    let _ = writeln!(user, "Business facts:");
    for field in ProfileField::ALL {
        if let Some(value) = facts.get(field) {
            let _ = writeln!(user, "- {}: {}", field.as_str(), value);
        }
    }
    for (key, value) in &facts.additional {
        let _ = writeln!(user, "- {key}: {value}");
    }

    if let Some(summary) = summary.map(str::trim).filter(|s| !s.is_empty()) {
        let excerpt: String = summary.chars().take(MAX_SUMMARY_CHARS).collect();
        let _ = writeln!(user);
        let _ = writeln!(user, "Website excerpt:");
        let _ = writeln!(user, "{excerpt}");
    }

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
