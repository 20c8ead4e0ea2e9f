//! Business facts from HTML, using `scraper`.
//!
//! Sources are consulted in priority order and a fact is only filled from a
//! lower-priority source when still missing: JSON-LD, OpenGraph, plain meta
//! tags, `<title>`/`<h1>`, `mailto:`/`tel:` links, `<address>`, offering
//! sections, social profile links.

use std::collections::BTreeSet;

use brandkit_core::models::ProfileFacts;
use brandkit_core::traits::PageParser;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

const MAX_OFFERINGS: usize = 10;

const BUSINESS_TYPES: &[&str] = &[
    "Organization",
    "Corporation",
    "LocalBusiness",
    "Store",
    "Restaurant",
    "FoodEstablishment",
    "ProfessionalService",
    "Bakery",
    "CafeOrCoffeeShop",
];

const OFFERING_HINTS: &[&str] = &["service", "product", "offering", "menu", "solution"];

const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
];

const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", " :: ", " · "];

#[derive(Debug, Clone, Default)]
pub struct HtmlProfileParser;

impl HtmlProfileParser {
    pub fn new() -> Self {
        Self
    }
}

impl PageParser for HtmlProfileParser {
    fn parse(&self, url: &str, html: &str) -> ProfileFacts {
        let doc = Html::parse_document(html);
        let mut facts = ProfileFacts::default();

        for node in json_ld_businesses(&doc) {
            apply_json_ld(&mut facts, &node);
        }

        fill(&mut facts.name, meta(&doc, "meta[property='og:site_name']"));
        fill(&mut facts.description, meta(&doc, "meta[property='og:description']"));
        fill(&mut facts.description, meta(&doc, "meta[name='description']"));
        fill(&mut facts.category, meta(&doc, "meta[name='keywords']").and_then(keywords));

        fill(&mut facts.name, first_text(&doc, "title").map(|t| site_name(&t)));
        fill(&mut facts.name, first_text(&doc, "h1"));

        fill(&mut facts.email, link_target(&doc, "mailto:"));
        fill(&mut facts.phone, link_target(&doc, "tel:"));
        fill(&mut facts.address, first_text(&doc, "address"));

        if facts.offerings.is_empty() {
            facts.offerings = offerings(&doc);
        }

        let social = social_links(&doc, url);
        if !social.is_empty() && !facts.additional.contains_key("social_links") {
            facts.additional.insert("social_links".to_string(), social);
        }
        if let Some(lang) = select(&doc, "html")
            .first()
            .and_then(|html| html.value().attr("lang"))
            .and_then(clean)
        {
            facts.additional.entry("language".to_string()).or_insert(lang);
        }

        facts
    }
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

fn json_ld_businesses(doc: &Html) -> Vec<Value> {
    let mut found = Vec::new();
    for script in select(doc, "script[type='application/ld+json']") {
        let raw: String = script.text().collect();
        // malformed blocks are common; skip them
        if let Ok(value) = serde_json::from_str::<Value>(&raw) {
            collect_businesses(value, &mut found);
        }
    }
    found
}

fn collect_businesses(value: Value, found: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| collect_businesses(v, found)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_businesses(graph, found);
            }
            let is_business = match map.get("@type") {
                Some(Value::String(t)) => is_business_type(t),
                Some(Value::Array(types)) => types
                    .iter()
                    .filter_map(Value::as_str)
                    .any(is_business_type),
                _ => false,
            };
            if is_business {
                found.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn is_business_type(t: &str) -> bool {
    BUSINESS_TYPES.contains(&t) || t.ends_with("Business")
}

fn apply_json_ld(facts: &mut ProfileFacts, node: &Value) {
    let text = |key: &str| node.get(key).and_then(Value::as_str).and_then(clean);

    fill(&mut facts.name, text("name"));
    fill(&mut facts.description, text("description"));
    fill(
        &mut facts.email,
        text("email").map(|e| e.trim_start_matches("mailto:").to_string()),
    );
    fill(&mut facts.phone, text("telephone"));
    fill(&mut facts.address, node.get("address").and_then(postal_address));

    if let Some(slogan) = text("slogan") {
        facts.additional.entry("tagline".to_string()).or_insert(slogan);
    }
    if let Some(Value::String(t)) = node.get("@type")
        && t != "Organization"
    {
        fill(&mut facts.category, Some(t.clone()));
    }

    if facts.offerings.is_empty() {
        facts.offerings = offer_names(node);
    }

    let same_as: Vec<String> = match node.get("sameAs") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };
    if !same_as.is_empty() {
        facts
            .additional
            .entry("social_links".to_string())
            .or_insert_with(|| same_as.join(", "));
    }
}

fn postal_address(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Object(_) => {
            let parts: Vec<&str> = [
                "streetAddress",
                "postalCode",
                "addressLocality",
                "addressRegion",
                "addressCountry",
            ]
            .iter()
            .filter_map(|k| value.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn offer_names(node: &Value) -> Vec<String> {
    let offers = match node.get("makesOffer") {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => return Vec::new(),
    };
    let names = offers.iter().filter_map(|offer| {
        offer
            .get("itemOffered")
            .and_then(|item| item.get("name"))
            .or_else(|| offer.get("name"))
            .and_then(Value::as_str)
            .and_then(clean)
    });
    dedup_bounded(names)
}

// ---------------------------------------------------------------------------
// HTML fallbacks
// ---------------------------------------------------------------------------

fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn element_text(el: &ElementRef<'_>) -> Option<String> {
    clean(&el.text().collect::<Vec<_>>().join(" "))
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    select(doc, css).iter().find_map(element_text)
}

fn meta(doc: &Html, css: &str) -> Option<String> {
    select(doc, css)
        .iter()
        .find_map(|el| el.value().attr("content").and_then(clean))
}

fn link_target(doc: &Html, scheme: &str) -> Option<String> {
    select(doc, "a[href]").iter().find_map(|a| {
        let href = a.value().attr("href")?.trim();
        let target = href.get(..scheme.len())?.eq_ignore_ascii_case(scheme).then(|| {
            let rest = &href[scheme.len()..];
            rest.split('?').next().unwrap_or(rest)
        })?;
        clean(target)
    })
}

fn offerings(doc: &Html) -> Vec<String> {
    let Ok(headings) = Selector::parse("h3, h4") else {
        return Vec::new();
    };
    let Ok(items) = Selector::parse("li") else {
        return Vec::new();
    };

    let sections = select(doc, "[id], [class]")
        .into_iter()
        .filter(|el| {
            let value = el.value();
            let mut labels = value.id().into_iter().chain(value.classes());
            labels.any(|label| {
                let label = label.to_ascii_lowercase();
                OFFERING_HINTS.iter().any(|hint| label.contains(hint))
            })
        });

    for section in sections {
        let mut names: Vec<String> = section.select(&headings).filter_map(|h| element_text(&h)).collect();
        if names.is_empty() {
            names = section.select(&items).filter_map(|li| element_text(&li)).collect();
        }
        let names = dedup_bounded(names.into_iter());
        if !names.is_empty() {
            return names;
        }
    }
    Vec::new()
}

fn social_links(doc: &Html, base: &str) -> String {
    let base = url::Url::parse(base).ok();
    let links: BTreeSet<String> = select(doc, "a[href]")
        .iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok(),
            None => url::Url::parse(href).ok(),
        })
        .filter(|link| {
            link.host_str().is_some_and(|host| {
                let host = host.trim_start_matches("www.");
                SOCIAL_HOSTS
                    .iter()
                    .any(|s| host == *s || host.ends_with(&format!(".{s}")))
            })
        })
        .map(String::from)
        .collect();
    links.into_iter().collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Collapses whitespace; blank text is treated as absent.
fn clean(raw: &str) -> Option<String> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

/// First segment of a page title: `"Example Co | Home"` → `"Example Co"`.
fn site_name(title: &str) -> String {
    TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.split_once(sep).map(|(head, _)| head))
        .min_by_key(|head| head.len())
        .unwrap_or(title)
        .trim()
        .to_string()
}

fn keywords(raw: String) -> Option<String> {
    let words: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .take(3)
        .collect();
    (!words.is_empty()).then(|| words.join(", "))
}

fn dedup_bounded(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .filter(|n| seen.insert(n.to_lowercase()))
        .take(MAX_OFFERINGS)
        .collect()
}
