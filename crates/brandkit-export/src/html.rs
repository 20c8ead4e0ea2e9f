//! Standalone HTML export. Output depends only on its inputs, so the same
//! project and outputs always render to the same bytes.

use std::fmt::Write;

use brandkit_core::models::Output;
use brandkit_core::project::Project;
use html_escape::{encode_double_quoted_attribute, encode_text};

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem;line-height:1.5;color:#222}\
h1{margin-bottom:0}.source{color:#666;margin-top:.25rem}\
section{border-top:1px solid #ddd;margin-top:1.5rem}\
h2 .lang{font-weight:normal;color:#666;font-size:.8em}";

pub fn render(project: &Project, outputs: &[&Output]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html>");
    let _ = writeln!(out, "<head>");
    let _ = writeln!(out, "<meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>{} marketing kit</title>", encode_text(&project.name));
    let _ = writeln!(out, "<style>{STYLE}</style>");
    let _ = writeln!(out, "</head>");
    let _ = writeln!(out, "<body>");
    let _ = writeln!(out, "<h1>{}</h1>", encode_text(&project.name));
    let _ = writeln!(
        out,
        "<p class=\"source\"><a href=\"{}\">{}</a></p>",
        encode_double_quoted_attribute(&project.url),
        encode_text(&project.url)
    );

    for output in outputs {
        let _ = writeln!(
            out,
            "<section id=\"{}-{}\" lang=\"{}\">",
            output.output_type,
            output.language,
            output.language.code()
        );
        let _ = writeln!(
            out,
            "<h2>{} <span class=\"lang\">({})</span></h2>",
            output.output_type.title(),
            output.language.english_name()
        );
        for paragraph in paragraphs(&output.content) {
            let lines: Vec<String> = paragraph
                .iter()
                .map(|line| encode_text(line).into_owned())
                .collect();
            let _ = writeln!(out, "<p>{}</p>", lines.join("<br>\n"));
        }
        let _ = writeln!(out, "</section>");
    }

    let _ = writeln!(out, "</body>");
    let _ = writeln!(out, "</html>");
    out
}

/// Splits text into paragraphs (blank-line separated) of trimmed lines.
pub(crate) fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut result = Vec::new();
    let mut current = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}
