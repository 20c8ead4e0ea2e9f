use brandkit_core::error::AppError;
use brandkit_core::models::{ExportFormat, ExportedDocument, Output};
use brandkit_core::project::Project;
use brandkit_core::traits::ExportRenderer;

use crate::{docx, html, pdf};

/// Renders a project's current outputs as HTML, PDF or DOCX.
///
/// Outputs are sorted by (type, language) before rendering. Content that
/// cannot be embedded fails the whole render; nothing is truncated or dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ExportRenderer for DocumentRenderer {
    fn render(
        &self,
        project: &Project,
        outputs: &[Output],
        format: ExportFormat,
    ) -> Result<ExportedDocument, AppError> {
        let mut sorted: Vec<&Output> = outputs.iter().collect();
        sorted.sort_by_key(|o| o.key());

        check_embeddable("project name", &project.name, format)?;
        for output in &sorted {
            let label = format!("{}/{}", output.output_type, output.language);
            check_embeddable(&label, &output.content, format)?;
        }

        let bytes = match format {
            ExportFormat::Html => html::render(project, &sorted).into_bytes(),
            ExportFormat::Pdf => pdf::render(project, &sorted)?,
            ExportFormat::Docx => docx::render(project, &sorted)?,
        };

        tracing::debug!(
            project_id = %project.id,
            %format,
            outputs = sorted.len(),
            bytes = bytes.len(),
            "Rendered export"
        );

        Ok(ExportedDocument {
            project_id: project.id,
            format,
            included: sorted.iter().map(|o| o.key()).collect(),
            bytes,
            content_type: format.content_type(),
            file_name: format!("{}.{}", file_stem(&project.name), format.as_str()),
        })
    }
}

/// Rejects text the target format cannot carry.
///
/// XML-illegal control characters are refused for every format so the three
/// renderings stay equivalent; PDF additionally needs characters from the
/// WinAnsi encoding used for the built-in Helvetica font.
fn check_embeddable(label: &str, text: &str, format: ExportFormat) -> Result<(), AppError> {
    if let Some(c) = text
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(AppError::RenderFailure(format!(
            "{label} contains control character U+{:04X}",
            c as u32
        )));
    }
    if format == ExportFormat::Pdf
        && let Some(c) = text.chars().find(|c| !is_win_ansi(*c))
    {
        return Err(AppError::RenderFailure(format!(
            "{label} contains '{c}' (U+{:04X}), which the PDF font cannot display",
            c as u32
        )));
    }
    Ok(())
}

/// Characters outside Latin-1 that WinAnsiEncoding places at 0x80..=0x9F.
const WIN_ANSI_EXTRAS: [char; 27] = [
    '€', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', 'Ž', '‘', '’', '“', '”', '•',
    '–', '—', '˜', '™', 'š', '›', 'œ', 'ž', 'Ÿ',
];

/// Whether the built-in PDF fonts can show `c`.
fn is_win_ansi(c: char) -> bool {
    matches!(c as u32, 0x00..=0x7F | 0xA0..=0xFF) || WIN_ANSI_EXTRAS.contains(&c)
}

/// Filesystem-safe file name stem derived from the project name.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "brandkit-export".to_string()
    } else {
        stem.to_string()
    }
}
