//! PDF export with the built-in Helvetica fonts (WinAnsi repertoire only).

use brandkit_core::error::AppError;
use brandkit_core::models::Output;
use brandkit_core::project::Project;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::html::paragraphs;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const BODY_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 14.0;
const TITLE_SIZE: f32 = 20.0;
const LINE_HEIGHT: f32 = 5.5;
const PT_TO_MM: f32 = 25.4 / 72.0;

/// Helvetica advance widths in 1/1000 em for U+0020..=U+007E (Adobe AFM).
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 222, 333, 333, 389, 584, 278, 333, 278, 278, // space to /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 to 9
    278, 278, 584, 584, 584, 556, 1015, // : to @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A to M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N to Z
    278, 278, 278, 469, 556, 333, // [ to `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a to m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n to z
    334, 260, 334, 584, // { to ~
];
/// Width assumed for glyphs outside ASCII; no Helvetica glyph is wider.
const FALLBACK_WIDTH: u16 = 1015;
/// Upper bound of Helvetica-Bold width over Helvetica for any ASCII glyph.
const BOLD_FACTOR: f32 = 1.25;

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::RenderFailure(format!("PDF rendering failed: {e}"))
}

/// Writes wrapped text top to bottom, starting a new page when the current
/// one is full.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn text(&mut self, text: &str, size: f32, bold: bool) {
        for line in wrap(text, size, bold, TEXT_WIDTH) {
            self.line(&line, size, bold);
        }
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        if self.y < MARGIN {
            self.new_page();
        }
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        self.y -= LINE_HEIGHT * (size / BODY_SIZE).max(1.0);
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT;
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Page {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }
}

pub fn render(project: &Project, outputs: &[&Output]) -> Result<Vec<u8>, AppError> {
    let (doc, page, layer) = PdfDocument::new(
        format!("{} marketing kit", project.name),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Page 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(render_error)?;

    {
        let mut writer = PageWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        };

        writer.text(&project.name, TITLE_SIZE, true);
        writer.text(&project.url, BODY_SIZE, false);

        for output in outputs {
            writer.gap();
            let heading = format!(
                "{} ({})",
                output.output_type.title(),
                output.language.english_name()
            );
            writer.text(&heading, HEADING_SIZE, true);

            for paragraph in paragraphs(&output.content) {
                for line in &paragraph {
                    writer.text(line, BODY_SIZE, false);
                }
                writer.gap();
            }
        }
    }

    doc.save_to_bytes().map_err(render_error)
}

fn glyph_width(c: char) -> u16 {
    match c {
        ' '..='~' => HELVETICA_WIDTHS[(c as u32 - 0x20) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in millimetres.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c))).sum();
    let scale = if bold { BOLD_FACTOR } else { 1.0 };
    units as f32 / 1000.0 * size * PT_TO_MM * scale
}

/// Greedy word wrap to `max_width` millimetres; words wider than a line are
/// split between characters.
fn wrap(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let fits = |s: &str| text_width(s, size, bold) <= max_width;
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for c in word.chars() {
            current.push(c);
            if !fits(&current) && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
