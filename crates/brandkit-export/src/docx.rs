use std::io::Cursor;

use brandkit_core::error::AppError;
use brandkit_core::models::Output;
use brandkit_core::project::Project;
use docx_rs::{Docx, Paragraph, Run};

use crate::html::paragraphs;

// docx-rs sizes are in half-points
const TITLE_SIZE: usize = 40;
const HEADING_SIZE: usize = 28;
const BODY_SIZE: usize = 22;

fn text_paragraph(text: &str, size: usize, bold: bool) -> Paragraph {
    let run = Run::new().add_text(text).size(size);
    Paragraph::new().add_run(if bold { run.bold() } else { run })
}

pub fn render(project: &Project, outputs: &[&Output]) -> Result<Vec<u8>, AppError> {
    let mut docx = Docx::new()
        .add_paragraph(text_paragraph(&project.name, TITLE_SIZE, true))
        .add_paragraph(text_paragraph(&project.url, BODY_SIZE, false));

    for output in outputs {
        let heading = format!(
            "{} ({})",
            output.output_type.title(),
            output.language.english_name()
        );
        docx = docx.add_paragraph(text_paragraph(&heading, HEADING_SIZE, true));

        for paragraph in paragraphs(&output.content) {
            let mut run = Run::new().size(BODY_SIZE);
            for (i, line) in paragraph.iter().enumerate() {
                if i > 0 {
                    run = run.add_break(docx_rs::BreakType::TextWrapping);
                }
                run = run.add_text(*line);
            }
            docx = docx.add_paragraph(Paragraph::new().add_run(run));
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| AppError::RenderFailure(format!("DOCX rendering failed: {e}")))?;
    Ok(buffer.into_inner())
}
