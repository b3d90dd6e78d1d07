use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::error::Error;

/// Renders an error as an annotated snippet of `source_text`. Falls back to
/// the plain message when the error points into a different file (an include)
/// or carries no position.
pub fn render_error(source_name: &str, source_text: &str, error: &Error) -> String {
    let at = error.at();

    if at.line == 0 || (!at.filename.is_empty() && at.filename.as_ref() != source_name) {
        return error.to_string();
    }

    let Some(offset) = offset_of(source_text, at.line, at.column) else {
        return error.to_string();
    };
    let end = (offset + 1).min(source_text.len());

    let mut output = Vec::new();
    let result = Report::build(ReportKind::Error, source_name.to_string(), offset)
        .with_message(error.cause().to_string())
        .with_label(
            Label::new((source_name.to_string(), offset..end))
                .with_color(Color::Red)
                .with_message("here"),
        )
        .finish()
        .write(
            (source_name.to_string(), Source::from(source_text.to_string())),
            &mut output,
        );

    if result.is_err() {
        return error.to_string();
    }

    String::from_utf8_lossy(&output).into_owned()
}

fn offset_of(text: &str, line: u32, column: u32) -> Option<usize> {
    let line_start = if line <= 1 {
        0
    } else {
        let mut seen = 1;
        let mut start = None;
        for (idx, ch) in text.char_indices() {
            if ch == '\n' {
                seen += 1;
                if seen == line {
                    start = Some(idx + 1);
                    break;
                }
            }
        }
        start?
    };

    let offset = line_start + column.saturating_sub(1) as usize;
    if offset <= text.len() {
        Some(offset)
    } else {
        None
    }
}
