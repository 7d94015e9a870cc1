use crate::error::ContextError;
use crate::pdf::{PdfDocument, Rgb};

pub const WATERMARK_FONT_SIZE: f32 = 40.0;
pub const WATERMARK_COLOR: Rgb = [200, 200, 200];
pub const WATERMARK_ANGLE_DEGREES: f32 = 45.0;

/// The text stamped on a form which has no template.
pub fn watermark_text(label: &str) -> String {
    format!("{label} - SIN FORMATO")
}

/// Stamps the diagonal watermark across the current page. The font size and the text color
/// in use before the call are in use again after it.
pub fn stamp(pdf_document: &mut PdfDocument, label: &str) -> Result<(), ContextError> {
    let previous_font_size = pdf_document.font_size();
    let previous_text_color = pdf_document.text_color();

    pdf_document.set_font_size(WATERMARK_FONT_SIZE);
    pdf_document.set_text_color(WATERMARK_COLOR);

    let text = watermark_text(label);
    let text_width = pdf_document.text_width(&text, WATERMARK_FONT_SIZE);
    let x = (pdf_document.page_width() - text_width) / 2.0;
    let y = pdf_document.page_height() / 2.0;

    let result = pdf_document
        .save_graphics_state()
        .and_then(|_| pdf_document.rotated_text(&text, x, y, WATERMARK_ANGLE_DEGREES))
        .and_then(|_| pdf_document.restore_graphics_state());

    pdf_document.set_font_size(previous_font_size);
    pdf_document.set_text_color(previous_text_color);

    result
}
