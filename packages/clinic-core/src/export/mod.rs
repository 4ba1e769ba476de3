//! PDF export
//!
//! - Invoices rendered from a [`Bill`](clinic_db::models::Bill)
//! - Prescriptions with a patient header, diagnosis and medicine items
//! - Download filenames with spaces replaced by underscores
//!
//! Both documents use a fixed A4 text layout with the built-in Helvetica
//! fonts, so only Latin text renders.

pub mod invoice;
pub mod prescription;

use std::io::BufWriter;

use chrono::NaiveDate;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use thiserror::Error;

pub use invoice::{invoice_filename, render_invoice_pdf};
pub use prescription::{
    prescription_filename, render_prescription_pdf, Prescription, PrescriptionItem,
};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("A prescription needs a diagnosis")]
    MissingDiagnosis,

    #[error("A prescription needs at least one complete item (medicine, dosage and duration)")]
    NoCompleteItems,
}

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: Mm = Mm(280.0);
const BOTTOM: f32 = 20.0;
const LEFT: Mm = Mm(20.0);

/// Characters per wrapped line at 9pt
pub(crate) const WRAP_CHARS: usize = 85;

pub(crate) fn file_part(text: &str) -> String {
    text.trim().split_whitespace().collect::<Vec<_>>().join("_")
}

pub(crate) fn dd_mm_yyyy(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Greedy word wrap on whitespace
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Top-down text cursor that starts a new page when the current one fills up
pub(crate) struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: Mm,
    pages: usize,
}

impl PageWriter {
    pub(crate) fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page1, layer1) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(format!("Font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Pdf(format!("Font error: {e}")))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            pages: 1,
        })
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y.0 - height >= BOTTOM {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            PAGE_WIDTH,
            PAGE_HEIGHT,
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
    }

    pub(crate) fn title(&mut self, text: &str) {
        self.ensure_room(10.0);
        self.layer.use_text(text, 16.0, LEFT, self.y, &self.bold);
        self.y -= Mm(10.0);
    }

    pub(crate) fn heading(&mut self, text: &str) {
        self.ensure_room(12.0);
        self.y -= Mm(4.0);
        self.layer.use_text(text, 11.0, LEFT, self.y, &self.bold);
        self.y -= Mm(6.0);
    }

    pub(crate) fn line(&mut self, text: &str) {
        self.ensure_room(5.0);
        self.layer.use_text(text, 10.0, LEFT, self.y, &self.regular);
        self.y -= Mm(5.0);
    }

    /// Label and value on one line, the value starting at a fixed column
    pub(crate) fn field(&mut self, label: &str, value: &str) {
        self.ensure_room(5.0);
        self.layer.use_text(label, 10.0, LEFT, self.y, &self.bold);
        self.layer.use_text(value, 10.0, Mm(65.0), self.y, &self.regular);
        self.y -= Mm(5.0);
    }

    /// Text placed at given x offsets on the same line
    pub(crate) fn columns(&mut self, cells: &[(f32, &str)], bold: bool) {
        self.ensure_room(5.0);
        let font = if bold { &self.bold } else { &self.regular };
        for (x, text) in cells {
            self.layer.use_text(*text, 9.5, Mm(*x), self.y, font);
        }
        self.y -= Mm(5.0);
    }

    pub(crate) fn paragraph(&mut self, text: &str, indent: f32) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.ensure_room(4.5);
            self.layer
                .use_text(&line, 9.0, Mm(LEFT.0 + indent), self.y, &self.regular);
            self.y -= Mm(4.5);
        }
    }

    pub(crate) fn gap(&mut self, height: f32) {
        self.y -= Mm(height);
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>, ExportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ExportError::Pdf(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| ExportError::Pdf(format!("Buffer error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let text = "one two three four five six seven eight nine ten";
        let lines = wrap_text(text, 14);
        assert!(lines.iter().all(|l| l.len() <= 14));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_keeps_long_words_whole() {
        let lines = wrap_text("supercalifragilistic ok", 5);
        assert_eq!(lines, vec!["supercalifragilistic", "ok"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn file_parts_use_underscores() {
        assert_eq!(file_part(" Mary  Ann Lee "), "Mary_Ann_Lee");
        assert_eq!(
            dd_mm_yyyy(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()),
            "07-03-2024"
        );
    }

    #[test]
    fn long_documents_span_pages() {
        let mut writer = PageWriter::new("Long").unwrap();
        for i in 0..120 {
            writer.line(&format!("Line {i}"));
        }
        assert!(writer.pages > 1);
        let bytes = writer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
