use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ResultExt as _};
use crate::fonts::{FontFamily, FontStyle};
use crate::pdf::{Color, PdfDocument, Stroke};

/// An intermediate representation of a PDF document: its identification and the ordered list of
/// drawing operations that make it up. It can be built from code (see `ticket`) or read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    pub instance_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub creator: String,
    pub operations: Vec<Operation>,
}

/// A single drawing operation. Every position and size is in millimeters, measured from the
/// top-left corner of the page; font sizes are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    /// Starts a new page; every following operation draws onto it.
    #[serde(rename_all = "camelCase")]
    AppendNewPage { page_width: f32, page_height: f32 },
    /// A single line of text whose baseline starts at `position`.
    #[serde(rename_all = "camelCase")]
    UnicodeText {
        color: Color,
        position: [f32; 2],
        text_string: String,
        font_size: f32,
        font_style: FontStyle,
    },
    /// A rectangle whose top-left corner is at `position`.
    #[serde(rename_all = "camelCase")]
    Rectangle {
        position: [f32; 2],
        size: [f32; 2],
        fill_color: Option<Color>,
        stroke: Option<Stroke>,
    },
    #[serde(rename_all = "camelCase")]
    Line {
        from: [f32; 2],
        to: [f32; 2],
        stroke: Stroke,
    },
}

impl Document {
    pub fn from_path(document_path: &Path) -> Result<Document, ContextError> {
        let document_content = std::fs::read_to_string(document_path)
            .with_context(|| format!("Unable to read the document {:?}", document_path))?;

        serde_json::from_str(&document_content)
            .with_context(|| format!("Unable to parse the document {:?}", document_path))
    }

    /// Replays the operations onto a new `PdfDocument` typeset with the given fonts.
    pub fn to_pdf_document(&self, font_family: &FontFamily) -> Result<PdfDocument, ContextError> {
        let mut pdf_document = PdfDocument::new(self.document_id.clone());
        pdf_document.title = self.title.clone();
        pdf_document.author = self.author.clone();
        pdf_document.creator = self.creator.clone();
        let font_indices = font_family.register_into(&mut pdf_document);

        let mut current_page_index = None;
        let no_page_error = |operation: &str| {
            ContextError::with_context(format!(
                "Unable to draw {} before any page has been appended",
                operation
            ))
        };
        for operation in self.operations.iter() {
            match operation {
                Operation::AppendNewPage {
                    page_width,
                    page_height,
                } => {
                    current_page_index = Some(pdf_document.add_page(*page_width, *page_height));
                }
                Operation::UnicodeText {
                    color,
                    position,
                    text_string,
                    font_size,
                    font_style,
                } => {
                    let page_index = current_page_index.ok_or_else(|| no_page_error("text"))?;
                    let font_index = font_indices.get(font_style).copied().ok_or_else(|| {
                        ContextError::with_context(format!(
                            "Unable to find the font for the style {:?}",
                            font_style
                        ))
                    })?;
                    pdf_document.write_text_to_page(
                        page_index,
                        *color,
                        text_string,
                        font_index,
                        *font_size,
                        *position,
                    )?;
                }
                Operation::Rectangle {
                    position,
                    size,
                    fill_color,
                    stroke,
                } => {
                    let page_index =
                        current_page_index.ok_or_else(|| no_page_error("a rectangle"))?;
                    pdf_document.draw_rectangle(page_index, *position, *size, *fill_color, *stroke)?;
                }
                Operation::Line { from, to, stroke } => {
                    let page_index = current_page_index.ok_or_else(|| no_page_error("a line"))?;
                    pdf_document.draw_line(page_index, *from, *to, *stroke)?;
                }
            }
        }

        pdf_document.write_all(&self.instance_id)?;
        Ok(pdf_document)
    }

    /// Renders the document and serializes it into the bytes of a PDF file.
    pub fn save_to_bytes(&self, font_family: &FontFamily) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document = self
            .to_pdf_document(font_family)
            .context("Failed to convert the document to a PDF document")?;
        pdf_document.optimize();

        pdf_document.save_to_bytes()
    }

    pub fn save_to_pdf_file(
        &self,
        pdf_file_path: &Path,
        font_family: &FontFamily,
    ) -> Result<(), ContextError> {
        let pdf_document_bytes = self.save_to_bytes(font_family)?;
        std::fs::write(pdf_file_path, pdf_document_bytes)
            .with_context(|| format!("Failed to write the PDF file {:?}", pdf_file_path))?;
        log::debug!("Saved the PDF document to {:?}", pdf_file_path);

        Ok(())
    }
}
