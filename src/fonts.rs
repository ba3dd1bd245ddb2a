use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::configuration::FontFiles;
use crate::error::ContextError;
use crate::pdf::{Font, PdfDocument};

/// The faces a ticket is typeset with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// Anything able to tell how wide a string is once typeset.
///
/// The layout code only ever needs widths, so it is written against this trait rather than
/// against concrete fonts, which keeps it usable (and testable) without any font file.
pub trait TextMeasure {
    /// The width in millimeters of `text` set in `style` at `font_size` points.
    fn text_width(&self, text: &str, style: FontStyle, font_size: f32) -> f32;
}

/// A crude measure giving every character the same advance, expressed as a fraction of the em.
///
/// Handy for previews and tests; real documents are measured with a `FontFamily`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvanceMeasure {
    pub advance_per_em: f32,
}

impl Default for FixedAdvanceMeasure {
    fn default() -> Self {
        FixedAdvanceMeasure {
            advance_per_em: 0.5,
        }
    }
}

impl TextMeasure for FixedAdvanceMeasure {
    fn text_width(&self, text: &str, _style: FontStyle, font_size: f32) -> f32 {
        crate::pdf::points_to_millimeters(
            text.chars().count() as f32 * self.advance_per_em * font_size,
        )
    }
}

/// The regular, bold and (optionally) italic fonts of the ticket. Without an italic face the
/// regular one stands in for it.
#[derive(Debug, Clone)]
pub struct FontFamily {
    regular: Font,
    bold: Font,
    italic: Option<Font>,
}

impl FontFamily {
    pub fn new(regular: Font, bold: Font, italic: Option<Font>) -> Self {
        FontFamily {
            regular,
            bold,
            italic,
        }
    }

    /// Loads the font files named by the configuration.
    pub fn from_font_files(font_files: &FontFiles) -> Result<Self, ContextError> {
        let regular = Font::from_path(&font_files.regular).map_err(|error| {
            ContextError::with_error("Unable to load the regular font", &error)
        })?;
        let bold = Font::from_path(&font_files.bold)
            .map_err(|error| ContextError::with_error("Unable to load the bold font", &error))?;
        let italic = match &font_files.italic {
            Some(italic_path) => Some(Font::from_path(italic_path).map_err(|error| {
                ContextError::with_error("Unable to load the italic font", &error)
            })?),
            None => None,
        };

        Ok(FontFamily::new(regular, bold, italic))
    }

    pub fn font(&self, style: FontStyle) -> &Font {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => self.italic.as_ref().unwrap_or(&self.regular),
        }
    }

    /// Registers the faces into the PDF document and returns the font index of every style.
    pub fn register_into(&self, pdf_document: &mut PdfDocument) -> BTreeMap<FontStyle, usize> {
        let regular_index = pdf_document.add_font(self.regular.clone());
        let bold_index = pdf_document.add_font(self.bold.clone());
        let italic_index = match &self.italic {
            Some(italic) => pdf_document.add_font(italic.clone()),
            None => regular_index,
        };

        BTreeMap::from([
            (FontStyle::Regular, regular_index),
            (FontStyle::Bold, bold_index),
            (FontStyle::Italic, italic_index),
        ])
    }
}

impl TextMeasure for FontFamily {
    fn text_width(&self, text: &str, style: FontStyle, font_size: f32) -> f32 {
        self.font(style).text_width(text, font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_advance_measure_scales_with_length_and_size() {
        let measure = FixedAdvanceMeasure::default();
        let short = measure.text_width("ab", FontStyle::Regular, 10.0);
        let long = measure.text_width("abcd", FontStyle::Regular, 10.0);
        let large = measure.text_width("ab", FontStyle::Bold, 20.0);

        assert!((long - 2.0 * short).abs() < 1e-5);
        assert!((large - 2.0 * short).abs() < 1e-5);
        // Two characters at half an em of 10pt each span exactly 10pt
        assert!((short - 10.0 * 25.4 / 72.0).abs() < 1e-5);
    }

    #[test]
    fn multibyte_characters_count_once() {
        let measure = FixedAdvanceMeasure::default();
        assert_eq!(
            measure.text_width("ść", FontStyle::Regular, 7.0),
            measure.text_width("sc", FontStyle::Regular, 7.0)
        );
    }
}
