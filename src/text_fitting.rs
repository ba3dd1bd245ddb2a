use crate::fonts::{FontStyle, TextMeasure};

/// The decrement between two candidate font sizes, in points.
pub const FONT_SIZE_STEP: f32 = 0.2;

/// The largest font size, going down from `maximum_size` by steps of 0.2pt, at which `text`
/// fits in `width` millimeters. When nothing fits the minimum size is returned and the text is
/// left to overflow.
pub fn fit_font_size<M: TextMeasure + ?Sized>(
    measure: &M,
    style: FontStyle,
    text: &str,
    width: f32,
    maximum_size: f32,
    minimum_size: f32,
) -> f32 {
    // Sizes are derived from an integer step count so that they don't accumulate rounding
    let step_count = ((maximum_size - minimum_size) / FONT_SIZE_STEP + 1e-3).floor();
    if step_count < 0.0 {
        return minimum_size;
    }

    (0..=step_count as u32)
        .map(|step| maximum_size - step as f32 * FONT_SIZE_STEP)
        .find(|&font_size| measure.text_width(text, style, font_size) <= width)
        .unwrap_or(minimum_size)
}

/// Greedily packs the whitespace separated words of `text` into lines no wider than `width`.
///
/// A word wider than the line on its own gets a line for itself and overflows it. Empty or blank
/// text gives no line at all.
pub fn wrap_lines<M: TextMeasure + ?Sized>(
    measure: &M,
    style: FontStyle,
    font_size: f32,
    text: &str,
    width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
            continue;
        }

        let candidate = format!("{current_line} {word}");
        if measure.text_width(&candidate, style, font_size) <= width {
            current_line = candidate;
        } else {
            lines.push(std::mem::replace(&mut current_line, word.to_string()));
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// How many lines `wrap_lines` breaks the text into.
pub fn line_count<M: TextMeasure + ?Sized>(
    measure: &M,
    style: FontStyle,
    font_size: f32,
    text: &str,
    width: f32,
) -> usize {
    wrap_lines(measure, style, font_size, text, width).len()
}

/// Wraps every newline separated paragraph on its own; blank paragraphs are kept as empty lines.
pub fn wrap_paragraphs<M: TextMeasure + ?Sized>(
    measure: &M,
    style: FontStyle,
    font_size: f32,
    text: &str,
    width: f32,
) -> Vec<String> {
    text.lines()
        .flat_map(|paragraph| {
            let lines = wrap_lines(measure, style, font_size, paragraph, width);
            if lines.is_empty() {
                vec![String::new()]
            } else {
                lines
            }
        })
        .collect()
}
