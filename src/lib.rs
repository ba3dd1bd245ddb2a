//! Ticketr generates the production tickets of a print and converting shop: an A5 page holding
//! two copies of the slip that travels with an order through production, with the order header,
//! the client and delivery blocks, the production table and the notes.
//!
//! The tickets are first laid out as a `Document`, a plain list of drawing operations which can
//! be inspected, serialized to JSON or converted into a `PdfDocument` with embedded TrueType
//! fonts. The `TicketExporter` ties everything together: it names the file, lays out the page,
//! writes the PDF into the output directory and hands it over to the default viewer.

/// The order, client and order item records.
///
/// Records come from the persistence layer as loosely keyed JSON objects, where every field may
/// be found under its canonical name (`order_number`) or under the display label used by older
/// versions of the application (`Nr zamówienia`). The `FieldKey` of each field knows both names.
pub mod records;

/// The formatting of an order item into the fields printed in a row of the production table.
pub mod row;

/// Font size fitting and word wrapping, measured through the `TextMeasure` trait.
pub mod text_fitting;

/// The allocation of the production table column widths.
pub mod columns;

/// The layout of the production page.
///
/// # Introduction
///
/// The `PageComposer` places text cells, rectangles and lines on an A5 page, expressed in
/// millimeters from the top-left corner. A cell is a box with a 1mm horizontal margin whose text
/// is aligned to the left, the center or the right, with the baseline slightly below the middle
/// of the box. The `compose_production_page` function lays out the upper copy of the ticket, the
/// cut guide and the lower copy.
pub mod ticket;

/// The module where the `Document` interface is presented.
///
/// The `Document` struct is an intermediate representation of a PDF document: a document ID, an
/// instance ID and the ordered list of operations drawing its content (pages, text, rectangles
/// and lines). It is what the ticket layout produces, and it is converted into a PDF document
/// by `to_pdf_document` (or either `save_to_bytes` and `save_to_pdf_file`).
pub mod document;

/// The module where the `PdfDocument` interface for working with PDF documents is presented.
///
/// `PdfDocument` wraps a `lopdf::Document` and offers a few convenience functions such as
/// `add_page`, `add_font`, `write_text_to_page`, `draw_rectangle`, `draw_line`, `write_all` and
/// `save_to_bytes`, keeping the details of the PDF object model behind private methods. Fonts are
/// embedded as `Type0` fonts with the `Identity-H` encoding, so that any character the TrueType
/// font covers (Polish diacritics included) can be written.
pub mod pdf;

/// The subsetting of TrueType fonts down to the glyphs a document uses.
///
/// The glyph IDs are preserved: the outlines of the unused glyphs are emptied and the tables a
/// PDF viewer does not need are dropped, so that the `Identity` mapping from CIDs to glyphs of
/// the embedded font keeps working.
pub mod font_subset;

/// The fonts a ticket is typeset with and the `TextMeasure` trait the layout is measured with.
pub mod fonts;

/// The export of production tickets to PDF files and the opening of the exported files.
pub mod export;

/// The drop contract of a day in the production calendar.
pub mod schedule;

/// The configuration of the exporter, read from a JSON file.
pub mod configuration;

/// This module contains the `ContextError` type which is the error type used throughout this
/// library.
///
/// Every fallible function returns a `Result` whose error explains what was being done when
/// the failure happened, followed by the message of the underlying error when there is one.
pub mod error;
