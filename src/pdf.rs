use lopdf::{content::Operation, Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{
    collections::{hash_map::DefaultHasher, BTreeMap, BTreeSet},
    hash::{Hash as _, Hasher as _},
    io::BufWriter,
    mem,
    path::Path,
    sync::Arc,
};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ResultExt as _};
use crate::font_subset::subset_font;

/// An RGB color whose components lie in the `0.0..=1.0` range.
pub type Color = [f32; 3];

const POINTS_PER_MILLIMETER: f32 = 72.0 / 25.4;

/// Converts millimeters to points, which is the unit the PDF format works with.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * POINTS_PER_MILLIMETER
}

/// Converts points back to millimeters.
pub fn points_to_millimeters(points: f32) -> f32 {
    points / POINTS_PER_MILLIMETER
}

/// The vertical metrics of a font, already scaled to the 1000 units glyph space used by PDF.
#[derive(Clone, Copy, Debug, Default)]
struct FontMetrics {
    /// The height above the baseline reached by the tallest glyphs.
    ascent: i64,
    /// The depth below the baseline, negative for any font that has descenders.
    descent: i64,
    /// The box enclosing every glyph of the font: `[x_min, y_min, x_max, y_max]`.
    bounding_box: [i64; 4],
}

/// A font face parsed from TTF data.
#[derive(Clone, Debug)]
struct TtfFontFace {
    /// The parsed face, owning the font data it borrows from.
    inner: Arc<OwnedFace>,
    /// The number of font units per em, never zero.
    units_per_em: u16,
}

impl TtfFontFace {
    fn from_bytes(data: &[u8]) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.to_vec(), 0).context("Failed to parse the font")?;
        let units_per_em = face.as_face_ref().units_per_em();
        // Every scaling into the PDF glyph space divides by this value
        if units_per_em == 0 {
            return Err(ContextError::with_context(
                "The font declares zero units per em",
            ));
        }

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    /// Scales a value from font units into the 1000 units per em space of PDF.
    fn to_glyph_space(&self, value: f32) -> i64 {
        (value * 1000.0 / self.units_per_em as f32).round() as i64
    }

    fn font_metrics(&self) -> FontMetrics {
        let bounding_box = self.face().global_bounding_box();
        FontMetrics {
            ascent: self.to_glyph_space(self.face().ascender() as f32),
            descent: self.to_glyph_space(self.face().descender() as f32),
            bounding_box: [
                self.to_glyph_space(bounding_box.x_min as f32),
                self.to_glyph_space(bounding_box.y_min as f32),
                self.to_glyph_space(bounding_box.x_max as f32),
                self.to_glyph_space(bounding_box.y_max as f32),
            ],
        }
    }

    /// The glyph drawn for a character, `.notdef` (glyph 0) when the font lacks it.
    fn glyph_id(&self, character: char) -> u16 {
        self.face()
            .glyph_index(character)
            .map(|glyph_id| glyph_id.0)
            .unwrap_or(0)
    }

    fn glyph_advance(&self, glyph_id: u16) -> Option<u16> {
        self.face()
            .glyph_hor_advance(owned_ttf_parser::GlyphId(glyph_id))
    }
}

/// A TrueType font, kept together with the raw bytes it has been loaded from so that it can be
/// embedded into a PDF document.
#[derive(Debug, Clone)]
pub struct Font {
    /// The contents of the font file.
    bytes: Arc<Vec<u8>>,
    /// The face parsed out of `bytes`, used for the metrics and the glyph lookups.
    ttf_face: TtfFontFace,
}

impl Font {
    /// Parses a font from the contents of a TTF (or TrueType flavoured OTF) file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContextError> {
        let ttf_face = TtfFontFace::from_bytes(&bytes)?;

        Ok(Font {
            bytes: Arc::new(bytes),
            ttf_face,
        })
    }

    /// Reads and parses the font stored at the given path.
    pub fn from_path(font_path: &Path) -> Result<Self, ContextError> {
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("Failed to read the font {:?}", font_path))?;
        log::debug!("Loaded {} bytes of font data from {:?}", bytes.len(), font_path);

        Font::from_bytes(bytes)
            .map_err(|error| ContextError::with_error(format!("Invalid font {:?}", font_path), &error))
    }

    /// The width in millimeters of the text when set at the given size in points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let advance: u32 = text
            .nfc()
            .map(|character| {
                let glyph_id = self.ttf_face.glyph_id(character);
                self.ttf_face.glyph_advance(glyph_id).unwrap_or(0) as u32
            })
            .sum();

        points_to_millimeters(advance as f32 * font_size / self.ttf_face.units_per_em as f32)
    }

    /// The glyphs drawing the text, each with the character it stands for.
    fn glyphs(&self, text: &str) -> Vec<(u16, char)> {
        // Composed characters (`ó` rather than `o` and a combining acute) are the ones fonts map
        text.nfc()
            .map(|character| {
                let glyph_id = self.ttf_face.glyph_id(character);
                if glyph_id == 0 {
                    log::warn!("Unable to find the character {:?} in the font", character);
                }
                (glyph_id, character)
            })
            .collect()
    }

    /// Builds the `W` array of the descendant font for the given glyphs.
    fn glyph_widths(&self, glyph_ids: impl IntoIterator<Item = u16>) -> Vec<Object> {
        // Glyphs without an advance take the default width `DW`
        width_runs(glyph_ids.into_iter().filter_map(|glyph_id| {
            let advance = self.ttf_face.glyph_advance(glyph_id)?;
            Some((glyph_id, self.ttf_face.to_glyph_space(advance as f32)))
        }))
    }

    /// Inserts the font program, its descriptor, the descendant CID font and the `ToUnicode`
    /// map into the document, returning the `Type0` font dictionary referencing them.
    ///
    /// Only the glyphs of `used_glyphs` are embedded, along with `.notdef`, when the font can
    /// be subset; otherwise the whole font program is.
    fn insert_into_document(
        &self,
        face_identifier: &str,
        used_glyphs: &BTreeMap<u16, char>,
        inner_document: &mut lopdf::Document,
    ) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let metrics = self.ttf_face.font_metrics();
        let glyph_ids: BTreeSet<u16> = used_glyphs.keys().copied().chain([0]).collect();

        // A subset font is named after its glyphs, prefixed with a tag of six capital letters
        let (font_program, base_font) = match subset_font(&self.bytes, &glyph_ids) {
            Some(font_program) => (
                font_program,
                format!("{}+{}", subset_tag(&glyph_ids), face_identifier),
            ),
            None => {
                log::debug!(
                    "Unable to subset the font {}, embedding all of it",
                    face_identifier
                );
                (self.bytes.as_ref().clone(), face_identifier.to_string())
            }
        };
        log::debug!(
            "Embedding {} glyphs of the font {} in {} bytes",
            glyph_ids.len(),
            base_font,
            font_program.len()
        );

        // `Length1` is the length of the font program before any compression
        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(font_program.len() as i64))]),
            font_program,
        );
        let font_stream_id = inner_document.add_object(font_stream);

        // The properties viewers use to position the glyphs or to substitute the font
        let font_descriptor = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("FontDescriptor".into())),
            ("FontName", Name(base_font.clone().into_bytes())),
            ("Ascent", Integer(metrics.ascent)),
            ("Descent", Integer(metrics.descent)),
            ("CapHeight", Integer(metrics.ascent)),
            ("ItalicAngle", Integer(0)),
            // Nonsymbolic font using the standard Latin character set
            ("Flags", Integer(32)),
            // There is no reliable way of reading it from the font, 80 is the usual fallback
            ("StemV", Integer(80)),
            (
                "FontBBox",
                Array(metrics.bounding_box.iter().copied().map(Integer).collect()),
            ),
            ("FontFile2", Reference(font_stream_id)),
        ]);
        let font_descriptor_id = inner_document.add_object(font_descriptor);

        // The CID of a glyph is its glyph ID, hence the `Identity` mapping
        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(base_font.clone().into_bytes())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(self.glyph_widths(glyph_ids.iter().copied()))),
            ("DW", Integer(1000)),
            ("CIDToGIDMap", Name("Identity".into())),
            ("FontDescriptor", Reference(font_descriptor_id)),
        ]);

        // Lets viewers extract the text back out of the glyph IDs
        let to_unicode_map = generate_to_unicode_map(face_identifier, used_glyphs);
        let to_unicode_id = inner_document.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            to_unicode_map.into_bytes(),
        ));

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type0".into())),
            ("BaseFont", Name(base_font.into_bytes())),
            // `Identity-H` is used for horizontal writing
            ("Encoding", Name("Identity-H".into())),
            ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
            ("ToUnicode", Reference(to_unicode_id)),
        ])
    }
}

/// Six capital letters derived from the glyph set, as required in front of the name of a
/// subset font.
fn subset_tag(glyph_ids: &BTreeSet<u16>) -> String {
    let mut hasher = DefaultHasher::new();
    glyph_ids.hash(&mut hasher);
    let mut hash = hasher.finish();

    (0..6)
        .map(|_| {
            let letter = char::from(b'A' + (hash % 26) as u8);
            hash /= 26;
            letter
        })
        .collect()
}

/// Groups the widths, sorted by glyph ID, into runs of consecutive glyph IDs each followed by
/// the array of their widths, e.g. `[0 [500 600] 7 [250]]`.
fn width_runs(glyph_widths: impl IntoIterator<Item = (u16, i64)>) -> Vec<Object> {
    let mut width_objects = Vec::new();
    let mut run: Option<(u16, Vec<Object>)> = None;

    for (glyph_id, width) in glyph_widths {
        // The glyph extends the current run when it directly follows its last glyph
        if let Some((start, widths)) = run.as_mut() {
            if *start as usize + widths.len() == glyph_id as usize {
                widths.push(Object::Integer(width));
                continue;
            }
        }
        if let Some((start, widths)) = run.replace((glyph_id, vec![Object::Integer(width)])) {
            width_objects.push(Object::Integer(start.into()));
            width_objects.push(Object::Array(widths));
        }
    }
    // Do not forget the last run
    if let Some((start, widths)) = run {
        width_objects.push(Object::Integer(start.into()));
        width_objects.push(Object::Array(widths));
    }

    width_objects
}

/// A font registered into a `PdfDocument`, with the glyphs written with it so far.
#[derive(Debug, Clone)]
struct RegisteredFont {
    /// The object ID reserved for the `Type0` font dictionary.
    object_id: lopdf::ObjectId,
    font: Font,
    /// The glyphs written with this font, each with the first character it has been used for.
    used_glyphs: BTreeMap<u16, char>,
}

/// A single page together with the content stream operations drawn onto it.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    pub(crate) operations: Vec<Operation>,
}

impl PdfPage {
    /// Converts a vertical position measured in millimeters from the top edge into the PDF
    /// coordinate system, whose origin lies in the bottom-left corner.
    fn flip_y(&self, y: f32) -> f32 {
        self.height - millimeters_to_points(y)
    }

    fn encode_contents(&self) -> Result<Vec<u8>, ContextError> {
        lopdf::content::Content {
            operations: self.operations.clone(),
        }
        .encode()
        .context("Failed to encode the page content")
    }
}

/// The outline of a rectangle or a line.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub color: Color,
    /// The line width in millimeters.
    pub line_width: f32,
}

/// A high-level interface to the underlying `lopdf::Document`, holding the pages, the fonts and
/// the identification of the document until everything is written out by `write_all`.
///
/// Every position given to the drawing functions is expressed in millimeters, measured from the
/// top-left corner of the page.
pub struct PdfDocument {
    /// The fonts by their resource name (`F0`, `F1`, ...).
    fonts: BTreeMap<String, RegisteredFont>,
    pub inner_document: lopdf::Document,
    /// The identifier of the document, used for the `ID` entry of the trailer.
    pub identifier: String,
    pub title: String,
    pub author: String,
    pub creator: String,
    pub creation_date: OffsetDateTime,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Creates an empty PDF 1.5 document with the given identifier.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            title: String::new(),
            author: String::new(),
            creator: String::new(),
            creation_date: OffsetDateTime::now_utc(),
            pages: Vec::new(),
        }
    }

    /// Appends a page of the given size in millimeters and returns its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            operations: Vec::new(),
        });

        self.pages.len() - 1
    }

    /// Registers a font and returns the index to be passed to `write_text_to_page`.
    pub fn add_font(&mut self, font: Font) -> usize {
        let font_index = self.fonts.len();
        // The font dictionary itself is only written by `write_all`, once every glyph is known
        let object_id = self.inner_document.new_object_id();
        self.fonts.insert(
            format!("F{font_index}"),
            RegisteredFont {
                object_id,
                font,
                used_glyphs: BTreeMap::new(),
            },
        );

        font_index
    }

    /// Writes a single line of text whose baseline starts at `baseline_position`.
    pub fn write_text_to_page(
        &mut self,
        page_index: usize,
        color: Color,
        text: &str,
        font_index: usize,
        font_size: f32,
        baseline_position: [f32; 2],
    ) -> Result<(), ContextError> {
        let font_name = format!("F{font_index}");
        let registered_font = self.fonts.get_mut(&font_name).ok_or_else(|| {
            ContextError::with_context(format!(
                "Failed to find font {} into the fonts map",
                font_index
            ))
        })?;
        let glyphs = registered_font.font.glyphs(text);
        // Remember the glyphs so that they get embedded, and mapped back to their characters
        for &(glyph_id, character) in glyphs.iter().filter(|(glyph_id, _)| *glyph_id != 0) {
            registered_font
                .used_glyphs
                .entry(glyph_id)
                .or_insert(character);
        }
        // With `Identity-H` the text is the string of the big-endian glyph IDs
        let glyph_bytes: Vec<u8> = glyphs
            .iter()
            .flat_map(|(glyph_id, _)| glyph_id.to_be_bytes())
            .collect();

        let page = self.get_mut_page(page_index)?;
        let [x, y] = baseline_position;
        let [r, g, b] = color;
        // A text object: select the font, move to the baseline, set the color and show the glyphs
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font_name.into_bytes()), font_size.into()],
            ),
            Operation::new(
                "Td",
                vec![millimeters_to_points(x).into(), page.flip_y(y).into()],
            ),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(glyph_bytes, StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ];
        page.operations.extend(operations);

        Ok(())
    }

    /// Draws a rectangle whose top-left corner is at `position`, filled and/or outlined.
    pub fn draw_rectangle(
        &mut self,
        page_index: usize,
        position: [f32; 2],
        size: [f32; 2],
        fill_color: Option<Color>,
        stroke: Option<Stroke>,
    ) -> Result<(), ContextError> {
        let paint_operator = match (fill_color, stroke) {
            (Some(_), Some(_)) => "B",
            (Some(_), None) => "f",
            (None, Some(_)) => "S",
            (None, None) => return Ok(()),
        };

        let page = self.get_mut_page(page_index)?;
        let [x, y] = position;
        let [width, height] = size;
        // The colors and the line width are scoped to the rectangle by `q` and `Q`
        let mut operations = vec![Operation::new("q", vec![])];
        if let Some([r, g, b]) = fill_color {
            operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        }
        if let Some(stroke) = stroke {
            operations.extend(stroke_operations(stroke));
        }
        operations.push(Operation::new(
            "re",
            vec![
                millimeters_to_points(x).into(),
                // The rectangle is anchored at its bottom-left corner in PDF space
                page.flip_y(y + height).into(),
                millimeters_to_points(width).into(),
                millimeters_to_points(height).into(),
            ],
        ));
        operations.push(Operation::new(paint_operator, vec![]));
        operations.push(Operation::new("Q", vec![]));
        page.operations.extend(operations);

        Ok(())
    }

    /// Draws a straight line between two points.
    pub fn draw_line(
        &mut self,
        page_index: usize,
        from: [f32; 2],
        to: [f32; 2],
        stroke: Stroke,
    ) -> Result<(), ContextError> {
        let page = self.get_mut_page(page_index)?;
        let mut operations = vec![Operation::new("q", vec![])];
        operations.extend(stroke_operations(stroke));
        operations.push(Operation::new(
            "m",
            vec![millimeters_to_points(from[0]).into(), page.flip_y(from[1]).into()],
        ));
        operations.push(Operation::new(
            "l",
            vec![millimeters_to_points(to[0]).into(), page.flip_y(to[1]).into()],
        ));
        operations.push(Operation::new("S", vec![]));
        operations.push(Operation::new("Q", vec![]));
        page.operations.extend(operations);

        Ok(())
    }

    /// Writes the document information, the catalog, the page tree, the fonts and the content
    /// streams into the underlying document. It must be called once, before saving.
    pub fn write_all(&mut self, instance_id: &str) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        // The document information dictionary, shown by viewers in the document properties
        let timestamp = to_pdf_timestamp_format(&self.creation_date);
        let text = |value: &str| String(value.as_bytes().to_vec(), Literal);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Trapped", Name("False".into())),
            ("CreationDate", text(&timestamp)),
            ("ModDate", text(&timestamp)),
            ("Title", text(&self.title)),
            ("Author", text(&self.author)),
            ("Creator", text(&self.creator)),
            ("Producer", text(concat!("ticketr ", env!("CARGO_PKG_VERSION")))),
            ("Identifier", text(&self.identifier)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        // The page tree is referenced by the catalog but only written once every page is
        let pages_id = self.inner_document.new_object_id();
        let catalog_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("PageMode", Name("UseNone".into())),
            ("Pages", Reference(pages_id)),
        ]));

        // The trailer points at the catalog and the information, and identifies the file
        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.as_bytes().to_vec(), Literal),
            ]),
        );

        // Every page shares the same resources: the fonts registered into the document
        let fonts_dictionary = self.insert_fonts_into_document();
        let resources_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![(
            "Font",
            Dictionary(fonts_dictionary),
        )]));

        let mut page_ids = Vec::<Object>::with_capacity(self.pages.len());
        for page in self.pages.iter() {
            // Each page gets its own content stream holding the operations drawn onto it
            let content_id = self.inner_document.add_object(lopdf::Stream::new(
                lopdf::Dictionary::new(),
                page.encode_contents()?,
            ));
            let page_box = || {
                Array(vec![
                    Integer(0),
                    Integer(0),
                    page.width.into(),
                    page.height.into(),
                ])
            };
            let page_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Rotate", Integer(0)),
                ("MediaBox", page_box()),
                ("TrimBox", page_box()),
                ("CropBox", page_box()),
                ("Parent", Reference(pages_id)),
                ("Resources", Reference(resources_id)),
                ("Contents", Reference(content_id)),
            ]));
            page_ids.push(Reference(page_id));
        }

        // Finally fill in the page tree reserved above
        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially).
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Serializes the document, which should have been finalized by `write_all`.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document
            .save_to(&mut writer)
            .context("Error while saving the PDF document to bytes")?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Embeds every registered font under its reserved object ID and returns the `Font`
    /// resource dictionary naming them.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (font_name, registered_font) in self.fonts.iter() {
            let font_object = registered_font.font.insert_into_document(
                font_name,
                &registered_font.used_glyphs,
                &mut self.inner_document,
            );
            // Fill in the object ID reserved when the font was registered
            self.inner_document
                .objects
                .insert(registered_font.object_id, Object::Dictionary(font_object));
            font_dictionary.set(font_name.clone(), Object::Reference(registered_font.object_id));
        }

        font_dictionary
    }

    fn get_mut_page(&mut self, page_index: usize) -> Result<&mut PdfPage, ContextError> {
        self.pages.get_mut(page_index).ok_or_else(|| {
            ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            ))
        })
    }
}

fn stroke_operations(stroke: Stroke) -> Vec<Operation> {
    let [r, g, b] = stroke.color;
    vec![
        Operation::new("RG", vec![r.into(), g.into(), b.into()]),
        Operation::new("w", vec![millimeters_to_points(stroke.line_width).into()]),
    ]
}

const TO_UNICODE_MAP_BEGINNING: &str = "/CIDInit /ProcSet findresource begin\n\
12 dict begin\n\
begincmap\n\
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n";

const TO_UNICODE_MAP_CODESPACE: &str = "/CMapType 2 def\n\
1 begincodespacerange\n\
<0000> <FFFF>\n\
endcodespacerange\n";

const TO_UNICODE_MAP_END: &str = "endcmap\n\
CMapName currentdict /CMap defineresource pop\n\
end\n\
end\n";

/// Largest number of entries a single `beginbfchar` section may hold.
const MAXIMUM_BFCHAR_ENTRIES: usize = 100;

/// Generates the `ToUnicode` CMap which lets viewers map the glyph IDs written in the content
/// streams back to text. Entries are grouped in sections of at most 100 glyphs sharing the same
/// high byte.
fn generate_to_unicode_map(face_name: &str, glyph_characters: &BTreeMap<u16, char>) -> String {
    let mut to_unicode_map = TO_UNICODE_MAP_BEGINNING.to_string();
    to_unicode_map.push_str(&format!("/CMapName /{face_name}-UTF16 def\n"));
    to_unicode_map.push_str(TO_UNICODE_MAP_CODESPACE);

    let mut sections: Vec<Vec<(u16, char)>> = Vec::new();
    for (&glyph_id, &character) in glyph_characters {
        match sections.last_mut() {
            Some(section)
                if section.len() < MAXIMUM_BFCHAR_ENTRIES
                    && section[0].0 >> 8 == glyph_id >> 8 =>
            {
                section.push((glyph_id, character))
            }
            _ => sections.push(vec![(glyph_id, character)]),
        }
    }

    for section in sections {
        to_unicode_map.push_str(&format!("{} beginbfchar\n", section.len()));
        for (glyph_id, character) in section {
            let utf16 = character
                .encode_utf16(&mut [0; 2])
                .iter()
                .map(|unit| format!("{unit:04x}"))
                .collect::<std::string::String>();
            to_unicode_map.push_str(&format!("<{glyph_id:04x}> <{utf16}>\n"));
        }
        to_unicode_map.push_str("endbfchar\n");
    }

    to_unicode_map.push_str(TO_UNICODE_MAP_END);
    to_unicode_map
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(pdf_bytes: &[u8]) -> Vec<String> {
        let document = lopdf::Document::load_mem(pdf_bytes).unwrap();
        let (_, page_id) = document.get_pages().into_iter().next().unwrap();
        let content = document.get_page_content(page_id).unwrap();
        lopdf::content::Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .map(|operation| operation.operator)
            .collect()
    }

    #[test]
    fn millimeters_round_trip_through_points() {
        assert!((millimeters_to_points(25.4) - 72.0).abs() < 1e-4);
        assert!((points_to_millimeters(72.0) - 25.4).abs() < 1e-4);
    }

    #[test]
    fn a5_page_has_the_expected_media_box() {
        let mut pdf_document = PdfDocument::new("a5-media-box".into());
        pdf_document.add_page(148.0, 210.0);
        pdf_document.write_all("instance").unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();

        let document = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = document.get_pages();
        assert_eq!(pages.len(), 1);
        let page = document.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let width = media_box[2].as_float().unwrap();
        let height = media_box[3].as_float().unwrap();
        assert!((width - 419.53).abs() < 0.01, "{width}");
        assert!((height - 595.28).abs() < 0.01, "{height}");
    }

    #[test]
    fn shapes_are_written_into_the_page_content() {
        let mut pdf_document = PdfDocument::new("shapes".into());
        let page_index = pdf_document.add_page(148.0, 210.0);
        let stroke = Stroke {
            color: [0.7, 0.7, 0.7],
            line_width: 0.6,
        };
        pdf_document
            .draw_rectangle(page_index, [6.0, 6.0], [56.0, 8.0], Some([0.0; 3]), None)
            .unwrap();
        pdf_document
            .draw_rectangle(page_index, [6.0, 20.0], [10.0, 5.0], None, Some(stroke))
            .unwrap();
        pdf_document
            .draw_line(page_index, [6.0, 105.0], [142.0, 105.0], stroke)
            .unwrap();
        pdf_document.write_all("instance").unwrap();

        let operators = operators(&pdf_document.save_to_bytes().unwrap());
        assert_eq!(operators.iter().filter(|operator| *operator == "re").count(), 2);
        assert!(operators.contains(&"f".to_string()));
        assert!(operators.contains(&"S".to_string()));
        assert!(operators.contains(&"l".to_string()));
    }

    #[test]
    fn drawing_on_a_missing_page_is_an_error() {
        let mut pdf_document = PdfDocument::new("missing-page".into());
        let error = pdf_document
            .draw_line(
                3,
                [0.0, 0.0],
                [1.0, 1.0],
                Stroke {
                    color: [0.0; 3],
                    line_width: 1.0,
                },
            )
            .unwrap_err();
        assert_eq!(error.context, "Failed to find the page with index 3");
    }

    #[test]
    fn writing_with_an_unregistered_font_is_an_error() {
        let mut pdf_document = PdfDocument::new("missing-font".into());
        let page_index = pdf_document.add_page(148.0, 210.0);
        let error = pdf_document
            .write_text_to_page(page_index, [0.0; 3], "Uwagi:", 0, 7.0, [6.0, 50.0])
            .unwrap_err();
        assert!(error.context.contains("Failed to find font 0"));
    }

    #[test]
    fn to_unicode_map_groups_glyphs_by_high_byte() {
        let glyph_characters = BTreeMap::from([(0x0024, 'A'), (0x0025, 'B'), (0x0150, 'ś')]);
        let to_unicode_map = generate_to_unicode_map("F0", &glyph_characters);

        assert!(to_unicode_map.contains("/CMapName /F0-UTF16 def"));
        assert!(to_unicode_map.contains("2 beginbfchar\n<0024> <0041>\n<0025> <0042>\nendbfchar"));
        assert!(to_unicode_map.contains("1 beginbfchar\n<0150> <015b>\nendbfchar"));
        assert!(to_unicode_map.ends_with(TO_UNICODE_MAP_END));
    }

    #[test]
    fn widths_are_grouped_in_runs_of_consecutive_glyphs() {
        let width_objects = width_runs([(0, 600), (36, 684), (37, 686), (38, 698), (72, 612)]);
        let integers = |values: &[i64]| -> Vec<Object> {
            values.iter().copied().map(Object::Integer).collect()
        };
        assert_eq!(
            width_objects,
            vec![
                Object::Integer(0),
                Object::Array(integers(&[600])),
                Object::Integer(36),
                Object::Array(integers(&[684, 686, 698])),
                Object::Integer(72),
                Object::Array(integers(&[612])),
            ]
        );
        assert!(width_runs(Vec::new()).is_empty());
    }

    #[test]
    fn subset_tags_are_six_capital_letters() {
        let tag = subset_tag(&BTreeSet::from([0, 36, 72]));
        assert_eq!(tag.len(), 6);
        assert!(tag.chars().all(|letter| letter.is_ascii_uppercase()));
        assert_eq!(tag, subset_tag(&BTreeSet::from([72, 36, 0])));
    }

    #[test]
    fn timestamps_follow_the_pdf_date_format() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }
}
