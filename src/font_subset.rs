use owned_ttf_parser::{loca, Face, GlyphId, RawFace, Tag};
use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    num::NonZeroU16,
};

/// The tables a TrueType program embedded as `FontFile2` needs. The layout tables (`GSUB`,
/// `GPOS`, `kern`, ...) are dropped since the glyphs are positioned by the PDF content stream.
const KEPT_TABLES: [&[u8; 4]; 13] = [
    b"cmap", b"cvt ", b"fpgm", b"glyf", b"head", b"hhea", b"hmtx", b"loca", b"maxp", b"name",
    b"OS/2", b"post", b"prep",
];

/// The magic number the checksums of a whole font must add up to.
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

// Composite glyph component flags
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Rebuilds a TrueType font keeping the outlines of the given glyphs only (plus `.notdef` and
/// the components of the kept composite glyphs). Glyph IDs are left untouched: every other
/// glyph is still there, but empty, so the `Identity` CID to glyph mapping stays valid.
///
/// Returns `None` when the font is not a TrueType outline font this function can rebuild, e.g.
/// a CFF flavoured OpenType font or a font collection.
pub fn subset_font(font_bytes: &[u8], used_glyphs: &BTreeSet<u16>) -> Option<Vec<u8>> {
    let face = Face::parse(font_bytes, 0).ok()?;
    let raw_face = RawFace::parse(font_bytes, 0).ok()?;
    let table = |tag: &[u8; 4]| raw_face.table(Tag::from_bytes(tag));

    let glyph_count = face.number_of_glyphs();
    let glyf = table(b"glyf")?;
    let loca = loca::Table::parse(
        NonZeroU16::new(glyph_count)?,
        face.tables().head.index_to_location_format,
        table(b"loca")?,
    )?;
    let glyph_data = |glyph_id: u16| {
        loca.glyph_range(GlyphId(glyph_id))
            .and_then(|range| glyf.get(range))
            .unwrap_or_default()
    };

    let kept_glyphs = glyph_closure(used_glyphs, &glyph_data);

    // The new `glyf` table and its offsets, always in the long format
    let mut subset_glyf = Vec::new();
    let mut subset_loca = Vec::with_capacity((glyph_count as usize + 1) * 4);
    for glyph_id in 0..glyph_count {
        subset_loca.extend_from_slice(&(subset_glyf.len() as u32).to_be_bytes());
        if kept_glyphs.contains(&glyph_id) {
            subset_glyf.extend_from_slice(glyph_data(glyph_id));
            pad_to_four_bytes(&mut subset_glyf);
        }
    }
    subset_loca.extend_from_slice(&(subset_glyf.len() as u32).to_be_bytes());

    let mut head = table(b"head")?.to_vec();
    if head.len() < 54 {
        return None;
    }
    // Zero the checksum adjustment, it is computed once the whole font is known
    head[8..12].fill(0);
    // `indexToLocFormat` is now long
    head[50..52].copy_from_slice(&1i16.to_be_bytes());

    let mut tables: BTreeMap<[u8; 4], Cow<[u8]>> = BTreeMap::new();
    for tag in KEPT_TABLES {
        if let Some(data) = table(tag) {
            tables.insert(*tag, Cow::Borrowed(data));
        }
    }
    tables.insert(*b"glyf", Cow::Owned(subset_glyf));
    tables.insert(*b"loca", Cow::Owned(subset_loca));
    tables.insert(*b"head", Cow::Owned(head));
    // A version 3 `post` table carries no glyph names
    if let Some(post) = table(b"post").filter(|post| post.len() >= 32) {
        let mut post = post[..32].to_vec();
        post[..4].copy_from_slice(&0x0003_0000u32.to_be_bytes());
        tables.insert(*b"post", Cow::Owned(post));
    }

    Some(write_font(&tables))
}

/// The used glyphs, `.notdef` and, recursively, every component of the composite glyphs.
fn glyph_closure<'a>(
    used_glyphs: &BTreeSet<u16>,
    glyph_data: impl Fn(u16) -> &'a [u8],
) -> BTreeSet<u16> {
    let mut kept_glyphs = BTreeSet::from([0]);
    let mut pending_glyphs: Vec<u16> = used_glyphs.iter().copied().chain([0]).collect();

    while let Some(glyph_id) = pending_glyphs.pop() {
        kept_glyphs.insert(glyph_id);
        for component in composite_components(glyph_data(glyph_id)) {
            if !kept_glyphs.contains(&component) {
                pending_glyphs.push(component);
            }
        }
    }

    kept_glyphs
}

/// The glyph IDs a composite glyph is made of, nothing for a simple or empty glyph.
fn composite_components(glyph_data: &[u8]) -> Vec<u16> {
    let read_u16 = |offset: usize| {
        glyph_data
            .get(offset..offset + 2)
            .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
    };
    let mut components = Vec::new();
    // A negative number of contours marks a composite glyph
    match read_u16(0) {
        Some(number_of_contours) if (number_of_contours as i16) < 0 => {}
        _ => return components,
    }

    // The components follow the 10 bytes of the glyph header
    let mut offset = 10;
    while let (Some(flags), Some(glyph_id)) = (read_u16(offset), read_u16(offset + 2)) {
        components.push(glyph_id);
        offset += 4;
        offset += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            offset += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            offset += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            offset += 8;
        }
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }

    components
}

fn pad_to_four_bytes(data: &mut Vec<u8>) {
    data.resize(data.len().next_multiple_of(4), 0);
}

/// The sum of the big-endian 32 bit words of the data, zero padded.
fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Serializes the tables, sorted by tag, into a TrueType font file and fills in the checksum
/// adjustment of the `head` table.
fn write_font(tables: &BTreeMap<[u8; 4], Cow<[u8]>>) -> Vec<u8> {
    let table_count = tables.len() as u16;
    // The largest power of two not above the number of tables
    let entry_selector = table_count.checked_ilog2().unwrap_or(0) as u16;
    let search_range = (1u16 << entry_selector) * 16;

    let mut font = Vec::new();
    font.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    font.extend_from_slice(&table_count.to_be_bytes());
    font.extend_from_slice(&search_range.to_be_bytes());
    font.extend_from_slice(&entry_selector.to_be_bytes());
    font.extend_from_slice(&(table_count * 16 - search_range).to_be_bytes());

    let mut table_offset = 12 + tables.len() * 16;
    let mut head_offset = None;
    for (tag, data) in tables {
        if tag == b"head" {
            head_offset = Some(table_offset);
        }
        font.extend_from_slice(tag);
        font.extend_from_slice(&checksum(data).to_be_bytes());
        font.extend_from_slice(&(table_offset as u32).to_be_bytes());
        font.extend_from_slice(&(data.len() as u32).to_be_bytes());
        table_offset += data.len().next_multiple_of(4);
    }
    for data in tables.values() {
        font.extend_from_slice(data);
        pad_to_four_bytes(&mut font);
    }

    if let Some(head_offset) = head_offset {
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&font));
        font[head_offset + 8..head_offset + 12].copy_from_slice(&adjustment.to_be_bytes());
    }

    font
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    /// A composite glyph header followed by the given `(flags, glyph ID, extra bytes)` records.
    fn composite_glyph(components: &[(u16, u16, usize)]) -> Vec<u8> {
        let mut glyph = (-1i16).to_be_bytes().to_vec();
        glyph.extend_from_slice(&[0; 8]);
        for &(flags, glyph_id, extra_bytes) in components {
            glyph.extend_from_slice(&flags.to_be_bytes());
            glyph.extend_from_slice(&glyph_id.to_be_bytes());
            glyph.extend(std::iter::repeat(0).take(extra_bytes));
        }
        glyph
    }

    #[test]
    fn composite_glyphs_list_their_components() {
        let glyph = composite_glyph(&[
            (MORE_COMPONENTS | ARG_1_AND_2_ARE_WORDS, 36, 4),
            (MORE_COMPONENTS | WE_HAVE_A_SCALE, 250, 2 + 2),
            (WE_HAVE_A_TWO_BY_TWO, 7, 2 + 8),
        ]);
        assert_eq!(composite_components(&glyph), vec![36, 250, 7]);
    }

    #[test]
    fn simple_and_empty_glyphs_have_no_components() {
        let mut simple_glyph = 2i16.to_be_bytes().to_vec();
        simple_glyph.extend_from_slice(&[0, 4, 0, 9]);
        assert!(composite_components(&simple_glyph).is_empty());
        assert!(composite_components(&[]).is_empty());
    }

    #[test]
    fn truncated_composite_glyph_stops_at_the_end_of_its_data() {
        let mut glyph = composite_glyph(&[(MORE_COMPONENTS, 12, 2)]);
        glyph.extend_from_slice(&[0, 0]);
        assert_eq!(composite_components(&glyph), vec![12]);
    }

    #[test]
    fn closure_pulls_in_nested_components_and_notdef() {
        // `ż` (3) is made of `z` (1) and the dot (2), which is itself a composite of glyph 4
        let glyphs: BTreeMap<u16, Vec<u8>> = BTreeMap::from([
            (1, vec![0, 1, 0, 0]),
            (2, composite_glyph(&[(0, 4, 2)])),
            (3, composite_glyph(&[(MORE_COMPONENTS, 1, 2), (0, 2, 2)])),
            (4, vec![0, 1, 0, 0]),
        ]);
        let glyph_data =
            |glyph_id: u16| glyphs.get(&glyph_id).map(Vec::as_slice).unwrap_or_default();

        let kept_glyphs = glyph_closure(&BTreeSet::from([3]), glyph_data);
        assert_eq!(kept_glyphs, BTreeSet::from([0, 1, 2, 3, 4]));
    }

    #[test]
    fn written_font_has_a_valid_table_directory() {
        let mut head = vec![0u8; 54];
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        let tables: BTreeMap<[u8; 4], Cow<[u8]>> = BTreeMap::from([
            (*b"head", Cow::Owned(head)),
            (*b"maxp", Cow::Owned(vec![0, 0, 0x50, 0, 0, 5])),
            (*b"glyf", Cow::Owned(vec![1, 2, 3])),
        ]);

        let font = write_font(&tables);
        assert_eq!(font.len() % 4, 0);
        assert_eq!(checksum(&font), CHECKSUM_MAGIC);

        let raw_face = RawFace::parse(&font, 0).unwrap();
        assert_eq!(raw_face.table_records.len(), 3);
        assert_eq!(
            raw_face.table(Tag::from_bytes(b"glyf")).unwrap().to_vec(),
            vec![1, 2, 3]
        );
        assert_eq!(
            raw_face.table(Tag::from_bytes(b"maxp")).unwrap().to_vec(),
            vec![0, 0, 0x50, 0, 0, 5]
        );
        for record in raw_face.table_records {
            assert_eq!(record.offset % 4, 0);
        }
        // searchRange, entrySelector and rangeShift for three tables
        assert_eq!(font[6..12].to_vec(), vec![0, 32, 0, 1, 0, 16]);
    }

    #[test]
    fn non_truetype_data_is_not_subset() {
        assert!(subset_font(b"OTTO not a font", &BTreeSet::from([1])).is_none());
        assert!(subset_font(&[], &BTreeSet::new()).is_none());
    }
}
