use crate::columns::{allocate_column_widths, ColumnBounds};
use crate::document::Operation;
use crate::fonts::{FontStyle, TextMeasure};
use crate::pdf::{points_to_millimeters, Color, Stroke};
use crate::records::{Client, Order, OrderItem};
use crate::row::item_row;
use crate::text_fitting::{fit_font_size, wrap_lines, wrap_paragraphs};

pub const PAGE_WIDTH: f32 = 148.0;
pub const PAGE_HEIGHT: f32 = 210.0;
pub const PAGE_MARGIN: f32 = 6.0;
pub const TICKET_HEIGHT: f32 = 90.0;
pub const TICKET_SPACING: f32 = 6.0;
pub const FIRST_TICKET_TOP: f32 = PAGE_MARGIN;
/// The lower copy sits 10mm further down than the ticket height and spacing alone would put it.
pub const SECOND_TICKET_TOP: f32 = PAGE_MARGIN + TICKET_HEIGHT + TICKET_SPACING + 10.0;

/// The horizontal padding between a cell border and its text.
pub const CELL_MARGIN: f32 = 1.0;

const HEADER_BOX_HEIGHT: f32 = 8.0;
const ORDER_NUMBER_BOX_WIDTH: f32 = 56.0;
const DATE_BOXES_OFFSET: f32 = 58.0;
const DATE_BOXES_GAP: f32 = 15.0;
const DATE_LABEL_PADDING: f32 = 6.0;
const DELIVERY_COLUMN_OFFSET: f32 = 60.0;
const CLIENT_LABEL_WIDTH: f32 = 18.0;
const CLIENT_VALUE_WIDTH: f32 = 20.0;
const DELIVERY_VALUE_WIDTH: f32 = 34.0;
const INFO_LINE_HEIGHT: f32 = 4.0;
const TABLE_OFFSET: f32 = 22.0;

pub const TABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * PAGE_MARGIN;
pub const TABLE_HEADERS: [&str; 9] = [
    "Lp.",
    "Wymiar",
    "Materiał",
    "Na rolce",
    "Rdzeń",
    "Ilość",
    "Miara",
    "zam. rolki",
    "Cena",
];
pub const COLUMN_BOUNDS: ColumnBounds = ColumnBounds {
    minimum_width: 10.0,
    maximum_width: 70.0,
    padding: 1.0,
};
const TITLE_BAR_HEIGHT: f32 = 6.0;
const TABLE_LINE_HEIGHT: f32 = 5.0;
const BODY_MAXIMUM_FONT_SIZE: f32 = 7.0;
const BODY_MINIMUM_FONT_SIZE: f32 = 5.0;

const NOTES_WIDTH: f32 = 110.0;
const NOTES_LINE_HEIGHT: f32 = 4.0;

const CUT_LINE_Y: f32 = PAGE_HEIGHT / 2.0;
const CUT_LABEL: &str = "--- cięcie ---";
const CUT_LABEL_SIZE: [f32; 2] = [20.0, 5.0];

/// An RGB color from its 8-bit components.
macro_rules! rgb {
    ($red:expr, $green:expr, $blue:expr) => {
        [$red as f32 / 255.0, $green as f32 / 255.0, $blue as f32 / 255.0]
    };
}

const BLACK: Color = [0.0, 0.0, 0.0];
const WHITE: Color = [1.0, 1.0, 1.0];
const LIGHT_GREY: Color = rgb!(245, 245, 245);
const TABLE_FILL: Color = rgb!(180, 200, 245);
const TABLE_TITLE_COLOR: Color = rgb!(40, 80, 160);
const TABLE_BORDER: Stroke = Stroke {
    color: rgb!(180, 180, 200),
    line_width: 0.2,
};
const CUT_LINE_STROKE: Stroke = Stroke {
    color: rgb!(180, 180, 180),
    line_width: 0.6,
};
const CUT_LABEL_COLOR: Color = rgb!(120, 120, 120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_style: FontStyle,
    pub font_size: f32,
    pub color: Color,
}

impl TextStyle {
    pub const fn new(font_style: FontStyle, font_size: f32) -> Self {
        TextStyle {
            font_style,
            font_size,
            color: BLACK,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// A labelled line of the client or delivery block. The slot is the line it is drawn on, so
/// that lines keep their place when the ones before them are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRow {
    pub slot: usize,
    pub label: &'static str,
    pub value: String,
}

/// Where the parts of a ticket ended up, in millimeters from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketGeometry {
    pub top: f32,
    pub client_rows_top: f32,
    pub table_top: f32,
    pub notes_top: f32,
    pub table: Option<TableGeometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableGeometry {
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
    pub bottom: f32,
}

/// The billing lines of the client block. Empty values are skipped but keep their slot.
pub fn client_rows(client: &Client) -> Vec<LabeledRow> {
    labeled_rows([
        ("Firma:", client.display_name().to_string()),
        ("Nr klienta:", client.client_number.clone()),
        ("Ulica i nr:", client.street.clone()),
        ("Kod poczt.:", client.postal_code.clone()),
        ("Miasto:", client.city.clone()),
    ])
}

/// The delivery lines, each delivery value falling back to its billing counterpart, followed by
/// the contact lines. Contact lines take the slots right after the address, in order. An empty
/// result means that nothing is known about the delivery.
pub fn delivery_rows(client: &Client) -> Vec<LabeledRow> {
    let or_billing = |delivery: &str, billing: &str| {
        if delivery.is_empty() {
            billing.to_string()
        } else {
            delivery.to_string()
        }
    };
    let mut rows = labeled_rows([
        ("Firma:", or_billing(&client.delivery_company, &client.name)),
        ("Ulica i nr:", or_billing(&client.delivery_street, &client.street)),
        (
            "Kod poczt.:",
            or_billing(&client.delivery_postal_code, &client.postal_code),
        ),
        ("Miasto:", or_billing(&client.delivery_city, &client.city)),
    ]);

    let contacts = [
        ("Osoba kont.:", &client.contact_person),
        ("tel:", &client.phone),
    ];
    let contact_rows = contacts
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .enumerate()
        .map(|(index, (label, value))| LabeledRow {
            slot: 4 + index,
            label,
            value: value.clone(),
        });
    rows.extend(contact_rows);

    rows
}

/// How many contact lines the delivery block grows by.
pub fn contact_row_count(client: &Client) -> usize {
    [&client.contact_person, &client.phone]
        .into_iter()
        .filter(|value| !value.is_empty())
        .count()
}

fn labeled_rows<const N: usize>(rows: [(&'static str, String); N]) -> Vec<LabeledRow> {
    rows.into_iter()
        .enumerate()
        .filter(|(_, (_, value))| !value.is_empty())
        .map(|(slot, (label, value))| LabeledRow { slot, label, value })
        .collect()
}

/// The table body: the 1-based line number followed by the item fields, placeholders left out.
pub fn table_rows(items: &[OrderItem]) -> Vec<Vec<String>> {
    items
        .iter()
        .filter(|item| !item.is_placeholder())
        .enumerate()
        .map(|(index, item)| {
            std::iter::once((index + 1).to_string())
                .chain(item_row(item))
                .collect()
        })
        .collect()
}

/// Builds the drawing operations of the production page, one cell at a time, the way a
/// printer would fill in a form.
pub struct PageComposer<'a, M: TextMeasure + ?Sized> {
    measure: &'a M,
    operations: Vec<Operation>,
}

impl<'a, M: TextMeasure + ?Sized> PageComposer<'a, M> {
    /// Starts an empty A5 page.
    pub fn new(measure: &'a M) -> Self {
        PageComposer {
            measure,
            operations: vec![Operation::AppendNewPage {
                page_width: PAGE_WIDTH,
                page_height: PAGE_HEIGHT,
            }],
        }
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// Writes a single line of text into the cell box at `position`. A zero width stretches the
    /// cell up to the right margin.
    pub fn cell(
        &mut self,
        position: [f32; 2],
        size: [f32; 2],
        text: &str,
        style: TextStyle,
        align: Align,
    ) {
        if text.is_empty() {
            return;
        }
        let [x, y] = position;
        let [width, height] = size;
        let width = if width == 0.0 {
            PAGE_WIDTH - PAGE_MARGIN - x
        } else {
            width
        };

        let text_width = self
            .measure
            .text_width(text, style.font_style, style.font_size);
        let text_x = match align {
            Align::Left => x + CELL_MARGIN,
            Align::Center => x + (width - text_width) / 2.0,
            Align::Right => x + width - CELL_MARGIN - text_width,
        };
        // Slightly below the middle of the box, so that the glyphs look vertically centered
        let baseline_y = y + height / 2.0 + 0.3 * points_to_millimeters(style.font_size);

        self.operations.push(Operation::UnicodeText {
            color: style.color,
            position: [text_x, baseline_y],
            text_string: text.to_string(),
            font_size: style.font_size,
            font_style: style.font_style,
        });
    }

    pub fn rectangle(
        &mut self,
        position: [f32; 2],
        size: [f32; 2],
        fill_color: Option<Color>,
        stroke: Option<Stroke>,
    ) {
        self.operations.push(Operation::Rectangle {
            position,
            size,
            fill_color,
            stroke,
        });
    }

    /// The dashed-label line the two copies are cut apart along.
    pub fn cut_guide(&mut self) {
        let right = PAGE_WIDTH - PAGE_MARGIN;
        self.operations.push(Operation::Line {
            from: [PAGE_MARGIN, CUT_LINE_Y],
            to: [right, CUT_LINE_Y],
            stroke: CUT_LINE_STROKE,
        });
        self.cell(
            [right - CUT_LABEL_SIZE[0], CUT_LINE_Y - 4.0],
            CUT_LABEL_SIZE,
            CUT_LABEL,
            TextStyle::new(FontStyle::Regular, 8.0).with_color(CUT_LABEL_COLOR),
            Align::Right,
        );
    }

    /// Lays out one copy of the ticket with its top edge at `top`.
    pub fn ticket(
        &mut self,
        order: &Order,
        client: &Client,
        items: &[OrderItem],
        top: f32,
    ) -> TicketGeometry {
        let x = PAGE_MARGIN;
        // The order number and the two dates, white on black
        self.header_band(order, [x, top]);

        let captions_top = top + HEADER_BOX_HEIGHT + 5.0;
        let caption_style = TextStyle::new(FontStyle::Bold, 8.0);
        self.cell(
            [x, captions_top],
            [40.0, INFO_LINE_HEIGHT],
            "Dane klienta",
            caption_style,
            Align::Left,
        );
        self.cell(
            [x + DELIVERY_COLUMN_OFFSET, captions_top],
            [0.0, INFO_LINE_HEIGHT],
            "Adres dostawy",
            caption_style,
            Align::Left,
        );

        // Both blocks share their rows: a missing value leaves its row blank
        let client_rows_top = captions_top + INFO_LINE_HEIGHT;
        for row in client_rows(client) {
            self.labeled_row([x, client_rows_top], &row, CLIENT_VALUE_WIDTH);
        }
        let delivery_origin = [x + DELIVERY_COLUMN_OFFSET, client_rows_top];
        let delivery_rows = delivery_rows(client);
        if delivery_rows.is_empty() {
            self.cell(
                delivery_origin,
                [0.0, INFO_LINE_HEIGHT],
                "brak danych",
                TextStyle::new(FontStyle::Italic, 7.0),
                Align::Left,
            );
        }
        for row in delivery_rows.iter() {
            self.labeled_row(delivery_origin, row, DELIVERY_VALUE_WIDTH);
        }

        // Every contact row of the delivery block pushes the table one line further down
        let table_top = client_rows_top
            + TABLE_OFFSET
            + INFO_LINE_HEIGHT * contact_row_count(client) as f32;
        let table = self.production_table(items, [x, table_top]);
        let notes_top = match &table {
            Some(table) => table.bottom + 1.0,
            None => table_top,
        };
        self.notes(&order.notes, [x, notes_top]);

        TicketGeometry {
            top,
            client_rows_top,
            table_top,
            notes_top,
            table,
        }
    }

    fn header_band(&mut self, order: &Order, [x, y]: [f32; 2]) {
        let box_size = |width: f32| [width, HEADER_BOX_HEIGHT];
        self.rectangle([x, y], box_size(ORDER_NUMBER_BOX_WIDTH), Some(BLACK), None);
        self.cell(
            [x, y],
            box_size(ORDER_NUMBER_BOX_WIDTH),
            &format!("Nr zamówienia: {}", order.order_number),
            TextStyle::new(FontStyle::Bold, 9.0).with_color(WHITE),
            Align::Left,
        );

        let label_style = TextStyle::new(FontStyle::Bold, 8.0).with_color(WHITE);
        let date_style = TextStyle::new(FontStyle::Regular, 8.0);
        // Each date box is as wide as its label, with the date written right below it
        let mut box_x = x + DATE_BOXES_OFFSET;
        for (label, date) in [
            ("Data zamówienia:", &order.order_date),
            ("Data wysyłki:", &order.delivery_date),
        ] {
            let box_width =
                self.measure
                    .text_width(label, label_style.font_style, label_style.font_size)
                    + DATE_LABEL_PADDING;
            self.rectangle([box_x, y], box_size(box_width), Some(BLACK), None);
            self.cell([box_x, y], box_size(box_width), label, label_style, Align::Left);
            self.cell(
                [box_x, y + HEADER_BOX_HEIGHT],
                [box_width, 5.0],
                date,
                date_style,
                Align::Left,
            );
            box_x += box_width + DATE_BOXES_GAP;
        }
    }

    fn labeled_row(&mut self, [x, y]: [f32; 2], row: &LabeledRow, value_width: f32) {
        let row_y = y + row.slot as f32 * INFO_LINE_HEIGHT;
        self.cell(
            [x, row_y],
            [CLIENT_LABEL_WIDTH, INFO_LINE_HEIGHT],
            row.label,
            TextStyle::new(FontStyle::Bold, 7.0),
            Align::Left,
        );
        self.cell(
            [x + CLIENT_LABEL_WIDTH, row_y],
            [value_width, INFO_LINE_HEIGHT],
            &row.value,
            TextStyle::new(FontStyle::Regular, 7.0),
            Align::Left,
        );
    }

    fn production_table(&mut self, items: &[OrderItem], [x, y]: [f32; 2]) -> Option<TableGeometry> {
        let rows = table_rows(items);
        if rows.is_empty() {
            log::debug!("No production lines to print, leaving the table out");
            return None;
        }

        // The columns are sized after the headers and the cells, as if all were set in bold
        let measure = self.measure;
        let column_widths =
            allocate_column_widths(&TABLE_HEADERS, &rows, TABLE_WIDTH, COLUMN_BOUNDS, |text| {
                measure.text_width(text, FontStyle::Bold, 7.0)
            });
        let table_width: f32 = column_widths.iter().sum();

        // The title bar, then the header row right under it
        self.rectangle([x, y], [table_width, TITLE_BAR_HEIGHT], Some(TABLE_FILL), None);
        self.cell(
            [x, y],
            [table_width, TITLE_BAR_HEIGHT],
            "Dane produkcji",
            TextStyle::new(FontStyle::Bold, 8.0).with_color(TABLE_TITLE_COLOR),
            Align::Left,
        );

        let header_top = y + TABLE_LINE_HEIGHT;
        let mut column_x = x;
        for (header, width) in TABLE_HEADERS.iter().zip(column_widths.iter()) {
            let size = [*width, TABLE_LINE_HEIGHT];
            self.rectangle([column_x, header_top], size, Some(TABLE_FILL), Some(TABLE_BORDER));
            self.cell(
                [column_x, header_top],
                size,
                header,
                TextStyle::new(FontStyle::Bold, 7.0),
                Align::Center,
            );
            column_x += width;
        }

        // Odd rows are shaded, each row being as tall as its longest cell
        let mut row_top = header_top + TABLE_LINE_HEIGHT;
        let mut row_heights = Vec::with_capacity(rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let fill_color = if row_index % 2 == 1 { LIGHT_GREY } else { WHITE };
            let row_height = self.body_row(row, &column_widths, [x, row_top], fill_color);
            row_heights.push(row_height);
            row_top += row_height;
        }

        Some(TableGeometry {
            column_widths,
            row_heights,
            bottom: row_top,
        })
    }

    /// Draws a table row whose cells shrink their font and wrap to fit their column, and
    /// returns its height.
    fn body_row(
        &mut self,
        row: &[String],
        column_widths: &[f32],
        [x, y]: [f32; 2],
        fill_color: Color,
    ) -> f32 {
        // The font size and the lines of each cell are decided before anything is drawn
        let cells: Vec<(f32, Vec<String>)> = row
            .iter()
            .zip(column_widths.iter())
            .map(|(text, width)| {
                let inner_width = width - 2.0 * CELL_MARGIN;
                let font_size = fit_font_size(
                    self.measure,
                    FontStyle::Regular,
                    text,
                    inner_width,
                    BODY_MAXIMUM_FONT_SIZE,
                    BODY_MINIMUM_FONT_SIZE,
                );
                let lines = wrap_lines(self.measure, FontStyle::Regular, font_size, text, inner_width);
                (font_size, lines)
            })
            .collect();
        let line_count = cells
            .iter()
            .map(|(_, lines)| lines.len())
            .max()
            .unwrap_or(0)
            .max(1);
        let row_height = line_count as f32 * TABLE_LINE_HEIGHT;

        // The boxes take the full height of the row while the lines start from its top
        let mut column_x = x;
        for ((font_size, lines), width) in cells.iter().zip(column_widths.iter()) {
            self.rectangle(
                [column_x, y],
                [*width, row_height],
                Some(fill_color),
                Some(TABLE_BORDER),
            );
            for (line_index, line) in lines.iter().enumerate() {
                self.cell(
                    [column_x, y + line_index as f32 * TABLE_LINE_HEIGHT],
                    [*width, TABLE_LINE_HEIGHT],
                    line,
                    TextStyle::new(FontStyle::Regular, *font_size),
                    Align::Center,
                );
            }
            column_x += width;
        }

        row_height
    }

    fn notes(&mut self, notes: &str, [x, y]: [f32; 2]) {
        self.cell(
            [x, y],
            [0.0, NOTES_LINE_HEIGHT],
            "Uwagi:",
            TextStyle::new(FontStyle::Bold, 7.0),
            Align::Left,
        );

        // Every line of the notes is wrapped on its own, under the caption
        let style = TextStyle::new(FontStyle::Regular, 6.0);
        let lines = wrap_paragraphs(
            self.measure,
            style.font_style,
            style.font_size,
            notes,
            NOTES_WIDTH - 2.0 * CELL_MARGIN,
        );
        for (line_index, line) in lines.iter().enumerate() {
            let line_top = y + NOTES_LINE_HEIGHT * (1 + line_index) as f32;
            self.cell(
                [x, line_top],
                [NOTES_WIDTH, NOTES_LINE_HEIGHT],
                line,
                style,
                Align::Left,
            );
        }
    }
}

/// The whole A5 production page: the upper copy, the cut guide and the lower copy.
pub fn compose_production_page<M: TextMeasure + ?Sized>(
    measure: &M,
    order: &Order,
    client: &Client,
    items: &[OrderItem],
) -> Vec<Operation> {
    let mut composer = PageComposer::new(measure);
    composer.ticket(order, client, items, FIRST_TICKET_TOP);
    composer.cut_guide();
    composer.ticket(order, client, items, SECOND_TICKET_TOP);

    composer.into_operations()
}
