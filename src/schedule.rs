use time::{macros::format_description, Date, Weekday};

use crate::error::ContextError;

/// The MIME type of a dragged order, whose payload is its identifier as a big-endian `i32`.
pub const ORDER_ID_MIME_TYPE: &str = "application/x-order-id";

/// How many orders a day holds before dropping another one asks for confirmation.
pub const DEFAULT_MAX_ORDERS: usize = 20;

/// The background and text colors of a day header, as CSS hex strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderColors {
    pub background: &'static str,
    pub foreground: &'static str,
}

const WEEK_HEADER_COLORS: [HeaderColors; 4] = [
    HeaderColors {
        background: "#e6f0fa",
        foreground: "#235d9f",
    },
    HeaderColors {
        background: "#eafaea",
        foreground: "#2d7c31",
    },
    HeaderColors {
        background: "#fff9e1",
        foreground: "#a6842e",
    },
    HeaderColors {
        background: "#e6f0fa",
        foreground: "#235d9f",
    },
];

/// The planner receiving the orders dropped onto the days of the calendar.
pub trait DropHandler {
    fn handle_drop(&mut self, order_id: i32, day: Date);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The order has been handed to the planner.
    Accepted { order_id: i32 },
    /// The day was full and the user declined to overbook it.
    Declined { order_id: i32 },
}

/// A day of the production calendar and the orders scheduled on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub day: Date,
    pub orders: Vec<i32>,
    pub max_orders: usize,
    pub week_index: usize,
}

impl DayCell {
    pub fn new(day: Date) -> Self {
        DayCell {
            day,
            orders: Vec::new(),
            max_orders: DEFAULT_MAX_ORDERS,
            week_index: 0,
        }
    }

    /// A day placed among the days shown by the calendar, which determines its header colors.
    pub fn within(day: Date, displayed_days: &[Date]) -> Self {
        DayCell {
            week_index: week_index(day, displayed_days),
            ..DayCell::new(day)
        }
    }

    pub fn accepts_mime(mime_type: &str) -> bool {
        mime_type == ORDER_ID_MIME_TYPE
    }

    /// Reads the order identifier out of a drag payload.
    pub fn decode_order_id(payload: &[u8]) -> Result<i32, ContextError> {
        let bytes: [u8; 4] = payload
            .get(..4)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                ContextError::with_context(format!(
                    "The order payload holds {} bytes instead of 4",
                    payload.len()
                ))
            })?;

        Ok(i32::from_be_bytes(bytes))
    }

    /// Hands the dropped order over to the planner. When the day is already full `confirm` is
    /// asked (with the maximum number of orders) whether to overbook it.
    pub fn handle_drop<D: DropHandler + ?Sized>(
        &self,
        payload: &[u8],
        confirm: impl FnOnce(usize) -> bool,
        planner: &mut D,
    ) -> Result<DropOutcome, ContextError> {
        let order_id = DayCell::decode_order_id(payload)?;
        if self.is_full() && !confirm(self.max_orders) {
            log::debug!("Declined to overbook {} with order {}", self.day, order_id);
            return Ok(DropOutcome::Declined { order_id });
        }

        planner.handle_drop(order_id, self.day);
        Ok(DropOutcome::Accepted { order_id })
    }

    pub fn is_full(&self) -> bool {
        self.orders.len() >= self.max_orders
    }

    pub fn add_order(&mut self, order_id: i32) {
        self.orders.push(order_id);
    }

    pub fn clear_orders(&mut self) {
        self.orders.clear();
    }

    /// The question asked before overbooking the day.
    pub fn overbooking_question(&self) -> String {
        format!(
            "W tym dniu jest już {} zamówień. Czy dodać kolejne?",
            self.max_orders
        )
    }

    pub fn weekday_name(&self) -> &'static str {
        polish_weekday_name(self.day.weekday())
    }

    /// The date as `DD.MM.YYYY`.
    pub fn date_label(&self) -> String {
        let format = format_description!("[day].[month].[year]");
        self.day
            .format(&format)
            .unwrap_or_else(|_| self.day.to_string())
    }

    pub fn header_colors(&self) -> HeaderColors {
        WEEK_HEADER_COLORS[self.week_index % WEEK_HEADER_COLORS.len()]
    }
}

pub fn polish_weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Poniedziałek",
        Weekday::Tuesday => "Wtorek",
        Weekday::Wednesday => "Środa",
        Weekday::Thursday => "Czwartek",
        Weekday::Friday => "Piątek",
        Weekday::Saturday => "Sobota",
        Weekday::Sunday => "Niedziela",
    }
}

/// The calendar shows five working days per week: the week of a day is its position among the
/// displayed days divided by five. Days that are not displayed belong to the first week.
pub fn week_index(day: Date, displayed_days: &[Date]) -> usize {
    displayed_days
        .iter()
        .position(|displayed_day| *displayed_day == day)
        .map_or(0, |position| position / 5)
}
