use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{macros::format_description, PrimitiveDateTime, UtcOffset};

use crate::error::{ContextError, ResultExt as _};

/// The name of a field under the canonical scheme and, for fields that used to be keyed by
/// their display label, under the legacy scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    pub canonical: &'static str,
    pub legacy: Option<&'static str>,
}

impl FieldKey {
    pub const fn new(canonical: &'static str, legacy: &'static str) -> Self {
        FieldKey {
            canonical,
            legacy: Some(legacy),
        }
    }

    pub const fn canonical_only(canonical: &'static str) -> Self {
        FieldKey {
            canonical,
            legacy: None,
        }
    }
}

/// A loosely keyed record, as stored by the persistence layer or exported from older versions
/// of the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub serde_json::Map<String, Value>);

impl Record {
    /// The value of the field, looked up under the canonical key and then under the legacy key.
    /// `null` values count as absent.
    pub fn resolve(&self, key: FieldKey) -> Option<&Value> {
        let lookup = |name: &str| self.0.get(name).filter(|value| !value.is_null());
        lookup(key.canonical).or_else(|| key.legacy.and_then(lookup))
    }

    /// The display text of the field, empty when it is absent under both schemes.
    pub fn text(&self, key: FieldKey) -> String {
        self.resolve(key).map(display_value).unwrap_or_default()
    }
}

impl<const N: usize> From<[(&str, Value); N]> for Record {
    fn from(fields: [(&str, Value); N]) -> Self {
        Record(
            fields
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }
}

/// Renders a JSON value the way it is printed on a ticket. Date-times collapse to their date.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => display_text(text),
        other => other.to_string(),
    }
}

fn display_text(text: &str) -> String {
    let date_time_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    let Some((date_time, remainder)) = text.get(..19).zip(text.get(19..)) else {
        return text.to_string();
    };
    if !is_date_time_suffix(remainder) {
        return text.to_string();
    }

    date_time_formats
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(date_time, format).ok())
        .and_then(|date_time| {
            date_time
                .date()
                .format(format_description!("[year]-[month]-[day]"))
                .ok()
        })
        .unwrap_or_else(|| text.to_string())
}

/// What may follow the seconds of a date-time: optional fractional seconds, then optionally
/// `Z` or a `+HH:MM`/`-HH:MM` offset. The offset does not move the printed date.
fn is_date_time_suffix(suffix: &str) -> bool {
    let time_zone = match suffix.strip_prefix('.') {
        Some(fraction) => {
            let time_zone =
                fraction.trim_start_matches(|character: char| character.is_ascii_digit());
            if time_zone.len() == fraction.len() {
                return false;
            }
            time_zone
        }
        None => suffix,
    };
    let offset_format = format_description!("[offset_hour sign:mandatory]:[offset_minute]");

    time_zone.is_empty()
        || time_zone.eq_ignore_ascii_case("z")
        || UtcOffset::parse(time_zone, offset_format).is_ok()
}

pub mod keys {
    use super::FieldKey;

    pub const ORDER_NUMBER: FieldKey = FieldKey::new("order_number", "Nr zamówienia");
    pub const ORDER_DATE: FieldKey = FieldKey::new("order_date", "Data zamówienia");
    pub const DELIVERY_DATE: FieldKey = FieldKey::new("delivery_date", "Data dostawy");
    pub const NOTES: FieldKey = FieldKey::new("notes", "Uwagi");

    pub const CLIENT_NAME: FieldKey = FieldKey::new("name", "Firma");
    pub const SHORT_NAME: FieldKey = FieldKey::new("short_name", "Nazwa skrócona");
    pub const CLIENT_NUMBER: FieldKey = FieldKey::new("client_number", "Nr klienta");
    pub const STREET: FieldKey = FieldKey::new("street", "Ulica i nr");
    pub const POSTAL_CODE: FieldKey = FieldKey::new("postal_code", "Kod pocztowy");
    pub const CITY: FieldKey = FieldKey::new("city", "Miasto");
    pub const DELIVERY_COMPANY: FieldKey = FieldKey::canonical_only("delivery_company");
    pub const DELIVERY_STREET: FieldKey = FieldKey::canonical_only("delivery_street");
    pub const DELIVERY_POSTAL_CODE: FieldKey = FieldKey::canonical_only("delivery_postal_code");
    pub const DELIVERY_CITY: FieldKey = FieldKey::canonical_only("delivery_city");
    pub const CONTACT_PERSON: FieldKey = FieldKey::canonical_only("contact_person");
    pub const PHONE: FieldKey = FieldKey::canonical_only("phone");

    pub const ITEM_ID: FieldKey = FieldKey::canonical_only("id");
    pub const ITEM_ORDER_ID: FieldKey = FieldKey::canonical_only("order_id");
    pub const WIDTH: FieldKey = FieldKey::new("width", "Szerokość");
    pub const HEIGHT: FieldKey = FieldKey::new("height", "Wysokość");
    pub const MATERIAL: FieldKey = FieldKey::new("material", "Rodzaj materiału");
    pub const ROLL_LENGTH: FieldKey = FieldKey::new("roll_length", "nawój/długość");
    pub const CORE: FieldKey = FieldKey::new("core", "Średnica rdzenia");
    pub const ORDERED_QUANTITY: FieldKey = FieldKey::new("ordered_quantity", "zam. ilość");
    pub const QUANTITY_TYPE: FieldKey = FieldKey::new("quantity_type", "Typ ilości");
    pub const ROLL_COUNT: FieldKey = FieldKey::new("zam_rolki", "zam. rolki");
    pub const PRICE: FieldKey = FieldKey::new("price", "Cena");
    pub const PRICE_TYPE: FieldKey = FieldKey::new("price_type", "CenaTyp");
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: String,
    pub order_date: String,
    pub delivery_date: String,
    pub notes: String,
}

impl Order {
    pub fn from_record(record: &Record) -> Self {
        Order {
            order_number: record.text(keys::ORDER_NUMBER),
            order_date: record.text(keys::ORDER_DATE),
            delivery_date: record.text(keys::DELIVERY_DATE),
            notes: record.text(keys::NOTES),
        }
    }
}

/// A client with its billing address and the optional delivery specifics. Empty strings stand
/// for absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub short_name: String,
    pub client_number: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub delivery_company: String,
    pub delivery_street: String,
    pub delivery_postal_code: String,
    pub delivery_city: String,
    pub contact_person: String,
    pub phone: String,
}

impl Client {
    pub fn from_record(record: &Record) -> Self {
        Client {
            name: record.text(keys::CLIENT_NAME),
            short_name: record.text(keys::SHORT_NAME),
            client_number: record.text(keys::CLIENT_NUMBER),
            street: record.text(keys::STREET),
            postal_code: record.text(keys::POSTAL_CODE),
            city: record.text(keys::CITY),
            delivery_company: record.text(keys::DELIVERY_COMPANY),
            delivery_street: record.text(keys::DELIVERY_STREET),
            delivery_postal_code: record.text(keys::DELIVERY_POSTAL_CODE),
            delivery_city: record.text(keys::DELIVERY_CITY),
            contact_person: record.text(keys::CONTACT_PERSON),
            phone: record.text(keys::PHONE),
        }
    }

    /// The short name when there is one, the full name otherwise.
    pub fn display_name(&self) -> &str {
        if self.short_name.is_empty() {
            &self.name
        } else {
            &self.short_name
        }
    }
}

/// One production line item of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Option<i64>,
    pub order_id: Option<i64>,
    pub width: String,
    pub height: String,
    pub material: String,
    pub ordered_quantity: String,
    pub quantity_type: String,
    pub roll_length: String,
    pub core: String,
    pub price: String,
    pub price_type: String,
    /// The precomputed number of rolls, printed as given.
    pub roll_count: String,
}

impl OrderItem {
    pub fn from_record(record: &Record) -> Self {
        OrderItem {
            id: record.resolve(keys::ITEM_ID).and_then(Value::as_i64),
            order_id: record.resolve(keys::ITEM_ORDER_ID).and_then(Value::as_i64),
            width: record.text(keys::WIDTH),
            height: record.text(keys::HEIGHT),
            material: record.text(keys::MATERIAL),
            ordered_quantity: record.text(keys::ORDERED_QUANTITY),
            quantity_type: record.text(keys::QUANTITY_TYPE),
            roll_length: record.text(keys::ROLL_LENGTH),
            core: record.text(keys::CORE),
            price: record.text(keys::PRICE),
            price_type: record.text(keys::PRICE_TYPE),
            roll_count: record.text(keys::ROLL_COUNT),
        }
    }

    /// Items without a width are empty rows left over by the order form.
    pub fn is_placeholder(&self) -> bool {
        self.width.trim().is_empty()
    }
}

/// Everything needed to print the ticket of one order, as found in an order export file:
///
/// ```json
/// { "order": { "order_number": "Z-2024-001" }, "client": { "Firma": "Acme" }, "items": [] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBundle {
    pub order: Record,
    pub client: Record,
    #[serde(default)]
    pub items: Vec<Record>,
}

impl OrderBundle {
    pub fn from_path(order_file_path: &Path) -> Result<Self, ContextError> {
        let order_file_contents = std::fs::read_to_string(order_file_path)
            .with_context(|| format!("Unable to read the order file {:?}", order_file_path))?;

        serde_json::from_str(&order_file_contents)
            .with_context(|| format!("Unable to parse the order file {:?}", order_file_path))
    }

    pub fn order(&self) -> Order {
        Order::from_record(&self.order)
    }

    pub fn client(&self) -> Client {
        Client::from_record(&self.client)
    }

    pub fn items(&self) -> Vec<OrderItem> {
        self.items.iter().map(OrderItem::from_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use similar_asserts::assert_eq;

    #[test]
    fn canonical_key_wins_over_legacy_key() {
        let record = Record::from([("width", json!("100")), ("Szerokość", json!("999"))]);
        assert_eq!(record.text(keys::WIDTH), "100");
    }

    #[test]
    fn legacy_key_is_used_when_canonical_is_missing_or_null() {
        let missing = Record::from([("Szerokość", json!("80"))]);
        let null = Record::from([("width", Value::Null), ("Szerokość", json!("80"))]);

        assert_eq!(missing.text(keys::WIDTH), "80");
        assert_eq!(null.text(keys::WIDTH), "80");
    }

    #[test]
    fn absent_fields_resolve_to_empty_text() {
        let record = Record::default();
        assert_eq!(record.resolve(keys::PRICE), None);
        assert_eq!(record.text(keys::PRICE), "");
        assert_eq!(record.text(keys::PHONE), "");
    }

    #[test]
    fn values_are_displayed_as_printed_text() {
        assert_eq!(display_value(&json!(12.5)), "12.5");
        assert_eq!(display_value(&json!(40)), "40");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!("Termotransferowy")), "Termotransferowy");
    }

    #[test]
    fn date_times_are_printed_as_dates() {
        assert_eq!(display_value(&json!("2024-05-06T13:45:00")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06 13:45:00")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06 13:45:00.123456")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06")), "2024-05-06");
        assert_eq!(
            display_value(&json!("2024-05-06 13:45:00 rano")),
            "2024-05-06 13:45:00 rano"
        );
        assert_eq!(display_value(&json!("ąąąąąąąąąąąąąąąąąąąąąąą")), "ąąąąąąąąąąąąąąąąąąąąąąą");
    }

    #[test]
    fn date_times_with_a_time_zone_are_printed_as_dates() {
        assert_eq!(display_value(&json!("2024-05-06T13:45:00Z")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06T23:45:00+02:00")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06 01:15:00-05:30")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06T13:45:00.250Z")), "2024-05-06");
        assert_eq!(display_value(&json!("2024-05-06T13:45:00.5+01:00")), "2024-05-06");
        assert_eq!(
            display_value(&json!("2024-05-06T13:45:00+2")),
            "2024-05-06T13:45:00+2"
        );
        assert_eq!(
            display_value(&json!("2024-05-06T13:45:00.Z")),
            "2024-05-06T13:45:00.Z"
        );
    }

    #[test]
    fn order_item_is_built_from_legacy_display_labels() {
        let record = Record::from([
            ("Szerokość", json!("100")),
            ("Wysokość", json!("50")),
            ("Rodzaj materiału", json!("Termotransferowy")),
            ("nawój/długość", json!("250")),
            ("Średnica rdzenia", json!("40")),
            ("zam. ilość", json!("1000")),
            ("Typ ilości", json!("tyś.")),
            ("zam. rolki", json!(4)),
            ("Cena", json!("12.34")),
            ("CenaTyp", json!("za 1 tyś")),
        ]);

        let item = OrderItem::from_record(&record);
        assert_eq!(
            item,
            OrderItem {
                id: None,
                order_id: None,
                width: "100".into(),
                height: "50".into(),
                material: "Termotransferowy".into(),
                ordered_quantity: "1000".into(),
                quantity_type: "tyś.".into(),
                roll_length: "250".into(),
                core: "40".into(),
                price: "12.34".into(),
                price_type: "za 1 tyś".into(),
                roll_count: "4".into(),
            }
        );
    }

    #[test]
    fn whitespace_width_marks_a_placeholder() {
        let placeholder = OrderItem {
            width: "   ".into(),
            material: "Folia".into(),
            ..Default::default()
        };
        let real = OrderItem {
            width: "100".into(),
            ..Default::default()
        };

        assert!(placeholder.is_placeholder());
        assert!(!real.is_placeholder());
    }

    #[test]
    fn client_display_name_prefers_short_name() {
        let mut client = Client {
            name: "Acme Sp. z o.o.".into(),
            ..Default::default()
        };
        assert_eq!(client.display_name(), "Acme Sp. z o.o.");
        client.short_name = "Acme".into();
        assert_eq!(client.display_name(), "Acme");
    }

    #[test]
    fn bundle_is_read_from_an_order_file() {
        let directory = tempfile::tempdir().unwrap();
        let order_file_path = directory.path().join("order.json");
        std::fs::write(
            &order_file_path,
            r#"{
                "order": { "Nr zamówienia": "Z-2024-001", "order_date": "2024-05-06T08:00:00" },
                "client": { "name": "Acme", "id": 7 },
                "items": [{ "width": "100", "height": "50", "id": 1, "order_id": 3 }]
            }"#,
        )
        .unwrap();

        let bundle = OrderBundle::from_path(&order_file_path).unwrap();
        assert_eq!(bundle.order().order_number, "Z-2024-001");
        assert_eq!(bundle.order().order_date, "2024-05-06");
        assert_eq!(bundle.client().name, "Acme");
        let items = bundle.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, Some(1));
        assert_eq!(items[0].order_id, Some(3));
    }
}
