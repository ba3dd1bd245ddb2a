use unicode_normalization::{char::is_combining_mark, UnicodeNormalization as _};

use crate::records::OrderItem;

/// The number of fields of a formatted table row, the line number excluded.
pub const ROW_FIELD_COUNT: usize = 8;

/// Lower-cases the price unit label, drops dots and spaces and strips the Polish diacritics, so
/// that `"Za 1 Rolkę"`, `"za rolke"` and `"zarolkę"` all compare alike.
pub fn normalize_price_unit(price_unit: &str) -> String {
    price_unit
        .to_lowercase()
        .nfd()
        .filter(|&character| !is_combining_mark(character) && character != '.' && character != ' ')
        .map(|character| match character {
            // The stroke of `ł` is not a combining mark
            'ł' => 'l',
            other => other,
        })
        .collect()
}

/// The price as printed, followed by the unit it refers to when the unit is recognized.
pub fn format_price(price: &str, price_unit: &str) -> String {
    if price.is_empty() {
        return String::new();
    }

    let price_unit = normalize_price_unit(price_unit);
    if price_unit.contains("rol") {
        format!("{price} /rolka")
    } else if price_unit.contains("tys") {
        format!("{price} /tyś")
    } else {
        price.to_string()
    }
}

/// `"{width}x{height}"`, or whichever of the two is known.
pub fn dimension(width: &str, height: &str) -> String {
    match (width.is_empty(), height.is_empty()) {
        (false, false) => format!("{width}x{height}"),
        (false, true) => width.to_string(),
        (true, false) => height.to_string(),
        (true, true) => String::new(),
    }
}

/// The printed fields of an order item: dimension, material, roll length, core, quantity,
/// quantity unit, roll count and price.
pub fn item_row(item: &OrderItem) -> [String; ROW_FIELD_COUNT] {
    [
        dimension(&item.width, &item.height),
        item.material.clone(),
        item.roll_length.clone(),
        item.core.clone(),
        item.ordered_quantity.clone(),
        item.quantity_type.clone(),
        item.roll_count.clone(),
        format_price(&item.price, &item.price_type),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Record;
    use serde_json::json;
    use similar_asserts::assert_eq;

    #[test]
    fn price_unit_is_normalized() {
        assert_eq!(normalize_price_unit("Za 1 Rolkę"), "za1rolke");
        assert_eq!(normalize_price_unit("ZA TYŚ."), "zatys");
        assert_eq!(normalize_price_unit("Łódź żółć"), "lodzzolc");
    }

    #[test]
    fn roll_prices_get_the_roll_suffix() {
        let roll_units = [
            "za rolkę",
            "ZA ROLKE",
            "rol.",
            "/rolka",
            "Za 1 Rolkę",
            "rolek",
            "rolki",
            "za 100 Rolek",
        ];
        for unit in roll_units {
            assert_eq!(format_price("12.34", unit), "12.34 /rolka", "unit {unit:?}");
        }
    }

    #[test]
    fn thousand_prices_get_the_thousand_suffix() {
        for unit in ["za 1 tyś", "tys.", "ZA TYŚ", "Tyś. szt", "tysiąc", "za 1 Tysiąc szt."] {
            assert_eq!(format_price("0.85", unit), "0.85 /tyś", "unit {unit:?}");
        }
    }

    #[test]
    fn unknown_units_leave_the_price_alone() {
        assert_eq!(format_price("99", "za m2"), "99");
        assert_eq!(format_price("99", ""), "99");
    }

    #[test]
    fn empty_price_prints_nothing() {
        assert_eq!(format_price("", "za rolkę"), "");
        assert_eq!(format_price("", "tyś"), "");
    }

    #[test]
    fn dimension_uses_whatever_is_known() {
        assert_eq!(dimension("100", "50"), "100x50");
        assert_eq!(dimension("100", ""), "100");
        assert_eq!(dimension("", "50"), "50");
        assert_eq!(dimension("", ""), "");
    }

    #[test]
    fn item_row_of_a_roll_priced_label() {
        let record = Record::from([
            ("width", json!("100")),
            ("height", json!("50")),
            ("material", json!("Termotransferowy")),
            ("roll_length", json!("250")),
            ("core", json!("40")),
            ("ordered_quantity", json!("10")),
            ("quantity_type", json!("rolki")),
            ("zam_rolki", json!("10")),
            ("price", json!("12.34")),
            ("price_type", json!("za 1 rolkę")),
        ]);

        assert_eq!(
            item_row(&OrderItem::from_record(&record)),
            [
                "100x50",
                "Termotransferowy",
                "250",
                "40",
                "10",
                "rolki",
                "10",
                "12.34 /rolka"
            ]
            .map(String::from)
        );
    }

    #[test]
    fn item_row_of_an_empty_item() {
        assert_eq!(
            item_row(&OrderItem::default()),
            std::array::from_fn(|_| String::new())
        );
    }
}
