/// The limits every column width is clamped to, in millimeters. The padding is added on both
/// sides of the widest text of the column before clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnBounds {
    pub minimum_width: f32,
    pub maximum_width: f32,
    pub padding: f32,
}

/// Sizes the columns of a table after their widest text, then scales them so that they add up to
/// `total_width` exactly. Any rounding residue ends up in the last column.
///
/// `text_width` gives the width in millimeters of a cell text. Rows shorter than the header are
/// allowed; their missing cells count as empty.
pub fn allocate_column_widths<R: AsRef<str>>(
    headers: &[&str],
    rows: &[Vec<R>],
    total_width: f32,
    bounds: ColumnBounds,
    text_width: impl Fn(&str) -> f32,
) -> Vec<f32> {
    let clamped_width = |text: &str| {
        (text_width(text) + 2.0 * bounds.padding)
            .min(bounds.maximum_width)
            .max(bounds.minimum_width)
    };

    let mut widths: Vec<f32> = headers
        .iter()
        .enumerate()
        .map(|(column_index, header)| {
            rows.iter()
                .filter_map(|row| row.get(column_index))
                .map(|cell| clamped_width(cell.as_ref()))
                .fold(clamped_width(header), f32::max)
        })
        .collect();

    let width_sum: f32 = widths.iter().sum();
    if widths.is_empty() || width_sum == total_width {
        return widths;
    }

    let scale = if width_sum == 0.0 {
        1.0
    } else {
        total_width / width_sum
    };
    for width in &mut widths {
        *width *= scale;
    }
    let scaled_sum: f32 = widths.iter().sum();
    if let Some(last_width) = widths.last_mut() {
        *last_width += total_width - scaled_sum;
    }
    log::debug!(
        "Scaled {} columns from {:.2}mm to {:.2}mm",
        widths.len(),
        width_sum,
        total_width
    );

    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng as _, SeedableRng as _};

    const BOUNDS: ColumnBounds = ColumnBounds {
        minimum_width: 10.0,
        maximum_width: 70.0,
        padding: 1.0,
    };

    fn character_count(text: &str) -> f32 {
        text.chars().count() as f32
    }

    #[test]
    fn widths_that_already_fit_are_kept() {
        let rows = vec![vec!["abcdefghijklmnopqrstuvwxyzabcd", "x"]];
        // 30 characters plus padding and the minimum width of the second column
        let widths = allocate_column_widths(&["a", "b"], &rows, 42.0, BOUNDS, character_count);
        assert_eq!(widths, vec![32.0, 10.0]);
    }

    #[test]
    fn widths_are_scaled_up_to_the_total() {
        let widths =
            allocate_column_widths::<&str>(&["Lp.", "Cena"], &[], 40.0, BOUNDS, character_count);
        assert_eq!(widths, vec![20.0, 20.0]);
    }

    #[test]
    fn widest_column_is_clamped_before_scaling() {
        let long_text = "x".repeat(300);
        let rows = vec![vec![long_text.as_str(), ""]];
        let widths = allocate_column_widths(&["a", "b"], &rows, 80.0, BOUNDS, character_count);
        assert_eq!(widths, vec![70.0, 10.0]);
    }

    #[test]
    fn zero_sum_keeps_a_unit_scale() {
        let bounds = ColumnBounds {
            minimum_width: 0.0,
            maximum_width: 70.0,
            padding: 0.0,
        };
        let widths = allocate_column_widths::<&str>(&["", ""], &[], 10.0, bounds, character_count);
        // The whole residue goes to the last column
        assert_eq!(widths, vec![0.0, 10.0]);
    }

    #[test]
    fn no_headers_give_no_columns() {
        let widths = allocate_column_widths::<&str>(&[], &[], 136.0, BOUNDS, character_count);
        assert!(widths.is_empty());
    }

    #[test]
    fn random_tables_always_add_up_to_the_total_width() {
        let mut random_generator = rand::rngs::StdRng::seed_from_u64(136);

        for _ in 0..500 {
            let column_count = random_generator.gen_range(1..10);
            let headers: Vec<String> = (0..column_count)
                .map(|_| "h".repeat(random_generator.gen_range(0..15)))
                .collect();
            let header_references: Vec<&str> = headers.iter().map(String::as_str).collect();
            let rows: Vec<Vec<String>> = (0..random_generator.gen_range(0..8))
                .map(|_| {
                    (0..column_count)
                        .map(|_| "c".repeat(random_generator.gen_range(0..90)))
                        .collect()
                })
                .collect();
            let total_width = random_generator.gen_range(20.0..200.0);

            let widths = allocate_column_widths(
                &header_references,
                &rows,
                total_width,
                BOUNDS,
                character_count,
            );
            assert_eq!(widths.len(), column_count);
            let sum: f32 = widths.iter().sum();
            assert!(
                (sum - total_width).abs() < 1e-3,
                "{sum} != {total_width} for {widths:?}"
            );

            let natural_sum: f32 = (0..column_count)
                .map(|column_index| {
                    rows.iter()
                        .map(|row| row[column_index].len() as f32)
                        .fold(headers[column_index].len() as f32, f32::max)
                })
                .map(|width| (width + 2.0 * BOUNDS.padding).clamp(10.0, 70.0))
                .sum();
            if natural_sum <= total_width {
                // Without down-scaling no column can drop under the minimum
                for width in &widths {
                    assert!(*width >= BOUNDS.minimum_width - 1e-3);
                }
            }
        }
    }
}
