//! Gap filling for yearly series
//!
//! Missing observations are filled by linear interpolation on the year axis.
//! Leading gaps stay missing (there is nothing to interpolate from); trailing
//! gaps carry the last observation forward.

/// Fill missing values in `values` using the matching `years` as x-axis
///
/// `years` must be sorted ascending and have the same length as `values`.
pub fn interpolate_linear(years: &[i32], values: &[Option<f64>]) -> Vec<Option<f64>> {
    debug_assert_eq!(years.len(), values.len());

    let mut filled: Vec<Option<f64>> = values.to_vec();
    let mut previous: Option<(i32, f64)> = None;
    let mut gap_start: Option<usize> = None;

    for idx in 0..values.len() {
        match values[idx] {
            Some(value) => {
                if let (Some((x0, y0)), Some(start)) = (previous, gap_start) {
                    let x1 = years[idx];
                    let span = (x1 - x0) as f64;
                    for gap_idx in start..idx {
                        let fraction = if span > 0.0 {
                            (years[gap_idx] - x0) as f64 / span
                        } else {
                            0.0
                        };
                        filled[gap_idx] = Some(y0 + fraction * (value - y0));
                    }
                }
                previous = Some((years[idx], value));
                gap_start = None;
            }
            None => {
                if previous.is_some() && gap_start.is_none() {
                    gap_start = Some(idx);
                }
            }
        }
    }

    // Trailing gap: hold the last observation
    if let (Some((_, last)), Some(start)) = (previous, gap_start) {
        for slot in filled.iter_mut().skip(start) {
            *slot = Some(last);
        }
    }

    filled
}
