use crate::domain::types::{SeriesPoint, SeriesSlice};

/// Even-stride selection of at most `max_points` points.
///
/// The `n % max_points` leftover points are spread over the first indices, so
/// the first point is always kept and the last kept index is `n - step`.
pub fn downsample(slice: &SeriesSlice, max_points: usize) -> SeriesSlice {
    let n = slice.len();
    if max_points == 0 || n <= max_points {
        return slice.clone();
    }

    let step = n / max_points;
    let remainder = n % max_points;

    (0..max_points)
        .map(|i| i * step + i.min(remainder))
        .map(|index| SeriesPoint {
            value: slice.values[index],
            timestamp: slice.timestamps[index],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> SeriesSlice {
        (0..n)
            .map(|i| SeriesPoint {
                value: i as f64,
                timestamp: i as i64,
            })
            .collect()
    }

    #[test]
    fn test_small_slices_pass_through() {
        let slice = ramp(5);
        assert_eq!(downsample(&slice, 200), slice);
        assert_eq!(downsample(&slice, 5), slice);
    }

    #[test]
    fn test_even_stride_with_remainder() {
        // step 2, remainder 1: indices 0, 3, 5, 7
        let picked = downsample(&ramp(9), 4);
        assert_eq!(picked.timestamps, vec![0, 3, 5, 7]);
        assert_eq!(picked.values, vec![0.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_budget_is_respected() {
        let picked = downsample(&ramp(4320), 200);
        assert_eq!(picked.len(), 200);
        assert_eq!(picked.timestamps[0], 0);
        assert!(picked.timestamps.windows(2).all(|w| w[0] < w[1]));
    }
}
