use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{GanymedeError, Result};

/// Combine arrays by computing the median at each pixel position.
///
/// All arrays must share one shape, otherwise `ShapeMismatch` is returned.
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Parallelizes at the row level for images >= 256x256.
pub fn median_stack(arrays: &[Array2<f32>], label: &str) -> Result<Array2<f32>> {
    let Some(first) = arrays.first() else {
        return Err(GanymedeError::EmptyGroup(label.to_string()));
    };

    let (h, w) = first.dim();
    if let Some(odd) = arrays.iter().find(|a| a.dim() != (h, w)) {
        return Err(GanymedeError::ShapeMismatch {
            expected: (h, w),
            found: odd.dim(),
        });
    }

    let n = arrays.len();

    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        // Row-parallel: each row allocates its own pixel_values
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = vec![0.0f32; n];
                let mut row_result = vec![0.0f32; w];
                for (col, result) in row_result.iter_mut().enumerate() {
                    for (i, array) in arrays.iter().enumerate() {
                        pixel_values[i] = array[[row, col]];
                    }
                    *result = compute_median(&mut pixel_values);
                }
                row_result
            })
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        Ok(result)
    } else {
        // Sequential for small images
        let mut result = Array2::<f32>::zeros((h, w));
        let mut pixel_values = vec![0.0f32; n];

        for row in 0..h {
            for col in 0..w {
                for (i, array) in arrays.iter().enumerate() {
                    pixel_values[i] = array[[row, col]];
                }
                result[[row, col]] = compute_median(&mut pixel_values);
            }
        }
        Ok(result)
    }
}

/// Median of every pixel in one array.
pub fn median_value(array: &Array2<f32>) -> Option<f32> {
    if array.is_empty() {
        return None;
    }
    let mut values: Vec<f32> = array.iter().copied().collect();
    Some(compute_median(&mut values))
}

/// Median of a non-empty slice; even counts average the two middle values.
fn compute_median(pixel_values: &mut [f32]) -> f32 {
    let n = pixel_values.len();
    if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}
