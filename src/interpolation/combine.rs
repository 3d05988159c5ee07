//! Tensor-product weighting and missing-value repair.
//!
//! Missing corner samples are replaced by the mean of the point's remaining
//! samples before weighting. The interpolated value is therefore pulled
//! towards the local neighbourhood mean rather than becoming missing itself.
//! Only a point with no valid corner at all yields no value.

use ndarray::{Array2, ArrayViewMut1, Axis as NdAxis};

use super::gather::{CellLocation, CORNERS};

/// Outcome of repairing one column of corner samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repair {
    /// Mean of the valid samples
    pub mean: f64,
    /// Number of samples that were replaced by the mean
    pub replaced: usize,
}

/// The weighted value of one point and how its samples were repaired
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combined {
    pub value: f64,
    pub repair: Repair,
}

/// The eight tensor-product weights for one point, in corner order
pub fn tensor_weights(w_time: f64, w_lat: f64, w_lon: f64) -> [f64; CORNERS] {
    let factor = |w: f64, next: bool| if next { w } else { 1.0 - w };
    let mut weights = [0.0; CORNERS];
    for (corner, weight) in weights.iter_mut().enumerate() {
        *weight = factor(w_time, corner & 0b100 != 0)
            * factor(w_lat, corner & 0b010 != 0)
            * factor(w_lon, corner & 0b001 != 0);
    }
    weights
}

/// Weight matrix matching the layout produced by [`gather`](super::gather::gather)
pub fn weight_matrix(cells: &[CellLocation]) -> Array2<f64> {
    let mut weights = Array2::zeros((CORNERS, cells.len()));
    for (mut column, cell) in weights.axis_iter_mut(NdAxis(1)).zip(cells) {
        let w = tensor_weights(cell.time.weight, cell.lat.weight, cell.lon.weight);
        for (dst, src) in column.iter_mut().zip(w) {
            *dst = src;
        }
    }
    weights
}

/// Replace the `NaN` samples of one column by the mean of the others.
///
/// Returns `None` and leaves the column untouched when every sample is
/// missing.
pub fn repair_column(mut column: ArrayViewMut1<f64>) -> Option<Repair> {
    let (sum, valid) = column
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0_f64, 0usize), |(sum, n), v| (sum + v, n + 1));

    if valid == 0 {
        return None;
    }

    let mean = sum / valid as f64;
    let mut replaced = 0;
    for v in column.iter_mut().filter(|v| v.is_nan()) {
        *v = mean;
        replaced += 1;
    }

    Some(Repair { mean, replaced })
}

/// Repair every column in place and reduce each to its weighted sum.
///
/// The result has one entry per column; `None` marks a point whose eight
/// samples were all missing.
pub fn combine(samples: &mut Array2<f64>, weights: &Array2<f64>) -> Vec<Option<Combined>> {
    debug_assert_eq!(samples.shape(), weights.shape());

    samples
        .axis_iter_mut(NdAxis(1))
        .zip(weights.axis_iter(NdAxis(1)))
        .map(|(mut column, w)| {
            let repair = repair_column(column.view_mut())?;
            Some(Combined {
                value: column.dot(&w),
                repair,
            })
        })
        .collect()
}
