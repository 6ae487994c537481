//! Correlation and distance matrices.
//!
//! Correlations map to distances by `d = √(½·(1 − ρ))`, so perfectly
//! correlated assets sit at 0, uncorrelated ones at `√½` and perfectly
//! anti-correlated ones at 1.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::QuantLensError;
use crate::series::stats;

const SYMMETRY_TOL: f64 = 1e-9;

/// Row-major `Vec<Vec<f64>>` (de)serialization for square matrices.
mod rows {
    use nalgebra::DMatrix;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &DMatrix<f64>, s: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<f64>> = m
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect();
        rows.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DMatrix<f64>, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(d)?;
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(D::Error::custom("matrix rows must form a square"));
        }
        Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }
}

fn check_square(labels: &[String], values: &DMatrix<f64>) -> crate::error::Result<()> {
    if !values.is_square() {
        return Err(QuantLensError::shape(format!(
            "matrix must be square, got {}x{}",
            values.nrows(),
            values.ncols()
        )));
    }
    if labels.len() != values.nrows() {
        return Err(QuantLensError::shape(format!(
            "{} labels for a {n}x{n} matrix",
            labels.len(),
            n = values.nrows()
        )));
    }
    Ok(())
}

fn check_symmetric(values: &DMatrix<f64>) -> crate::error::Result<()> {
    let n = values.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (values[(i, j)], values[(j, i)]);
            if a.is_finite() && b.is_finite() && (a - b).abs() > SYMMETRY_TOL {
                return Err(QuantLensError::shape(format!(
                    "matrix is not symmetric at ({i}, {j}): {a} vs {b}"
                )));
            }
        }
    }
    Ok(())
}

/// Reorder rows and columns: `out[i, j] = values[order[i], order[j]]`.
///
/// # Errors
/// Returns [`QuantLensError::ShapeError`] if `order` is not a permutation of
/// `0..n`.
pub fn seriate(values: &DMatrix<f64>, order: &[usize]) -> crate::error::Result<DMatrix<f64>> {
    let n = values.nrows();
    let mut seen = vec![false; n];
    if order.len() != n
        || !order
            .iter()
            .all(|&i| i < n && !std::mem::replace(&mut seen[i], true))
    {
        return Err(QuantLensError::shape(format!(
            "order {order:?} is not a permutation of 0..{n}"
        )));
    }
    Ok(DMatrix::from_fn(n, n, |i, j| values[(order[i], order[j])]))
}

/// One cell of a long-format heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    /// Column label.
    pub x: String,
    /// Row label.
    pub y: String,
    pub value: f64,
}

/// Long-format cells of a labelled square matrix, row-major.
pub fn heatmap_cells(labels: &[String], values: &DMatrix<f64>) -> Vec<HeatmapCell> {
    let n = values.nrows().min(labels.len());
    (0..n)
        .flat_map(|i| {
            (0..n).map(move |j| HeatmapCell {
                x: labels[j].clone(),
                y: labels[i].clone(),
                value: values[(i, j)],
            })
        })
        .collect()
}

/// A labelled Pearson correlation matrix.
///
/// Square, symmetric, unit diagonal, entries in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    labels: Vec<String>,
    #[serde(with = "rows")]
    values: DMatrix<f64>,
}

impl CorrelationMatrix {
    /// Validate and wrap a correlation matrix.
    ///
    /// # Errors
    /// - [`QuantLensError::ShapeError`] — non-square, asymmetric, or label
    ///   count mismatch
    /// - [`QuantLensError::DataError`] — missing entries, diagonal not 1, or
    ///   entries outside `[-1, 1]`
    pub fn new(labels: Vec<String>, values: DMatrix<f64>) -> crate::error::Result<Self> {
        check_square(&labels, &values)?;
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(QuantLensError::data(format!(
                "correlation matrix has a missing entry ({v})"
            )));
        }
        check_symmetric(&values)?;
        let n = values.nrows();
        if let Some(i) = (0..n).find(|&i| (values[(i, i)] - 1.0).abs() > SYMMETRY_TOL) {
            return Err(QuantLensError::data(format!(
                "diagonal entry {i} is {}, expected 1",
                values[(i, i)]
            )));
        }
        if let Some(v) = values.iter().find(|v| v.abs() > 1.0 + SYMMETRY_TOL) {
            return Err(QuantLensError::data(format!(
                "correlation {v} outside [-1, 1]"
            )));
        }
        Ok(Self { labels, values })
    }

    /// Pairwise-complete Pearson correlations of equally long columns.
    ///
    /// A pair's correlation uses only the rows where both columns are
    /// finite; it must have at least `min_periods` such rows.
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] for fewer than two columns, a
    /// pair below `min_periods`, or a pair whose correlation is undefined
    /// (constant column), and [`QuantLensError::ShapeError`] for ragged
    /// columns.
    pub fn from_columns(
        labels: Vec<String>,
        columns: &[Vec<f64>],
        min_periods: usize,
    ) -> crate::error::Result<Self> {
        let n = columns.len();
        if n < 2 {
            return Err(QuantLensError::data(format!(
                "need at least 2 series for a correlation matrix, got {n}"
            )));
        }
        if labels.len() != n {
            return Err(QuantLensError::shape(format!(
                "{} labels for {n} columns",
                labels.len()
            )));
        }
        let rows = columns[0].len();
        if columns.iter().any(|c| c.len() != rows) {
            return Err(QuantLensError::shape("columns must have equal length"));
        }

        let mut values = DMatrix::<f64>::identity(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let (x, y): (Vec<f64>, Vec<f64>) = columns[i]
                    .iter()
                    .zip(&columns[j])
                    .filter(|(a, b)| a.is_finite() && b.is_finite())
                    .map(|(a, b)| (*a, *b))
                    .unzip();
                if x.len() < min_periods.max(2) {
                    return Err(QuantLensError::data(format!(
                        "'{}' and '{}' overlap on {} observations, need {min_periods}",
                        labels[i],
                        labels[j],
                        x.len()
                    )));
                }
                let rho = stats::pearson(&x, &y);
                if !rho.is_finite() {
                    return Err(QuantLensError::data(format!(
                        "correlation between '{}' and '{}' is undefined",
                        labels[i], labels[j]
                    )));
                }
                values[(i, j)] = rho;
                values[(j, i)] = rho;
            }
        }

        #[cfg(feature = "logging")]
        tracing::debug!(n_assets = n, rows, min_periods, "correlation matrix estimated");

        Ok(Self { labels, values })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Correlation between two labels.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.values[(i, j)])
    }

    /// Map to correlation distances.
    pub fn to_distance(&self) -> DistanceMatrix {
        DistanceMatrix {
            labels: self.labels.clone(),
            values: correlation_distance(&self.values),
        }
    }

    /// Reorder assets by `order`, permuting labels identically.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ShapeError`] if `order` is not a permutation.
    pub fn seriate(&self, order: &[usize]) -> crate::error::Result<Self> {
        let values = seriate(&self.values, order)?;
        let labels = order.iter().map(|&i| self.labels[i].clone()).collect();
        Ok(Self { labels, values })
    }

    /// Long-format cells, row-major.
    pub fn heatmap_cells(&self) -> Vec<HeatmapCell> {
        heatmap_cells(&self.labels, &self.values)
    }

    /// Rows as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .row_iter()
            .map(|r| r.iter().copied().collect())
            .collect()
    }
}

/// `d = √(½·(1 − ρ))` elementwise with a zero diagonal.
///
/// Round-off that pushes `1 − ρ` below zero is clamped to 0.
fn correlation_distance(corr: &DMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(corr.nrows(), corr.ncols(), |i, j| {
        if i == j {
            0.0
        } else {
            (0.5 * (1.0 - corr[(i, j)])).max(0.0).sqrt()
        }
    })
}

/// Map a raw correlation matrix to distances.
///
/// # Errors
/// Returns [`QuantLensError::ShapeError`] if `corr` is not square.
pub fn to_distance(corr: &DMatrix<f64>) -> crate::error::Result<DMatrix<f64>> {
    if !corr.is_square() {
        return Err(QuantLensError::shape(format!(
            "correlation matrix must be square, got {}x{}",
            corr.nrows(),
            corr.ncols()
        )));
    }
    Ok(correlation_distance(corr))
}

/// A labelled, symmetric dissimilarity matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    #[serde(with = "rows")]
    values: DMatrix<f64>,
}

impl DistanceMatrix {
    /// Wrap an arbitrary dissimilarity matrix.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ShapeError`] if the matrix is not square,
    /// not symmetric, or the label count differs.
    pub fn new(labels: Vec<String>, values: DMatrix<f64>) -> crate::error::Result<Self> {
        check_square(&labels, &values)?;
        check_symmetric(&values)?;
        Ok(Self { labels, values })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A{i}")).collect()
    }

    // --- CorrelationMatrix::new ---

    #[test]
    fn accepts_valid_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 1.0]);
        let corr = CorrelationMatrix::new(labels(2), m).unwrap();
        assert_eq!(corr.get("A0", "A1"), Some(0.3));
    }

    #[test]
    fn rejects_non_square() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let err = CorrelationMatrix::new(labels(2), m).unwrap_err();
        assert!(matches!(err, QuantLensError::ShapeError { .. }));
    }

    #[test]
    fn rejects_asymmetric() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.4, 1.0]);
        let err = CorrelationMatrix::new(labels(2), m).unwrap_err();
        assert!(matches!(err, QuantLensError::ShapeError { .. }));
    }

    #[test]
    fn rejects_missing_entries() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, f64::NAN, 1.0]);
        let err = CorrelationMatrix::new(labels(2), m).unwrap_err();
        assert!(matches!(err, QuantLensError::DataError { .. }));
    }

    #[test]
    fn rejects_bad_diagonal_and_range() {
        let diag = DMatrix::from_row_slice(2, 2, &[0.9, 0.3, 0.3, 1.0]);
        assert!(matches!(
            CorrelationMatrix::new(labels(2), diag),
            Err(QuantLensError::DataError { .. })
        ));
        let range = DMatrix::from_row_slice(2, 2, &[1.0, 1.3, 1.3, 1.0]);
        assert!(matches!(
            CorrelationMatrix::new(labels(2), range),
            Err(QuantLensError::DataError { .. })
        ));
    }

    #[test]
    fn rejects_label_mismatch() {
        let m = DMatrix::<f64>::identity(3, 3);
        assert!(matches!(
            CorrelationMatrix::new(labels(2), m),
            Err(QuantLensError::ShapeError { .. })
        ));
    }

    // --- from_columns ---

    #[test]
    fn pairwise_complete_observations() {
        let a = vec![1.0, 2.0, 3.0, f64::NAN, 5.0];
        let b = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let corr =
            CorrelationMatrix::from_columns(labels(2), &[a, b], 4).unwrap();
        assert_abs_diff_eq!(corr.values()[(0, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn too_few_overlapping_rows_is_data_error() {
        let a = vec![1.0, 2.0, f64::NAN, f64::NAN, 5.0];
        let b = vec![2.0, 1.0, 6.0, 8.0, 10.0];
        let err = CorrelationMatrix::from_columns(labels(2), &[a, b], 4).unwrap_err();
        assert!(matches!(err, QuantLensError::DataError { .. }));
    }

    #[test]
    fn constant_column_is_data_error() {
        let a = vec![1.0; 5];
        let b = vec![2.0, 1.0, 6.0, 8.0, 10.0];
        assert!(matches!(
            CorrelationMatrix::from_columns(labels(2), &[a, b], 2),
            Err(QuantLensError::DataError { .. })
        ));
    }

    #[test]
    fn single_column_is_data_error() {
        assert!(matches!(
            CorrelationMatrix::from_columns(labels(1), &[vec![1.0, 2.0]], 1),
            Err(QuantLensError::DataError { .. })
        ));
    }

    // --- Distances ---

    #[test]
    fn distance_reference_values() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 1.0, -1.0, 1.0, 1.0, 0.0, -1.0, 0.0, 1.0]);
        let d = to_distance(&m).unwrap();
        assert_abs_diff_eq!(d[(0, 1)], 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(d[(0, 2)], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(d[(1, 2)], 0.70711, epsilon = 1e-5);
        assert_eq!(d[(2, 2)], 0.0);
    }

    #[test]
    fn distance_clamps_round_off() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 1.0 + 1e-12, 1.0 + 1e-12, 1.0]);
        let d = to_distance(&m).unwrap();
        assert_eq!(d[(0, 1)], 0.0);
    }

    #[test]
    fn distance_of_non_square_is_shape_error() {
        let m = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(to_distance(&m), Err(QuantLensError::ShapeError { .. })));
    }

    // --- Seriation ---

    #[test]
    fn seriate_permutes_rows_and_columns() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.1, 0.2, 0.1, 1.0, 0.3, 0.2, 0.3, 1.0]);
        let corr = CorrelationMatrix::new(labels(3), m).unwrap();
        let s = corr.seriate(&[2, 0, 1]).unwrap();
        assert_eq!(s.labels(), &["A2", "A0", "A1"]);
        assert_eq!(s.values()[(0, 1)], 0.2);
        assert_eq!(s.values()[(1, 2)], 0.1);
        assert_eq!(s.values()[(0, 2)], 0.3);
    }

    #[test]
    fn seriate_rejects_non_permutation() {
        let m = DMatrix::<f64>::identity(3, 3);
        assert!(matches!(seriate(&m, &[0, 0, 1]), Err(QuantLensError::ShapeError { .. })));
        assert!(matches!(seriate(&m, &[0, 1]), Err(QuantLensError::ShapeError { .. })));
        assert!(matches!(seriate(&m, &[0, 1, 3]), Err(QuantLensError::ShapeError { .. })));
    }

    #[test]
    fn heatmap_is_row_major() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0]);
        let corr = CorrelationMatrix::new(labels(2), m).unwrap();
        let cells = corr.heatmap_cells();
        assert_eq!(cells.len(), 4);
        assert_eq!((cells[1].x.as_str(), cells[1].y.as_str()), ("A1", "A0"));
        assert_eq!(cells[1].value, 0.5);
    }

    #[test]
    fn serializes_as_nested_rows() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0]);
        let corr = CorrelationMatrix::new(labels(2), m).unwrap();
        let json = serde_json::to_value(&corr).unwrap();
        assert_eq!(json["values"], serde_json::json!([[1.0, 0.5], [0.5, 1.0]]));
        let back: CorrelationMatrix = serde_json::from_value(json).unwrap();
        assert_eq!(back, corr);
    }
}
