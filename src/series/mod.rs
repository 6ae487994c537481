//! Time-series data model shared by the engines.
//!
//! - [`PriceSeries`] — one asset's `(date, price)` observations, dates strictly increasing
//! - [`PriceTable`] — several assets aligned on their common dates
//! - [`ReturnTable`] — percentage changes of a [`PriceTable`], complete rows only
//!
//! Missing observations are represented as `NaN` throughout.

pub(crate) mod stats;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cluster::CorrelationMatrix;
use crate::error::QuantLensError;
use crate::validate::validate_unit_interval;

/// Minimum number of return rows needed before correlations are meaningful.
pub const MIN_RETURN_OBSERVATIONS: usize = 10;

/// Price observations for a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    label: String,
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Create a price series.
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] if dates are not strictly increasing.
    pub fn new(
        label: impl Into<String>,
        points: Vec<(NaiveDate, f64)>,
    ) -> crate::error::Result<Self> {
        let label = label.into();
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(QuantLensError::DataError {
                message: format!(
                    "dates for '{label}' must be strictly increasing ({} followed by {})",
                    w[0].0, w[1].0
                ),
            });
        }
        Ok(Self { label, points })
    }

    /// Asset label (ticker).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Observations in date order.
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    /// Number of observations, including missing ones.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether every observation is missing.
    pub fn is_all_missing(&self) -> bool {
        self.points.iter().all(|(_, p)| !p.is_finite())
    }
}

/// Prices for several assets on a shared, strictly increasing date index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    labels: Vec<String>,
    dates: Vec<NaiveDate>,
    /// One column per label, each `dates.len()` long.
    columns: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Create a table from already aligned columns.
    ///
    /// # Errors
    /// Returns [`QuantLensError::ShapeError`] if a column length differs from
    /// the date index or the label count differs from the column count, and
    /// [`QuantLensError::DataError`] for duplicate labels or unsorted dates.
    pub fn new(
        labels: Vec<String>,
        dates: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> crate::error::Result<Self> {
        if labels.len() != columns.len() {
            return Err(QuantLensError::shape(format!(
                "{} labels for {} columns",
                labels.len(),
                columns.len()
            )));
        }
        if let Some((label, col)) = labels
            .iter()
            .zip(&columns)
            .find(|(_, col)| col.len() != dates.len())
        {
            return Err(QuantLensError::shape(format!(
                "column '{label}' has {} rows, index has {}",
                col.len(),
                dates.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
            return Err(QuantLensError::data(format!("duplicate label '{dup}'")));
        }
        if dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(QuantLensError::data("dates must be strictly increasing"));
        }
        Ok(Self {
            labels,
            dates,
            columns,
        })
    }

    /// Align several series on the dates they all share.
    ///
    /// Series whose observations are all missing are dropped (see
    /// [`missing_labels`](Self::missing_labels)). Remaining series are
    /// intersected on date.
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] if no usable series remains or
    /// the series share no dates.
    pub fn align(series: &[PriceSeries]) -> crate::error::Result<Self> {
        let usable: Vec<&PriceSeries> = series.iter().filter(|s| !s.is_all_missing()).collect();

        #[cfg(feature = "logging")]
        for dropped in series.iter().filter(|s| s.is_all_missing()) {
            tracing::warn!(label = dropped.label(), "dropping series with no observations");
        }

        if usable.is_empty() {
            return Err(QuantLensError::data("no series with usable observations"));
        }

        let mut common: BTreeSet<NaiveDate> = usable[0].points.iter().map(|(d, _)| *d).collect();
        for s in &usable[1..] {
            let dates: BTreeSet<NaiveDate> = s.points.iter().map(|(d, _)| *d).collect();
            common = common.intersection(&dates).copied().collect();
        }
        if common.is_empty() {
            return Err(QuantLensError::data("series share no common dates"));
        }

        let dates: Vec<NaiveDate> = common.into_iter().collect();
        let columns: Vec<Vec<f64>> = usable
            .iter()
            .map(|s| {
                let by_date: BTreeMap<NaiveDate, f64> = s.points.iter().copied().collect();
                dates
                    .iter()
                    .map(|d| by_date.get(d).copied().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        let labels = usable.iter().map(|s| s.label.clone()).collect();

        #[cfg(feature = "logging")]
        tracing::debug!(
            n_assets = usable.len(),
            n_rows = dates.len(),
            "aligned price series"
        );

        Self::new(labels, dates, columns)
    }

    /// Asset labels in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Shared date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Price column for a label.
    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.columns[i].as_slice())
    }

    /// All columns in label order.
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Number of dates.
    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    /// Number of assets.
    pub fn n_assets(&self) -> usize {
        self.labels.len()
    }

    /// Requested labels that are not present in this table.
    pub fn missing_labels<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|r| !self.labels.iter().any(|l| l == r))
            .map(str::to_owned)
            .collect()
    }

    /// Copy of the table without rows that contain any missing price.
    pub fn drop_incomplete(&self) -> Self {
        let keep: Vec<usize> = (0..self.n_rows())
            .filter(|&i| self.columns.iter().all(|c| c[i].is_finite()))
            .collect();
        Self {
            labels: self.labels.clone(),
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
        }
    }

    /// Daily percentage returns.
    ///
    /// The first row is dropped, as is every row where any asset's return is
    /// undefined (missing price on either day, or a zero previous price).
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] if fewer than
    /// [`MIN_RETURN_OBSERVATIONS`] complete rows remain.
    pub fn returns(&self) -> crate::error::Result<ReturnTable> {
        let n = self.n_rows();
        let raw: Vec<Vec<f64>> = self
            .columns
            .iter()
            .map(|c| {
                (1..n)
                    .map(|i| {
                        let r = c[i] / c[i - 1] - 1.0;
                        if r.is_finite() { r } else { f64::NAN }
                    })
                    .collect()
            })
            .collect();
        let keep: Vec<usize> = (0..n.saturating_sub(1))
            .filter(|&i| raw.iter().all(|c| c[i].is_finite()))
            .collect();

        if keep.len() < MIN_RETURN_OBSERVATIONS {
            return Err(QuantLensError::data(format!(
                "insufficient data points after cleaning: got {} days, need at least {MIN_RETURN_OBSERVATIONS}",
                keep.len()
            )));
        }

        Ok(ReturnTable {
            labels: self.labels.clone(),
            dates: keep.iter().map(|&i| self.dates[i + 1]).collect(),
            columns: raw
                .iter()
                .map(|c| keep.iter().map(|&i| c[i]).collect())
                .collect(),
        })
    }
}

/// Percentage returns on complete rows only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnTable {
    labels: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl ReturnTable {
    /// Asset labels in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Date of each return row (the later day of each pair).
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return columns in label order.
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Number of return rows.
    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    /// Pearson correlation matrix requiring `min_periods` overlapping
    /// observations for every pair.
    ///
    /// # Errors
    /// Returns [`QuantLensError::DataError`] for fewer than two assets or if
    /// any pairwise correlation cannot be computed.
    pub fn correlation(&self, min_periods: usize) -> crate::error::Result<CorrelationMatrix> {
        CorrelationMatrix::from_columns(self.labels.clone(), &self.columns, min_periods)
    }

    /// Correlation matrix requiring that each pair overlaps on at least
    /// `coverage` of all rows (`floor(rows × coverage)` observations).
    ///
    /// # Errors
    /// Returns [`QuantLensError::ConfigurationError`] if `coverage ∉ (0, 1)`,
    /// otherwise as [`correlation`](Self::correlation).
    pub fn correlation_with_coverage(&self, coverage: f64) -> crate::error::Result<CorrelationMatrix> {
        validate_unit_interval(coverage, "min_correlation_periods")?;
        let min_periods = (self.n_rows() as f64 * coverage).floor() as usize;
        self.correlation(min_periods)
    }
}
