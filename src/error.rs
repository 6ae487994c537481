//! Error types for the quantlens library.
//!
//! All fallible operations return `Result<T, QuantLensError>` rather than
//! panicking. Validation happens eagerly, before any engine does partial work.
//!
//! Solver non-convergence is deliberately *not* an error: see
//! [`IvSolution`](crate::implied::IvSolution).

use thiserror::Error;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, QuantLensError>;

/// Errors surfaced by the clustering, cointegration and volatility engines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuantLensError {
    /// Insufficient or missing observations (too few rows, all-NaN series,
    /// too few assets, unresolved correlation entries).
    #[error("data error: {message}")]
    DataError { message: String },

    /// Unknown method or option type, or a numeric parameter out of range.
    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    /// Matrix is not square or symmetric, or two inputs disagree in length.
    #[error("shape error: {message}")]
    ShapeError { message: String },

    /// Numerical computation failed (e.g., singular regression design).
    #[error("numerical error: {message}")]
    NumericalError { message: String },
}

impl QuantLensError {
    pub(crate) fn data(message: impl Into<String>) -> Self {
        Self::DataError {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::ShapeError {
            message: message.into(),
        }
    }

    pub(crate) fn numerical(message: impl Into<String>) -> Self {
        Self::NumericalError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_error_message_accessible() {
        let err = QuantLensError::data("need at least 30 observations");
        match &err {
            QuantLensError::DataError { message } => {
                assert!(message.contains("30"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn error_display_includes_message() {
        let err = QuantLensError::config("unknown linkage method 'median'");
        assert!(format!("{err}").contains("median"));
        assert!(format!("{err}").starts_with("configuration error"));

        let err2 = QuantLensError::shape("matrix is 2x3");
        assert!(format!("{err2}").contains("2x3"));

        let err3 = QuantLensError::numerical("singular design matrix");
        assert!(format!("{err3}").contains("singular"));

        let err4 = QuantLensError::data("all values missing");
        assert!(format!("{err4}").contains("all values missing"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QuantLensError>();
    }
}
