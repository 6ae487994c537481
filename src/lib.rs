//! # quantlens
//!
//! Portfolio analytics over historical asset prices and option chains.
//!
//! Three independent engines share one data layer and one error type:
//!
//! - **`cluster`** — correlation clustering: pairwise-complete correlation,
//!   `√(½(1 − ρ))` distances, agglomerative linkage (single, complete,
//!   average, Ward), quasi-diagonal seriation, dendrogram and cluster map
//! - **`pairs`** — Engle-Granger cointegration with MacKinnon p-values, hedge
//!   ratios, mean-reversion half-life, rolling z-scores and trading signals
//! - **`implied`** / **`surface`** — Black-Scholes-Merton implied volatility by
//!   bounded Newton-Raphson, batch solving over cleaned option chains and
//!   surface summary metrics
//!
//! Supporting modules:
//!
//! - **`series`** — date-aligned price tables and simple returns
//! - **`source`** — the [`MarketData`](source::MarketData) seam and an
//!   in-memory implementation
//! - **`config`** — JSON and environment driven engine parameters
//!
//! ## Design
//!
//! - **No panics.** Every fallible operation returns [`Result`]. Library code
//!   never calls `unwrap()` or `expect()`.
//! - **Validate first.** Inputs are checked before any engine does partial
//!   work; violations surface as a [`QuantLensError`] variant.
//! - **Non-convergence is a value.** An implied volatility that cannot be
//!   found is an [`IvSolution::NoSolution`](implied::IvSolution), not an error.
//! - **Serializable.** Results implement Serde `Serialize` / `Deserialize` so
//!   they can be handed to any presentation layer as JSON.
//!
//! ## Features
//!
//! - `logging` (default) — structured `tracing` events
//! - `parallel` (default) — rayon fan-out for pair scans and chain solving

pub mod cluster;
pub mod config;
pub mod conventions;
pub mod error;
pub mod implied;
pub mod pairs;
pub mod series;
pub mod source;
pub mod surface;
pub mod types;
mod validate;

#[doc(inline)]
pub use config::AnalyticsConfig;
#[doc(inline)]
pub use error::{QuantLensError, Result};
#[doc(inline)]
pub use source::MarketData;
#[doc(inline)]
pub use types::{OptionType, Signal, Vol};
