//! Implied volatility surface extraction from an option chain.
//!
//! - [`clean_chain`] / [`ChainFilter`] — turn raw quotes into [`OptionContract`]s
//! - [`batch_solve`] — Newton-Raphson IV for every contract of one side
//! - [`surface_metrics`] — ATM vol, put-call skew, per-side ranges
//! - [`IvSurfaceBuilder`] — assemble an [`IvSurface`] from both sides

pub mod builder;
pub mod chain;
pub mod metrics;

pub use builder::{IvSurface, IvSurfaceBuilder};
pub use chain::{
    batch_solve, batch_solve_with_dividend, clean_chain, ChainFilter, ExpirationFilter,
    OptionContract, RawContract, SurfacePoint,
};
pub use metrics::{surface_metrics, IvRange, SurfaceMetrics};
