//! Implied volatility extraction from option prices.
//!
//! - [`black_price`] / [`black_vega`] — Black-Scholes-Merton closed form
//! - [`NewtonRaphsonSolver`] — bounded Newton-Raphson inversion returning an
//!   [`IvSolution`] (`Converged` or `NoSolution`)

pub mod black;
pub mod newton;

pub use black::{black_price, black_vega};
pub use newton::{implied_vol, IvSolution, NewtonRaphsonSolver, NoSolutionReason, SolverConfig};
