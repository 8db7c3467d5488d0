//! Rolling probe history.
//!
//! Keeps the most recent rounds in a caller-owned log and computes windowed
//! per-endpoint aggregates over it.

mod models;
mod rollup;
mod store;

pub use models::*;
pub use rollup::*;
pub use store::*;
