//! nbk-expand
//!
//! Combinatorial expansion engine: turns compact digit specifications into
//! sets of cell keys.
//! - cross-product of two digit sequences ("laddi"), optional self-pair
//!   removal and reversal
//! - inclusive key ranges
//! - half-complement ("harup") rows and columns
//! - structural count validation for the `digits=count=amount` notation
//!
//! Pure functions only. No IO, no state.

mod compact;
mod cross;
mod digits;
mod error;
mod harup;

pub use compact::{compact_counts, compact_keys, CompactCounts, SelfPairs};
pub use cross::{cross_product, expand, range, CrossOptions, KeySpec};
pub use digits::{digit_set, digits_of};
pub use error::ExpandError;
pub use harup::{harup, harup_total};
