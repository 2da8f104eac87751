//! nbk-testkit
//!
//! In-memory [`MemoryBook`] implementing the store contracts, plus fixtures
//! shared by scenario tests across the workspace.

mod fixtures;
mod memory;

pub use fixtures::{client, date, grid, sheet, FixedGuardLog};
pub use memory::MemoryBook;
