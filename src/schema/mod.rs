//! Input and output column contracts
//!
//! This module defines the raw trial table read from the dataset and the
//! documented column catalog the processed table is validated against.

mod catalog;
mod raw_table;

pub use catalog::*;
pub use raw_table::*;
