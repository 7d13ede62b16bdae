//! CLI command implementations.

pub mod board;
pub mod bom;
pub mod check;
pub mod normalize;
