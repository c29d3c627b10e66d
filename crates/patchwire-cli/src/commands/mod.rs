//! CLI command implementations.

pub mod catalog;
pub mod check;
mod common;
pub mod render;
