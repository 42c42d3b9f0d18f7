//! Core data models for the warlog agent.

mod tag;
mod week;

pub use tag::*;
pub use week::*;
