//! # Warlog Agent
//!
//! Reconstructs a player's or clan's recent clan-war history from two
//! unequal sources: the official REST API (reliable format, no cross-clan
//! player history) and a community site that must be scraped and
//! heuristically interpreted.
//!
//! ## Architecture
//!
//! - **models**: canonical tags and war-week records
//! - **extract**: schema-agnostic extraction (alias tables, shape-matching
//!   tree walk, scraped-row heuristics)
//! - **fetch**: HTTP transport wrapper
//! - **sources**: the official API client and the community scraper, one
//!   fallback tier each
//! - **history**: reconciliation plus the tier-fallback facade
//! - **config**: configuration loading and validation

pub mod config;
pub mod extract;
pub mod fetch;
pub mod history;
pub mod models;
pub mod sources;

pub use models::*;
