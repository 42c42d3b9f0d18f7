//! War-log data sources.
//!
//! Each source is one tier in the facade's fallback chain. The traits keep
//! the chain testable without a network: the facade only sees
//! [`OfficialSource`] and [`CommunitySource`].

pub mod community;
pub mod official;

pub use community::CommunityScraper;
pub use official::{ApiError, OfficialApiClient, PlayerProfile};

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{RawWeekRecord, Tag};

/// One data-source strategy in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTier {
    /// Official REST API, clan war-log endpoint.
    OfficialApi,

    /// Community site, clan war-log page (embedded data blob).
    CommunityClanLog,

    /// Community site, player page (scraped history table).
    CommunityPlayerPage,
}

/// The official API tier. Failures carry a taxonomy so the facade can log
/// why a tier was skipped; all of them mean "try the next tier".
#[async_trait]
pub trait OfficialSource: Send + Sync {
    /// Fetch the clan's war log, attributed to one player.
    async fn clan_war_log(&self, clan: &Tag, player: &Tag)
        -> Result<Vec<RawWeekRecord>, ApiError>;
}

/// The community-site tiers. Scraping never raises: any internal failure
/// collapses to an empty result.
#[async_trait]
pub trait CommunitySource: Send + Sync {
    /// War-log records from the clan's war-log page, attributed to one
    /// player.
    async fn clan_war_log(&self, clan: &Tag, player: &Tag) -> Vec<RawWeekRecord>;

    /// War-week rows from the player's profile page. The only tier that
    /// can cross clan boundaries.
    async fn player_war_history(&self, player: &Tag) -> Vec<RawWeekRecord>;
}
