//! History service: reconciliation and the tier-fallback facade.
//!
//! The facade tries sources strictly in sequence (official API, then the
//! community clan-log page, then the community player page) and stops at
//! the first tier that yields usable weeks. Tier failures are absorbed and
//! logged; the sources are known to be unreliable, and a missing tier is a
//! soft condition, not an error. Only an invalid identifier surfaces as an
//! error, and only total exhaustion surfaces as "unavailable".

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{RawWeekRecord, Tag, WeekEntry};
use crate::sources::{CommunitySource, OfficialSource, SourceTier};

/// Default number of weeks returned to the caller.
pub const DEFAULT_WEEK_LIMIT: usize = 10;

/// The only hard error the facade produces. Everything network-shaped is
/// absorbed into the fallback chain instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("identifier normalizes to an empty tag")]
    InvalidTag,
}

/// What the caller is asking for.
#[derive(Debug, Clone)]
pub enum HistoryQuery {
    /// Player history anchored to a known clan. Runs all three tiers.
    ByClan { clan: Tag, player: Tag },

    /// Player history with no clan anchor (membership unknown or
    /// changed). Only the player-page tier can answer this.
    ByPlayer { player: Tag },
}

/// Ordered history plus which tier produced it. `source == None` is the
/// explicit "no history available" signal, deliberately not an error.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub weeks: Vec<WeekEntry>,
    pub source: Option<SourceTier>,
}

impl HistoryReport {
    fn unavailable() -> Self {
        Self {
            weeks: Vec::new(),
            source: None,
        }
    }

    fn from_tier(weeks: Vec<WeekEntry>, tier: SourceTier) -> Self {
        Self {
            weeks,
            source: Some(tier),
        }
    }

    /// Whether every tier came up empty.
    pub fn is_unavailable(&self) -> bool {
        self.source.is_none()
    }
}

// ── Reconciliation ──────────────────────────────────────────────────────────

/// Merge raw records from whichever source succeeded into the final
/// ordered result: validate, dedupe, sort, truncate. Pure, no I/O.
pub fn reconcile(records: Vec<RawWeekRecord>, limit: usize) -> Vec<WeekEntry> {
    let mut entries: Vec<WeekEntry> = records
        .into_iter()
        .filter_map(WeekEntry::from_raw)
        .collect();

    // Identical observations collapse to the first occurrence
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.dedup_key()));

    // Most recent week first; stable sort keeps source order for ties
    entries.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
    entries.truncate(limit);
    entries
}

// ── Facade ──────────────────────────────────────────────────────────────────

/// Fallback-chain facade over the configured sources.
///
/// Stateless across calls (the official client keeps its own short-lived
/// response cache). Tiers run one at a time: a successful early tier
/// short-circuits, and racing tiers would only burn API quota. Dropping
/// the returned future abandons the request at the current tier; nothing
/// partial leaks into a result.
pub struct HistoryService {
    official: Arc<dyn OfficialSource>,
    community: Arc<dyn CommunitySource>,
    limit: usize,
}

impl HistoryService {
    pub fn new(official: Arc<dyn OfficialSource>, community: Arc<dyn CommunitySource>) -> Self {
        Self {
            official,
            community,
            limit: DEFAULT_WEEK_LIMIT,
        }
    }

    /// Override the number of weeks returned.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Resolve a history query through the fallback chain.
    pub async fn history(&self, query: HistoryQuery) -> Result<HistoryReport, HistoryError> {
        match query {
            HistoryQuery::ByClan { clan, player } => {
                if clan.is_empty() || player.is_empty() {
                    return Err(HistoryError::InvalidTag);
                }

                if let Some(report) = self.official_tier(&clan, &player).await {
                    return Ok(report);
                }
                if let Some(report) = self.clan_log_tier(&clan, &player).await {
                    return Ok(report);
                }
                Ok(self.player_page_tier(&player).await)
            }
            HistoryQuery::ByPlayer { player } => {
                if player.is_empty() {
                    return Err(HistoryError::InvalidTag);
                }
                Ok(self.player_page_tier(&player).await)
            }
        }
    }

    async fn official_tier(&self, clan: &Tag, player: &Tag) -> Option<HistoryReport> {
        match self.official.clan_war_log(clan, player).await {
            Ok(records) => {
                let weeks = reconcile(records, self.limit);
                if weeks.is_empty() {
                    debug!("official API has no usable weeks for {}", clan);
                    None
                } else {
                    Some(HistoryReport::from_tier(weeks, SourceTier::OfficialApi))
                }
            }
            Err(e) => {
                warn!("official API tier failed for {}: {}", clan, e);
                None
            }
        }
    }

    async fn clan_log_tier(&self, clan: &Tag, player: &Tag) -> Option<HistoryReport> {
        let records = self.community.clan_war_log(clan, player).await;
        let weeks = reconcile(records, self.limit);
        if weeks.is_empty() {
            debug!("community clan-log tier has no usable weeks for {}", clan);
            None
        } else {
            Some(HistoryReport::from_tier(weeks, SourceTier::CommunityClanLog))
        }
    }

    async fn player_page_tier(&self, player: &Tag) -> HistoryReport {
        let records = self.community.player_war_history(player).await;
        let weeks = reconcile(records, self.limit);
        if weeks.is_empty() {
            info!("all history tiers exhausted for {}", player);
            HistoryReport::unavailable()
        } else {
            HistoryReport::from_tier(weeks, SourceTier::CommunityPlayerPage)
        }
    }
}
