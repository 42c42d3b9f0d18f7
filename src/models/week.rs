//! War-week records.
//!
//! Sources emit [`RawWeekRecord`]s, which may be missing identification.
//! The reconciler promotes them to [`WeekEntry`]s, which are concrete by
//! construction: a record that cannot name its clan and its
//! `(season, week)` pair never becomes a `WeekEntry`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Tag;

/// Maximum war decks a player can use in one week. Used by the scraped-row
/// heuristic to tell the decks-used column apart from medal counts.
pub const MAX_WAR_DECKS: i64 = 16;

/// A war-week record as emitted by a source, before validation.
///
/// Identification fields are optional because neither source guarantees
/// them: the scraped blob drifts between releases and the official API has
/// renamed its week field more than once. Week numbering is carried
/// verbatim from the source, never rebased.
#[derive(Debug, Clone, Default)]
pub struct RawWeekRecord {
    pub season_id: Option<i64>,
    pub week: Option<i64>,
    /// Player's war points for the week; 0 when the source omits them.
    pub medals: i64,
    /// Battles fought that week; 0 when the source omits them.
    pub decks_used: i64,
    pub clan_tag: Option<Tag>,
    pub clan_name: String,
    pub clan_trophies: Option<i64>,
    /// Calendar date of the week, when the source carries one (table rows).
    pub recorded_on: Option<NaiveDate>,
}

/// A validated clan-war week entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekEntry {
    /// Competitive season number.
    pub season_id: u32,

    /// Week index within the season, exactly as the source numbered it.
    pub week: u32,

    /// Player's earned war points for the week.
    pub medals: u32,

    /// Battles the player fought that week.
    pub decks_used: u32,

    /// Clan the player fought for, canonical form.
    pub clan_tag: Tag,

    /// Clan display name; empty only when the source omitted it.
    pub clan_name: String,

    /// Clan's war trophies for the week, when derivable.
    pub clan_trophies: Option<u32>,

    /// Calendar date of the week, when the source carried one.
    pub recorded_on: Option<NaiveDate>,
}

impl WeekEntry {
    /// Promote a raw record, enforcing the identification invariant:
    /// a concrete clan tag and a concrete `(season, week)` pair.
    pub fn from_raw(raw: RawWeekRecord) -> Option<Self> {
        let clan_tag = raw.clan_tag.filter(|t| !t.is_empty())?;
        let season_id = to_count(raw.season_id?)?;
        let week = to_count(raw.week?)?;

        Some(Self {
            season_id,
            week,
            medals: to_count(raw.medals).unwrap_or(0),
            decks_used: to_count(raw.decks_used).unwrap_or(0),
            clan_tag,
            clan_name: raw.clan_name,
            clan_trophies: raw.clan_trophies.and_then(to_count),
            recorded_on: raw.recorded_on,
        })
    }

    /// League bucket derived from clan trophies: `floor(t / 1000) * 1000`.
    pub fn league(&self) -> Option<u32> {
        self.clan_trophies.map(|t| (t / 1000) * 1000)
    }

    /// Two entries with the same key are the same observation.
    pub fn dedup_key(&self) -> (Tag, u32, u32, u32, u32) {
        (
            self.clan_tag.clone(),
            self.season_id,
            self.week,
            self.medals,
            self.decks_used,
        )
    }

    /// Sort key: most recent week first.
    pub fn recency_key(&self) -> (u32, u32) {
        (self.season_id, self.week)
    }
}

fn to_count(v: i64) -> Option<u32> {
    u32::try_from(v).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(season: Option<i64>, week: Option<i64>, tag: Option<&str>) -> RawWeekRecord {
        RawWeekRecord {
            season_id: season,
            week,
            medals: 1800,
            decks_used: 14,
            clan_tag: tag.map(Tag::normalize),
            clan_name: "Alpha Clan".to_string(),
            clan_trophies: Some(2534),
            recorded_on: None,
        }
    }

    #[test]
    fn test_from_raw_complete() {
        let entry = WeekEntry::from_raw(raw(Some(41), Some(2), Some("#ABC"))).unwrap();
        assert_eq!(entry.season_id, 41);
        assert_eq!(entry.week, 2);
        assert_eq!(entry.medals, 1800);
        assert_eq!(entry.decks_used, 14);
        assert_eq!(entry.clan_tag.as_str(), "ABC");
    }

    #[test]
    fn test_from_raw_rejects_missing_season() {
        assert!(WeekEntry::from_raw(raw(None, Some(2), Some("#ABC"))).is_none());
    }

    #[test]
    fn test_from_raw_rejects_missing_week() {
        assert!(WeekEntry::from_raw(raw(Some(41), None, Some("#ABC"))).is_none());
    }

    #[test]
    fn test_from_raw_rejects_missing_clan() {
        assert!(WeekEntry::from_raw(raw(Some(41), Some(2), None)).is_none());
        assert!(WeekEntry::from_raw(raw(Some(41), Some(2), Some(""))).is_none());
    }

    #[test]
    fn test_from_raw_week_zero_is_valid() {
        // Some API versions number weeks from 0; the value is kept as-is.
        let entry = WeekEntry::from_raw(raw(Some(41), Some(0), Some("#ABC"))).unwrap();
        assert_eq!(entry.week, 0);
    }

    #[test]
    fn test_from_raw_negative_counts_default_to_zero() {
        let mut r = raw(Some(41), Some(1), Some("#ABC"));
        r.medals = -5;
        r.decks_used = -1;
        let entry = WeekEntry::from_raw(r).unwrap();
        assert_eq!(entry.medals, 0);
        assert_eq!(entry.decks_used, 0);
    }

    #[test]
    fn test_league_buckets() {
        let mut entry = WeekEntry::from_raw(raw(Some(41), Some(1), Some("#ABC"))).unwrap();
        assert_eq!(entry.league(), Some(2000));
        entry.clan_trophies = Some(999);
        assert_eq!(entry.league(), Some(0));
        entry.clan_trophies = Some(4750);
        assert_eq!(entry.league(), Some(4000));
        entry.clan_trophies = None;
        assert_eq!(entry.league(), None);
    }

    #[test]
    fn test_dedup_key_ignores_trophies_and_date() {
        let mut a = WeekEntry::from_raw(raw(Some(41), Some(1), Some("#ABC"))).unwrap();
        let mut b = a.clone();
        a.clan_trophies = Some(2000);
        b.clan_trophies = Some(3000);
        b.recorded_on = NaiveDate::from_ymd_opt(2025, 12, 15);
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let entry = WeekEntry::from_raw(raw(Some(41), Some(1), Some("#ABC"))).unwrap();
        let json = serde_json::to_string(&entry).unwrap();
        let back: WeekEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
