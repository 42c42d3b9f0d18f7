//! Schema-agnostic extraction from war-log payloads.
//!
//! Both upstream surfaces loosely mirror the same shape but neither is
//! stable: the official API has renamed its week and medal fields across
//! versions, and the community site's embedded data moves around between
//! releases. This module keeps the drift in one place:
//!
//! - alias tables, one ordered candidate list per logical attribute,
//!   resolved by first match;
//! - a shape predicate that recognizes a war-log item by structure rather
//!   than by position in the document;
//! - a recursive walk that collects matching items from an arbitrary
//!   JSON tree;
//! - the pure integer-disambiguation heuristic for scraped table rows.

use serde_json::Value;

use crate::models::{RawWeekRecord, Tag, MAX_WAR_DECKS};

// ── Field alias tables ──────────────────────────────────────────────────────
//
// Ordered by how current the spelling is; extend here when the upstream
// shape drifts again.

/// Season identifier.
pub const SEASON_KEYS: &[&str] = &["seasonId", "season"];

/// Week index within a season.
pub const WEEK_KEYS: &[&str] = &["sectionIndex", "week", "warWeek", "periodIndex"];

/// Player's war points.
pub const MEDAL_KEYS: &[&str] = &["medals", "fame", "fameEarned", "fame_earned"];

/// Battles fought.
pub const DECK_KEYS: &[&str] = &["decksUsed", "decks_used", "decks"];

/// Clan war trophies.
pub const TROPHY_KEYS: &[&str] = &["clanScore", "warTrophies", "clanWarTrophies", "trophies"];

/// The per-week standings list inside a war-log item.
pub const STANDING_KEYS: &[&str] = &["standings", "clans"];

/// Participants list inside a standing's clan object.
pub const PARTICIPANT_KEYS: &[&str] = &["participants", "players"];

// ── Alias-tolerant field lookup ─────────────────────────────────────────────

/// First present field among `keys`, as an integer.
///
/// Accepts JSON numbers and numeric strings (the scraped blob serializes
/// some counters as strings).
pub fn first_int(obj: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(v) = obj.get(key) {
            if let Some(n) = as_int(v) {
                return Some(n);
            }
        }
    }
    None
}

/// First present field among `keys`, as a non-empty string.
pub fn first_str<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        if let Some(s) = obj.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

/// First present field among `keys`, as an array.
pub fn first_array<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    for key in keys {
        if let Some(arr) = obj.get(key).and_then(Value::as_array) {
            return Some(arr);
        }
    }
    None
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Shape matching ──────────────────────────────────────────────────────────

/// Whether a JSON object structurally resembles a war-log item: it carries
/// a standings-like list and at least one season/week identification key.
pub fn looks_like_war_log_item(obj: &Value) -> bool {
    if !obj.is_object() {
        return false;
    }
    let has_standings = first_array(obj, STANDING_KEYS).is_some();
    let has_period = SEASON_KEYS
        .iter()
        .chain(WEEK_KEYS)
        .any(|k| obj.get(*k).is_some());
    has_standings && has_period
}

/// Recursively collect every object in `root` that passes
/// [`looks_like_war_log_item`]. Matching is by shape, not by path, because
/// the embedded document's layout changes between site releases.
pub fn collect_war_log_items(root: &Value) -> Vec<&Value> {
    let mut found = Vec::new();
    walk(root, &mut found);
    found
}

fn walk<'a>(node: &'a Value, found: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            if looks_like_war_log_item(node) {
                found.push(node);
            }
            for v in map.values() {
                walk(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk(v, found);
            }
        }
        _ => {}
    }
}

// ── War-log item decoding ───────────────────────────────────────────────────

/// Decode one war-log item into a [`RawWeekRecord`] for `clan_tag`,
/// attributing medals/decks to `player_tag` where present.
///
/// Returns `None` when the item has no standing for the requested clan.
/// A standing without the requested player still yields a record with zero
/// medals/decks; the reconciler decides what to keep.
pub fn decode_war_log_item(item: &Value, clan_tag: &Tag, player_tag: &Tag) -> Option<RawWeekRecord> {
    let standings = first_array(item, STANDING_KEYS)?;

    let clan = standings.iter().find_map(|standing| {
        // Standings nest the clan under `clan`; some blob variants inline it.
        let clan = standing.get("clan").unwrap_or(standing);
        let tag = first_str(clan, &["tag"])?;
        (Tag::normalize(tag) == *clan_tag).then_some(clan)
    })?;

    let mut record = RawWeekRecord {
        season_id: first_int(item, SEASON_KEYS),
        week: first_int(item, WEEK_KEYS),
        clan_tag: first_str(clan, &["tag"]).map(Tag::normalize),
        clan_name: first_str(clan, &["name"]).unwrap_or_default().to_string(),
        clan_trophies: first_int(clan, TROPHY_KEYS),
        ..Default::default()
    };

    if let Some(participants) = first_array(clan, PARTICIPANT_KEYS) {
        let player = participants
            .iter()
            .find(|p| first_str(p, &["tag"]).is_some_and(|t| Tag::normalize(t) == *player_tag));
        if let Some(p) = player {
            record.medals = first_int(p, MEDAL_KEYS).unwrap_or(0);
            record.decks_used = first_int(p, DECK_KEYS).unwrap_or(0);
        }
    }

    Some(record)
}

// ── Scraped-row numeric disambiguation ──────────────────────────────────────

/// Best-guess classification of the leftover integers in a scraped table
/// row, once season/week and the calendar date have been removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStats {
    pub medals: i64,
    pub decks_used: i64,
    pub clan_trophies: Option<i64>,
}

/// Classify loose integers from a war-history table row.
///
/// The columns carry no markup hints once flattened to text, so this leans
/// on the value ranges: decks used is bounded by [`MAX_WAR_DECKS`], medal
/// totals start around 50, and clan trophies run 1000+. Best effort only:
/// values that land in overlapping ranges can be misclassified.
pub fn classify_row_integers(values: &[i64]) -> RowStats {
    let mut remaining: Vec<i64> = values.to_vec();

    let decks_used = take_max(&mut remaining, |v| (0..=MAX_WAR_DECKS).contains(&v)).unwrap_or(0);
    let medals = take_max(&mut remaining, |v| v >= 50).unwrap_or(0);
    let clan_trophies = take_max(&mut remaining, |v| v >= 1000);

    RowStats {
        medals,
        decks_used,
        clan_trophies,
    }
}

/// Remove and return the largest value matching `pred`.
fn take_max(values: &mut Vec<i64>, pred: impl Fn(i64) -> bool) -> Option<i64> {
    let (idx, _) = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| pred(v))
        .max_by_key(|(_, &v)| v)?;
    Some(values.swap_remove(idx))
}
