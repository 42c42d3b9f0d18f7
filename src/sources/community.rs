//! Community site scraper.
//!
//! The community site is unofficial and structurally unstable, so this
//! tier is built to degrade rather than fail: any internal problem (a
//! non-200 page, a missing marker, a malformed blob, a table that moved)
//! collapses to an empty result and a trace line. The facade treats empty
//! as "try the next tier".
//!
//! Two strategies live here:
//!
//! - the clan war-log page embeds a JSON document in a script tag; it is
//!   parsed generically and searched by shape (see [`crate::extract`])
//!   because no fixed path into it survives site releases;
//! - the player page renders war history as an HTML table; rows are
//!   flattened to text and interpreted with regex patterns plus the
//!   integer-range heuristic.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::extract::{classify_row_integers, collect_war_log_items, decode_war_log_item};
use crate::fetch::{FetchError, HttpClient, HttpConfig};
use crate::models::{RawWeekRecord, Tag};
use crate::sources::CommunitySource;

/// Script-tag marker for the embedded data blob.
const EMBEDDED_JSON_MARKER: &str =
    r#"<script id="__NEXT_DATA__" type="application/json">\s*(\{.*?\})\s*</script>"#;

/// Marker for the player page's war-history table.
const WAR_TABLE_SELECTOR: &str = "table.cw2_history, #cw2_history table";

/// Configuration for the community scraper.
#[derive(Debug, Clone)]
pub struct CommunityConfig {
    /// Site base, e.g. `https://royaleapi.com`.
    pub base_url: String,

    /// Request timeout. A full page fetch; slower than the API tier.
    pub timeout: std::time::Duration,

    /// Browser-like user agent; the site serves bots differently.
    pub user_agent: String,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            base_url: "https://royaleapi.com".to_string(),
            timeout: std::time::Duration::from_secs(12),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Scraper over the community site's clan and player pages.
pub struct CommunityScraper {
    http: HttpClient,
    base_url: Url,
}

impl CommunityScraper {
    pub fn new(config: CommunityConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)?;
        let http = HttpClient::new(HttpConfig {
            timeout: config.timeout,
            user_agent: config.user_agent,
            follow_redirects: true,
            ..Default::default()
        })?;

        Ok(Self { http, base_url })
    }

    /// Fetch a page, collapsing every failure to `None`.
    async fn fetch_page(&self, path: &str) -> Option<String> {
        let url = match self.base_url.join(path) {
            Ok(u) => u,
            Err(e) => {
                warn!("bad page path {}: {}", path, e);
                return None;
            }
        };

        match self.http.get_text(&url).await {
            Ok(response) if response.is_success() => Some(response.body),
            Ok(response) => {
                debug!("{} answered {}", url, response.status);
                None
            }
            Err(e) => {
                warn!("fetch of {} failed: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl CommunitySource for CommunityScraper {
    async fn clan_war_log(&self, clan: &Tag, player: &Tag) -> Vec<RawWeekRecord> {
        let path = format!("clan/{}/war/log", clan.path_segment());
        let Some(html) = self.fetch_page(&path).await else {
            return Vec::new();
        };

        let Some(blob) = extract_embedded_json(&html) else {
            debug!("no embedded data blob on clan war-log page for {}", clan);
            return Vec::new();
        };

        let records = parse_embedded_war_log(&blob, clan, player);
        debug!("clan war-log page yielded {} records for {}", records.len(), clan);
        records
    }

    async fn player_war_history(&self, player: &Tag) -> Vec<RawWeekRecord> {
        let path = format!("player/{}", player.path_segment());
        let Some(html) = self.fetch_page(&path).await else {
            return Vec::new();
        };

        let records = parse_war_history_table(&html);
        debug!("player page yielded {} rows for {}", records.len(), player);
        records
    }
}

// ── Embedded-blob path ──────────────────────────────────────────────────────

/// Locate and parse the JSON document embedded in the page's script tag.
pub fn extract_embedded_json(html: &str) -> Option<Value> {
    let re = Regex::new(&format!("(?s){}", EMBEDDED_JSON_MARKER)).unwrap();
    let captured = re.captures(html)?.get(1)?.as_str();
    serde_json::from_str(captured).ok()
}

/// Shape-search the blob for war-log items and decode the ones naming the
/// requested clan.
pub fn parse_embedded_war_log(blob: &Value, clan: &Tag, player: &Tag) -> Vec<RawWeekRecord> {
    collect_war_log_items(blob)
        .into_iter()
        .filter_map(|item| decode_war_log_item(item, clan, player))
        .collect()
}

// ── Table-scraping path ─────────────────────────────────────────────────────

/// Parse the player page's war-history table into raw week rows.
///
/// Rows that do not carry a season-week pair are skipped (header rows,
/// separator rows, ongoing-week placeholders).
pub fn parse_war_history_table(html: &str) -> Vec<RawWeekRecord> {
    let document = Html::parse_document(html);

    let table_sel = Selector::parse(WAR_TABLE_SELECTOR).unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let clan_link_sel = Selector::parse(r#"a[href*="/clan/"]"#).unwrap();

    let Some(table) = document.select(&table_sel).next() else {
        debug!("war-history table marker not found");
        return Vec::new();
    };

    let mut records = Vec::new();

    for row in table.select(&row_sel) {
        let mut text = row
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        // Clan identity comes from the profile link, not from loose text.
        let mut clan_tag = None;
        let mut clan_name = String::new();
        if let Some(link) = row.select(&clan_link_sel).next() {
            if let Some(href) = link.value().attr("href") {
                clan_tag = clan_tag_from_href(href);
            }
            clan_name = link.text().collect::<String>().trim().to_string();
            if !clan_name.is_empty() {
                // Clan names may contain digits; take the name out of the
                // text before anything numeric is interpreted.
                text = text.replace(&clan_name, " ");
            }
        }

        // Date first: its components would otherwise read as stats.
        let (recorded_on, text) = take_date(&text);

        let Some((season_id, week, text)) = take_season_week(&text) else {
            continue;
        };

        let re_int = Regex::new(r"\b\d+\b").unwrap();
        let values: Vec<i64> = re_int
            .find_iter(&text)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        let stats = classify_row_integers(&values);

        records.push(RawWeekRecord {
            season_id: Some(season_id),
            week: Some(week),
            medals: stats.medals,
            decks_used: stats.decks_used,
            clan_tag,
            clan_name,
            clan_trophies: stats.clan_trophies,
            recorded_on,
        });
    }

    records
}

/// Pull the clan tag out of a `/clan/<TAG>` profile href.
fn clan_tag_from_href(href: &str) -> Option<Tag> {
    let rest = href.split("/clan/").nth(1)?;
    let segment = rest.split(['/', '?', '#']).next()?;
    let tag = Tag::normalize(segment);
    (!tag.is_empty()).then_some(tag)
}

/// Extract and remove a literal calendar date (`YYYY-MM-DD`) from row text.
fn take_date(text: &str) -> (Option<NaiveDate>, String) {
    let re = Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap();
    let Some(m) = re.find(text) else {
        return (None, text.to_string());
    };

    let date = NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok();
    let stripped = re.replace_all(text, " ").into_owned();
    (date, stripped)
}

/// Extract and remove the `season-week` pair: two integers joined by a
/// hyphen, e.g. `127-2`. Must run after [`take_date`] so a date's
/// `12-15` cannot be mistaken for it.
fn take_season_week(text: &str) -> Option<(i64, i64, String)> {
    let re = Regex::new(r"\b(\d+)-(\d+)\b").unwrap();
    let caps = re.captures(text)?;

    let season: i64 = caps.get(1)?.as_str().parse().ok()?;
    let week: i64 = caps.get(2)?.as_str().parse().ok()?;

    let whole = caps.get(0)?;
    let mut stripped = String::with_capacity(text.len());
    stripped.push_str(&text[..whole.start()]);
    stripped.push(' ');
    stripped.push_str(&text[whole.end()..]);

    Some((season, week, stripped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_extract_embedded_json() {
        let html = concat!(
            "<html><body><div>war log</div>",
            r#"<script id="__NEXT_DATA__" type="application/json">"#,
            r#" {"props": {"pageProps": {"n": 1}}} "#,
            "</script></body></html>"
        );
        let blob = extract_embedded_json(html).unwrap();
        assert_eq!(blob["props"]["pageProps"]["n"], 1);
    }

    #[test]
    fn test_extract_embedded_json_spans_lines() {
        let html = "<script id=\"__NEXT_DATA__\" type=\"application/json\">\n{\"a\":\n[1,2]}\n</script>";
        let blob = extract_embedded_json(html).unwrap();
        assert_eq!(blob["a"], json!([1, 2]));
    }

    #[test]
    fn test_extract_embedded_json_missing_marker() {
        assert!(extract_embedded_json("<html><body>nothing here</body></html>").is_none());
    }

    #[test]
    fn test_extract_embedded_json_malformed_blob() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{broken</script>"#;
        assert!(extract_embedded_json(html).is_none());
    }

    #[test]
    fn test_parse_embedded_war_log() {
        let blob = json!({
            "props": {
                "pageProps": {
                    "warLog": [
                        {
                            "seasonId": 41,
                            "sectionIndex": 1,
                            "standings": [{
                                "clan": {
                                    "tag": "#ABC123",
                                    "name": "Alpha Clan",
                                    "clanScore": 2600,
                                    "participants": [
                                        {"tag": "#P1", "fame": 1900, "decksUsed": 15}
                                    ]
                                }
                            }]
                        }
                    ]
                }
            }
        });
        let records =
            parse_embedded_war_log(&blob, &Tag::normalize("#ABC123"), &Tag::normalize("#P1"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].season_id, Some(41));
        assert_eq!(records[0].medals, 1900);
        assert_eq!(records[0].clan_trophies, Some(2600));
    }

    fn history_row(inner: &str) -> String {
        format!(
            "<html><body><table class=\"cw2_history\"><tbody>{}</tbody></table></body></html>",
            inner
        )
    }

    #[test]
    fn test_parse_table_spec_row() {
        // The date column must not be misread as stats
        let html = history_row(
            r#"<tr>
                <td>127-2</td>
                <td><a href="/clan/L0GJ9PYP">Alpha Clan</a> #L0GJ9PYP</td>
                <td>2200</td>
                <td>16</td>
                <td>2025-12-15</td>
            </tr>"#,
        );
        let records = parse_war_history_table(&html);
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.season_id, Some(127));
        assert_eq!(r.week, Some(2));
        assert_eq!(r.clan_tag, Some(Tag::normalize("#L0GJ9PYP")));
        assert_eq!(r.clan_name, "Alpha Clan");
        assert_eq!(r.medals, 2200);
        assert_eq!(r.decks_used, 16);
        assert_eq!(r.clan_trophies, None);
        assert_eq!(r.recorded_on, NaiveDate::from_ymd_opt(2025, 12, 15));
    }

    #[test]
    fn test_parse_table_row_with_trophies() {
        let html = history_row(
            r#"<tr>
                <td>126-4</td>
                <td><a href="/clan/ABC123">Beta Squad</a></td>
                <td>1850</td>
                <td>1420</td>
                <td>12</td>
                <td>2025-11-30</td>
            </tr>"#,
        );
        let records = parse_war_history_table(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].decks_used, 12);
        assert_eq!(records[0].medals, 1850);
        assert_eq!(records[0].clan_trophies, Some(1420));
    }

    #[test]
    fn test_parse_table_skips_rows_without_season_week() {
        let html = history_row(
            r#"<tr><th>Week</th><th>Clan</th><th>Medals</th></tr>
               <tr>
                 <td>127-1</td>
                 <td><a href="/clan/ABC123">Alpha Clan</a></td>
                 <td>900</td><td>9</td>
               </tr>"#,
        );
        let records = parse_war_history_table(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].week, Some(1));
    }

    #[test]
    fn test_parse_table_digits_in_clan_name() {
        // "Top 100 Kings" must not contaminate the stat integers
        let html = history_row(
            r#"<tr>
                <td>125-3</td>
                <td><a href="/clan/XYZ">Top 100 Kings</a></td>
                <td>2050</td>
                <td>14</td>
            </tr>"#,
        );
        let records = parse_war_history_table(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].clan_name, "Top 100 Kings");
        assert_eq!(records[0].medals, 2050);
        assert_eq!(records[0].decks_used, 14);
    }

    #[test]
    fn test_parse_table_missing_table() {
        assert!(parse_war_history_table("<html><table><tr><td>1-2</td></tr></table></html>")
            .is_empty());
    }

    #[test]
    fn test_clan_tag_from_href() {
        assert_eq!(
            clan_tag_from_href("/clan/L0GJ9PYP"),
            Some(Tag::normalize("#L0GJ9PYP"))
        );
        assert_eq!(
            clan_tag_from_href("https://royaleapi.com/clan/abc/war/log"),
            Some(Tag::normalize("#ABC"))
        );
        assert_eq!(clan_tag_from_href("/player/XYZ"), None);
        assert_eq!(clan_tag_from_href("/clan/"), None);
    }

    #[test]
    fn test_take_date() {
        let (date, rest) = take_date("127-2 something 2025-12-15 tail");
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 15));
        assert!(!rest.contains("2025-12-15"));
        assert!(rest.contains("127-2"));
    }

    #[test]
    fn test_take_season_week_requires_pair() {
        assert!(take_season_week("no numbers here").is_none());
        let (season, week, rest) = take_season_week("127-2 2200 16").unwrap();
        assert_eq!((season, week), (127, 2));
        assert!(!rest.contains("127-2"));
        assert!(rest.contains("2200"));
    }

    #[test]
    fn test_default_config() {
        let config = CommunityConfig::default();
        assert_eq!(config.timeout, std::time::Duration::from_secs(12));
        assert!(config.user_agent.starts_with("Mozilla"));
    }
}
