//! Official API client.
//!
//! Queries the vendor's REST API with bearer-token auth. The war-log
//! endpoint is clan-scoped: it cannot answer "where did this player fight
//! three clans ago", which is why the community tiers exist. All endpoint
//! specifics are isolated in this module so upstream changes are easy to
//! fix.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::extract::{collect_war_log_items, decode_war_log_item};
use crate::fetch::{FetchError, HttpClient, HttpConfig};
use crate::models::{RawWeekRecord, Tag};
use crate::sources::OfficialSource;

/// Failures from the official API tier. All of them are non-fatal to the
/// facade: each one means "fall through to the next tier".
#[derive(Debug, Error)]
pub enum ApiError {
    /// Many clans simply have no war log.
    #[error("resource not found (404)")]
    NotFound,

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport failure: {0}")]
    Transport(FetchError),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout => ApiError::Timeout,
            other => ApiError::Transport(other),
        }
    }
}

/// Configuration for the official API client.
#[derive(Debug, Clone)]
pub struct OfficialConfig {
    /// API base, e.g. `https://api.clashroyale.com/v1`.
    pub base_url: String,

    /// Bearer token.
    pub token: String,

    /// Request timeout. The API answers fast; a long timeout here only
    /// delays the fallback chain.
    pub timeout: Duration,

    /// How long a fetched response stays reusable in memory.
    pub cache_ttl: Duration,
}

impl Default for OfficialConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.clashroyale.com/v1".to_string(),
            token: String::new(),
            timeout: Duration::from_secs(8),
            cache_ttl: Duration::from_secs(30),
        }
    }
}

struct CacheSlot {
    expires_at: Instant,
    value: Value,
}

/// Official API client with a short-lived in-memory response cache.
///
/// The cache absorbs repeated lookups for the same tag inside a small
/// window (a user reopening the same profile) and keeps pressure off the
/// rate-limited API. Entries are plain value+deadline pairs checked lazily
/// on read; nothing evicts in the background.
pub struct OfficialApiClient {
    http: HttpClient,
    base_url: Url,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

/// A player's current profile, as far as this crate cares: enough to
/// anchor a by-player history query to the player's current clan.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerProfile {
    pub tag: String,
    pub name: String,
    pub clan: Option<ClanRef>,
}

/// Clan reference embedded in a player profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ClanRef {
    pub tag: String,
    pub name: String,
}

impl OfficialApiClient {
    pub fn new(config: OfficialConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)?;
        let http = HttpClient::new(HttpConfig {
            timeout: config.timeout,
            bearer_token: Some(config.token),
            ..Default::default()
        })?;

        Ok(Self {
            http,
            base_url,
            cache_ttl: config.cache_ttl,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch the player's current profile (name + current clan).
    ///
    /// Callers use this to anchor a by-player query to a clan before
    /// asking for history.
    pub async fn player_profile(&self, player: &Tag) -> Result<PlayerProfile, ApiError> {
        let path = format!("players/{}", player.api_encoded());
        let key = format!("player:{}", player.as_str());
        let json = self.get_json(&path, &key).await?;
        Ok(serde_json::from_value(json)?)
    }

    /// GET a path under the base URL, serving from the response cache when
    /// the entry is still fresh. One network attempt per call.
    async fn get_json(&self, path: &str, cache_key: &str) -> Result<Value, ApiError> {
        {
            let mut cache = self.cache.lock().await;
            match cache.get(cache_key) {
                Some(slot) if slot.expires_at > Instant::now() => {
                    debug!("serving {} from response cache", cache_key);
                    return Ok(slot.value.clone());
                }
                Some(_) => {
                    cache.remove(cache_key);
                }
                None => {}
            }
        }

        // The encoded tag contains %23 which must survive as-is; plain
        // string append instead of Url::join keeps it unescaped.
        let url = Url::parse(&format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        ))
        .map_err(FetchError::from)?;

        let response = self.http.get_text(&url).await?;
        if response.status == 404 {
            return Err(ApiError::NotFound);
        }
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let value: Value = serde_json::from_str(&response.body)?;

        let mut cache = self.cache.lock().await;
        cache.insert(
            cache_key.to_string(),
            CacheSlot {
                expires_at: Instant::now() + self.cache_ttl,
                value: value.clone(),
            },
        );

        Ok(value)
    }
}

#[async_trait]
impl OfficialSource for OfficialApiClient {
    async fn clan_war_log(
        &self,
        clan: &Tag,
        player: &Tag,
    ) -> Result<Vec<RawWeekRecord>, ApiError> {
        let path = format!("clans/{}/riverracelog", clan.api_encoded());
        let key = format!("warlog:{}", clan.as_str());
        let json = self.get_json(&path, &key).await?;
        Ok(parse_war_log(&json, clan, player))
    }
}

/// Decode a war-log response for one clan and one player.
///
/// The well-formed response nests weeks under `items`, but the same
/// alias-tolerant extraction used for the scraped blob serves here too.
/// The two surfaces drift toward each other, and shape-matching keeps this
/// working when a version bump re-nests the list.
pub fn parse_war_log(json: &Value, clan: &Tag, player: &Tag) -> Vec<RawWeekRecord> {
    collect_war_log_items(json)
        .into_iter()
        .filter_map(|item| decode_war_log_item(item, clan, player))
        .collect()
}
