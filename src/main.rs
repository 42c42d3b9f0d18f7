use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warlog_agent::config::AppConfig;
use warlog_agent::history::{HistoryQuery, HistoryService};
use warlog_agent::models::{Tag, WeekEntry};
use warlog_agent::sources::community::CommunityConfig;
use warlog_agent::sources::official::OfficialConfig;
use warlog_agent::sources::{CommunityScraper, OfficialApiClient};

#[derive(Parser)]
#[command(name = "warlog-agent")]
#[command(about = "Clan-war history lookup over the official API and community site")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a player's recent clan-war weeks
    History {
        /// Player tag (with or without #)
        #[arg(long)]
        player: String,

        /// Clan tag to anchor the query; resolved from the player's
        /// profile when omitted
        #[arg(long)]
        clan: Option<String>,

        /// Number of weeks to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a tag's canonical form and per-source encodings
    Tag {
        /// Raw tag as the user typed it
        raw: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::History {
            player,
            clan,
            limit,
        } => {
            let mut config = if cli.config.exists() {
                AppConfig::from_file(&cli.config)?
            } else {
                tracing::debug!("no config file at {:?}, using defaults", cli.config);
                AppConfig::default()
            };

            // Token from the environment wins over the file so the file
            // can be committed without secrets.
            if let Ok(token) = std::env::var("WARLOG_API_TOKEN") {
                if !token.is_empty() {
                    config.api.token = token;
                }
            }

            run_history(&config, &player, clan.as_deref(), limit).await?;
        }
        Commands::Tag { raw } => {
            let tag = Tag::normalize(&raw);
            println!("canonical:     {}", tag);
            println!("api path:      {}", tag.api_encoded());
            println!("site path:     {}", tag.path_segment());
            if tag.is_empty() {
                println!("(empty tag — would be rejected before any request)");
            }
        }
    }

    Ok(())
}

async fn run_history(
    config: &AppConfig,
    player: &str,
    clan: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let player = Tag::normalize(player);

    let official = Arc::new(OfficialApiClient::new(OfficialConfig {
        base_url: config.api.base_url.clone(),
        token: config.api.token.clone(),
        timeout: config.api.timeout(),
        cache_ttl: config.api.cache_ttl(),
    })?);

    let community = Arc::new(CommunityScraper::new(CommunityConfig {
        base_url: config.community.base_url.clone(),
        timeout: config.community.timeout(),
        user_agent: config.community.user_agent.clone(),
    })?);

    let service = HistoryService::new(official.clone(), community)
        .with_limit(limit.unwrap_or(config.history.week_limit));

    // Anchor to a clan when we have one: either given on the command line
    // or resolved from the player's current profile. Anchored queries can
    // use all three tiers.
    let clan = match clan {
        Some(raw) => Some(Tag::normalize(raw)),
        None => match official.player_profile(&player).await {
            Ok(profile) => profile.clan.map(|c| Tag::normalize(&c.tag)),
            Err(e) => {
                tracing::warn!("could not resolve current clan for {}: {}", player, e);
                None
            }
        },
    };

    let query = match clan {
        Some(clan) if !clan.is_empty() => HistoryQuery::ByClan {
            clan,
            player: player.clone(),
        },
        _ => HistoryQuery::ByPlayer {
            player: player.clone(),
        },
    };

    let report = service.history(query).await?;

    if report.is_unavailable() {
        println!("No war history available for {} right now.", player);
        println!("Both the official API and the community site came up empty.");
        return Ok(());
    }

    println!("=== War history for {} ===", player);
    for (i, week) in report.weeks.iter().enumerate() {
        println!("{:>2}) {}", i + 1, format_week(week));
    }

    Ok(())
}

fn format_week(week: &WeekEntry) -> String {
    let league = week
        .league()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "—".to_string());
    let date = week
        .recorded_on
        .map(|d| format!("  ({})", d))
        .unwrap_or_default();

    format!(
        "S{}-W{}  {} {}  medals {}  decks {}  league {}{}",
        week.season_id,
        week.week,
        week.clan_tag,
        week.clan_name,
        week.medals,
        week.decks_used,
        league,
        date
    )
}
