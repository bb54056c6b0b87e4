//! Constants for the channel ticker
//!
//! Compile-time defaults for every configurable setting. The values here are
//! used whenever `channel-ticker.toml` omits a key.

/// How often a refresh pass runs (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 900;

/// Pause between two channel renames within a pass (in milliseconds)
pub const PUBLISH_PAUSE_MS: u64 = 2000;

/// HTTP request timeout when fetching metrics (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Total fetch attempts per metric before it is reported unavailable
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Fixed delay between two fetch attempts (in milliseconds)
pub const RETRY_DELAY_MS: u64 = 2000;

/// Fixed circulating supply of the NACHO token
pub const TOKEN_SUPPLY: f64 = 287_000_000_000.0;

/// Trading pair queried on Pionex
pub const TOKEN_SYMBOL: &str = "NACHO_USDT";

/// Number of recent trades requested when looking up the spot price
pub const TRADE_LIMIT: u32 = 10;

/// KRC-721 collection floor price endpoint
pub const FLOOR_PRICE_URL: &str = "https://api.kaspa.com/krc721/NACHO";

/// JSON pointer to the floor price in the floor endpoint's body
pub const FLOOR_PRICE_FIELD: &str = "/price";

/// Pionex recent trades endpoint
pub const TRADES_URL: &str = "https://api.pionex.com/api/v1/market/trades";

/// Pionex 24h tickers endpoint
pub const TICKERS_URL: &str = "https://api.pionex.com/api/v1/market/tickers";

/// Discord REST API base URL
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Environment variable holding the Discord bot token
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";

/// Discord rejects channel names outside this length range
pub const MAX_CHANNEL_NAME_CHARS: usize = 100;

pub const FLOOR_LABEL: &str = "NFT Floor: {} KAS";
pub const MARKET_CAP_LABEL: &str = "MCAP: {}";
pub const SPOT_LABEL: &str = "Price: ${}";
pub const VOLUME_LABEL: &str = "24h Vol: {}";

/// Browser-like user agent sent to upstream APIs
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Accept header sent with every upstream request
pub const ACCEPT: &str = "application/json, text/plain, */*";

/// Accept-Language header sent with every upstream request
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// User agent for Discord API requests (Discord requires the `DiscordBot` form)
pub const DISCORD_USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);
