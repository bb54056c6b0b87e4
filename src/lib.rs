//! # Channel Ticker
//!
//! Publishes NACHO market metrics as Discord channel names: the KRC-721
//! collection floor price, the token market cap and spot price, and
//! optionally the token's 24h volume.
//!
//! ## Usage
//!
//! ```no_run
//! use channel_ticker::{
//!     config::{load_config, RefreshPlan},
//!     ChannelPublisher, DiscordClient, FetchSettings, MetricFetcher, RefreshCycle,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None)?;
//! let discord = DiscordClient::connect("bot-token").await?;
//! let fetcher = MetricFetcher::new(FetchSettings::default())?;
//!
//! let cycle = RefreshCycle::new(
//!     Arc::new(fetcher),
//!     ChannelPublisher::new(Arc::new(discord)),
//!     RefreshPlan::from(&config),
//! );
//! cycle.run(async { tokio::signal::ctrl_c().await.ok(); }).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Nothing below the pass level returns an error. A metric that cannot be
//! read is an unavailable [`MetricResult`]; a channel that cannot be renamed
//! is a [`TargetStatus::Failed`] entry in the pass [`RefreshOutcome`]. Only
//! startup (configuration, login) fails with [`StartupError`].

pub mod aggregator;
pub mod config;
pub mod constants;
pub mod cycle;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod metric;
pub mod metrics;
pub mod platforms;
pub mod provider;
pub mod publisher;
pub mod types;

// Re-export commonly used types
pub use cycle::RefreshCycle;
pub use error::{FetchError, PublishError, StartupError};
pub use fetcher::{FetchSettings, MetricFetcher};
pub use metric::{Extractor, MetricSpec};
pub use metrics::FetchMetrics;
pub use platforms::DiscordClient;
pub use provider::MetricProvider;
pub use publisher::{ChannelPublisher, ChatPlatform, PublishStatus};
pub use types::{MetricResult, RefreshOutcome, TargetChannel, TargetRole, TargetStatus, Unit};
