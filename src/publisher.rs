//! Channel publishing
//!
//! [`ChatPlatform`] is the seam to the messaging platform; [`ChannelPublisher`]
//! applies a label to one channel and turns every platform error into a
//! [`PublishStatus`] so that one broken target never affects its siblings.

use crate::{constants::MAX_CHANNEL_NAME_CHARS, error::PublishError};
use async_trait::async_trait;
use std::sync::Arc;

/// A resolved channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Trait for messaging platforms whose channels can be renamed
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Looks up a channel by identifier
    async fn resolve_channel(&self, id: &str) -> Result<Channel, PublishError>;

    /// Renames a channel, returning the channel as stored by the platform
    async fn rename_channel(&self, id: &str, name: &str) -> Result<Channel, PublishError>;

    /// Returns the name of this platform
    fn platform_name(&self) -> &'static str;
}

/// Result of one publish call
#[derive(Debug, Clone, PartialEq)]
pub enum PublishStatus {
    /// Channel renamed to the label
    Renamed,
    /// Channel already had the label; no rename issued
    Unchanged,
    /// Label not applied
    Failed(PublishError),
}

/// Publishes labels as channel names
#[derive(Clone)]
pub struct ChannelPublisher {
    platform: Arc<dyn ChatPlatform>,
}

impl ChannelPublisher {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    /// Returns the name of the underlying platform
    pub fn platform_name(&self) -> &'static str {
        self.platform.platform_name()
    }

    /// Applies `label` as the name of channel `target_id`
    ///
    /// Never retries. Publishing a label the channel already carries is a
    /// no-op reported as [`PublishStatus::Unchanged`].
    pub async fn publish(&self, target_id: &str, label: &str) -> PublishStatus {
        match self.try_publish(target_id, label).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    platform = self.platform_name(),
                    channel_id = target_id,
                    label,
                    error = %e,
                    "Failed to publish label"
                );
                PublishStatus::Failed(e)
            }
        }
    }

    async fn try_publish(&self, target_id: &str, label: &str) -> Result<PublishStatus, PublishError> {
        validate_label(label)?;

        let channel = self.platform.resolve_channel(target_id).await?;
        if channel.name == label {
            tracing::debug!(channel_id = target_id, label, "Channel already up to date");
            return Ok(PublishStatus::Unchanged);
        }

        let updated = self.platform.rename_channel(target_id, label).await?;
        tracing::info!(
            channel_id = target_id,
            old_name = %channel.name,
            new_name = %updated.name,
            "Channel name updated"
        );
        Ok(PublishStatus::Renamed)
    }
}

/// Rejects names the platform would refuse
fn validate_label(label: &str) -> Result<(), PublishError> {
    let chars = label.chars().count();
    if label.trim().is_empty() || chars > MAX_CHANNEL_NAME_CHARS {
        return Err(PublishError::InvalidName(format!(
            "name must be 1-{} characters, got {}",
            MAX_CHANNEL_NAME_CHARS, chars
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::mock::MockPlatform;
    use super::*;

    fn publisher(platform: &Arc<MockPlatform>) -> ChannelPublisher {
        ChannelPublisher::new(platform.clone())
    }

    #[tokio::test]
    async fn test_publish_renames_channel() {
        let platform = Arc::new(MockPlatform::new());
        platform.add_channel("100", "old");

        let status = publisher(&platform).publish("100", "NFT Floor: 1234 KAS").await;

        assert_eq!(status, PublishStatus::Renamed);
        assert_eq!(platform.name_of("100").as_deref(), Some("NFT Floor: 1234 KAS"));
    }

    #[tokio::test]
    async fn test_publish_same_label_twice_renames_once() {
        let platform = Arc::new(MockPlatform::new());
        platform.add_channel("100", "old");
        let publisher = publisher(&platform);

        assert_eq!(publisher.publish("100", "MCAP: $1").await, PublishStatus::Renamed);
        assert_eq!(publisher.publish("100", "MCAP: $1").await, PublishStatus::Unchanged);
        assert_eq!(platform.renames().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_failure_is_not_retried() {
        let platform = Arc::new(MockPlatform::new());
        platform.fail_resolve("100", PublishError::Unauthorized("100".into()));

        let status = publisher(&platform).publish("100", "label").await;

        assert_eq!(status, PublishStatus::Failed(PublishError::Unauthorized("100".into())));
        assert_eq!(platform.resolves().len(), 1);
        assert!(platform.renames().is_empty());
    }

    #[tokio::test]
    async fn test_rename_rejection_reported() {
        let platform = Arc::new(MockPlatform::new());
        platform.add_channel("100", "old");
        platform.fail_rename(
            "100",
            PublishError::RateLimited {
                retry_after_secs: Some(300.0),
            },
        );

        let status = publisher(&platform).publish("100", "label").await;

        assert!(matches!(status, PublishStatus::Failed(PublishError::RateLimited { .. })));
        assert_eq!(platform.name_of("100").as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_overlong_label_rejected_locally() {
        let platform = Arc::new(MockPlatform::new());
        platform.add_channel("100", "old");

        let label = "x".repeat(MAX_CHANNEL_NAME_CHARS + 1);
        let status = publisher(&platform).publish("100", &label).await;

        assert!(matches!(status, PublishStatus::Failed(PublishError::InvalidName(_))));
        assert!(platform.resolves().is_empty());
    }

    #[test]
    fn test_validate_label_bounds() {
        assert!(validate_label("a").is_ok());
        assert!(validate_label(&"a".repeat(MAX_CHANNEL_NAME_CHARS)).is_ok());
        assert!(validate_label("   ").is_err());
        assert!(validate_label("").is_err());
    }
}
