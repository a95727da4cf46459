pub mod discord;

use anyhow::Result;

pub use discord::DiscordNotifier;

/// Delivery channel for newly detected assets.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Announce one asset. Errors are reported to the caller, which logs them and
    /// moves on to the next asset.
    async fn send_asset(&self, url: &str) -> Result<()>;
}
