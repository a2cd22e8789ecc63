//! Out-of-band push wake for drivers without an open channel. Only the
//! contract lives here; actual delivery to mobile OSes is a collaborator
//! behind the trait.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifySummary {
    pub success_count: usize,
    pub failure_count: usize,
}

#[async_trait]
pub trait PushNotifier: Send + Sync {
    /// Deliver a silent location-request wake to every token. Best-effort;
    /// the summary reports per-token outcomes, never an error.
    async fn notify_all(&self, tokens: &[String]) -> NotifySummary;
}

/// Stands in when no push provider is configured: logs the request and
/// reports nothing sent, mirroring a disabled provider.
pub struct LogNotifier;

#[async_trait]
impl PushNotifier for LogNotifier {
    async fn notify_all(&self, tokens: &[String]) -> NotifySummary {
        info!(
            tokens = tokens.len(),
            "push wake requested; no provider configured"
        );
        NotifySummary::default()
    }
}
