//! Webhook notification dispatcher
//!
//! After a successful commit, delivers one completion event to every active
//! webhook target. The whole phase is best-effort: per-target failures are
//! warnings, and nothing here can turn a committed import into a failed one.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

/// Per-request delivery timeout; one unreachable target must not stall the
/// run beyond this.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Completion event posted to each active target.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionPayload {
    pub event: &'static str,
    pub source_identifier: String,
    pub processed_count: u64,
    pub status: &'static str,
}

impl CompletionPayload {
    pub fn import_completed(source_identifier: impl Into<String>, processed_count: u64) -> Self {
        Self {
            event: "import_completed",
            source_identifier: source_identifier.into(),
            processed_count,
            status: "success",
        }
    }
}

/// A registered listener, consumed read-only; only active targets receive
/// notifications.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookTarget {
    pub url: String,
}

/// Delivers completion events to registered webhook targets.
pub struct NotificationDispatcher {
    pool: PgPool,
    client: reqwest::Client,
}

impl NotificationDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            client: reqwest::Client::new(),
        }
    }

    /// Notify all active targets that an import completed.
    ///
    /// Invoked only after a successful commit. Any failure inside this phase,
    /// including fetching the target list, is logged and contained.
    pub async fn notify_completion(&self, payload: CompletionPayload) {
        let targets = match self.fetch_active_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                warn!(error = %e, "Failed to load webhook targets, skipping notification");
                return;
            },
        };

        if targets.is_empty() {
            info!("No active webhook targets, skipping notification");
            return;
        }

        deliver_to_all(&self.client, &targets, &payload).await;
    }

    async fn fetch_active_targets(&self) -> anyhow::Result<Vec<WebhookTarget>> {
        let targets = sqlx::query_as::<_, WebhookTarget>(
            "SELECT url FROM webhooks WHERE is_active = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(targets)
    }
}

/// Fan the payload out to every target concurrently.
///
/// Each delivery is bounded by [`DELIVERY_TIMEOUT`], never retried, and a
/// failure to one target does not block or abort delivery to the others. All
/// attempts complete before this returns.
pub async fn deliver_to_all(
    client: &reqwest::Client,
    targets: &[WebhookTarget],
    payload: &CompletionPayload,
) {
    let deliveries = targets
        .iter()
        .map(|target| deliver_one(client, target, payload));

    let results = join_all(deliveries).await;

    let delivered = results.iter().filter(|ok| **ok).count();
    info!(
        delivered,
        total = targets.len(),
        event = payload.event,
        "Webhook notification fan-out finished"
    );
}

async fn deliver_one(
    client: &reqwest::Client,
    target: &WebhookTarget,
    payload: &CompletionPayload,
) -> bool {
    let result = client
        .post(&target.url)
        .timeout(DELIVERY_TIMEOUT)
        .json(payload)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            warn!(
                url = %target.url,
                status = %response.status(),
                "Webhook target rejected completion event"
            );
            false
        },
        Err(e) => {
            warn!(url = %target.url, error = %e, "Webhook delivery failed");
            false
        },
    }
}
