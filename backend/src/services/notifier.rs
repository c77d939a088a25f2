//! Customer notifications. Fire-and-forget: delivery failures are logged and
//! never block or fail the transactional path that triggered them.

use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::Proposal;

pub trait Notifier: Send + Sync {
    fn proposal_created(&self, proposal: &Proposal);
    fn booking_confirmed(&self, request_id: Uuid, booking_id: Uuid);
}

/// Log-only delivery, used when no webhook is configured and in tests.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn proposal_created(&self, proposal: &Proposal) {
        info!(
            "📨 proposal {} for request {}: {} cents, expires {}",
            proposal.id, proposal.request_id, proposal.price_cents, proposal.expires_at
        );
    }

    fn booking_confirmed(&self, request_id: Uuid, booking_id: Uuid) {
        info!(
            "📨 booking {} confirmed for request {}",
            booking_id, request_id
        );
    }
}

/// Posts events to a downstream SMS/e-mail dispatcher. Each notification is
/// spawned onto its own task so the caller never waits on delivery.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    fn dispatch(&self, payload: serde_json::Value) {
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&payload).send().await {
                error!("notification webhook failed: {}", e);
            }
        });
    }
}

impl Notifier for WebhookNotifier {
    fn proposal_created(&self, proposal: &Proposal) {
        self.dispatch(json!({
            "event": "proposal_created",
            "request_id": proposal.request_id,
            "proposal_id": proposal.id,
            "price_cents": proposal.price_cents,
            "pickup_time": proposal.pickup_time,
            "return_pickup_time": proposal.return_pickup_time,
            "expires_at": proposal.expires_at,
        }));
    }

    fn booking_confirmed(&self, request_id: Uuid, booking_id: Uuid) {
        self.dispatch(json!({
            "event": "booking_confirmed",
            "request_id": request_id,
            "booking_id": booking_id,
        }));
    }
}
