//! Final dispatch stage: POST the payload and absorb any failure

use tracing::{error, info};

use crate::clients::RelayClient;
use crate::models::OutboundPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Remote webhook accepted the payload with this status
    Delivered { status: u16 },
    /// Transport or remote failure, logged only
    Failed { reason: String },
}

/// Send the payload to `url`. Never fails: the inbound trigger was already
/// handled, so delivery problems are only logged.
pub async fn relay(client: &dyn RelayClient, url: &str, payload: &OutboundPayload) -> RelayOutcome {
    info!(
        store_id = %payload.store_id,
        resource = %payload.trigger.resource,
        url = %url,
        "Sending {} notification",
        payload.trigger.resource
    );

    match client.post_json(url, payload).await {
        Ok(status) => {
            info!(url = %url, status, "Relay delivered");
            RelayOutcome::Delivered { status }
        }
        Err(e) => {
            error!(url = %url, error = %e, "Relay failed");
            RelayOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
