//! Trigger dispatch: config lookup, filter, enrichment and relay.
//!
//! Each call to [`TriggerDispatcher::dispatch`] is independent. Stages run in
//! order and every remote call is awaited before the next decision, so the
//! returned [`DispatchOutcome`] always describes exactly one branch.

pub mod enrichment;
pub mod filter;
pub mod relay;
pub mod response;

pub use enrichment::{Enrichment, ShortCircuit};
pub use filter::{FilterDecision, PassThroughReason};
pub use relay::RelayOutcome;
pub use response::{DispatchOutcome, Echo};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::clients::{AppDataProvider, RelayClient, ResourceFetcher};
use crate::error::StoreApiError;
use crate::models::{OutboundPayload, RemoteResource, StoreId, Trigger};

const CUSTOMERS: &str = "customers";

pub struct TriggerDispatcher {
    app_data: Arc<dyn AppDataProvider>,
    resources: Arc<dyn ResourceFetcher>,
    relay_client: Arc<dyn RelayClient>,
}

impl TriggerDispatcher {
    pub fn new(
        app_data: Arc<dyn AppDataProvider>,
        resources: Arc<dyn ResourceFetcher>,
        relay_client: Arc<dyn RelayClient>,
    ) -> Self {
        Self {
            app_data,
            resources,
            relay_client,
        }
    }

    pub async fn dispatch(&self, store_id: StoreId, trigger: Trigger) -> DispatchOutcome {
        self.dispatch_at(store_id, trigger, Utc::now()).await
    }

    /// Dispatch with an explicit clock reading for the cart delay window
    pub async fn dispatch_at(
        &self,
        store_id: StoreId,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            store_id = %store_id,
            resource = %trigger.resource,
            action = trigger.action.as_ref().map(|a| a.as_str()).unwrap_or("-"),
        );

        let outcome = self.run(store_id, trigger, now).instrument(span).await;
        debug!(store_id = %store_id, outcome = outcome.label(), "Dispatch finished");
        outcome
    }

    async fn run(&self, store_id: StoreId, trigger: Trigger, now: DateTime<Utc>) -> DispatchOutcome {
        let app_data = match self.app_data.fetch_app_data(store_id).await {
            Ok(app_data) => app_data,
            Err(e) => {
                warn!(error = %e, "App data lookup failed");
                return DispatchOutcome::ConfigFailed {
                    message: e.to_string(),
                };
            }
        };

        let (resource_id, url) = match filter::filter(&trigger, &app_data) {
            FilterDecision::Skip => {
                debug!("Trigger ignored by app configuration");
                return DispatchOutcome::Skipped;
            }
            FilterDecision::PassThrough(reason) => {
                debug!(reason = reason.as_str(), "Trigger passed through");
                return DispatchOutcome::PassedThrough(reason);
            }
            FilterDecision::Eligible { resource_id, url } => (resource_id, url),
        };

        info!("Trigger for Store #{} {} => {}", store_id, resource_id, url);

        let mut resource = match self
            .fetch(store_id, trigger.resource.as_str(), &resource_id)
            .await
            .and_then(RemoteResource::try_from)
        {
            Ok(resource) => resource,
            Err(e) => return lookup_failed(trigger.resource.as_str(), &resource_id, e),
        };

        let customer_id = match enrichment::enrich(&trigger, &mut resource, &app_data, now) {
            Enrichment::ShortCircuit(reason) => {
                debug!(reason = reason.as_str(), "Relay suppressed");
                return DispatchOutcome::ShortCircuited(reason);
            }
            Enrichment::Relay { customer_id } => customer_id,
        };

        let customer = match customer_id {
            Some(id) => match self.fetch(store_id, CUSTOMERS, &id).await {
                Ok(customer) => Some(customer),
                Err(e) => return lookup_failed(CUSTOMERS, &id, e),
            },
            None => None,
        };

        let payload = OutboundPayload {
            store_id,
            trigger,
            resource,
            customer,
        };

        DispatchOutcome::Relayed(relay::relay(self.relay_client.as_ref(), &url, &payload).await)
    }

    async fn fetch(
        &self,
        store_id: StoreId,
        resource: &str,
        id: &str,
    ) -> Result<serde_json::Value, StoreApiError> {
        self.resources.fetch_resource(store_id, resource, id).await
    }
}

fn lookup_failed(resource: &str, id: &str, e: StoreApiError) -> DispatchOutcome {
    error!(resource, id, error = %e, "Resource lookup failed, nothing relayed");
    DispatchOutcome::LookupFailed {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockAppDataProvider, MockRelayClient, MockResourceFetcher};
    use crate::error::RelayError;
    use crate::models::AppData;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const STORE: StoreId = StoreId(1011);
    const HOOK: &str = "https://hook.example.test/ni";

    fn app_data_provider(app_data: AppData) -> MockAppDataProvider {
        let mut provider = MockAppDataProvider::new();
        provider
            .expect_fetch_app_data()
            .returning(move |_| Ok(app_data.clone()));
        provider
    }

    fn relay_settings() -> AppData {
        AppData {
            ni_webhook_uri: Some(HOOK.to_string()),
            ..AppData::default()
        }
    }

    fn trigger(value: Value) -> Trigger {
        serde_json::from_value(value).unwrap()
    }

    fn untouched_fetcher() -> MockResourceFetcher {
        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch_resource().never();
        fetcher
    }

    fn untouched_relay() -> MockRelayClient {
        let mut relay = MockRelayClient::new();
        relay.expect_post_json().never();
        relay
    }

    fn build_dispatcher(
        provider: MockAppDataProvider,
        fetcher: MockResourceFetcher,
        relay: MockRelayClient,
    ) -> TriggerDispatcher {
        TriggerDispatcher::new(Arc::new(provider), Arc::new(fetcher), Arc::new(relay))
    }

    #[tokio::test]
    async fn test_ignored_resource_skips_without_remote_calls() {
        let settings = AppData {
            ignore_triggers: vec!["orders".to_string()],
            ..relay_settings()
        };
        let dispatcher = build_dispatcher(
            app_data_provider(settings),
            untouched_fetcher(),
            untouched_relay(),
        );

        let outcome = dispatcher
            .dispatch(
                STORE,
                trigger(json!({
                    "resource": "orders",
                    "action": "change",
                    "resource_id": "o1",
                    "fields": ["financial_status"]
                })),
            )
            .await;

        assert_eq!(outcome, DispatchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_non_relayable_triggers_make_no_remote_calls() {
        for raw in [
            json!({ "resource": "products", "action": "change", "resource_id": "p1" }),
            json!({ "resource": "orders", "action": "delete", "resource_id": "o1" }),
            json!({ "resource": "carts", "action": "delete", "resource_id": "k1" }),
        ] {
            let dispatcher = build_dispatcher(
                app_data_provider(relay_settings()),
                untouched_fetcher(),
                untouched_relay(),
            );
            let outcome = dispatcher.dispatch(STORE, trigger(raw)).await;
            assert_eq!(
                outcome,
                DispatchOutcome::PassedThrough(PassThroughReason::NotRelayable)
            );
        }
    }

    #[tokio::test]
    async fn test_config_failure_is_reported() {
        let mut provider = MockAppDataProvider::new();
        provider.expect_fetch_app_data().returning(|_| {
            Err(StoreApiError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        });
        let dispatcher = build_dispatcher(provider, untouched_fetcher(), untouched_relay());

        let outcome = dispatcher
            .dispatch(STORE, trigger(json!({ "resource": "orders", "resource_id": "o1" })))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::ConfigFailed {
                message: "Store API error (status 503): unavailable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_cart_is_not_relayed() {
        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch_resource()
            .withf(|_, resource, id| resource == "carts" && id == "k1")
            .times(1)
            .returning(|_, _, _| Ok(json!({ "available": false, "completed": false })));

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, untouched_relay());
        let outcome = dispatcher
            .dispatch(
                STORE,
                trigger(json!({ "resource": "carts", "action": "change", "resource_id": "k1" })),
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::ShortCircuited(ShortCircuit::CartNotActionable)
        );
    }

    #[tokio::test]
    async fn test_fresh_cart_is_too_early() {
        let now = Utc::now();
        let created_at = now.to_rfc3339();
        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch_resource().times(1).returning(move |_, _, _| {
            Ok(json!({
                "available": true,
                "completed": false,
                "created_at": created_at,
                "customers": ["c1"]
            }))
        });

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, untouched_relay());
        let outcome = dispatcher
            .dispatch_at(
                STORE,
                trigger(json!({ "resource": "carts", "action": "create", "inserted_id": "k1" })),
                now,
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::ShortCircuited(ShortCircuit::CartTooEarly)
        );
    }

    #[tokio::test]
    async fn test_abandoned_cart_relays_with_customer() {
        let now = Utc::now();
        let created_at = (now - Duration::minutes(13)).to_rfc3339();

        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch_resource()
            .withf(|_, resource, id| resource == "carts" && id == "k1")
            .times(1)
            .returning(move |_, _, _| {
                Ok(json!({
                    "_id": "k1",
                    "available": true,
                    "completed": false,
                    "created_at": created_at,
                    "customers": ["c1"]
                }))
            });
        fetcher
            .expect_fetch_resource()
            .withf(|_, resource, id| resource == "customers" && id == "c1")
            .times(1)
            .returning(|_, _, _| Ok(json!({ "_id": "c1", "main_email": "buyer@example.test" })));

        let mut relay = MockRelayClient::new();
        relay
            .expect_post_json()
            .withf(|url, payload| {
                let body = serde_json::to_value(payload).unwrap();
                url == HOOK
                    && body["storeId"] == json!(1011)
                    && body["cart"]["_id"] == json!("k1")
                    && body["customer"]["_id"] == json!("c1")
                    && body["trigger"]["resource"] == json!("carts")
            })
            .times(1)
            .returning(|_, _| Ok(200));

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, relay);
        let outcome = dispatcher
            .dispatch_at(
                STORE,
                trigger(json!({ "resource": "carts", "action": "change", "resource_id": "k1" })),
                now,
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Relayed(RelayOutcome::Delivered { status: 200 })
        );
    }

    #[tokio::test]
    async fn test_cancelled_order_relayed_as_voided() {
        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch_resource().times(1).returning(|_, _, _| {
            Ok(json!({
                "_id": "o1",
                "status": "cancelled",
                "transactions": [],
                "financial_status": { "current": "pending" }
            }))
        });

        let mut relay = MockRelayClient::new();
        relay
            .expect_post_json()
            .withf(|_, payload| {
                let body = serde_json::to_value(payload).unwrap();
                body["order"]["financial_status"] == json!({ "current": "voided" })
                    && body.get("customer").is_none()
            })
            .times(1)
            .returning(|_, _| Ok(204));

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, relay);
        let outcome = dispatcher
            .dispatch(
                STORE,
                trigger(json!({
                    "resource": "orders",
                    "action": "change",
                    "resource_id": "o1",
                    "fields": ["sku_change"]
                })),
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Relayed(RelayOutcome::Delivered { status: 204 })
        );
    }

    #[tokio::test]
    async fn test_irrelevant_order_change_is_not_relayed() {
        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch_resource()
            .times(1)
            .returning(|_, _, _| Ok(json!({ "_id": "o1", "status": "open" })));

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, untouched_relay());
        let outcome = dispatcher
            .dispatch(
                STORE,
                trigger(json!({
                    "resource": "orders",
                    "action": "change",
                    "resource_id": "o1",
                    "fields": ["sku_change"]
                })),
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::ShortCircuited(ShortCircuit::IrrelevantOrderChange)
        );
    }

    #[tokio::test]
    async fn test_relay_failure_is_absorbed() {
        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch_resource()
            .returning(|_, _, _| Ok(json!({ "_id": "o1", "status": "paid" })));

        let mut relay = MockRelayClient::new();
        relay
            .expect_post_json()
            .times(1)
            .returning(|_, _| Err(RelayError::Transport("connection refused".to_string())));

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, relay);
        let outcome = dispatcher
            .dispatch(
                STORE,
                trigger(json!({
                    "resource": "orders",
                    "action": "change",
                    "resource_id": "o1",
                    "fields": ["financial_status"]
                })),
            )
            .await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Relayed(RelayOutcome::Failed { .. })
        ));
        assert_eq!(outcome.status_code(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resource_lookup_failure_skips_relay() {
        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch_resource().times(1).returning(|_, _, _| {
            Err(StoreApiError::Api {
                status: 404,
                message: "not found".to_string(),
            })
        });

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, untouched_relay());
        let outcome = dispatcher
            .dispatch(
                STORE,
                trigger(json!({
                    "resource": "orders",
                    "action": "change",
                    "resource_id": "o1",
                    "fields": ["fulfillment_status"]
                })),
            )
            .await;

        assert!(matches!(outcome, DispatchOutcome::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn test_customer_lookup_failure_skips_relay() {
        let now = Utc::now();
        let created_at = (now - Duration::minutes(30)).to_rfc3339();

        let mut fetcher = MockResourceFetcher::new();
        fetcher
            .expect_fetch_resource()
            .withf(|_, resource, _| resource == "carts")
            .times(1)
            .returning(move |_, _, _| {
                Ok(json!({
                    "_id": "k1",
                    "available": true,
                    "completed": false,
                    "created_at": created_at,
                    "customers": ["c9"]
                }))
            });
        fetcher
            .expect_fetch_resource()
            .withf(|_, resource, id| resource == "customers" && id == "c9")
            .times(1)
            .returning(|_, _, _| {
                Err(StoreApiError::Api {
                    status: 404,
                    message: "customer not found".to_string(),
                })
            });

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, untouched_relay());
        let outcome = dispatcher
            .dispatch_at(
                STORE,
                trigger(json!({ "resource": "carts", "action": "change", "resource_id": "k1" })),
                now,
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::LookupFailed {
                reason: "Store API error (status 404): customer not found".to_string()
            }
        );
        assert_eq!(outcome.status_code(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_exactly_at_delay_is_relayed() {
        let now: DateTime<Utc> = "2026-10-17T10:12:00Z".parse().unwrap();

        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch_resource().times(1).returning(|_, _, _| {
            Ok(json!({
                "_id": "k1",
                "available": true,
                "completed": false,
                "created_at": "2026-10-17T10:00:00Z"
            }))
        });

        let mut relay = MockRelayClient::new();
        relay
            .expect_post_json()
            .withf(|url, payload| url == HOOK && payload.customer.is_none())
            .times(1)
            .returning(|_, _| Ok(200));

        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, relay);
        let outcome = dispatcher
            .dispatch_at(
                STORE,
                trigger(json!({ "resource": "carts", "action": "change", "resource_id": "k1" })),
                now,
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Relayed(RelayOutcome::Delivered { status: 200 })
        );

        // One second younger is still held back
        let mut fetcher = MockResourceFetcher::new();
        fetcher.expect_fetch_resource().times(1).returning(|_, _, _| {
            Ok(json!({
                "_id": "k1",
                "available": true,
                "completed": false,
                "created_at": "2026-10-17T10:00:01Z"
            }))
        });
        let dispatcher = build_dispatcher(app_data_provider(relay_settings()), fetcher, untouched_relay());
        let outcome = dispatcher
            .dispatch_at(
                STORE,
                trigger(json!({ "resource": "carts", "action": "change", "resource_id": "k1" })),
                now,
            )
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::ShortCircuited(ShortCircuit::CartTooEarly)
        );
    }
}
