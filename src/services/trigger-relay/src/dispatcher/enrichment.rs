//! Enrichment rules applied to a fetched order or cart before relaying.
//!
//! Carts are held back until they are older than the store's cart delay; the
//! window is evaluated again on every trigger, nothing is scheduled. Orders are
//! only relayed for payment or fulfillment changes, except cancelled orders
//! without transactions, which are relayed with a voided financial status.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use crate::models::{AppData, RemoteResource, ResourceKind, Trigger};

const FINANCIAL_STATUS: &str = "financial_status";
const FULFILLMENT_STATUS: &str = "fulfillment_status";

/// Deliberate early exit, answered with a status code and no relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    /// Cart is unavailable or already completed
    CartNotActionable,
    /// Cart is younger than the abandoned-cart delay
    CartTooEarly,
    /// Order change touches neither payment nor fulfillment
    IrrelevantOrderChange,
}

impl ShortCircuit {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShortCircuit::CartNotActionable | ShortCircuit::IrrelevantOrderChange => {
                StatusCode::NO_CONTENT
            }
            ShortCircuit::CartTooEarly => StatusCode::NOT_IMPLEMENTED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShortCircuit::CartNotActionable => "cart_not_actionable",
            ShortCircuit::CartTooEarly => "cart_too_early",
            ShortCircuit::IrrelevantOrderChange => "irrelevant_order_change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    ShortCircuit(ShortCircuit),
    /// Relay, attaching this customer first when set
    Relay { customer_id: Option<String> },
}

/// Apply the rules for the trigger's resource, possibly rewriting `resource`
pub fn enrich(
    trigger: &Trigger,
    resource: &mut RemoteResource,
    app_data: &AppData,
    now: DateTime<Utc>,
) -> Enrichment {
    match trigger.resource {
        ResourceKind::Carts => evaluate_cart(resource, app_data, now),
        ResourceKind::Orders => evaluate_order(trigger, resource),
        ResourceKind::Other(_) => Enrichment::Relay { customer_id: None },
    }
}

pub fn evaluate_cart(cart: &RemoteResource, app_data: &AppData, now: DateTime<Utc>) -> Enrichment {
    if !cart.is_available() || cart.is_completed() {
        return Enrichment::ShortCircuit(ShortCircuit::CartNotActionable);
    }

    // Carts without a readable creation date are not held back
    if let Some(created_at) = cart.created_at() {
        if now - created_at < app_data.cart_delay_window() {
            return Enrichment::ShortCircuit(ShortCircuit::CartTooEarly);
        }
    }

    Enrichment::Relay {
        customer_id: cart.first_customer_id().map(str::to_string),
    }
}

pub fn evaluate_order(trigger: &Trigger, order: &mut RemoteResource) -> Enrichment {
    if order.status() == Some("cancelled") && !order.has_transactions() {
        order.void_financial_status();
        return Enrichment::Relay { customer_id: None };
    }

    if !trigger.changed(FINANCIAL_STATUS) && !trigger.changed(FULFILLMENT_STATUS) {
        return Enrichment::ShortCircuit(ShortCircuit::IrrelevantOrderChange);
    }

    Enrichment::Relay { customer_id: None }
}
