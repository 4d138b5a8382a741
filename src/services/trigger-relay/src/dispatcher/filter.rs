//! First dispatch stage: decide whether a trigger is skipped, passed through or
//! eligible for enrichment and relay.

use crate::models::{AppData, Trigger};

/// Why a trigger is acknowledged without any remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// Not an order or cart, or a delete action
    NotRelayable,
    /// No usable document id on the trigger
    MissingResourceId,
    /// The store has no relay URL configured
    NoRelayUrl,
}

impl PassThroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassThroughReason::NotRelayable => "not_relayable",
            PassThroughReason::MissingResourceId => "missing_resource_id",
            PassThroughReason::NoRelayUrl => "no_relay_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Resource is listed in the store's `ignore_triggers`
    Skip,
    PassThrough(PassThroughReason),
    /// Fetch `resource_id` and relay to `url`
    Eligible { resource_id: String, url: String },
}

pub fn filter(trigger: &Trigger, app_data: &AppData) -> FilterDecision {
    if app_data.ignores(&trigger.resource) {
        return FilterDecision::Skip;
    }

    if !trigger.resource.is_relayable() || trigger.is_delete() {
        return FilterDecision::PassThrough(PassThroughReason::NotRelayable);
    }

    let Some(resource_id) = trigger.target_id() else {
        return FilterDecision::PassThrough(PassThroughReason::MissingResourceId);
    };

    match app_data.relay_url() {
        Some(url) => FilterDecision::Eligible {
            resource_id: resource_id.to_string(),
            url: url.to_string(),
        },
        None => FilterDecision::PassThrough(PassThroughReason::NoRelayUrl),
    }
}
