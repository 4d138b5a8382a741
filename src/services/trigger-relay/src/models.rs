//! Data models for store triggers, per-store app settings and relayed payloads

use chrono::{DateTime, Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;

/// Default abandoned-cart delay in minutes
pub const DEFAULT_CART_DELAY_MINUTES: f64 = 12.0;

/// Numeric store (tenant) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StoreId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(StoreId)
    }
}

/// Resource a trigger refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Orders,
    Carts,
    Other(String),
}

impl ResourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Orders => "orders",
            ResourceKind::Carts => "carts",
            ResourceKind::Other(name) => name,
        }
    }

    /// Key used for the resource in relayed payloads ("orders" -> "order")
    pub fn singular(&self) -> &str {
        let name = self.as_str();
        name.strip_suffix('s').unwrap_or(name)
    }

    /// Bounded label for metrics; unknown resource names collapse to "other"
    pub fn metric_label(&self) -> &'static str {
        match self {
            ResourceKind::Orders => "orders",
            ResourceKind::Carts => "carts",
            ResourceKind::Other(_) => "other",
        }
    }

    /// Only orders and carts are enriched and relayed
    pub fn is_relayable(&self) -> bool {
        matches!(self, ResourceKind::Orders | ResourceKind::Carts)
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "orders" => ResourceKind::Orders,
            "carts" => ResourceKind::Carts,
            _ => ResourceKind::Other(value),
        }
    }
}

impl From<ResourceKind> for String {
    fn from(value: ResourceKind) -> Self {
        match value {
            ResourceKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action that fired the trigger. Only deletes change how a trigger is
/// handled; every other action name is carried through as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerAction {
    Delete,
    Other(String),
}

impl TriggerAction {
    pub fn as_str(&self) -> &str {
        match self {
            TriggerAction::Delete => "delete",
            TriggerAction::Other(name) => name,
        }
    }
}

impl From<String> for TriggerAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "delete" => TriggerAction::Delete,
            _ => TriggerAction::Other(value),
        }
    }
}

impl From<TriggerAction> for String {
    fn from(value: TriggerAction) -> Self {
        match value {
            TriggerAction::Delete => "delete".to_string(),
            TriggerAction::Other(name) => name,
        }
    }
}

/// Trigger notification sent by the store platform.
///
/// Attributes the relay does not inspect are kept in `extra` so the trigger is
/// forwarded as it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub resource: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TriggerAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<String>,
    /// Changed field names, sent for order changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trigger {
    pub fn is_delete(&self) -> bool {
        matches!(self.action, Some(TriggerAction::Delete))
    }

    /// Identifier of the affected document. Carts fall back to `inserted_id`.
    pub fn target_id(&self) -> Option<&str> {
        fn non_empty(id: &Option<String>) -> Option<&str> {
            id.as_deref().filter(|id| !id.is_empty())
        }

        non_empty(&self.resource_id).or_else(|| match self.resource {
            ResourceKind::Carts => non_empty(&self.inserted_id),
            _ => None,
        })
    }

    pub fn changed_fields(&self) -> &[String] {
        self.fields.as_deref().unwrap_or_default()
    }

    pub fn changed(&self, field: &str) -> bool {
        self.changed_fields().iter().any(|f| f == field)
    }
}

/// Per-store settings read from the application data.
///
/// Merchants edit these values by hand, so a field holding `null` or the
/// wrong type falls back to its default instead of rejecting the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppData {
    /// Resource names whose triggers are answered with SKIP
    #[serde(default, deserialize_with = "string_list_or_empty")]
    pub ignore_triggers: Vec<String>,
    /// Merchant webhook receiving relayed payloads
    #[serde(default, deserialize_with = "string_or_none")]
    pub ni_webhook_uri: Option<String>,
    /// Abandoned-cart delay in minutes
    #[serde(default = "default_cart_delay", deserialize_with = "minutes_or_default")]
    pub cart_delay: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_cart_delay() -> f64 {
    DEFAULT_CART_DELAY_MINUTES
}

fn string_list_or_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        _ => None,
    })
}

fn minutes_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_f64()
        .filter(|minutes| minutes.is_finite())
        .unwrap_or(DEFAULT_CART_DELAY_MINUTES))
}

impl Default for AppData {
    fn default() -> Self {
        Self {
            ignore_triggers: Vec::new(),
            ni_webhook_uri: None,
            cart_delay: DEFAULT_CART_DELAY_MINUTES,
            extra: Map::new(),
        }
    }
}

impl AppData {
    pub fn ignores(&self, resource: &ResourceKind) -> bool {
        self.ignore_triggers
            .iter()
            .any(|name| name == resource.as_str())
    }

    /// Relay destination, if one is configured
    pub fn relay_url(&self) -> Option<&str> {
        self.ni_webhook_uri
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Minimum cart age before a cart trigger may be relayed
    pub fn cart_delay_window(&self) -> Duration {
        let millis = (self.cart_delay * 60_000.0).max(0.0);
        Duration::milliseconds(millis as i64)
    }
}

/// Order or cart document fetched from the store API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteResource(Map<String, Value>);

impl RemoteResource {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_available(&self) -> bool {
        truthy(self.0.get("available"))
    }

    pub fn is_completed(&self) -> bool {
        truthy(self.0.get("completed"))
    }

    /// Creation timestamp, `None` when missing or not RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.0
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// First customer id linked to a cart
    pub fn first_customer_id(&self) -> Option<&str> {
        self.0
            .get("customers")
            .and_then(Value::as_array)
            .and_then(|customers| customers.first())
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    pub fn has_transactions(&self) -> bool {
        self.0
            .get("transactions")
            .and_then(Value::as_array)
            .is_some_and(|transactions| !transactions.is_empty())
    }

    pub fn financial_status(&self) -> Option<&Value> {
        self.0.get("financial_status")
    }

    /// Replace the financial status with a fresh `{ "current": "voided" }`
    pub fn void_financial_status(&mut self) {
        self.0
            .insert("financial_status".to_string(), json!({ "current": "voided" }));
    }
}

impl TryFrom<Value> for RemoteResource {
    type Error = crate::error::StoreApiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(crate::error::StoreApiError::Parse(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }
}

/// Body POSTed to the merchant webhook:
/// `{ storeId, trigger, <order|cart>, customer? }`
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPayload {
    pub store_id: StoreId,
    pub trigger: Trigger,
    pub resource: RemoteResource,
    pub customer: Option<Value>,
}

impl OutboundPayload {
    pub fn resource_key(&self) -> &str {
        self.trigger.resource.singular()
    }
}

impl Serialize for OutboundPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.customer.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("storeId", &self.store_id)?;
        map.serialize_entry("trigger", &self.trigger)?;
        map.serialize_entry(self.resource_key(), &self.resource)?;
        if let Some(customer) = &self.customer {
            map.serialize_entry("customer", customer)?;
        }
        map.end()
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
