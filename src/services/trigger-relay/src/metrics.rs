//! Prometheus metrics for the relay
//!
//! Counters only: one per dispatch outcome and one per relay attempt result.

use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::dispatcher::{DispatchOutcome, RelayOutcome};
use crate::error::ServiceResult;

#[derive(Clone)]
pub struct RelayMetrics {
    registry: Arc<Registry>,
    dispatch_total: IntCounterVec,
    relay_total: IntCounterVec,
}

impl RelayMetrics {
    pub fn new(namespace: &str) -> ServiceResult<Self> {
        let registry = Registry::new();

        let dispatch_total = IntCounterVec::new(
            Opts::new("dispatch_total", "Triggers dispatched, by outcome").namespace(namespace),
            &["outcome", "resource"],
        )?;

        let relay_total = IntCounterVec::new(
            Opts::new("relay_total", "Relay POST attempts, by result").namespace(namespace),
            &["result"],
        )?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(relay_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            dispatch_total,
            relay_total,
        })
    }

    /// `resource` must come from a bounded set, see `ResourceKind::metric_label`
    pub fn record(&self, resource: &str, outcome: &DispatchOutcome) {
        self.dispatch_total
            .with_label_values(&[outcome.label(), resource])
            .inc();

        if let DispatchOutcome::Relayed(relay) = outcome {
            let result = match relay {
                RelayOutcome::Delivered { .. } => "delivered",
                RelayOutcome::Failed { .. } => "failed",
            };
            self.relay_total.with_label_values(&[result]).inc();
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> ServiceResult<String> {
        let encoder = TextEncoder::new();
        Ok(encoder.encode_to_string(&self.registry.gather())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ShortCircuit;
    use crate::models::ResourceKind;

    #[test]
    fn test_record_and_export() {
        let metrics = RelayMetrics::new("trigger_relay_test").unwrap();

        metrics.record("carts", &DispatchOutcome::ShortCircuited(ShortCircuit::CartTooEarly));
        metrics.record(
            "orders",
            &DispatchOutcome::Relayed(RelayOutcome::Failed {
                reason: "timeout".to_string(),
            }),
        );

        let text = metrics.export().unwrap();
        assert!(text.contains(
            "trigger_relay_test_dispatch_total{outcome=\"cart_too_early\",resource=\"carts\"} 1"
        ));
        assert!(text.contains("trigger_relay_test_relay_total{result=\"failed\"} 1"));
    }

    #[test]
    fn test_unknown_resources_share_one_series() {
        let metrics = RelayMetrics::new("trigger_relay_test").unwrap();

        for i in 0..50 {
            let resource = ResourceKind::from(format!("junk{}", i));
            metrics.record(resource.metric_label(), &DispatchOutcome::Skipped);
        }

        let text = metrics.export().unwrap();
        let series: Vec<&str> = text
            .lines()
            .filter(|line| line.starts_with("trigger_relay_test_dispatch_total{"))
            .collect();
        assert_eq!(
            series,
            vec!["trigger_relay_test_dispatch_total{outcome=\"skipped\",resource=\"other\"} 50"]
        );
    }
}
