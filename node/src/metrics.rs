//! # Prometheus Metrics
//!
//! Counters for a devnet run. Registered in a dedicated
//! [`prometheus::Registry`] under the `tinybank` namespace and rendered in
//! the text exposition format once the run ends.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tinybank_contracts::Receipt;

/// Holds all Prometheus metric handles for a run.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Transactions executed, successful or not.
    pub transactions_total: IntCounter,
    /// Transactions that reverted.
    pub transactions_reverted_total: IntCounter,
    /// Contract events emitted by successful transactions.
    pub events_emitted_total: IntCounter,
    /// Height of the latest mined block.
    pub block_height: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tinybank".into()), None)?;

        let transactions_total =
            IntCounter::new("transactions_total", "Total number of transactions executed")?;
        registry.register(Box::new(transactions_total.clone()))?;

        let transactions_reverted_total = IntCounter::new(
            "transactions_reverted_total",
            "Total number of transactions that reverted",
        )?;
        registry.register(Box::new(transactions_reverted_total.clone()))?;

        let events_emitted_total = IntCounter::new(
            "events_emitted_total",
            "Total number of contract events emitted",
        )?;
        registry.register(Box::new(events_emitted_total.clone()))?;

        let block_height = IntGauge::new("block_height", "Height of the latest mined block")?;
        registry.register(Box::new(block_height.clone()))?;

        Ok(Self {
            registry,
            transactions_total,
            transactions_reverted_total,
            events_emitted_total,
            block_height,
        })
    }

    /// Accounts for one executed transaction.
    pub fn observe(&self, receipt: &Receipt, height: u64) {
        self.transactions_total.inc();
        if !receipt.is_success() {
            self.transactions_reverted_total.inc();
        }
        self.events_emitted_total.inc_by(receipt.events.len() as u64);
        self.block_height.set(i64::try_from(height).unwrap_or(i64::MAX));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
