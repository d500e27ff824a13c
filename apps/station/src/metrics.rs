use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{global, KeyValue};
use std::sync::Arc;

#[derive(Clone)]
pub struct StationTelemetry {
    inner: Arc<Inner>,
}

struct Inner {
    preparations_total: Counter<u64>,
    preparation_errors_total: Counter<u64>,
    broadcasts_total: Counter<u64>,
    broadcast_errors_total: Counter<u64>,
    simulation_fallbacks_total: Counter<u64>,
    activations_total: Counter<u64>,
    delegations_total: Counter<u64>,

    preparation_ms: Histogram<u64>,
    broadcast_ms: Histogram<u64>,
    verify_ms: Histogram<u64>,
}

impl StationTelemetry {
    pub fn new() -> Self {
        let meter = global::meter("station");

        let preparations_total = meter
            .u64_counter("station.preparations_total")
            .with_description("Total prepare_for_usdt runs")
            .build();
        let preparation_errors_total = meter
            .u64_counter("station.preparation_errors_total")
            .with_description("Total preparations that ended unsuccessfully")
            .build();
        let broadcasts_total = meter
            .u64_counter("station.broadcasts_total")
            .with_description("Total transactions broadcast from the pool wallet")
            .build();
        let broadcast_errors_total = meter
            .u64_counter("station.broadcast_errors_total")
            .with_description("Total broadcasts the node rejected or that failed in transit")
            .build();
        let simulation_fallbacks_total = meter
            .u64_counter("station.simulation_fallbacks_total")
            .with_description("Total simulations replaced by category estimates")
            .build();
        let activations_total = meter
            .u64_counter("station.activations_total")
            .with_description("Total account activations attempted")
            .build();
        let delegations_total = meter
            .u64_counter("station.delegations_total")
            .with_description("Total per-resource delegations attempted")
            .build();

        let preparation_ms = meter
            .u64_histogram("station.preparation_ms")
            .with_description("End-to-end preparation time")
            .with_unit("ms")
            .build();
        let broadcast_ms = meter
            .u64_histogram("station.broadcast_ms")
            .with_description("Build+sign+broadcast critical section time")
            .with_unit("ms")
            .build();
        let verify_ms = meter
            .u64_histogram("station.verify_ms")
            .with_description("Post-delegation verification time")
            .with_unit("ms")
            .build();

        Self {
            inner: Arc::new(Inner {
                preparations_total,
                preparation_errors_total,
                broadcasts_total,
                broadcast_errors_total,
                simulation_fallbacks_total,
                activations_total,
                delegations_total,
                preparation_ms,
                broadcast_ms,
                verify_ms,
            }),
        }
    }

    pub fn preparation(&self, strategy: &'static str, success: bool, ms: u64) {
        let attrs = [
            KeyValue::new("strategy", strategy),
            KeyValue::new("success", success),
        ];
        self.inner.preparations_total.add(1, &attrs);
        if !success {
            self.inner.preparation_errors_total.add(1, &attrs);
        }
        self.inner.preparation_ms.record(ms, &attrs);
    }

    pub fn broadcast(&self, op: &'static str, ok: bool, ms: u64) {
        let attrs = [KeyValue::new("op", op), KeyValue::new("ok", ok)];
        self.inner.broadcasts_total.add(1, &attrs);
        if !ok {
            self.inner.broadcast_errors_total.add(1, &attrs);
        }
        self.inner.broadcast_ms.record(ms, &attrs);
    }

    pub fn simulation_fallback(&self) {
        self.inner.simulation_fallbacks_total.add(1, &[]);
    }

    pub fn activation(&self, ok: bool) {
        self.inner
            .activations_total
            .add(1, &[KeyValue::new("ok", ok)]);
    }

    pub fn delegation(&self, resource: &'static str, ok: bool) {
        self.inner.delegations_total.add(
            1,
            &[KeyValue::new("resource", resource), KeyValue::new("ok", ok)],
        );
    }

    pub fn verify(&self, resource: &'static str, observed: bool, ms: u64) {
        self.inner.verify_ms.record(
            ms,
            &[
                KeyValue::new("resource", resource),
                KeyValue::new("observed", observed),
            ],
        );
    }
}

impl Default for StationTelemetry {
    fn default() -> Self {
        Self::new()
    }
}
