//! SolCodec metrics definitions.
//!
//! Instruments are created from whatever `Meter` the application hands in;
//! with no provider installed they are no-ops.

use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Central metrics handle for SolCodec.
#[derive(Clone)]
pub struct SolCodecMetrics {
    pub frames_received: Counter<u64>,
    pub transactions_decoded: Counter<u64>,
    pub accounts_decoded: Counter<u64>,
    pub decode_errors: Counter<u64>,
    pub reconnections: Counter<u64>,
    pub decode_latency_ms: Histogram<f64>,
}

impl SolCodecMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            frames_received: meter
                .u64_counter("solcodec.frames_received")
                .with_description("Frames received from the stream channel")
                .init(),
            transactions_decoded: meter
                .u64_counter("solcodec.transactions_decoded")
                .with_description("Transactions run through the normalizer")
                .init(),
            accounts_decoded: meter
                .u64_counter("solcodec.accounts_decoded")
                .with_description("Account updates decoded against a registered layout")
                .init(),
            decode_errors: meter
                .u64_counter("solcodec.decode_errors")
                .with_description("Frames or accounts that failed to decode")
                .init(),
            reconnections: meter
                .u64_counter("solcodec.reconnections")
                .with_description("Stream reconnect attempts")
                .init(),
            decode_latency_ms: meter
                .f64_histogram("solcodec.decode_latency_ms")
                .with_description("Time to decode a single frame in milliseconds")
                .init(),
        }
    }

    /// Handle on the global meter provider.
    pub fn global() -> Self {
        Self::new(&opentelemetry::global::meter("solcodec"))
    }

    pub fn record_frame(&self, kind: &str) {
        self.frames_received.add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    pub fn record_transaction(&self) {
        self.transactions_decoded.add(1, &[]);
    }

    pub fn record_account(&self, type_name: &str) {
        self.accounts_decoded
            .add(1, &[KeyValue::new("type", type_name.to_string())]);
    }

    /// `stage` is where decoding failed, e.g. "frame" or "account".
    pub fn record_error(&self, stage: &str) {
        self.decode_errors
            .add(1, &[KeyValue::new("stage", stage.to_string())]);
    }

    pub fn record_reconnect(&self, endpoint: &str) {
        self.reconnections
            .add(1, &[KeyValue::new("endpoint", endpoint.to_string())]);
    }

    pub fn record_latency(&self, ms: f64, kind: &str) {
        self.decode_latency_ms
            .record(ms, &[KeyValue::new("kind", kind.to_string())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_meter_accepts_records() {
        let m = SolCodecMetrics::global();
        m.record_frame("transactions");
        m.record_transaction();
        m.record_account("BondingCurve");
        m.record_error("frame");
        m.record_reconnect("https://grpc.example.com");
        m.record_latency(0.25, "transactions");
    }
}
