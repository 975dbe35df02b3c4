//! `solcodec stream`: run a stream connection and print decoded output as JSON lines.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use solcodec_core::schema::SchemaRegistry;
use solcodec_observability::SolCodecMetrics;
use solcodec_registry::MemoryRegistry;
use solcodec_solana::SolanaDecoder;
use solcodec_stream::{
    AccountStream, FrameDecoder, GeyserTransport, GrpcTransport, StreamConfig, StreamConnection, TransactionStream,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::Kind;

pub async fn run(config_path: &Path, kind: Kind, instructions: &[String]) -> Result<()> {
    let config = StreamConfig::from_file(config_path)?;

    let registry = MemoryRegistry::new();
    if let Some(dir) = &config.idl_dir {
        let loaded = registry
            .load_directory(dir)
            .with_context(|| format!("load IDLs from '{}'", dir.display()))?;
        info!(count = loaded, programs = ?registry.programs(), "IDLs loaded");
    }
    let decoder = SolanaDecoder::new(Arc::new(registry)).with_default_programs(config.default_programs);
    let transport: Arc<dyn GeyserTransport> = Arc::new(GrpcTransport::from_config(&config)?);
    let metrics = SolCodecMetrics::global();

    match kind {
        Kind::Transactions => {
            let conn = TransactionStream::transactions(transport, decoder, &config);
            for name in instructions {
                let name_out = name.clone();
                let stored = conn.on_detect_instruction(name, move |ix, tx| {
                    let line = serde_json::json!({
                        "detected": name_out,
                        "signature": tx.signature(),
                        "slot": tx.slot,
                        "instruction": ix,
                    });
                    println!("{line}");
                });
                if !stored {
                    bail!("no IDL in '{}' declares instruction '{name}'", idl_dir_label(&config));
                }
            }
            let m = metrics.clone();
            conn.on_data(move |tx| {
                m.record_frame("transactions");
                m.record_transaction();
                print_line(tx);
            });
            drive(conn, config.endpoint.clone(), metrics, "transactions").await
        }
        Kind::Accounts => {
            let conn = AccountStream::accounts(transport, decoder, &config);
            let m = metrics.clone();
            conn.on_data(move |acc| {
                m.record_frame("accounts");
                m.record_account(&acc.parsed.type_name);
                print_line(acc);
            });
            drive(conn, config.endpoint.clone(), metrics, "accounts").await
        }
    }
}

fn idl_dir_label(config: &StreamConfig) -> String {
    config
        .idl_dir
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |d| d.display().to_string())
}

fn print_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to serialize decoded output"),
    }
}

/// Run until Ctrl-C, then stop and wait for the loop to exit.
async fn drive<D: FrameDecoder>(
    conn: StreamConnection<D>,
    endpoint: String,
    metrics: SolCodecMetrics,
    kind: &'static str,
) -> Result<()> {
    conn.on_error(move |e| {
        if e.is_channel_error() {
            metrics.record_reconnect(&endpoint);
        } else {
            metrics.record_error(kind);
        }
        warn!(error = %e, "stream error");
    });
    conn.on_end(|| info!("server closed the stream"));

    let runner = tokio::spawn({
        let conn = conn.clone();
        async move { conn.start().await }
    });

    tokio::signal::ctrl_c().await.context("listen for Ctrl-C")?;
    info!("Ctrl-C received, stopping");
    conn.stop();
    runner.await.context("stream task panicked")??;

    let snapshot = conn.metrics();
    eprintln!(
        "frames={} decoded={} decode_errors={} reconnections={}",
        snapshot.frames_received, snapshot.decoded, snapshot.decode_errors, snapshot.reconnections
    );
    Ok(())
}
