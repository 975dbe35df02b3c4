//! `solcodec decode-account` and `solcodec decode-tx`.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solcodec_core::{transaction::RawTransaction, types::NormalizedValue};
use solcodec_registry::MemoryRegistry;
use solcodec_solana::{AccountDecoder, SolanaDecoder};
use std::path::Path;
use std::sync::Arc;

pub(crate) fn load_registry(idl_dir: &Path) -> Result<Arc<MemoryRegistry>> {
    let registry = MemoryRegistry::new();
    let loaded = registry
        .load_directory(idl_dir)
        .with_context(|| format!("load IDLs from '{}'", idl_dir.display()))?;
    if loaded == 0 {
        bail!("no IDLs found in '{}'", idl_dir.display());
    }
    Ok(Arc::new(registry))
}

pub fn account(idl_dir: &Path, owner: &str, data_b64: &str, as_json: bool) -> Result<()> {
    let registry = load_registry(idl_dir)?;
    let data = STANDARD.decode(data_b64.trim()).context("invalid base64 account data")?;

    let parsed = AccountDecoder::new(registry).decode_data(owner, &data)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
    } else {
        println!("Type:    {}", parsed.type_name);
        println!("Fields:");
        match &parsed.fields {
            NormalizedValue::Struct(fields) => {
                for (name, value) in fields {
                    println!("  {name}: {value}");
                }
            }
            other => println!("  {other}"),
        }
    }
    Ok(())
}

pub fn transaction(idl_dir: &Path, file: &Path, default_programs: bool) -> Result<()> {
    let registry = load_registry(idl_dir)?;
    let content =
        std::fs::read_to_string(file).with_context(|| format!("read transaction file '{}'", file.display()))?;
    let raw: RawTransaction = serde_json::from_str(&content).context("parse raw transaction JSON")?;

    let decoded = SolanaDecoder::new(registry)
        .with_default_programs(default_programs)
        .decode_transaction(&raw);
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}
