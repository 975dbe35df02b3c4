//! `solcodec inspect-idl`: register an IDL and print what the registry made of it.

use anyhow::{anyhow, bail, Context, Result};
use solcodec_core::schema::{SchemaRegistry, TypeDef};
use solcodec_registry::{IdlParser, MemoryRegistry};
use std::path::Path;

pub fn run(file: &Path, address: Option<&str>, as_json: bool) -> Result<()> {
    let content = std::fs::read_to_string(file).with_context(|| format!("read IDL file '{}'", file.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&content).context("parse IDL JSON")?;

    let address = address
        .map(str::to_string)
        .or_else(|| IdlParser::declared_address(&doc))
        .ok_or_else(|| anyhow!("IDL declares no address; pass --address"))?;

    let registry = MemoryRegistry::new();
    registry.register_value(&address, doc)?;
    let Some(schema) = registry.get(&address) else {
        bail!("'{}' matches neither IDL dialect", file.display());
    };

    if as_json {
        let summary = serde_json::json!({
            "address": schema.program_address,
            "name": schema.name,
            "dialect": schema.dialect,
            "instructions": schema.instructions.iter().map(|ix| serde_json::json!({
                "name": ix.name,
                "discriminator": ix.discriminator,
                "accounts": ix.accounts.iter().map(|a| &a.name).collect::<Vec<_>>(),
                "args": ix.args.iter().map(|f| serde_json::json!({ "name": f.name, "type": f.layout.to_string() })).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
            "accounts": schema.accounts.iter().map(|a| &a.name).collect::<Vec<_>>(),
            "events": schema.events.iter().map(|e| &e.name).collect::<Vec<_>>(),
            "types": schema.type_definitions.len(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("✓ '{}' registered at {} ({} dialect)", schema.name, schema.program_address, schema.dialect);
    println!("  Instructions: {}", schema.instructions.len());
    for ix in &schema.instructions {
        let args: Vec<String> = ix.args.iter().map(|f| format!("{}: {}", f.name, f.layout)).collect();
        println!("    - {}({})  [{} accounts]", ix.name, args.join(", "), ix.accounts.len());
    }
    println!("  Accounts:     {}", schema.accounts.len());
    for acc in &schema.accounts {
        println!("    - {} ({} fields)", acc.name, acc.fields.len());
    }
    println!("  Events:       {}", schema.events.len());
    for ev in &schema.events {
        println!("    - {} ({} fields)", ev.name, ev.fields.len());
    }

    let mut types: Vec<_> = schema.type_definitions.iter().collect();
    types.sort_by(|a, b| a.0.cmp(b.0));
    println!("  Types:        {}", types.len());
    for (name, def) in types {
        let kind = match def {
            TypeDef::Struct(fields) => format!("struct, {} fields", fields.len()),
            TypeDef::Enum(variants) => format!("enum, {} variants", variants.len()),
            TypeDef::Alias(layout) => format!("alias of {layout}"),
        };
        println!("    - {name} ({kind})");
    }
    Ok(())
}
