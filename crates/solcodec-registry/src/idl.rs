//! Anchor IDL parser.
//!
//! Accepts both IDL dialects and normalizes them into a single
//! `solcodec_core::ProgramSchema`:
//!
//! * **Legacy** (Anchor < 0.30): no top-level `address`, no `discriminator`
//!   fields. Instruction, account and event tags are derived from names.
//!   Account and event layouts are declared inline.
//! * **Modern** (Anchor ≥ 0.30): top-level `address` and explicit
//!   `discriminator` arrays. Account and event layouts live in `types`.
//!
//! The dialect is resolved once into [`RawIdl`]; nothing downstream branches
//! on it again.

use solcodec_core::{
    error::RegistryError,
    schema::{
        sighash, to_snake_case, AccountDef, Dialect, Discriminator, EnumVariant, EventDef,
        FieldDef, InstructionAccountDef, InstructionDef, ProgramSchema, TypeDef, VariantFields,
    },
    types::FieldLayout,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

// ─── Raw IDL serde types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: Value,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    name: String,
    #[serde(default)]
    fields: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawTypeBody {
    Struct {
        #[serde(default)]
        fields: Vec<Value>,
    },
    Enum {
        variants: Vec<RawVariant>,
    },
    Type {
        alias: Value,
    },
}

#[derive(Debug, Deserialize)]
struct RawTypeDef {
    name: String,
    #[serde(rename = "type")]
    ty: RawTypeBody,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyInstruction {
    name: String,
    #[serde(default)]
    accounts: Vec<Value>,
    #[serde(default)]
    args: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct LegacyAccount {
    name: String,
    #[serde(rename = "type")]
    ty: RawTypeBody,
}

#[derive(Debug, Deserialize)]
struct LegacyEvent {
    name: String,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct LegacyIdl {
    #[serde(default)]
    name: Option<String>,
    instructions: Vec<LegacyInstruction>,
    #[serde(default)]
    accounts: Vec<LegacyAccount>,
    #[serde(default)]
    types: Vec<RawTypeDef>,
    #[serde(default)]
    events: Vec<LegacyEvent>,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Deserialize)]
struct ModernInstruction {
    name: String,
    #[serde(default)]
    discriminator: Vec<u8>,
    #[serde(default)]
    accounts: Vec<Value>,
    #[serde(default)]
    args: Vec<RawField>,
}

/// Modern accounts and events only carry a tag; the layout is in `types`.
#[derive(Debug, Deserialize)]
struct ModernTaggedRef {
    name: String,
    #[serde(default)]
    discriminator: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ModernIdl {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    metadata: RawMetadata,
    instructions: Vec<ModernInstruction>,
    #[serde(default)]
    accounts: Vec<ModernTaggedRef>,
    #[serde(default)]
    types: Vec<RawTypeDef>,
    #[serde(default)]
    events: Vec<ModernTaggedRef>,
}

/// An IDL document with its dialect resolved.
#[derive(Debug)]
enum RawIdl {
    Legacy(LegacyIdl),
    Modern(ModernIdl),
}

// ─── Parser ───────────────────────────────────────────────────────────────────

pub struct IdlParser;

impl IdlParser {
    /// Detects the dialect from document shape. `None` when the document is
    /// not an IDL at all (no `instructions` array).
    pub fn detect_dialect(doc: &Value) -> Option<Dialect> {
        let instructions = doc.get("instructions")?.as_array()?;
        let has_address = doc.get("address").is_some_and(|a| !a.is_null());
        let has_discriminator = instructions
            .iter()
            .any(|ix| ix.get("discriminator").is_some());
        if has_address || has_discriminator {
            Some(Dialect::Modern)
        } else {
            Some(Dialect::Legacy)
        }
    }

    /// The program address an IDL declares for itself, if any
    /// (`address` for modern IDLs, `metadata.address` for legacy ones).
    pub fn declared_address(doc: &Value) -> Option<String> {
        doc.get("address")
            .and_then(Value::as_str)
            .or_else(|| doc.pointer("/metadata/address").and_then(Value::as_str))
            .map(str::to_string)
    }

    /// Parse an IDL JSON string. Returns `Ok(None)` for documents matching
    /// neither dialect.
    pub fn parse(program_address: &str, json: &str) -> Result<Option<ProgramSchema>, RegistryError> {
        let doc: Value = serde_json::from_str(json)?;
        Self::parse_value(program_address, doc)
    }

    pub fn parse_value(
        program_address: &str,
        doc: Value,
    ) -> Result<Option<ProgramSchema>, RegistryError> {
        let raw = match Self::detect_dialect(&doc) {
            None => return Ok(None),
            Some(Dialect::Legacy) => RawIdl::Legacy(
                serde_json::from_value(doc).map_err(|e| RegistryError::ParseError(e.to_string()))?,
            ),
            Some(Dialect::Modern) => RawIdl::Modern(
                serde_json::from_value(doc).map_err(|e| RegistryError::ParseError(e.to_string()))?,
            ),
        };
        let schema = match raw {
            RawIdl::Legacy(idl) => build_legacy(program_address, idl)?,
            RawIdl::Modern(idl) => build_modern(program_address, idl)?,
        };
        Ok(Some(schema))
    }
}

fn build_legacy(program_address: &str, idl: LegacyIdl) -> Result<ProgramSchema, RegistryError> {
    let mut type_definitions = build_type_table(&idl.types)?;

    let mut instructions = Vec::with_capacity(idl.instructions.len());
    for ix in &idl.instructions {
        instructions.push(InstructionDef {
            name: ix.name.clone(),
            discriminator: sighash("global", &to_snake_case(&ix.name)).to_vec(),
            accounts: flatten_accounts(&ix.accounts),
            args: parse_fields(&ix.args, &ix.name)?,
        });
    }

    let mut accounts = Vec::with_capacity(idl.accounts.len());
    for acc in &idl.accounts {
        let def = build_type_body(&acc.ty, &acc.name)?;
        let fields = struct_fields(&def, &acc.name)?;
        // Account layouts can be referenced as defined types too
        type_definitions.entry(acc.name.clone()).or_insert(def);
        accounts.push(AccountDef {
            name: acc.name.clone(),
            discriminator: sighash("account", &acc.name),
            fields,
        });
    }

    let mut events = Vec::with_capacity(idl.events.len());
    for ev in &idl.events {
        events.push(EventDef {
            name: ev.name.clone(),
            discriminator: sighash("event", &ev.name),
            fields: parse_fields(&ev.fields, &ev.name)?,
        });
    }

    let name = idl
        .name
        .or(idl.metadata.name)
        .unwrap_or_else(|| "unknown".to_string());

    Ok(assemble(
        program_address,
        Dialect::Legacy,
        name,
        instructions,
        accounts,
        type_definitions,
        events,
    ))
}

fn build_modern(program_address: &str, idl: ModernIdl) -> Result<ProgramSchema, RegistryError> {
    let type_definitions = build_type_table(&idl.types)?;

    let mut instructions = Vec::with_capacity(idl.instructions.len());
    for ix in &idl.instructions {
        let discriminator = if ix.discriminator.is_empty() {
            sighash("global", &to_snake_case(&ix.name)).to_vec()
        } else {
            ix.discriminator.clone()
        };
        instructions.push(InstructionDef {
            name: ix.name.clone(),
            discriminator,
            accounts: flatten_accounts(&ix.accounts),
            args: parse_fields(&ix.args, &ix.name)?,
        });
    }

    let mut accounts = Vec::with_capacity(idl.accounts.len());
    for acc in &idl.accounts {
        accounts.push(AccountDef {
            name: acc.name.clone(),
            discriminator: tag_or_derived(&acc.discriminator, "account", &acc.name)?,
            fields: layout_from_types(&type_definitions, &acc.name)?,
        });
    }

    let mut events = Vec::with_capacity(idl.events.len());
    for ev in &idl.events {
        events.push(EventDef {
            name: ev.name.clone(),
            discriminator: tag_or_derived(&ev.discriminator, "event", &ev.name)?,
            fields: layout_from_types(&type_definitions, &ev.name)?,
        });
    }

    let name = idl
        .metadata
        .name
        .or(idl.name)
        .unwrap_or_else(|| "unknown".to_string());

    if let Some(declared) = &idl.address {
        if declared != program_address {
            tracing::debug!(
                declared = %declared,
                registered = %program_address,
                "IDL address differs from registration address"
            );
        }
    }

    Ok(assemble(
        program_address,
        Dialect::Modern,
        name,
        instructions,
        accounts,
        type_definitions,
        events,
    ))
}

fn assemble(
    program_address: &str,
    dialect: Dialect,
    name: String,
    instructions: Vec<InstructionDef>,
    accounts: Vec<AccountDef>,
    type_definitions: HashMap<String, TypeDef>,
    events: Vec<EventDef>,
) -> ProgramSchema {
    let instruction_names: BTreeSet<String> =
        instructions.iter().map(|ix| ix.name.clone()).collect();
    ProgramSchema {
        program_address: program_address.to_string(),
        dialect,
        name,
        instructions,
        instruction_names,
        accounts,
        type_definitions,
        events,
    }
}

fn tag_or_derived(tag: &[u8], namespace: &str, name: &str) -> Result<Discriminator, RegistryError> {
    if tag.is_empty() {
        return Ok(sighash(namespace, name));
    }
    tag.try_into().map_err(|_| RegistryError::InvalidType {
        context: name.to_string(),
        reason: format!("discriminator must be 8 bytes, got {}", tag.len()),
    })
}

fn layout_from_types(
    types: &HashMap<String, TypeDef>,
    name: &str,
) -> Result<Vec<FieldDef>, RegistryError> {
    let def = types.get(name).ok_or_else(|| RegistryError::InvalidType {
        context: name.to_string(),
        reason: "no matching entry in `types`".into(),
    })?;
    struct_fields(def, name)
}

fn struct_fields(def: &TypeDef, context: &str) -> Result<Vec<FieldDef>, RegistryError> {
    match def {
        TypeDef::Struct(fields) => Ok(fields.clone()),
        _ => Err(RegistryError::InvalidType {
            context: context.to_string(),
            reason: "expected a struct layout".into(),
        }),
    }
}

// ─── Type table ───────────────────────────────────────────────────────────────

fn build_type_table(types: &[RawTypeDef]) -> Result<HashMap<String, TypeDef>, RegistryError> {
    let mut table = HashMap::with_capacity(types.len());
    for t in types {
        table.insert(t.name.clone(), build_type_body(&t.ty, &t.name)?);
    }
    Ok(table)
}

fn build_type_body(body: &RawTypeBody, context: &str) -> Result<TypeDef, RegistryError> {
    match body {
        RawTypeBody::Struct { fields } => Ok(TypeDef::Struct(parse_struct_fields(fields, context)?)),
        RawTypeBody::Enum { variants } => {
            let mut out = Vec::with_capacity(variants.len());
            for v in variants {
                let fields = match &v.fields {
                    None => VariantFields::Unit,
                    Some(fs) if fs.is_empty() => VariantFields::Unit,
                    Some(fs) if is_named(fs) => {
                        VariantFields::Named(parse_struct_fields(fs, &v.name)?)
                    }
                    Some(fs) => {
                        let layouts = fs
                            .iter()
                            .map(|f| parse_layout(f).map_err(|e| type_err(&v.name, e)))
                            .collect::<Result<Vec<_>, _>>()?;
                        VariantFields::Tuple(layouts)
                    }
                };
                out.push(EnumVariant {
                    name: v.name.clone(),
                    fields,
                });
            }
            Ok(TypeDef::Enum(out))
        }
        RawTypeBody::Type { alias } => Ok(TypeDef::Alias(
            parse_layout(alias).map_err(|e| type_err(context, e))?,
        )),
    }
}

fn is_named(fields: &[Value]) -> bool {
    fields.iter().all(|f| f.get("name").is_some())
}

/// Struct fields are named objects, or bare type refs for tuple structs
/// (named `"0"`, `"1"`, …).
fn parse_struct_fields(fields: &[Value], context: &str) -> Result<Vec<FieldDef>, RegistryError> {
    if is_named(fields) {
        let raw: Vec<RawField> = fields
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        parse_fields(&raw, context)
    } else {
        fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                parse_layout(f)
                    .map(|layout| FieldDef::new(i.to_string(), layout))
                    .map_err(|e| type_err(context, e))
            })
            .collect()
    }
}

fn parse_fields(fields: &[RawField], context: &str) -> Result<Vec<FieldDef>, RegistryError> {
    fields
        .iter()
        .map(|f| {
            parse_layout(&f.ty)
                .map(|layout| FieldDef::new(f.name.clone(), layout))
                .map_err(|e| type_err(&format!("{context}.{}", f.name), e))
        })
        .collect()
}

fn type_err(context: &str, reason: String) -> RegistryError {
    RegistryError::InvalidType {
        context: context.to_string(),
        reason,
    }
}

/// Flattens nested account groups into one ordered list.
fn flatten_accounts(accounts: &[Value]) -> Vec<InstructionAccountDef> {
    let mut out = Vec::new();
    for acc in accounts {
        if let Some(nested) = acc.get("accounts").and_then(Value::as_array) {
            out.extend(flatten_accounts(nested));
            continue;
        }
        let flag = |keys: &[&str]| {
            keys.iter()
                .any(|k| acc.get(*k).and_then(Value::as_bool).unwrap_or(false))
        };
        out.push(InstructionAccountDef {
            name: acc
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            is_signer: flag(&["isSigner", "signer"]),
            is_writable: flag(&["isMut", "writable"]),
        });
    }
    out
}

// ─── Type references ──────────────────────────────────────────────────────────

/// Parse an IDL type reference into a `FieldLayout`. Handles the spellings of
/// both dialects (`publicKey`/`pubkey`, `{"defined": "X"}`/`{"defined": {"name": "X"}}`).
pub fn parse_layout(ty: &Value) -> Result<FieldLayout, String> {
    match ty {
        Value::String(s) => parse_primitive(s).ok_or_else(|| format!("unknown type: '{s}'")),
        Value::Object(map) => {
            if let Some(inner) = map.get("option") {
                return Ok(FieldLayout::Option(Box::new(parse_layout(inner)?)));
            }
            if let Some(inner) = map.get("coption") {
                return Ok(FieldLayout::COption(Box::new(parse_layout(inner)?)));
            }
            if let Some(inner) = map.get("vec") {
                return Ok(FieldLayout::Vec(Box::new(parse_layout(inner)?)));
            }
            if let Some(arr) = map.get("array") {
                let parts = arr
                    .as_array()
                    .filter(|p| p.len() == 2)
                    .ok_or_else(|| format!("malformed array type: {arr}"))?;
                let len = parts[1]
                    .as_u64()
                    .ok_or_else(|| format!("unsupported array length: {}", parts[1]))?;
                return Ok(FieldLayout::Array {
                    elem: Box::new(parse_layout(&parts[0])?),
                    len: len as usize,
                });
            }
            if let Some(def) = map.get("defined") {
                let name = def
                    .as_str()
                    .or_else(|| def.get("name").and_then(Value::as_str))
                    .ok_or_else(|| format!("malformed defined type: {def}"))?;
                return Ok(FieldLayout::Defined(name.to_string()));
            }
            Err(format!("unsupported type: {ty}"))
        }
        other => Err(format!("unsupported type: {other}")),
    }
}

fn parse_primitive(s: &str) -> Option<FieldLayout> {
    let layout = match s {
        "bool" => FieldLayout::Bool,
        "string" => FieldLayout::Str,
        "bytes" => FieldLayout::Bytes,
        "publicKey" | "pubkey" => FieldLayout::Pubkey,
        "f32" => FieldLayout::Float(32),
        "f64" => FieldLayout::Float(64),
        _ => {
            let (signed, bits) = if let Some(rest) = s.strip_prefix('u') {
                (false, rest.parse::<u16>().ok()?)
            } else if let Some(rest) = s.strip_prefix('i') {
                (true, rest.parse::<u16>().ok()?)
            } else {
                return None;
            };
            if !matches!(bits, 8 | 16 | 32 | 64 | 128 | 256) {
                return None;
            }
            if signed {
                FieldLayout::Int(bits)
            } else {
                FieldLayout::Uint(bits)
            }
        }
    };
    Some(layout)
}
