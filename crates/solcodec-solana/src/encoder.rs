//! Borsh encoder, the inverse of the value decoder.
//!
//! Converts `NormalizedValue` inputs into instruction data for a registered
//! program: `discriminator ++ borsh(args)`. JSON arguments in the same shape
//! the decoder emits are accepted too, typed by the instruction's layouts.
//!
//! # Usage
//! ```ignore
//! let data = InstructionEncoder::new(&schema).encode("deposit", &args)?;
//! let data = InstructionEncoder::new(&schema).encode_json("deposit", &json!({ "amount": 5 }))?;
//! ```

use solcodec_core::{
    address::decode_pubkey,
    error::DecodeError,
    schema::{FieldDef, ProgramSchema, TypeDef, VariantFields},
    types::{FieldLayout, NormalizedValue},
};

use indexmap::IndexMap;
use serde_json::Value;

use crate::value::TypeTable;

/// Encodes instruction arguments for one program schema.
pub struct InstructionEncoder<'a> {
    schema: &'a ProgramSchema,
}

impl<'a> InstructionEncoder<'a> {
    pub fn new(schema: &'a ProgramSchema) -> Self {
        Self { schema }
    }

    /// Encode a call to instruction `name`. `args` must be a struct value
    /// carrying every declared argument.
    pub fn encode(&self, name: &str, args: &NormalizedValue) -> Result<Vec<u8>, DecodeError> {
        let ix = self
            .schema
            .instructions
            .iter()
            .find(|ix| ix.name == name)
            .ok_or_else(|| DecodeError::UnknownInstruction {
                program: format!("{} (no instruction '{name}')", self.schema.program_address),
            })?;
        let mut out = ix.discriminator.clone();
        encode_fields(&mut out, &ix.args, args, &self.schema.type_definitions)?;
        Ok(out)
    }

    /// Like [`Self::encode`], with `args` as a JSON object keyed by argument name.
    pub fn encode_json(&self, name: &str, args: &Value) -> Result<Vec<u8>, DecodeError> {
        let ix = self
            .schema
            .instructions
            .iter()
            .find(|ix| ix.name == name)
            .ok_or_else(|| DecodeError::UnknownInstruction {
                program: format!("{} (no instruction '{name}')", self.schema.program_address),
            })?;
        let value = fields_from_json(&ix.args, args, &self.schema.type_definitions)?;
        self.encode(name, &value)
    }
}

// ─── JSON input ───────────────────────────────────────────────────────────────

fn fields_from_json(fields: &[FieldDef], json: &Value, types: &TypeTable) -> Result<NormalizedValue, DecodeError> {
    let obj = json
        .as_object()
        .ok_or_else(|| DecodeError::Other(format!("expected an object, got {json}")))?;
    let mut out = IndexMap::with_capacity(fields.len());
    for f in fields {
        let v = obj
            .get(&f.name)
            .ok_or_else(|| DecodeError::Other(format!("missing field '{}'", f.name)))?;
        out.insert(f.name.clone(), value_from_json(&f.layout, v, types)?);
    }
    Ok(NormalizedValue::Struct(out))
}

/// Type a JSON value by `layout`. Wide integers may be numbers or decimal
/// strings, bytes are `0x` hex, enums are `"Variant"` or `{ "Variant": fields }`.
pub fn value_from_json(layout: &FieldLayout, json: &Value, types: &TypeTable) -> Result<NormalizedValue, DecodeError> {
    use NormalizedValue as V;
    let bad = || DecodeError::Other(format!("JSON {json} does not fit layout {layout}"));
    let value = match (layout, json) {
        (FieldLayout::Option(_) | FieldLayout::COption(_), Value::Null) => V::Null,
        (FieldLayout::Option(inner) | FieldLayout::COption(inner), v) => value_from_json(inner, v, types)?,
        (FieldLayout::Uint(bits), v) if *bits <= 64 => V::Uint(json_u64(v).ok_or_else(bad)?),
        (FieldLayout::Int(bits), v) if *bits <= 64 => V::Int(json_i64(v).ok_or_else(bad)?),
        (FieldLayout::Uint(_), Value::Number(n)) => V::BigUint(n.to_string()),
        (FieldLayout::Uint(_), Value::String(s)) => V::BigUint(s.clone()),
        (FieldLayout::Int(_), Value::Number(n)) => V::BigInt(n.to_string()),
        (FieldLayout::Int(_), Value::String(s)) => V::BigInt(s.clone()),
        (FieldLayout::Float(_), v) => V::Float(v.as_f64().ok_or_else(bad)?),
        (FieldLayout::Bool, Value::Bool(b)) => V::Bool(*b),
        (FieldLayout::Str, Value::String(s)) => V::Str(s.clone()),
        (FieldLayout::Bytes, Value::String(s)) => {
            V::Bytes(hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| bad())?)
        }
        (FieldLayout::Pubkey, Value::String(s)) => V::Pubkey(s.clone()),
        (FieldLayout::Vec(elem) | FieldLayout::Array { elem, .. }, Value::Array(items)) => V::Array(
            items
                .iter()
                .map(|item| value_from_json(elem, item, types))
                .collect::<Result<_, _>>()?,
        ),
        (FieldLayout::Defined(name), v) => {
            let def = types.get(name).ok_or_else(|| DecodeError::TypeNotFound { name: name.clone() })?;
            defined_from_json(name, def, v, types)?
        }
        _ => return Err(bad()),
    };
    Ok(value)
}

fn defined_from_json(name: &str, def: &TypeDef, json: &Value, types: &TypeTable) -> Result<NormalizedValue, DecodeError> {
    let shape = || {
        DecodeError::Other(format!(
            "enum '{name}' expects \"Variant\" or {{ \"Variant\": .. }}, got {json}"
        ))
    };
    let (variant, inner) = match (def, json) {
        (TypeDef::Struct(fields), v) => return fields_from_json(fields, v, types),
        (TypeDef::Alias(target), v) => return value_from_json(target, v, types),
        (TypeDef::Enum(_), Value::String(variant)) => (variant.as_str(), None),
        (TypeDef::Enum(_), Value::Object(map)) => match (map.len(), map.iter().next()) {
            (1, Some((variant, inner))) => (variant.as_str(), Some(inner)),
            _ => return Err(shape()),
        },
        (TypeDef::Enum(_), _) => return Err(shape()),
    };
    let (_, v) = def
        .variant_by_name(variant)
        .ok_or_else(|| DecodeError::Other(format!("enum '{name}' has no variant '{variant}'")))?;
    let value = match &v.fields {
        VariantFields::Unit => NormalizedValue::empty(),
        VariantFields::Named(fields) => fields_from_json(fields, inner.ok_or_else(shape)?, types)?,
        VariantFields::Tuple(layouts) => {
            let items = inner
                .and_then(Value::as_array)
                .filter(|items| items.len() == layouts.len())
                .ok_or_else(|| DecodeError::Other(format!("tuple variant '{variant}' expects {} items", layouts.len())))?;
            NormalizedValue::Array(
                layouts
                    .iter()
                    .zip(items)
                    .map(|(l, item)| value_from_json(l, item, types))
                    .collect::<Result<_, _>>()?,
            )
        }
    };
    Ok(NormalizedValue::Enum {
        variant: variant.to_string(),
        value: Box::new(value),
    })
}

fn json_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn json_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Encode the named fields of a struct value in declaration order.
pub fn encode_fields(
    out: &mut Vec<u8>,
    fields: &[FieldDef],
    value: &NormalizedValue,
    types: &TypeTable,
) -> Result<(), DecodeError> {
    for f in fields {
        let v = value
            .get(&f.name)
            .ok_or_else(|| DecodeError::Other(format!("missing field '{}'", f.name)))?;
        encode_value(out, &f.layout, v, types)?;
    }
    Ok(())
}

/// Encode one value of `layout`.
pub fn encode_value(
    out: &mut Vec<u8>,
    layout: &FieldLayout,
    value: &NormalizedValue,
    types: &TypeTable,
) -> Result<(), DecodeError> {
    use NormalizedValue as V;
    match (layout, value) {
        (FieldLayout::Uint(bits), V::Uint(n)) if *bits <= 64 => {
            let bytes = n.to_le_bytes();
            let width = *bits as usize / 8;
            if bytes[width..].iter().any(|&b| b != 0) {
                return Err(mismatch(layout, value));
            }
            out.extend_from_slice(&bytes[..width]);
        }
        (FieldLayout::Int(bits), V::Int(n)) if *bits <= 64 => {
            let width = *bits as usize / 8;
            let bytes = n.to_le_bytes();
            let shift = 64 - *bits as u32;
            if shift > 0 && (n << shift) >> shift != *n {
                return Err(mismatch(layout, value));
            }
            out.extend_from_slice(&bytes[..width]);
        }
        (FieldLayout::Uint(128), V::BigUint(s)) => {
            let n: u128 = s.parse().map_err(|_| mismatch(layout, value))?;
            out.extend_from_slice(&n.to_le_bytes());
        }
        (FieldLayout::Uint(128), V::Uint(n)) => out.extend_from_slice(&(*n as u128).to_le_bytes()),
        (FieldLayout::Int(128), V::BigInt(s)) => {
            let n: i128 = s.parse().map_err(|_| mismatch(layout, value))?;
            out.extend_from_slice(&n.to_le_bytes());
        }
        (FieldLayout::Int(128), V::Int(n)) => out.extend_from_slice(&(*n as i128).to_le_bytes()),
        (FieldLayout::Float(32), V::Float(f)) => out.extend_from_slice(&(*f as f32).to_le_bytes()),
        (FieldLayout::Float(64), V::Float(f)) => out.extend_from_slice(&f.to_le_bytes()),
        (FieldLayout::Bool, V::Bool(b)) => out.push(*b as u8),
        (FieldLayout::Str, V::Str(s)) => {
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        (FieldLayout::Bytes, V::Bytes(b)) => {
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
        (FieldLayout::Pubkey, V::Pubkey(s)) => {
            let key = decode_pubkey(s).map_err(|e| DecodeError::Other(e.to_string()))?;
            out.extend_from_slice(&key);
        }
        (FieldLayout::Option(_), V::Null) => out.push(0),
        (FieldLayout::Option(inner), v) => {
            out.push(1);
            encode_value(out, inner, v, types)?;
        }
        (FieldLayout::COption(_), V::Null) => out.extend_from_slice(&0u32.to_le_bytes()),
        (FieldLayout::COption(inner), v) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            encode_value(out, inner, v, types)?;
        }
        (FieldLayout::Vec(inner), V::Array(items)) => {
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                encode_value(out, inner, item, types)?;
            }
        }
        (FieldLayout::Array { elem, len }, V::Array(items)) if items.len() == *len => {
            for item in items {
                encode_value(out, elem, item, types)?;
            }
        }
        (FieldLayout::Defined(name), v) => {
            let def = types.get(name).ok_or_else(|| DecodeError::TypeNotFound {
                name: name.clone(),
            })?;
            encode_defined(out, name, def, v, types)?;
        }
        _ => return Err(mismatch(layout, value)),
    }
    Ok(())
}

fn encode_defined(
    out: &mut Vec<u8>,
    name: &str,
    def: &TypeDef,
    value: &NormalizedValue,
    types: &TypeTable,
) -> Result<(), DecodeError> {
    match (def, value) {
        (TypeDef::Struct(fields), v) => encode_fields(out, fields, v, types),
        (TypeDef::Alias(target), v) => encode_value(out, target, v, types),
        (TypeDef::Enum(_), NormalizedValue::Enum { variant, value }) => {
            let (discriminant, v) = def.variant_by_name(variant).ok_or_else(|| {
                DecodeError::Other(format!("enum '{name}' has no variant '{variant}'"))
            })?;
            out.push(discriminant);
            match (&v.fields, value.as_ref()) {
                (VariantFields::Unit, _) => Ok(()),
                (VariantFields::Named(fields), inner) => encode_fields(out, fields, inner, types),
                (VariantFields::Tuple(layouts), NormalizedValue::Array(items))
                    if items.len() == layouts.len() =>
                {
                    for (l, item) in layouts.iter().zip(items) {
                        encode_value(out, l, item, types)?;
                    }
                    Ok(())
                }
                (VariantFields::Tuple(_), other) => Err(DecodeError::Other(format!(
                    "tuple variant '{variant}' expects an array, got {other}"
                ))),
            }
        }
        (TypeDef::Enum(_), other) => Err(DecodeError::Other(format!(
            "enum '{name}' expects a variant value, got {other}"
        ))),
    }
}

fn mismatch(layout: &FieldLayout, value: &NormalizedValue) -> DecodeError {
    DecodeError::Other(format!("value {value} does not fit layout {layout}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_integers() {
        let mut out = Vec::new();
        assert!(encode_value(&mut out, &FieldLayout::Uint(8), &NormalizedValue::Uint(256), &TypeTable::new()).is_err());
        assert!(encode_value(&mut out, &FieldLayout::Int(8), &NormalizedValue::Int(-129), &TypeTable::new()).is_err());
        out.clear();
        encode_value(&mut out, &FieldLayout::Int(8), &NormalizedValue::Int(-128), &TypeTable::new()).unwrap();
        assert_eq!(out, vec![0x80]);
    }

    fn order_schema() -> ProgramSchema {
        use solcodec_core::schema::{Dialect, EnumVariant, InstructionDef};
        let mut types = TypeTable::new();
        types.insert(
            "Side".into(),
            TypeDef::Enum(vec![
                EnumVariant {
                    name: "Buy".into(),
                    fields: VariantFields::Unit,
                },
                EnumVariant {
                    name: "Limit".into(),
                    fields: VariantFields::Named(vec![FieldDef::new("price", FieldLayout::Uint(32))]),
                },
            ]),
        );
        ProgramSchema {
            program_address: "Order1111111111111111111111111111111111111".into(),
            dialect: Dialect::Modern,
            name: "order".into(),
            instructions: vec![InstructionDef {
                name: "place".into(),
                discriminator: vec![7; 8],
                accounts: Vec::new(),
                args: vec![
                    FieldDef::new("side", FieldLayout::Defined("Side".into())),
                    FieldDef::new("memo", FieldLayout::Option(Box::new(FieldLayout::Bytes))),
                    FieldDef::new("size", FieldLayout::Uint(128)),
                ],
            }],
            instruction_names: ["place".to_string()].into_iter().collect(),
            accounts: Vec::new(),
            type_definitions: types,
            events: Vec::new(),
        }
    }

    #[test]
    fn json_arguments_follow_layouts() {
        let schema = order_schema();
        let enc = InstructionEncoder::new(&schema);
        let data = enc
            .encode_json(
                "place",
                &serde_json::json!({ "side": { "limit": { "price": 9 } }, "memo": "0xbeef", "size": "5" }),
            )
            .unwrap();
        let mut expected = vec![7; 8];
        expected.extend_from_slice(&[1, 9, 0, 0, 0]);
        expected.extend_from_slice(&[1, 2, 0, 0, 0, 0xbe, 0xef]);
        expected.extend_from_slice(&5u128.to_le_bytes());
        assert_eq!(data, expected);

        let data = enc
            .encode_json("place", &serde_json::json!({ "side": "Buy", "memo": null, "size": 1 }))
            .unwrap();
        assert_eq!(&data[8..10], &[0, 0]);
    }

    #[test]
    fn json_shape_errors() {
        let schema = order_schema();
        let enc = InstructionEncoder::new(&schema);
        assert!(enc
            .encode_json("place", &serde_json::json!({ "side": "Market", "memo": null, "size": 1 }))
            .is_err());
        assert!(enc
            .encode_json("place", &serde_json::json!({ "side": "Buy", "memo": null }))
            .is_err());
        assert!(enc.encode_json("cancel", &serde_json::json!({})).is_err());
    }

    #[test]
    fn option_and_string() {
        let mut out = Vec::new();
        let layout = FieldLayout::Option(Box::new(FieldLayout::Str));
        encode_value(&mut out, &layout, &NormalizedValue::Str("hi".into()), &TypeTable::new()).unwrap();
        assert_eq!(out, vec![1, 2, 0, 0, 0, b'h', b'i']);
    }
}
