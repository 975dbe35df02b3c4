//! Borsh value decoder: `FieldLayout` + bytes → `NormalizedValue`.
//!
//! This is where the binary layouts of an IDL are mapped to the single
//! value representation defined in `solcodec-core`.

use indexmap::IndexMap;
use solcodec_core::{
    address::encode_pubkey,
    error::DecodeError,
    schema::{FieldDef, TypeDef, VariantFields},
    types::{FieldLayout, NormalizedValue},
};
use std::collections::HashMap;

use crate::cursor::BorshCursor;

/// User-defined types available to `defined` layouts.
pub type TypeTable = HashMap<String, TypeDef>;

/// Guards against self-referential aliases.
const MAX_DEPTH: usize = 64;

/// Decode one value of `layout` from the cursor.
pub fn decode_value(
    cur: &mut BorshCursor<'_>,
    layout: &FieldLayout,
    types: &TypeTable,
) -> Result<NormalizedValue, DecodeError> {
    decode_at(cur, layout, types, 0)
}

/// Decode a sequence of named fields into a struct value, in declaration order.
pub fn decode_fields(
    cur: &mut BorshCursor<'_>,
    fields: &[FieldDef],
    types: &TypeTable,
) -> Result<NormalizedValue, DecodeError> {
    fields_at(cur, fields, types, 0)
}

fn fields_at(
    cur: &mut BorshCursor<'_>,
    fields: &[FieldDef],
    types: &TypeTable,
    depth: usize,
) -> Result<NormalizedValue, DecodeError> {
    let mut out = IndexMap::with_capacity(fields.len());
    for f in fields {
        out.insert(f.name.clone(), decode_at(cur, &f.layout, types, depth)?);
    }
    Ok(NormalizedValue::Struct(out))
}

fn decode_at(
    cur: &mut BorshCursor<'_>,
    layout: &FieldLayout,
    types: &TypeTable,
    depth: usize,
) -> Result<NormalizedValue, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::UnsupportedLayout(format!(
            "type nesting deeper than {MAX_DEPTH} at {layout}"
        )));
    }
    let next = depth + 1;
    let value = match layout {
        FieldLayout::Uint(8) => NormalizedValue::Uint(cur.read_u8()? as u64),
        FieldLayout::Uint(16) => NormalizedValue::Uint(cur.read_u16()? as u64),
        FieldLayout::Uint(32) => NormalizedValue::Uint(cur.read_u32()? as u64),
        FieldLayout::Uint(64) => NormalizedValue::Uint(cur.read_u64()?),
        FieldLayout::Uint(128) => NormalizedValue::BigUint(cur.read_u128()?.to_string()),
        FieldLayout::Uint(256) => {
            let bytes: [u8; 32] = cur.read_array()?;
            NormalizedValue::BigUint(le_to_decimal(&bytes))
        }
        FieldLayout::Int(8) => NormalizedValue::Int(cur.read_i8()? as i64),
        FieldLayout::Int(16) => NormalizedValue::Int(cur.read_i16()? as i64),
        FieldLayout::Int(32) => NormalizedValue::Int(cur.read_i32()? as i64),
        FieldLayout::Int(64) => NormalizedValue::Int(cur.read_i64()?),
        FieldLayout::Int(128) => NormalizedValue::BigInt(cur.read_i128()?.to_string()),
        FieldLayout::Int(256) => {
            let bytes: [u8; 32] = cur.read_array()?;
            NormalizedValue::BigInt(le_signed_to_decimal(&bytes))
        }
        FieldLayout::Uint(bits) | FieldLayout::Int(bits) => {
            return Err(DecodeError::UnsupportedLayout(format!(
                "{bits}-bit integer"
            )))
        }
        FieldLayout::Float(32) => NormalizedValue::Float(cur.read_f32()? as f64),
        FieldLayout::Float(64) => NormalizedValue::Float(cur.read_f64()?),
        FieldLayout::Float(bits) => {
            return Err(DecodeError::UnsupportedLayout(format!("{bits}-bit float")))
        }
        FieldLayout::Bool => NormalizedValue::Bool(cur.read_bool()?),
        FieldLayout::Str => NormalizedValue::Str(cur.read_string()?),
        FieldLayout::Bytes => NormalizedValue::Bytes(cur.read_bytes()?.to_vec()),
        FieldLayout::Pubkey => NormalizedValue::Pubkey(encode_pubkey(&cur.read_pubkey()?)),
        FieldLayout::Option(inner) => match cur.read_u8()? {
            0 => NormalizedValue::Null,
            1 => decode_at(cur, inner, types, next)?,
            tag => {
                return Err(DecodeError::InvalidTag {
                    kind: "option",
                    tag: tag as u32,
                })
            }
        },
        FieldLayout::COption(inner) => match cur.read_u32()? {
            0 => NormalizedValue::Null,
            1 => decode_at(cur, inner, types, next)?,
            tag => return Err(DecodeError::InvalidTag { kind: "coption", tag }),
        },
        FieldLayout::Vec(inner) => {
            let len = cur.read_u32()? as usize;
            let mut items = Vec::with_capacity(len.min(cur.remaining()));
            for _ in 0..len {
                let before = cur.remaining();
                items.push(decode_at(cur, inner, types, next)?);
                // zero-sized elements would leave the loop bounded only by the prefix
                if cur.remaining() == before && items.len() < len {
                    return Err(DecodeError::UnsupportedLayout(format!(
                        "vec of {len} zero-sized {inner} elements"
                    )));
                }
            }
            NormalizedValue::Array(items)
        }
        FieldLayout::Array { elem, len } => {
            let mut items = Vec::with_capacity((*len).min(cur.remaining().max(1)));
            for _ in 0..*len {
                items.push(decode_at(cur, elem, types, next)?);
            }
            NormalizedValue::Array(items)
        }
        FieldLayout::Defined(name) => decode_defined(cur, name, types, next)?,
    };
    Ok(value)
}

fn decode_defined(
    cur: &mut BorshCursor<'_>,
    name: &str,
    types: &TypeTable,
    depth: usize,
) -> Result<NormalizedValue, DecodeError> {
    let def = types.get(name).ok_or_else(|| DecodeError::TypeNotFound {
        name: name.to_string(),
    })?;
    match def {
        TypeDef::Struct(fields) => fields_at(cur, fields, types, depth),
        TypeDef::Alias(target) => decode_at(cur, target, types, depth),
        TypeDef::Enum(variants) => {
            let discriminant = cur.read_u8()?;
            let variant = variants.get(discriminant as usize).ok_or_else(|| {
                DecodeError::UnknownVariant {
                    type_name: name.to_string(),
                    discriminant,
                }
            })?;
            let value = match &variant.fields {
                VariantFields::Unit => NormalizedValue::empty(),
                VariantFields::Named(fields) => fields_at(cur, fields, types, depth)?,
                VariantFields::Tuple(layouts) => {
                    let mut items = Vec::with_capacity(layouts.len());
                    for l in layouts {
                        items.push(decode_at(cur, l, types, depth)?);
                    }
                    NormalizedValue::Array(items)
                }
            };
            Ok(NormalizedValue::Enum {
                variant: variant.name.clone(),
                value: Box::new(value),
            })
        }
    }
}

/// Little-endian unsigned bytes → base-10 text.
pub(crate) fn le_to_decimal(le: &[u8]) -> String {
    // big-endian limbs, divided by 10 repeatedly
    let mut num: Vec<u8> = le.iter().rev().copied().collect();
    let mut digits = Vec::new();
    while num.iter().any(|&b| b != 0) {
        let mut rem: u16 = 0;
        for byte in num.iter_mut() {
            let acc = (rem << 8) | *byte as u16;
            *byte = (acc / 10) as u8;
            rem = acc % 10;
        }
        digits.push(b'0' + rem as u8);
    }
    if digits.is_empty() {
        return "0".to_string();
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Little-endian two's-complement bytes → base-10 text.
pub(crate) fn le_signed_to_decimal(le: &[u8]) -> String {
    let negative = le.last().is_some_and(|b| b & 0x80 != 0);
    if !negative {
        return le_to_decimal(le);
    }
    // magnitude = !x + 1
    let mut mag: Vec<u8> = le.iter().map(|b| !b).collect();
    for byte in mag.iter_mut() {
        let (v, overflow) = byte.overflowing_add(1);
        *byte = v;
        if !overflow {
            break;
        }
    }
    format!("-{}", le_to_decimal(&mag))
}
