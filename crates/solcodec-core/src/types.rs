//! Field layouts and decoded values.
//!
//! Every IDL type reference is resolved into a [`FieldLayout`] at registration
//! time. Decoding a byte buffer against a layout produces a [`NormalizedValue`],
//! the single value representation every consumer deals with.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Binary layout of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLayout {
    /// Unsigned integer (u8 .. u256). Width in bits.
    Uint(u16),
    /// Signed integer (i8 .. i256). Width in bits.
    Int(u16),
    /// IEEE-754 float, 32 or 64 bits.
    Float(u8),
    Bool,
    /// u32 length-prefixed UTF-8
    Str,
    /// u32 length-prefixed raw bytes
    Bytes,
    /// 32-byte public key
    Pubkey,
    /// 1-byte presence tag
    Option(Box<FieldLayout>),
    /// 4-byte presence tag
    COption(Box<FieldLayout>),
    /// u32 length-prefixed sequence
    Vec(Box<FieldLayout>),
    /// Fixed-count sequence
    Array { elem: Box<FieldLayout>, len: usize },
    /// User-defined struct, enum or alias, resolved against the schema type table
    Defined(String),
}

impl FieldLayout {
    /// Fixed encoded width in bytes, if the layout has one.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            FieldLayout::Uint(bits) | FieldLayout::Int(bits) => Some(*bits as usize / 8),
            FieldLayout::Float(bits) => Some(*bits as usize / 8),
            FieldLayout::Bool => Some(1),
            FieldLayout::Pubkey => Some(32),
            FieldLayout::Array { elem, len } => elem.fixed_size().map(|s| s * len),
            _ => None,
        }
    }
}

impl fmt::Display for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldLayout::Uint(bits) => write!(f, "u{bits}"),
            FieldLayout::Int(bits) => write!(f, "i{bits}"),
            FieldLayout::Float(bits) => write!(f, "f{bits}"),
            FieldLayout::Bool => write!(f, "bool"),
            FieldLayout::Str => write!(f, "string"),
            FieldLayout::Bytes => write!(f, "bytes"),
            FieldLayout::Pubkey => write!(f, "pubkey"),
            FieldLayout::Option(inner) => write!(f, "option<{inner}>"),
            FieldLayout::COption(inner) => write!(f, "coption<{inner}>"),
            FieldLayout::Vec(inner) => write!(f, "vec<{inner}>"),
            FieldLayout::Array { elem, len } => write!(f, "[{elem}; {len}]"),
            FieldLayout::Defined(name) => write!(f, "{name}"),
        }
    }
}

/// A decoded value.
///
/// Serializes to plain JSON: integers that fit in 64 bits become numbers,
/// wider ones base-10 strings, structs become objects in schema order and
/// enums become `{ "Variant": <fields> }`.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Uint(u64),
    /// Unsigned integers wider than 64 bits, as base-10 text
    BigUint(String),
    Int(i64),
    /// Signed integers wider than 64 bits, as base-10 text
    BigInt(String),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    /// Base58 public key
    Pubkey(String),
    Array(Vec<NormalizedValue>),
    /// Named fields in declaration order
    Struct(IndexMap<String, NormalizedValue>),
    Enum {
        variant: String,
        value: Box<NormalizedValue>,
    },
    Null,
}

impl NormalizedValue {
    /// An empty struct, used for unit enum variants and field-less instructions.
    pub fn empty() -> Self {
        NormalizedValue::Struct(IndexMap::new())
    }

    /// Returns `true` if this value is logically null/absent.
    pub fn is_null(&self) -> bool {
        matches!(self, NormalizedValue::Null)
    }

    /// Look up a struct field by name.
    pub fn get(&self, field: &str) -> Option<&NormalizedValue> {
        match self {
            NormalizedValue::Struct(fields) => fields.get(field),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            NormalizedValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NormalizedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner text of string-like values (strings, pubkeys, big integers).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedValue::Str(s)
            | NormalizedValue::Pubkey(s)
            | NormalizedValue::BigUint(s)
            | NormalizedValue::BigInt(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NormalizedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts into a plain `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NormalizedValue::Uint(v) => serializer.serialize_u64(*v),
            NormalizedValue::Int(v) => serializer.serialize_i64(*v),
            NormalizedValue::Float(v) => serializer.serialize_f64(*v),
            NormalizedValue::Bool(v) => serializer.serialize_bool(*v),
            NormalizedValue::BigUint(s)
            | NormalizedValue::BigInt(s)
            | NormalizedValue::Str(s)
            | NormalizedValue::Pubkey(s) => serializer.serialize_str(s),
            NormalizedValue::Bytes(b) => {
                serializer.serialize_str(&format!("0x{}", hex::encode(b)))
            }
            NormalizedValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            NormalizedValue::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            NormalizedValue::Enum { variant, value } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(variant, value.as_ref())?;
                map.end()
            }
            NormalizedValue::Null => serializer.serialize_unit(),
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::Uint(v) => write!(f, "{v}"),
            NormalizedValue::BigUint(v) => write!(f, "{v}"),
            NormalizedValue::Int(v) => write!(f, "{v}"),
            NormalizedValue::BigInt(v) => write!(f, "{v}"),
            NormalizedValue::Float(v) => write!(f, "{v}"),
            NormalizedValue::Bool(v) => write!(f, "{v}"),
            NormalizedValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            NormalizedValue::Str(s) => write!(f, "{s}"),
            NormalizedValue::Pubkey(p) => write!(f, "{p}"),
            NormalizedValue::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            NormalizedValue::Struct(fields) => {
                let parts: Vec<_> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            NormalizedValue::Enum { variant, value } => write!(f, "{variant}{value}"),
            NormalizedValue::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_display() {
        assert_eq!(FieldLayout::Uint(64).to_string(), "u64");
        assert_eq!(
            FieldLayout::Option(Box::new(FieldLayout::Pubkey)).to_string(),
            "option<pubkey>"
        );
        assert_eq!(
            FieldLayout::Array {
                elem: Box::new(FieldLayout::Uint(8)),
                len: 32
            }
            .to_string(),
            "[u8; 32]"
        );
    }

    #[test]
    fn fixed_size_of_nested_array() {
        let layout = FieldLayout::Array {
            elem: Box::new(FieldLayout::Uint(16)),
            len: 4,
        };
        assert_eq!(layout.fixed_size(), Some(8));
        assert_eq!(FieldLayout::Str.fixed_size(), None);
    }

    #[test]
    fn serializes_as_plain_json() {
        let mut fields = IndexMap::new();
        fields.insert("amount".to_string(), NormalizedValue::Uint(5));
        fields.insert(
            "supply".to_string(),
            NormalizedValue::BigUint("340282366920938463463374607431768211455".into()),
        );
        fields.insert("creator".to_string(), NormalizedValue::Null);
        fields.insert(
            "side".to_string(),
            NormalizedValue::Enum {
                variant: "Buy".into(),
                value: Box::new(NormalizedValue::empty()),
            },
        );
        let json = NormalizedValue::Struct(fields).to_json();
        assert_eq!(
            json,
            serde_json::json!({
                "amount": 5,
                "supply": "340282366920938463463374607431768211455",
                "creator": null,
                "side": { "Buy": {} }
            })
        );
    }

    #[test]
    fn struct_keeps_declaration_order() {
        let mut fields = IndexMap::new();
        fields.insert("z".to_string(), NormalizedValue::Bool(true));
        fields.insert("a".to_string(), NormalizedValue::Bool(false));
        let text = serde_json::to_string(&NormalizedValue::Struct(fields)).unwrap();
        assert_eq!(text, r#"{"z":true,"a":false}"#);
    }
}
