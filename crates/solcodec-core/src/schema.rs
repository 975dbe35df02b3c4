//! Schema types: the in-memory representation of a registered program IDL.
//!
//! Both IDL dialects are normalized into a single [`ProgramSchema`] at
//! registration time. Decoders only ever see this form.

use crate::types::FieldLayout;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// 8-byte tag prefixing instruction data, account data and event payloads.
pub type Discriminator = [u8; 8];

/// IDL dialect a schema was registered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Pre-0.30 Anchor IDLs: tags derived from names.
    Legacy,
    /// Anchor 0.30+ IDLs: explicit `address` and `discriminator` fields.
    Modern,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Dialect::Legacy => "legacy",
            Dialect::Modern => "modern",
        };
        write!(f, "{s}")
    }
}

/// A named field within a struct, instruction or enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub layout: FieldLayout,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, layout: FieldLayout) -> Self {
        Self {
            name: name.into(),
            layout,
        }
    }
}

/// Payload shape of an enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantFields {
    Unit,
    Named(Vec<FieldDef>),
    Tuple(Vec<FieldLayout>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub fields: VariantFields,
}

/// A user-defined type from the IDL `types` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDef {
    Struct(Vec<FieldDef>),
    /// Variants indexed by their 1-byte discriminant
    Enum(Vec<EnumVariant>),
    Alias(FieldLayout),
}

impl TypeDef {
    /// Case-insensitive variant lookup. Returns the variant's discriminant too.
    pub fn variant_by_name(&self, name: &str) -> Option<(u8, &EnumVariant)> {
        match self {
            TypeDef::Enum(variants) => variants
                .iter()
                .enumerate()
                .find(|(_, v)| v.name.eq_ignore_ascii_case(name))
                .map(|(i, v)| (i as u8, v)),
            _ => None,
        }
    }
}

/// An account slot expected by an instruction, flattened from nested groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionAccountDef {
    pub name: String,
    #[serde(default)]
    pub is_signer: bool,
    #[serde(default)]
    pub is_writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionDef {
    pub name: String,
    /// Data prefix identifying this instruction (8 bytes for Anchor programs)
    pub discriminator: Vec<u8>,
    pub accounts: Vec<InstructionAccountDef>,
    pub args: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDef {
    pub name: String,
    pub discriminator: Discriminator,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    pub discriminator: Discriminator,
    pub fields: Vec<FieldDef>,
}

/// A parsed, validated program schema. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramSchema {
    /// Base58 program address
    pub program_address: String,
    pub dialect: Dialect,
    /// IDL name (`name` or `metadata.name`)
    pub name: String,
    pub instructions: Vec<InstructionDef>,
    pub instruction_names: BTreeSet<String>,
    /// Account layouts in declaration order, scanned linearly on decode
    pub accounts: Vec<AccountDef>,
    pub type_definitions: HashMap<String, TypeDef>,
    pub events: Vec<EventDef>,
}

impl ProgramSchema {
    /// Finds the instruction whose discriminator prefixes `data`.
    pub fn instruction_for(&self, data: &[u8]) -> Option<&InstructionDef> {
        self.instructions
            .iter()
            .find(|ix| !ix.discriminator.is_empty() && data.starts_with(&ix.discriminator))
    }

    /// Exact comparison of the first 8 bytes against declared account tags.
    pub fn account_for(&self, data: &[u8]) -> Option<&AccountDef> {
        let tag = data.get(..8)?;
        self.accounts.iter().find(|a| a.discriminator[..] == *tag)
    }

    pub fn event_for(&self, data: &[u8]) -> Option<&EventDef> {
        let tag = data.get(..8)?;
        self.events.iter().find(|e| e.discriminator[..] == *tag)
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.type_definitions.get(name)
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

/// `sha256("<namespace>:<name>")[..8]`, the name-derived tag scheme used by
/// Anchor and the SPL interface programs.
pub fn sighash(namespace: &str, name: &str) -> Discriminator {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Converts an IDL identifier (`camelCase` or `PascalCase`) to `snake_case`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if i > 0 && (prev_lower || (prev_upper && next_lower)) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A thread-safe, read-only view of the program schema registry.
/// The concrete implementation lives in `solcodec-registry`.
pub trait SchemaRegistry: Send + Sync {
    /// Look up a program's schema by its base58 address.
    fn get(&self, program_address: &str) -> Option<Arc<ProgramSchema>>;

    fn contains(&self, program_address: &str) -> bool {
        self.get(program_address).is_some()
    }

    /// All registered program addresses.
    fn programs(&self) -> Vec<String>;

    /// Whether any registered schema declares an instruction with this name.
    fn has_instruction_name(&self, name: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sighash_matches_anchor_global_namespace() {
        // Anchor's well-known `initialize` tag
        assert_eq!(
            sighash("global", "initialize"),
            [0xaf, 0xaf, 0x6d, 0x1f, 0x0d, 0x98, 0x9b, 0xed]
        );
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("initialize"), "initialize");
        assert_eq!(to_snake_case("swapBaseIn"), "swap_base_in");
        assert_eq!(to_snake_case("SetAuthority"), "set_authority");
        assert_eq!(to_snake_case("withdrawV2"), "withdraw_v2");
    }

    #[test]
    fn variant_lookup_is_case_insensitive() {
        let def = TypeDef::Enum(vec![
            EnumVariant {
                name: "Buy".into(),
                fields: VariantFields::Unit,
            },
            EnumVariant {
                name: "Sell".into(),
                fields: VariantFields::Unit,
            },
        ]);
        let (idx, v) = def.variant_by_name("sell").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(v.name, "Sell");
        assert!(def.variant_by_name("hold").is_none());
    }

    #[test]
    fn account_lookup_needs_full_tag() {
        let schema = ProgramSchema {
            program_address: "11111111111111111111111111111111".into(),
            dialect: Dialect::Modern,
            name: "demo".into(),
            instructions: vec![],
            instruction_names: BTreeSet::new(),
            accounts: vec![AccountDef {
                name: "Pool".into(),
                discriminator: [1, 2, 3, 4, 5, 6, 7, 8],
                fields: vec![],
            }],
            type_definitions: HashMap::new(),
            events: vec![],
        };
        assert!(schema.account_for(&[1, 2, 3, 4, 5, 6, 7, 8, 0xff]).is_some());
        assert!(schema.account_for(&[1, 2, 3, 4, 5, 6, 7]).is_none());
        assert!(schema.account_for(&[1, 2, 3, 4, 5, 6, 7, 9]).is_none());
    }
}
