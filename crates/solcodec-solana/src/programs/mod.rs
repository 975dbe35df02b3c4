//! Built-in decoders for programs that ship without an Anchor IDL.
//!
//! Instruction data is unpacked with each program's own crate
//! (`solana-system-interface`, `spl-token`, `spl-token-2022` and the token
//! metadata / group interfaces) and the resulting enums are mapped onto
//! `{name, accounts, args}`. Unrecognized opcodes yield a `ParsedInstruction`
//! named `"unknown"` with empty args; only malformed data for a *known*
//! opcode is an error.

pub mod system;
pub mod token;
pub mod token_2022;

use indexmap::IndexMap;
use solcodec_core::{
    address::{SYSTEM_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID},
    error::DecodeError,
    instruction::{NamedAccount, ParsedInstruction},
    transaction::AccountMeta,
    types::NormalizedValue,
};
use spl_token::solana_program::{program_option::COption, pubkey::Pubkey};
use std::fmt::{Debug, Display};

/// A decoder for one well-known program.
pub trait ProgramDecoder: Send + Sync {
    /// Base58 address of the program this decoder handles.
    fn program_id(&self) -> &'static str;

    fn decode(&self, accounts: &[AccountMeta], data: &[u8]) -> Result<ParsedInstruction, DecodeError>;
}

static SYSTEM: system::SystemProgram = system::SystemProgram;
static TOKEN: token::TokenProgram = token::TokenProgram;
static TOKEN_2022: token_2022::Token2022Program = token_2022::Token2022Program;

/// Returns the built-in decoder for `program`, if there is one.
pub fn default_decoder_for(program: &str) -> Option<&'static dyn ProgramDecoder> {
    match program {
        SYSTEM_PROGRAM_ID => Some(&SYSTEM),
        TOKEN_PROGRAM_ID => Some(&TOKEN),
        TOKEN_2022_PROGRAM_ID => Some(&TOKEN_2022),
        _ => None,
    }
}

// ─── Helpers shared by the program decoders ───────────────────────────────────

/// Pairs account metas with names. Metas beyond `names` are named
/// `<extra><n>` (multisig signers, fee sources).
pub(crate) fn named_accounts(names: &[&str], metas: &[AccountMeta], extra: &str) -> Vec<NamedAccount> {
    metas
        .iter()
        .enumerate()
        .map(|(i, m)| NamedAccount {
            name: names
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("{extra}{}", i - names.len())),
            pubkey: m.pubkey.clone(),
            is_signer: m.is_signer,
            is_writable: m.is_writable,
        })
        .collect()
}

/// Insertion-ordered argument struct builder.
#[derive(Default)]
pub(crate) struct Args(IndexMap<String, NormalizedValue>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: NormalizedValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn u64(self, name: &str, v: impl Into<u64>) -> Self {
        self.with(name, NormalizedValue::Uint(v.into()))
    }

    pub fn str(self, name: &str, v: impl Into<String>) -> Self {
        self.with(name, NormalizedValue::Str(v.into()))
    }

    pub fn pubkey(self, name: &str, key: &impl Display) -> Self {
        self.with(name, NormalizedValue::Pubkey(key.to_string()))
    }

    /// `COption<Pubkey>` from the SPL instruction packing.
    pub fn coption(self, name: &str, key: COption<Pubkey>) -> Self {
        let value = match key {
            COption::Some(k) => NormalizedValue::Pubkey(k.to_string()),
            COption::None => NormalizedValue::Null,
        };
        self.with(name, value)
    }

    /// `OptionalNonZeroPubkey` (all-zero means none) or a plain `Option<Pubkey>`.
    pub fn nonzero(self, name: &str, key: impl Into<Option<Pubkey>>) -> Self {
        let value = match key.into() {
            Some(k) => NormalizedValue::Pubkey(k.to_string()),
            None => NormalizedValue::Null,
        };
        self.with(name, value)
    }

    /// A field-less enum rendered by [`variant_name`].
    pub fn variant(self, name: &str, v: &impl Debug) -> Self {
        self.with(name, NormalizedValue::Str(variant_name(v)))
    }

    pub fn build(self) -> NormalizedValue {
        NormalizedValue::Struct(self.0)
    }
}

pub(crate) fn parsed(
    name: &str,
    account_names: &[&str],
    metas: &[AccountMeta],
    args: Args,
) -> ParsedInstruction {
    ParsedInstruction::new(name, named_accounts(account_names, metas, "signer"), args.build())
}

/// lowerCamel name of a field-less enum variant (`AccountOwner` → `accountOwner`).
pub(crate) fn variant_name(v: &impl Debug) -> String {
    let name = format!("{v:?}");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => name,
    }
}

pub(crate) fn malformed(program: &'static str, reason: impl Display) -> DecodeError {
    DecodeError::MalformedInstruction {
        program,
        reason: reason.to_string(),
    }
}
