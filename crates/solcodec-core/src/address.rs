//! Public key helpers and well-known program addresses.

use crate::error::RegistryError;

/// System program
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
/// SPL Token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// SPL Token-2022 program
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

/// Renders a 32-byte key as base58.
pub fn encode_pubkey(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Parses a base58 address, requiring exactly 32 bytes.
pub fn decode_pubkey(address: &str) -> Result<[u8; 32], RegistryError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| RegistryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| RegistryError::InvalidAddress {
            address: address.to_string(),
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })
}

pub fn is_valid_pubkey(address: &str) -> bool {
    decode_pubkey(address).is_ok()
}

/// Returns `true` for the programs covered by the built-in decoders.
pub fn is_default_program(address: &str) -> bool {
    matches!(
        address,
        SYSTEM_PROGRAM_ID | TOKEN_PROGRAM_ID | TOKEN_2022_PROGRAM_ID
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_ids_are_valid_keys() {
        for id in [SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID] {
            assert!(is_valid_pubkey(id), "{id}");
        }
        assert_eq!(decode_pubkey(SYSTEM_PROGRAM_ID).unwrap(), [0u8; 32]);
    }

    #[test]
    fn rejects_wrong_length() {
        let short = bs58::encode([7u8; 20]).into_string();
        let err = decode_pubkey(&short).unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
        assert!(decode_pubkey("not-base58-0OIl").is_err());
    }

    #[test]
    fn round_trips_through_base58() {
        let key = [42u8; 32];
        let text = encode_pubkey(&key);
        assert_eq!(decode_pubkey(&text).unwrap(), key);
    }
}
