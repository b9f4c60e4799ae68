//! Account address normalization
//!
//! The same Substrate account shows up under different SS58 prefixes depending
//! on which node or indexer produced it, so addresses are never compared as
//! raw strings. Everything is reduced to a canonical form first:
//! SS58 with prefix 0 for 32-byte accounts, lowercase hex for 20-byte
//! Ethereum-style accounts.

use sp_core::crypto::{AccountId32, Ss58AddressFormat, Ss58Codec};
use thiserror::Error;

/// Prefix used for canonical comparison
pub const CANONICAL_PREFIX: u16 = 0;

const ACCOUNT_ID_LEN: usize = 32;
const ETHEREUM_ADDRESS_LEN: usize = 20;
/// Prefixes from 16384 upwards cannot be encoded in two bytes
const MAX_SS58_PREFIX: u16 = 0x3FFF;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid SS58 address: {0}")]
    Ss58(String),
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("unsupported SS58 prefix {0}")]
    UnsupportedPrefix(u16),
    #[error("unexpected address length {0}")]
    InvalidLength(usize),
}

/// Public key behind an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKey {
    Substrate([u8; ACCOUNT_ID_LEN]),
    Ethereum([u8; ETHEREUM_ADDRESS_LEN]),
}

impl AccountKey {
    /// Parse an SS58 address, a `0x` H160 address or a `0x` 32-byte account id
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let address = address.trim();

        if let Some(hex_part) = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
        {
            let bytes = hex::decode(hex_part).map_err(|e| AddressError::Hex(e.to_string()))?;
            return match bytes.len() {
                ETHEREUM_ADDRESS_LEN => {
                    let mut key = [0u8; ETHEREUM_ADDRESS_LEN];
                    key.copy_from_slice(&bytes);
                    Ok(AccountKey::Ethereum(key))
                }
                ACCOUNT_ID_LEN => {
                    let mut key = [0u8; ACCOUNT_ID_LEN];
                    key.copy_from_slice(&bytes);
                    Ok(AccountKey::Substrate(key))
                }
                len => Err(AddressError::InvalidLength(len)),
            };
        }

        let (key, _prefix) = decode_ss58(address)?;
        Ok(AccountKey::Substrate(key))
    }

    /// Re-encode under `prefix`. Ethereum keys have no SS58 form and are
    /// rendered as lowercase hex.
    pub fn to_ss58(&self, prefix: u16) -> Result<String, AddressError> {
        match self {
            AccountKey::Substrate(key) => encode_ss58(key, prefix),
            AccountKey::Ethereum(key) => Ok(format!("0x{}", hex::encode(key))),
        }
    }

    pub fn canonical(&self) -> String {
        match self {
            AccountKey::Substrate(key) => AccountId32::new(*key)
                .to_ss58check_with_version(Ss58AddressFormat::custom(CANONICAL_PREFIX)),
            AccountKey::Ethereum(key) => format!("0x{}", hex::encode(key)),
        }
    }
}

/// Encode a 32-byte account id as SS58 under `prefix`
pub fn encode_ss58(key: &[u8; ACCOUNT_ID_LEN], prefix: u16) -> Result<String, AddressError> {
    if prefix > MAX_SS58_PREFIX {
        return Err(AddressError::UnsupportedPrefix(prefix));
    }

    Ok(AccountId32::new(*key).to_ss58check_with_version(Ss58AddressFormat::custom(prefix)))
}

/// Decode an SS58 address into its account id and network prefix
pub fn decode_ss58(address: &str) -> Result<([u8; ACCOUNT_ID_LEN], u16), AddressError> {
    let (account, format) = AccountId32::from_ss58check_with_version(address)
        .map_err(|e| AddressError::Ss58(format!("{:?}", e)))?;

    Ok((account.into(), u16::from(format)))
}

pub fn is_ethereum_address(address: &str) -> bool {
    matches!(AccountKey::parse(address), Ok(AccountKey::Ethereum(_)))
}

/// Re-encode `address` under `prefix`. Unparseable input is returned as-is.
pub fn reformat_address(address: &str, prefix: u16) -> String {
    AccountKey::parse(address)
        .and_then(|key| key.to_ss58(prefix))
        .unwrap_or_else(|_| address.to_string())
}

/// Canonical form of `address`, or the input itself when it does not parse
pub fn canonical_address(address: &str) -> String {
    AccountKey::parse(address)
        .map(|key| key.canonical())
        .unwrap_or_else(|_| address.trim().to_string())
}

/// Compare two addresses by the account they refer to
pub fn is_same_address(a: &str, b: &str) -> bool {
    match (AccountKey::parse(a), AccountKey::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}
