//! Block identity and the concrete header type decoded from JSON-RPC.
//!
//! The tracker only needs a block's own hash and its parent's hash; everything else is
//! carried along for the consumer.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 32-byte block hash. Displays as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockHash(pub [u8; 32]);

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseHashError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

impl FromStr for BlockHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        if bytes.len() != 32 {
            return Err(ParseHashError::Length(bytes.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Anything the tracker can follow: identified by its hash, linked to its parent.
pub trait Block: Clone + Send + Sync + 'static {
    fn hash(&self) -> BlockHash;
    fn parent_hash(&self) -> BlockHash;
}

/// Block header as returned by `eth_getBlockByHash` / `eth_getBlockByNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    pub timestamp: u64,
}

impl Block for BlockHeader {
    fn hash(&self) -> BlockHash {
        self.hash
    }

    fn parent_hash(&self) -> BlockHash {
        self.parent_hash
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("missing field {0}")]
    Missing(&'static str),
    #[error("invalid field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Decode a JSON-RPC block object (transactions omitted or as hashes).
pub fn decode_block_header(value: &Value) -> Result<BlockHeader, DecodeError> {
    Ok(BlockHeader {
        number: parse_quantity(value, "number")?,
        hash: parse_hash(value, "hash")?,
        parent_hash: parse_hash(value, "parentHash")?,
        timestamp: parse_quantity(value, "timestamp")?,
    })
}

fn field<'a>(value: &'a Value, name: &'static str) -> Result<&'a str, DecodeError> {
    value
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or(DecodeError::Missing(name))
}

fn parse_quantity(value: &Value, name: &'static str) -> Result<u64, DecodeError> {
    let s = field(value, name)?;
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).map_err(|e| {
        DecodeError::Invalid {
            field: name,
            reason: e.to_string(),
        }
    })
}

fn parse_hash(value: &Value, name: &'static str) -> Result<BlockHash, DecodeError> {
    field(value, name)?
        .parse()
        .map_err(|e: ParseHashError| DecodeError::Invalid {
            field: name,
            reason: e.to_string(),
        })
}
