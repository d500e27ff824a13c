use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const INVALID: u8 = 255;

static BASE58_LOOKUP: [u8; 128] = {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < BASE58_ALPHABET.len() {
        table[BASE58_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// A TRON account address: the 0x41 prefix byte plus a 20-byte account id.
///
/// The canonical text form is base58check (34 chars, starts with 'T'). Every
/// externally supplied address goes through [`TronAddress::from_base58check`],
/// which validates the checksum.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    pub const PREFIX: u8 = 0x41;

    pub fn from_prefixed_bytes(bytes: [u8; 21]) -> Result<Self> {
        if bytes[0] != Self::PREFIX {
            anyhow::bail!("tron address must start with 0x41, got 0x{:02x}", bytes[0]);
        }
        Ok(Self(bytes))
    }

    pub fn from_base58check(s: &str) -> Result<Self> {
        let decoded = base58_decode(s).with_context(|| format!("decode base58 address {s:?}"))?;
        if decoded.len() != 25 {
            anyhow::bail!("address {s:?} decodes to {} bytes, want 25", decoded.len());
        }
        let (payload, checksum) = decoded.split_at(21);
        let digest = Sha256::digest(Sha256::digest(payload));
        if digest[..4] != *checksum {
            anyhow::bail!("address {s:?} has a bad checksum");
        }
        let mut bytes = [0u8; 21];
        bytes.copy_from_slice(payload);
        Self::from_prefixed_bytes(bytes)
    }

    /// 0x41-prefixed 21-byte form used by the wallet HTTP API in hex mode.
    pub fn prefixed_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// Hex form ("41" + 40 hex chars) accepted by the node when `visible=false`.
    pub fn hex41(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_base58check(&self) -> String {
        let digest = Sha256::digest(Sha256::digest(self.0));
        let mut full = [0u8; 25];
        full[..21].copy_from_slice(&self.0);
        full[21..].copy_from_slice(&digest[..4]);
        base58_encode(&full)
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58check())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({})", self.to_base58check())
    }
}

impl FromStr for TronAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58check(s)
    }
}

impl Serialize for TronAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58check())
    }
}

impl<'de> Deserialize<'de> for TronAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58check(&s).map_err(serde::de::Error::custom)
    }
}

fn base58_decode(s: &str) -> Result<Vec<u8>> {
    let mut num: Vec<u8> = vec![0];
    for byte in s.bytes() {
        let digit = if (byte as usize) < BASE58_LOOKUP.len() {
            BASE58_LOOKUP[byte as usize]
        } else {
            INVALID
        };
        if digit == INVALID {
            anyhow::bail!("invalid base58 character {:?}", byte as char);
        }

        let mut carry = u32::from(digit);
        for b in num.iter_mut().rev() {
            let v = u32::from(*b) * 58 + carry;
            *b = (v & 0xff) as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            num.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let n_zeros = s.bytes().take_while(|&b| b == b'1').count();
    let start = num.iter().take_while(|&&b| b == 0).count();
    let mut out = vec![0u8; n_zeros];
    out.extend_from_slice(&num[start..]);
    Ok(out)
}

fn base58_encode(bytes: &[u8]) -> String {
    let mut num = bytes.to_vec();
    let mut out = Vec::new();
    let n_zeros = bytes.iter().take_while(|&&b| b == 0).count();

    while num.iter().any(|&b| b != 0) {
        let mut rem: u32 = 0;
        for b in num.iter_mut() {
            let v = (rem << 8) | u32::from(*b);
            *b = (v / 58) as u8;
            rem = v % 58;
        }
        out.push(BASE58_ALPHABET[rem as usize]);
    }
    for _ in 0..n_zeros {
        out.push(b'1');
    }
    out.reverse();
    String::from_utf8(out).expect("base58 alphabet is ascii")
}
