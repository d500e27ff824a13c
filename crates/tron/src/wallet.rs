use crate::address::TronAddress;
use crate::protocol::{BuiltTransaction, SignedTransaction};
use anyhow::{Context, Result};
use k256::ecdsa::SigningKey;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// A secp256k1 keypair with its derived TRON address.
///
/// Signing covers `sha256(raw_data_bytes)`; the node recovers the public key
/// from the 65-byte signature and checks it against the permission the
/// transaction was stamped with.
#[derive(Clone)]
pub struct TronWallet {
    key: SigningKey,
    address: TronAddress,
}

impl std::fmt::Debug for TronWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl TronWallet {
    pub fn new(private_key: [u8; 32]) -> Result<Self> {
        let key = SigningKey::from_bytes(&private_key.into()).context("invalid secp256k1 key")?;
        let address = derive_address(&key);
        Ok(Self { key, address })
    }

    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(private_key_hex.trim()).context("private key is not hex")?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("private key must be 32 bytes"))?;
        Self::new(key)
    }

    pub fn address(&self) -> TronAddress {
        self.address
    }

    /// Signs a node-built transaction skeleton and returns it in broadcast
    /// shape. The txid is recomputed locally from `raw_data_hex` rather than
    /// trusted from the node.
    pub fn sign_transaction(&self, tx: &BuiltTransaction) -> Result<SignedTransaction> {
        if let Some(err) = &tx.error {
            anyhow::bail!("node refused to build transaction: {err}");
        }
        if tx.raw_data_hex.is_empty() {
            anyhow::bail!("node returned no raw_data_hex");
        }

        let raw_bytes = hex::decode(&tx.raw_data_hex).context("decode raw_data_hex")?;
        let txid = hex::encode(Sha256::digest(&raw_bytes));

        let (sig, recid) = self
            .key
            .sign_digest_recoverable(Sha256::new_with_prefix(&raw_bytes))
            .context("sign transaction digest")?;

        let mut sig65 = sig.to_bytes().to_vec();
        sig65.push(recid.to_byte() + 27);

        Ok(SignedTransaction {
            txid,
            raw_data: tx.raw_data.clone(),
            raw_data_hex: tx.raw_data_hex.clone(),
            signature: vec![hex::encode(sig65)],
            visible: true,
        })
    }
}

fn derive_address(key: &SigningKey) -> TronAddress {
    let pubkey = key.verifying_key().to_encoded_point(false);
    let digest = Keccak256::digest(&pubkey.as_bytes()[1..]);

    let mut bytes = [0u8; 21];
    bytes[0] = TronAddress::PREFIX;
    bytes[1..].copy_from_slice(&digest[12..]);
    TronAddress::from_prefixed_bytes(bytes).expect("prefix byte is set")
}

/// Serialized size of a signed transaction, used as its BANDWIDTH cost:
/// the raw-data bytes plus a flat 64 bytes per signature.
pub fn signed_size_estimate(raw_data_hex: &str, signatures: usize) -> u64 {
    (raw_data_hex.len() as u64) / 2 + 64 * signatures as u64
}
