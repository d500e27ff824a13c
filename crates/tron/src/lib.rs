//! TRON wallet HTTP-API plumbing: base58check addresses, secp256k1 signing,
//! node clients with multi-view reads, and staking/resource math.

pub mod abi;
pub mod address;
pub mod client;
pub mod protocol;
pub mod resources;
pub mod wallet;

pub use address::TronAddress;
pub use client::{
    ConstantCallRequest, HttpNode, MergeMax, NodeClient, NodeCluster, NodeKind, ResourceCode,
};
pub use wallet::TronWallet;
