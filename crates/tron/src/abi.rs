//! Minimal ABI encoding for the one call the gas station simulates:
//! TRC20 `transfer(address,uint256)`.

use crate::address::TronAddress;

pub const TRANSFER_SELECTOR: &str = "transfer(address,uint256)";

/// Encodes the `transfer(address,uint256)` argument words as the
/// `triggerconstantcontract` endpoint expects them: two 32-byte words, hex,
/// no selector. The address word carries the 20-byte account id without the
/// 0x41 prefix.
pub fn encode_transfer_params(to: TronAddress, amount: u64) -> String {
    let mut words = [0u8; 64];
    words[12..32].copy_from_slice(&to.prefixed_bytes()[1..]);
    words[56..64].copy_from_slice(&amount.to_be_bytes());
    hex::encode(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_two_padded_words() {
        let to = TronAddress::from_base58check("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap();
        let params = encode_transfer_params(to, 1);

        assert_eq!(params.len(), 128);
        assert!(params.starts_with("000000000000000000000000"));
        assert_eq!(&params[24..64], hex::encode(&to.prefixed_bytes()[1..]));
        assert!(params.ends_with("0000000000000001"));
    }

    #[test]
    fn amount_is_big_endian() {
        let to = TronAddress::from_base58check("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap();
        let params = encode_transfer_params(to, 0x0102_0304);
        assert!(params.ends_with("0000000001020304"));
    }
}
