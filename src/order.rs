//! Order signing.
//!
//! An order is hashed the way the exchange contract hashes it: the eight
//! fields are packed back to back in a fixed order, addresses as 20 bytes
//! and amounts as 32 byte big-endian integers, and the keccak-256 of that
//! packing is signed as a personal message. Any drift in this layout yields
//! a signature the contract silently refuses, so the layout is pinned by
//! the tests below.

use crate::crypto::{self, Keccak256Hash, Signature, Signer};
use crate::error::SigningError;
use bigint::U256;
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::{
    deserialize_number_from_string, deserialize_string_from_number,
};

/// Byte length of the packed order encoding.
pub const ENCODED_ORDER_SIZE: usize = 4 * 20 + 4 * 32;

/// The unsigned fields of a trade proposal.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub maker_address: String,
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub maker_amount: String,
    pub maker_token: String,
    pub taker_address: String,
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub taker_amount: String,
    pub taker_token: String,
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub nonce: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub expiration: u64,
}

/// An order with the maker's signature split into `r`, `s` and `v`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl Order {
    /// Whether the order is expired at `now_secs` (unix seconds).
    pub fn is_expired(&self, now_secs: u64) -> bool {
        self.expiration <= now_secs
    }

    /// Packs the fields in contract order:
    ///
    /// ```bytes
    /// 0-19      makerAddress  address
    /// 20-51     makerAmount   uint256
    /// 52-71     makerToken    address
    /// 72-91     takerAddress  address
    /// 92-123    takerAmount   uint256
    /// 124-143   takerToken    address
    /// 144-175   nonce         uint256
    /// 176-207   expiration    uint256
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>, SigningError> {
        let mut vbytes: Vec<u8> = Vec::with_capacity(ENCODED_ORDER_SIZE);
        vbytes.extend(&crypto::parse_address(&self.maker_address)?);
        vbytes.extend(&parse_uint256(&self.maker_amount)?);
        vbytes.extend(&crypto::parse_address(&self.maker_token)?);
        vbytes.extend(&crypto::parse_address(&self.taker_address)?);
        vbytes.extend(&parse_uint256(&self.taker_amount)?);
        vbytes.extend(&crypto::parse_address(&self.taker_token)?);
        vbytes.extend(&parse_uint256(&self.nonce)?);
        vbytes.extend(&uint256_from_u64(self.expiration));
        Ok(vbytes)
    }

    pub fn hash(&self) -> Result<Keccak256Hash, SigningError> {
        Ok(crypto::keccak256(&self.encode()?))
    }
}

impl SignedOrder {
    pub fn signature(&self) -> Result<Signature, SigningError> {
        Signature::from_rsv(&self.r, &self.s, self.v)
    }

    pub fn is_signed_by(&self, address: &str) -> bool {
        match recover_order_signer(self) {
            Ok(signer) => signer.eq_ignore_ascii_case(address),
            Err(_) => false,
        }
    }
}

/// Signs `order` with `signer`. Nothing is sent anywhere.
pub fn sign_order(order: Order, signer: &dyn Signer) -> Result<SignedOrder, SigningError> {
    let hash = order.hash()?;
    let signature = signer.sign_message(&hash)?;
    Ok(SignedOrder {
        order,
        r: signature.r_hex(),
        s: signature.s_hex(),
        v: signature.v(),
    })
}

/// Address whose key produced the signature on `signed_order`.
pub fn recover_order_signer(signed_order: &SignedOrder) -> Result<String, SigningError> {
    let hash = signed_order.order.hash()?;
    crypto::recover_address(&hash, &signed_order.signature()?)
}

/// A uint256 as 32 big-endian bytes. Decimal, or hex with a `0x` prefix.
pub fn parse_uint256(value: &str) -> Result<[u8; 32], SigningError> {
    let value = value.trim();
    let mut bytes = [0u8; 32];
    let digits = crypto::strip_hex_prefix(value);
    if digits.len() != value.len() {
        if digits.is_empty() || digits.len() > 64 {
            return Err(SigningError::InvalidUint(value.to_string()));
        }
        hex::decode_to_slice(format!("{:0>64}", digits), &mut bytes)
            .map_err(|_| SigningError::InvalidUint(value.to_string()))?;
        return Ok(bytes);
    }
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SigningError::InvalidUint(value.to_string()));
    }
    let number =
        U256::from_dec_str(value).map_err(|_| SigningError::InvalidUint(value.to_string()))?;
    number.to_big_endian(&mut bytes);
    Ok(bytes)
}

fn uint256_from_u64(value: u64) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&value.to_be_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::Keypair;
    use crate::test_utilities::{mock_order, MOCK_SECRET_KEY};
    use serde_json::json;

    #[test]
    fn test_encode_layout() {
        let order = Order {
            maker_address: String::from("0x00000000000000000000000000000000000000aa"),
            maker_amount: String::from("100"),
            maker_token: String::from("0x00000000000000000000000000000000000000bb"),
            taker_address: String::from("0x00000000000000000000000000000000000000cc"),
            taker_amount: String::from("1"),
            taker_token: String::from("0x00000000000000000000000000000000000000dd"),
            nonce: String::from("0x0102"),
            expiration: 1700000000,
        };
        let bytes = order.encode().unwrap();
        assert_eq!(bytes.len(), ENCODED_ORDER_SIZE);
        assert_eq!(bytes[19], 0xaa);
        assert_eq!(bytes[20..51], [0u8; 31]);
        assert_eq!(bytes[51], 100);
        assert_eq!(bytes[71], 0xbb);
        assert_eq!(bytes[91], 0xcc);
        assert_eq!(bytes[123], 1);
        assert_eq!(bytes[143], 0xdd);
        assert_eq!(bytes[174..176], [0x01, 0x02]);
        assert_eq!(bytes[176..], uint256_from_u64(1700000000));
        assert_eq!(bytes[204..], 1700000000u32.to_be_bytes());
    }

    #[test]
    fn test_parse_uint256() {
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_uint256(max).unwrap(), [0xff; 32]);
        assert_eq!(parse_uint256("256").unwrap()[30..], [1, 0]);
        assert_eq!(parse_uint256("0").unwrap(), [0; 32]);
        assert!(parse_uint256(&format!("{}0", max)).is_err());
        assert!(parse_uint256("-1").is_err());
        assert!(parse_uint256("1.5").is_err());
        assert!(parse_uint256("").is_err());
        assert!(parse_uint256("0xzz").is_err());
        assert_eq!(parse_uint256("0X0100").unwrap(), parse_uint256("256").unwrap());
        assert_eq!(parse_uint256("0xff").unwrap()[31], 0xff);
    }

    #[test]
    fn test_sign_order() {
        let keypair = Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap();
        let order = mock_order(keypair.address());
        let signed = sign_order(order.clone(), &keypair).unwrap();

        assert_eq!(signed.order, order);
        assert_eq!(signed.r.len(), 66);
        assert_eq!(signed.s.len(), 66);
        assert!(signed.r.starts_with("0x"));
        assert!(signed.v == 27 || signed.v == 28);

        assert_eq!(recover_order_signer(&signed).unwrap(), keypair.address());
        assert!(signed.is_signed_by(keypair.address()));

        // deterministic for the same key and fields
        assert_eq!(sign_order(order, &keypair).unwrap(), signed);
    }

    #[test]
    fn test_tampered_order_recovers_other_address() {
        let keypair = Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap();
        let signed = sign_order(mock_order(keypair.address()), &keypair).unwrap();

        let other = "0x00000000000000000000000000000000000000ee";
        let fields = [
            "makerAddress",
            "makerAmount",
            "makerToken",
            "takerAddress",
            "takerAmount",
            "takerToken",
            "nonce",
            "expiration",
        ];

        for field in fields {
            let mut tampered = signed.clone();
            let order = &mut tampered.order;
            match field {
                "makerAddress" => order.maker_address = other.to_string(),
                "makerAmount" => order.maker_amount = String::from("101"),
                "makerToken" => order.maker_token = other.to_string(),
                "takerAddress" => order.taker_address = other.to_string(),
                "takerAmount" => order.taker_amount = String::from("100001"),
                "takerToken" => order.taker_token = other.to_string(),
                "nonce" => order.nonce = String::from("43"),
                _ => order.expiration += 1,
            }
            assert_ne!(tampered.order, signed.order, "{} unchanged", field);
            assert_ne!(
                recover_order_signer(&tampered).unwrap(),
                keypair.address(),
                "{} not covered by the signature",
                field
            );
            assert!(!tampered.is_signed_by(keypair.address()));
        }
    }

    #[test]
    fn test_malformed_field_fails_signing() {
        let keypair = Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap();
        let mut order = mock_order(keypair.address());
        order.maker_token = String::from("0xT1");
        assert_eq!(
            sign_order(order, &keypair),
            Err(SigningError::InvalidAddress(String::from("0xT1")))
        );

        let mut order = mock_order(keypair.address());
        order.taker_address = String::from("0xA");
        assert_eq!(
            sign_order(order, &keypair),
            Err(SigningError::InvalidAddress(String::from("0xA")))
        );

        let mut order = mock_order(keypair.address());
        order.maker_amount = String::from("one hundred");
        assert!(matches!(
            sign_order(order, &keypair),
            Err(SigningError::InvalidUint(_))
        ));
    }

    #[test]
    fn test_signed_order_json() {
        let keypair = Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap();
        let signed = sign_order(mock_order(keypair.address()), &keypair).unwrap();
        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["makerAddress"], json!(keypair.address()));
        assert_eq!(value["expiration"], json!(signed.order.expiration));
        assert_eq!(value["v"], json!(signed.v));

        let parsed: SignedOrder = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, signed);
    }

    #[test]
    fn test_order_accepts_numbers_and_strings() {
        let order: Order = serde_json::from_value(json!({
            "makerAddress": "0xa",
            "makerAmount": 100,
            "makerToken": "0x1",
            "takerAddress": "0xb",
            "takerAmount": "1",
            "takerToken": "0x2",
            "nonce": 7,
            "expiration": "1700000000"
        }))
        .unwrap();
        assert_eq!(order.maker_amount, "100");
        assert_eq!(order.nonce, "7");
        assert_eq!(order.expiration, 1700000000);
        assert!(order.is_expired(1700000000));
        assert!(!order.is_expired(1699999999));
    }
}
