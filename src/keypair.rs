use crate::crypto::{self, Keccak256Hash, Signature, Signer};
use crate::error::SigningError;
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use std::fmt;

/// An secp256k1 keypair for signing relay challenges and orders
#[derive(Debug, PartialEq)]
pub struct Keypair {
    secret_key: SecretKey,
    public_key: PublicKey,
    address: String,
}

impl Keypair {
    /// Create and return a keypair with a randomly generated private key.
    pub fn new() -> Keypair {
        let (secret_key, public_key) =
            SECP256K1.generate_keypair(&mut secp256k1::rand::thread_rng());
        Keypair::from_keys(secret_key, public_key)
    }

    /// Create and return a keypair with the given 32 bytes as the private key
    pub fn from_secret_slice(slice: &[u8]) -> Result<Keypair, SigningError> {
        let secret_key =
            SecretKey::from_slice(slice).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        let public_key = PublicKey::from_secret_key(&SECP256K1, &secret_key);
        Ok(Keypair::from_keys(secret_key, public_key))
    }

    /// Create and return a keypair with the given hex string as the private key.
    /// A leading `0x` is accepted.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Keypair, SigningError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(crypto::strip_hex_prefix(secret_hex.trim()), &mut bytes)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Keypair::from_secret_slice(&bytes)
    }

    fn from_keys(secret_key: SecretKey, public_key: PublicKey) -> Keypair {
        let address = crypto::public_key_to_address(&public_key);
        Keypair {
            secret_key,
            public_key,
            address,
        }
    }

    /// Get the lower-case hex address of the keypair
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Sign a 32 byte hash as is, without the personal-message prefix
    pub fn sign_hash(&self, hash: &Keccak256Hash) -> Result<Signature, SigningError> {
        let msg = Message::from_slice(hash)
            .map_err(|e| SigningError::InvalidSignature(e.to_string()))?;
        let signature = SECP256K1.sign_recoverable(&msg, &self.secret_key);
        Ok(Signature::from_recoverable(&signature))
    }
}

impl Default for Keypair {
    fn default() -> Self {
        Keypair::new()
    }
}

impl Signer for Keypair {
    fn address(&self) -> &str {
        &self.address
    }

    fn sign_message(&self, message: &[u8]) -> Result<Signature, SigningError> {
        self.sign_hash(&crypto::hash_message(message))
    }
}

impl fmt::Display for Keypair {
    /// formats a Keypair for println! without revealing the secret
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "address:{} pubkey:{}", self.address, self.public_key)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::recover_address;
    use crate::test_utilities::{MOCK_ADDRESS, MOCK_SECRET_KEY};

    #[test]
    fn keypair_address_test() {
        let keypair = Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap();
        assert_eq!(keypair.address(), MOCK_ADDRESS);
        assert_eq!(keypair.secret_key().to_string(), MOCK_SECRET_KEY);

        let prefixed = Keypair::from_secret_hex(&format!("0x{}", MOCK_SECRET_KEY)).unwrap();
        assert_eq!(prefixed, keypair);

        assert!(Keypair::from_secret_hex("randomtext").is_err());
        assert!(Keypair::from_secret_hex("").is_err());
        assert!(Keypair::from_secret_slice(&[0u8; 32]).is_err());
    }

    #[test]
    fn keypair_signing_test() {
        let keypair = Keypair::from_secret_hex(MOCK_SECRET_KEY).unwrap();
        let signature = keypair.sign_message(b"Some data").unwrap();
        assert_eq!(
            signature.to_string(),
            "0xb91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c"
        );
        assert_eq!(
            recover_address(b"Some data", &signature).unwrap(),
            MOCK_ADDRESS
        );
        assert_ne!(
            recover_address(b"Some other data", &signature).unwrap(),
            MOCK_ADDRESS
        );
    }

    #[test]
    fn keypair_new_test() {
        let keypair = Keypair::new();
        assert_eq!(keypair.address().len(), 42);
        assert!(keypair.address().starts_with("0x"));
        assert_eq!(keypair.address(), keypair.address().to_lowercase());
        assert_eq!(keypair.secret_key().to_string().len(), 64);
    }
}
