use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;

use super::encoding::Hash256;
use super::transaction::Transaction;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Failed to sign message: {0}")]
    SigningError(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// Represents a public key (hex encoded, 32 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublicKey(pub String);

impl PublicKey {
    /// Creates a public key from a verifying key
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        PublicKey(hex::encode(key.as_bytes()))
    }

    /// Converts the public key to a verifying key
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = hex::decode(&self.0).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidPublicKey("Invalid public key length".to_string())
        })?;

        VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a digital signature (hex encoded, 64 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(hex::encode(signature.to_bytes()))
    }

    /// Converts the digital signature to a signature
    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = hex::decode(&self.0).map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidSignature("Invalid signature length".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

impl fmt::Display for DigitalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a hex encoded 32 byte private key
fn parse_signing_key(private_key: &str) -> Result<SigningKey, CryptoError> {
    let bytes = hex::decode(private_key)
        .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;

    let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPrivateKey("Invalid private key length".to_string())
    })?;

    Ok(SigningKey::from_bytes(&key_bytes))
}

/// Signs the digest of a transaction with a hex encoded private key
///
/// The signature covers only the transaction's canonical digest, never its
/// position in a block, so it stays valid however long the transaction waits
/// in the pool.
pub fn sign(transaction: &Transaction, private_key: &str) -> Result<DigitalSignature, CryptoError> {
    let signing_key =
        parse_signing_key(private_key).map_err(|e| CryptoError::SigningError(e.to_string()))?;
    Ok(sign_digest(&signing_key, &transaction.digest()))
}

fn sign_digest(signing_key: &SigningKey, digest: &Hash256) -> DigitalSignature {
    DigitalSignature::from_signature(&signing_key.sign(&digest.0))
}

/// Verifies a transaction signature against the sender's public key
///
/// Malformed keys and signatures count as a failed verification.
pub fn verify(transaction: &Transaction, public_key: &PublicKey, signature: &DigitalSignature) -> bool {
    let Ok(verifying_key) = public_key.to_verifying_key() else {
        return false;
    };
    let Ok(signature) = signature.to_signature() else {
        return false;
    };

    verifying_key
        .verify(&transaction.digest().0, &signature)
        .is_ok()
}

/// Key pair plus derived address; the node's identity provider
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: String,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let mut csprng = OsRng;
        Wallet::from_signing_key(SigningKey::generate(&mut csprng))
    }

    /// Creates a wallet from a hex encoded secret key
    pub fn from_private_key(private_key: &str) -> Result<Self, CryptoError> {
        Ok(Wallet::from_signing_key(parse_signing_key(private_key)?))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = derive_address(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(&self.verifying_key)
    }

    /// Exports the wallet's secret key as hex
    pub fn private_key(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signs a transaction with the wallet's private key
    pub fn sign(&self, transaction: &Transaction) -> DigitalSignature {
        sign_digest(&self.signing_key, &transaction.digest())
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Wallet::new()
    }
}

/// Base58 of the SHA-256 of the public key
fn derive_address(verifying_key: &VerifyingKey) -> String {
    bs58::encode(Hash256::of(verifying_key.as_bytes()).0).into_string()
}
