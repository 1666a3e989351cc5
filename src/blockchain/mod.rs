// Blockchain module
//
// This module contains the core ledger implementation including:
// - Canonical encoding and digests
// - Transaction structure
// - Signature verification and wallets
// - Block structure
// - Proof of work algorithm
// - Ledger (chain plus transaction pool)

pub mod block;
pub mod chain;
pub mod crypto;
pub mod encoding;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{Ledger, LedgerConfig, LedgerError};
pub use crypto::{CryptoError, DigitalSignature, PublicKey, Wallet};
pub use encoding::{CanonicalEncode, Hash256};
pub use transaction::{Transaction, MINING_SENDER};
