use serde::Serialize;
use utoipa::ToSchema;

use super::encoding::{CanonicalEncode, Hash256};

/// Reserved sender identity used to pay mining rewards
pub const MINING_SENDER: &str = "CHAIN";

/// Represents a value transfer between two addresses
///
/// Fields are private so a transaction cannot change once built. Clones are
/// independent values, which keeps the pool and committed blocks from
/// sharing state. Field order here is the canonical encoding's field order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Transaction {
    /// Sender's address
    sender: String,

    /// Receiver's address
    receiver: String,

    /// Amount being transferred
    value: f32,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// No check is made on the sign or magnitude of `value`.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, value: f32) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            value,
        }
    }

    /// Creates a mining reward transaction paid by the reserved sender
    pub fn new_reward(receiver: impl Into<String>, value: f32) -> Self {
        Transaction::new(MINING_SENDER, receiver, value)
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.sender == MINING_SENDER
    }

    /// SHA-256 of the canonical encoding; this is what gets signed
    pub fn digest(&self) -> Hash256 {
        Hash256::of(&self.canonical_bytes())
    }
}

impl CanonicalEncode for Transaction {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let transaction = Transaction::new("alice", "bob", 10.5);

        assert_eq!(transaction.sender(), "alice");
        assert_eq!(transaction.receiver(), "bob");
        assert_eq!(transaction.value(), 10.5);
        assert!(!transaction.is_reward());
    }

    #[test]
    fn test_reward_transaction() {
        let transaction = Transaction::new_reward("miner", 1.0);

        assert_eq!(transaction.sender(), MINING_SENDER);
        assert_eq!(transaction.receiver(), "miner");
        assert!(transaction.is_reward());
    }

    #[test]
    fn test_canonical_encoding() {
        let transaction = Transaction::new("A", "B", 2.0);
        assert_eq!(
            transaction.to_canonical_json(),
            r#"{"sender":"A","receiver":"B","value":2}"#
        );

        let transaction = Transaction::new("A", "B", 0.25);
        assert_eq!(
            transaction.to_canonical_json(),
            r#"{"sender":"A","receiver":"B","value":0.25}"#
        );
    }

    #[test]
    fn test_canonical_encoding_escapes_addresses() {
        let transaction = Transaction::new("<a>", "b&\"c\"", 1.5);
        assert_eq!(
            transaction.to_canonical_json(),
            r#"{"sender":"\u003ca\u003e","receiver":"b\u0026\"c\"","value":1.5}"#
        );
    }

    #[test]
    fn test_digest_is_sha256_of_canonical_bytes() {
        let transaction = Transaction::new("A", "B", 2.0);
        let expected = Hash256::of(br#"{"sender":"A","receiver":"B","value":2}"#);

        assert_eq!(transaction.digest(), expected);
        assert_eq!(transaction.digest(), transaction.clone().digest());
    }

    #[test]
    fn test_digest_depends_on_every_field() {
        let base = Transaction::new("A", "B", 2.0).digest();

        assert_ne!(base, Transaction::new("X", "B", 2.0).digest());
        assert_ne!(base, Transaction::new("A", "X", 2.0).digest());
        assert_ne!(base, Transaction::new("A", "B", 2.5).digest());
        // Swapping sender and receiver must not collide
        assert_ne!(base, Transaction::new("B", "A", 2.0).digest());
    }
}
