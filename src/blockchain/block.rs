use serde::Serialize;

use super::encoding::{CanonicalEncode, Hash256};
use super::transaction::Transaction;

/// Represents a block in the blockchain
///
/// Serializes as `{"nonce","prev_hash","timestamp","transactions"}` in that
/// order, with `prev_hash` as lowercase hex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    /// Proof of work (nonce)
    nonce: u64,

    /// Hash of the previous block
    prev_hash: Hash256,

    /// Creation time in nanoseconds since the Unix epoch
    timestamp: i64,

    /// List of transactions included in this block
    transactions: Vec<Transaction>,
}

impl Block {
    /// Creates a new block
    ///
    /// The timestamp is supplied by the caller so that hashing stays
    /// reproducible.
    pub fn new(nonce: u64, prev_hash: Hash256, transactions: Vec<Transaction>, timestamp: i64) -> Self {
        Block {
            nonce,
            prev_hash,
            timestamp,
            transactions,
        }
    }

    /// The block every field of which is zero or empty.
    ///
    /// Its digest is the predecessor hash of the genesis block. The empty
    /// transaction list encodes as `[]`, not `null`, so this digest differs
    /// from one computed over a `null` list.
    pub fn empty() -> Self {
        Block::new(0, Hash256::zero(), Vec::new(), 0)
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn prev_hash(&self) -> Hash256 {
        self.prev_hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Calculates the SHA-256 hash of the block
    pub fn digest(&self) -> Hash256 {
        Hash256::of(&self.canonical_bytes())
    }
}

impl CanonicalEncode for Block {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block() {
        let transactions = vec![
            Transaction::new_reward("recipient1", 10.0),
            Transaction::new_reward("recipient2", 20.0),
        ];

        let block = Block::new(100, Hash256::of(b"previous"), transactions.clone(), 42);

        assert_eq!(block.nonce(), 100);
        assert_eq!(block.prev_hash(), Hash256::of(b"previous"));
        assert_eq!(block.timestamp(), 42);
        assert_eq!(block.transactions(), transactions.as_slice());
    }

    #[test]
    fn test_empty_block_encoding() {
        let expected = format!(
            r#"{{"nonce":0,"prev_hash":"{}","timestamp":0,"transactions":[]}}"#,
            "0".repeat(64)
        );
        assert_eq!(Block::empty().to_canonical_json(), expected);
        assert_eq!(Block::empty().digest(), Hash256::of(expected.as_bytes()));
    }

    #[test]
    fn test_canonical_encoding_includes_transactions_in_order() {
        let block = Block::new(
            7,
            Hash256::zero(),
            vec![
                Transaction::new("A", "B", 2.0),
                Transaction::new_reward("A", 1.0),
            ],
            -5,
        );

        let expected = format!(
            concat!(
                r#"{{"nonce":7,"prev_hash":"{}","timestamp":-5,"transactions":["#,
                r#"{{"sender":"A","receiver":"B","value":2}},"#,
                r#"{{"sender":"CHAIN","receiver":"A","value":1}}]}}"#
            ),
            "0".repeat(64)
        );
        assert_eq!(block.to_canonical_json(), expected);
    }

    #[test]
    fn test_canonical_encoding_is_valid_json() {
        let block = Block::new(3, Hash256::of(b"x"), vec![Transaction::new("A", "B", 0.5)], 9);
        let value: serde_json::Value = serde_json::from_slice(&block.canonical_bytes()).unwrap();

        assert_eq!(value["nonce"], 3);
        assert_eq!(value["prev_hash"], Hash256::of(b"x").to_hex());
        assert_eq!(value["timestamp"], 9);
        assert_eq!(value["transactions"][0]["value"], 0.5);
    }

    #[test]
    fn test_digest_depends_on_timestamp_and_order() {
        let a = Transaction::new("A", "B", 1.0);
        let b = Transaction::new("B", "C", 1.0);
        let block = Block::new(1, Hash256::zero(), vec![a.clone(), b.clone()], 10);

        let hash = block.digest();
        assert_eq!(hash.to_hex().len(), 64);
        assert_eq!(hash, block.clone().digest());
        assert_ne!(hash, Block::new(1, Hash256::zero(), vec![a.clone(), b.clone()], 11).digest());
        assert_ne!(hash, Block::new(1, Hash256::zero(), vec![b, a], 10).digest());
    }
}
