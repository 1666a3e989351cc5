use sha2::{Digest, Sha256};

use super::block::Block;
use super::encoding::{CanonicalEncode, Hash256};
use super::transaction::Transaction;

/// Every canonical block encoding starts with this, followed by the nonce
const NONCE_KEY: &[u8] = b"{\"nonce\":";

/// Leading zero hex characters required of a mined block's digest
pub const DEFAULT_DIFFICULTY: usize = 3;

/// A block candidate with everything fixed except the nonce.
///
/// The block is encoded once with nonce 0; the bytes following the nonce
/// are kept and hashed again for every guess.
struct Candidate {
    tail: Vec<u8>,
}

impl Candidate {
    fn new(prev_hash: &Hash256, transactions: &[Transaction], timestamp: i64) -> Self {
        let template = Block::new(0, *prev_hash, transactions.to_vec(), timestamp).canonical_bytes();
        let tail = template[NONCE_KEY.len() + 1..].to_vec();
        Candidate { tail }
    }

    fn digest(&self, nonce: u64) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(NONCE_KEY);
        hasher.update(nonce.to_string().as_bytes());
        hasher.update(&self.tail);
        Hash256(hasher.finalize().into())
    }

    fn satisfies(&self, nonce: u64, difficulty: usize) -> bool {
        self.digest(nonce).leading_zero_nibbles() >= difficulty
    }
}

/// Checks whether `nonce` makes the described block meet `difficulty`.
///
/// Pure: anyone holding the same inputs gets the same answer.
pub fn is_valid(
    nonce: u64,
    prev_hash: &Hash256,
    transactions: &[Transaction],
    timestamp: i64,
    difficulty: usize,
) -> bool {
    Candidate::new(prev_hash, transactions, timestamp).satisfies(nonce, difficulty)
}

/// Finds the smallest nonce for which [`is_valid`] holds.
///
/// The search is unbounded. A difficulty above 64 can never be met and
/// will not return.
pub fn search(prev_hash: &Hash256, transactions: &[Transaction], timestamp: i64, difficulty: usize) -> u64 {
    let candidate = Candidate::new(prev_hash, transactions, timestamp);
    let mut nonce = 0;

    while !candidate.satisfies(nonce, difficulty) {
        nonce += 1;
    }

    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transactions() -> Vec<Transaction> {
        vec![
            Transaction::new("A", "B", 2.0),
            Transaction::new_reward("A", 1.0),
        ]
    }

    #[test]
    fn test_candidate_digest_matches_block_digest() {
        let prev_hash = Hash256::of(b"prev");
        let transactions = sample_transactions();
        let candidate = Candidate::new(&prev_hash, &transactions, 1234);

        for nonce in [0, 1, 99, u64::MAX] {
            let block = Block::new(nonce, prev_hash, transactions.clone(), 1234);
            assert_eq!(candidate.digest(nonce), block.digest());
        }
    }

    #[test]
    fn test_template_starts_with_nonce_key() {
        let template = Block::new(0, Hash256::zero(), sample_transactions(), 1).canonical_bytes();
        assert!(template.starts_with(NONCE_KEY));
        assert_eq!(template[NONCE_KEY.len()], b'0');
        assert_eq!(template[NONCE_KEY.len() + 1], b',');
    }

    #[test]
    fn test_zero_difficulty_returns_zero() {
        let transactions = sample_transactions();
        assert_eq!(search(&Hash256::zero(), &transactions, 0, 0), 0);
        assert_eq!(search(&Hash256::of(b"anything"), &[], 77, 0), 0);
        assert!(is_valid(12345, &Hash256::zero(), &transactions, 0, 0));
    }

    #[test]
    fn test_search_finds_smallest_valid_nonce() {
        let prev_hash = Hash256::of(b"prev");
        let transactions = sample_transactions();
        let timestamp = 1_700_000_000_000_000_000;

        let nonce = search(&prev_hash, &transactions, timestamp, 2);

        assert!(is_valid(nonce, &prev_hash, &transactions, timestamp, 2));
        for smaller in 0..nonce {
            assert!(!is_valid(smaller, &prev_hash, &transactions, timestamp, 2));
        }
    }

    #[test]
    fn test_default_difficulty_block_has_zero_prefix() {
        let prev_hash = Block::empty().digest();
        let transactions = sample_transactions();

        let nonce = search(&prev_hash, &transactions, 42, DEFAULT_DIFFICULTY);
        let block = Block::new(nonce, prev_hash, transactions.clone(), 42);

        assert!(block.digest().to_hex().starts_with("000"));
        assert!(is_valid(nonce, &prev_hash, &transactions, 42, DEFAULT_DIFFICULTY));
    }

    #[test]
    fn test_is_valid_matches_hex_prefix() {
        let prev_hash = Hash256::of(b"prefix");
        let transactions = sample_transactions();

        for nonce in 0..200 {
            let hex = Block::new(nonce, prev_hash, transactions.clone(), 5).digest().to_hex();
            let zeros = hex.chars().take_while(|c| *c == '0').count();
            for difficulty in 0..=3 {
                assert_eq!(
                    is_valid(nonce, &prev_hash, &transactions, 5, difficulty),
                    zeros >= difficulty
                );
            }
        }
    }
}
