use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{debug, info, warn};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use super::block::Block;
use super::crypto::{self, DigitalSignature, PublicKey};
use super::encoding::CanonicalEncode;
use super::pow;
use super::transaction::Transaction;

/// Errors that can occur during ledger operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Chain is empty: the ledger has not been initialized")]
    EmptyChain,

    #[error("Ledger is already initialized")]
    AlreadyInitialized,
}

/// Tunables for a ledger instance
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Mining difficulty (number of leading zeros required in hash)
    pub difficulty: usize,

    /// Mining reward
    pub mining_reward: f32,

    /// Reject transfers larger than the sender's committed balance
    pub enforce_balance_check: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            difficulty: pow::DEFAULT_DIFFICULTY,
            mining_reward: 1.0,
            enforce_balance_check: false,
        }
    }
}

/// The chain of committed blocks plus the pool of pending transactions
///
/// Lock order is pool then chain. `mine` keeps the pool locked from the
/// moment it takes its snapshot until the block is committed and the pool
/// cleared, so a concurrent submission waits for mining to finish instead of
/// being dropped by the clear.
#[derive(Debug)]
pub struct Ledger {
    /// The chain of blocks
    chain: Mutex<Vec<Block>>,

    /// Pending transactions to be included in the next block
    pool: Mutex<Vec<Transaction>>,

    /// Address credited with mining rewards
    address: String,

    /// Port the hosting server listens on
    port: u16,

    config: LedgerConfig,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_nanos() -> i64 {
    // Only out of range after the year 2262
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

impl Ledger {
    /// Creates an empty ledger; call [`Ledger::initialize`] before use
    pub fn new(address: impl Into<String>, port: u16, config: LedgerConfig) -> Self {
        Ledger {
            chain: Mutex::new(Vec::new()),
            pool: Mutex::new(Vec::new()),
            address: address.into(),
            port,
            config,
        }
    }

    /// Creates a ledger and commits its genesis block
    pub fn initialized(address: impl Into<String>, port: u16, config: LedgerConfig) -> Self {
        let ledger = Ledger::new(address, port, config);
        ledger.commit_genesis(&mut lock(&ledger.chain));
        ledger
    }

    /// Commits the genesis block
    ///
    /// Fails if the chain already holds a block. Mining rewards go to the
    /// address given to [`Ledger::new`].
    pub fn initialize(&self) -> Result<Block, LedgerError> {
        let mut chain = lock(&self.chain);
        if !chain.is_empty() {
            return Err(LedgerError::AlreadyInitialized);
        }
        Ok(self.commit_genesis(&mut chain))
    }

    fn commit_genesis(&self, chain: &mut Vec<Block>) -> Block {
        let genesis = Block::new(0, Block::empty().digest(), Vec::new(), now_nanos());
        info!("Created genesis block {} for {}", genesis.digest(), self.address);
        chain.push(genesis.clone());
        genesis
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Result<Block, LedgerError> {
        lock(&self.chain).last().cloned().ok_or(LedgerError::EmptyChain)
    }

    /// Gets the entire blockchain
    pub fn chain(&self) -> Vec<Block> {
        lock(&self.chain).clone()
    }

    /// Number of committed blocks
    pub fn len(&self) -> usize {
        lock(&self.chain).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.chain).is_empty()
    }

    /// Copies all pending transactions
    pub fn snapshot_pool(&self) -> Vec<Transaction> {
        lock(&self.pool).clone()
    }

    /// Admits a transaction into the pool
    ///
    /// The reserved mining sender is always refused; rewards enter a block
    /// only through [`Ledger::mine`]. Anything else needs a signature over
    /// the transaction digest that verifies against `sender_public_key`.
    ///
    /// # Returns
    ///
    /// true if the transaction entered the pool, false otherwise
    pub fn submit_transaction(
        &self,
        sender: &str,
        receiver: &str,
        value: f32,
        sender_public_key: Option<&PublicKey>,
        signature: Option<&DigitalSignature>,
    ) -> bool {
        let transaction = Transaction::new(sender, receiver, value);

        if transaction.is_reward() {
            warn!("Rejected transaction to {}: reserved sender {}", receiver, sender);
            return false;
        }

        let (Some(public_key), Some(signature)) = (sender_public_key, signature) else {
            warn!("Rejected transaction from {}: missing signature", sender);
            return false;
        };

        if !crypto::verify(&transaction, public_key, signature) {
            warn!("Rejected transaction from {}: invalid signature", sender);
            return false;
        }

        if self.config.enforce_balance_check {
            let available = self.balance_of(sender);
            if available < value {
                warn!(
                    "Rejected transaction from {}: insufficient funds (required {}, available {})",
                    sender, value, available
                );
                return false;
            }
        }

        debug!("Admitted transaction {} -> {} ({})", sender, receiver, value);
        lock(&self.pool).push(transaction);
        true
    }

    /// Mines a new block with the pending transactions
    ///
    /// Adds the mining reward, runs proof of work over a snapshot of the
    /// pool with a timestamp fixed at call time, commits the block and
    /// clears the pool.
    ///
    /// # Returns
    ///
    /// Result with the newly mined block
    pub fn mine(&self) -> Result<Block, LedgerError> {
        let mut pool = lock(&self.pool);
        let prev_hash = self.last_block()?.digest();

        pool.push(Transaction::new_reward(self.address.as_str(), self.config.mining_reward));
        let transactions = pool.clone();
        let timestamp = now_nanos();

        let nonce = pow::search(&prev_hash, &transactions, timestamp, self.config.difficulty);
        let block = Block::new(nonce, prev_hash, transactions, timestamp);

        lock(&self.chain).push(block.clone());
        pool.clear();

        info!(
            "action=mining status=success nonce={} transactions={} hash={}",
            nonce,
            block.transactions().len(),
            block.digest()
        );

        Ok(block)
    }

    /// Sums every committed transfer to and from `address`
    pub fn balance_of(&self, address: &str) -> f32 {
        let chain = lock(&self.chain);
        let mut total = 0.0;

        for block in chain.iter() {
            for transaction in block.transactions() {
                if transaction.receiver() == address {
                    total += transaction.value();
                }
                if transaction.sender() == address {
                    total -= transaction.value();
                }
            }
        }

        total
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if every block links to its predecessor and every mined block
    /// carries a valid proof of work, false otherwise
    pub fn is_valid(&self) -> bool {
        let chain = lock(&self.chain);

        let Some(genesis) = chain.first() else {
            return false;
        };
        if genesis.prev_hash() != Block::empty().digest() {
            return false;
        }

        for pair in chain.windows(2) {
            let (previous_block, current_block) = (&pair[0], &pair[1]);

            // Check if the previous hash is correct
            if current_block.prev_hash() != previous_block.digest() {
                return false;
            }

            // Check the proof with the block's own timestamp
            if !pow::is_valid(
                current_block.nonce(),
                &current_block.prev_hash(),
                current_block.transactions(),
                current_block.timestamp(),
                self.config.difficulty,
            ) {
                return false;
            }
        }

        true
    }
}

/// Serializes as `{"chains":[block, ...]}`
impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let chain = lock(&self.chain);
        let mut state = serializer.serialize_struct("Ledger", 1)?;
        state.serialize_field("chains", &*chain)?;
        state.end()
    }
}

impl CanonicalEncode for Ledger {}
