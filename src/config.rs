use clap::Parser;

use crate::blockchain::LedgerConfig;

/// Command line configuration for the ledger node
#[derive(Debug, Clone, Parser)]
#[command(name = "pow_ledger", version, about = "Single-node proof-of-work ledger")]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "LEDGER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port number for the HTTP server
    #[arg(long, env = "LEDGER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Leading zero hex characters required of a block hash
    #[arg(
        long,
        env = "LEDGER_DIFFICULTY",
        default_value_t = crate::blockchain::pow::DEFAULT_DIFFICULTY,
        value_parser = parse_difficulty
    )]
    pub difficulty: usize,

    /// Amount paid to the miner for each block
    #[arg(long, env = "LEDGER_MINING_REWARD", default_value_t = 1.0)]
    pub mining_reward: f32,

    /// Reject transfers larger than the sender's committed balance
    #[arg(long, env = "LEDGER_ENFORCE_BALANCE_CHECK")]
    pub enforce_balance_check: bool,

    /// Hex encoded private key of the miner; a fresh one is generated if absent
    #[arg(long, env = "LEDGER_MINER_KEY")]
    pub miner_key: Option<String>,
}

/// Highest difficulty accepted from the command line
const MAX_DIFFICULTY: usize = 8;

fn parse_difficulty(value: &str) -> Result<usize, String> {
    let difficulty: usize = value
        .parse()
        .map_err(|e| format!("invalid difficulty '{}': {}", value, e))?;
    if difficulty > MAX_DIFFICULTY {
        return Err(format!("difficulty must be at most {}", MAX_DIFFICULTY));
    }
    Ok(difficulty)
}

impl Cli {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            mining_reward: self.mining_reward,
            enforce_balance_check: self.enforce_balance_check,
        }
    }
}
