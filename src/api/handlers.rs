use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use utoipa::ToSchema;

use crate::blockchain::{
    crypto, CanonicalEncode, DigitalSignature, Ledger, PublicKey, Transaction, Wallet, MINING_SENDER,
};

/// Data structure for the ledger state
pub type LedgerData = web::Data<Ledger>;

/// Embeds a value's canonical encoding in a serde response unchanged
fn raw_json<T: CanonicalEncode>(value: &T) -> Result<Box<RawValue>, serde_json::Error> {
    RawValue::from_string(value.to_canonical_json())
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> HttpResponse {
    error!("{}: {}", context, err);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": format!("{}: {}", context, err)
    }))
}

/// Get the full blockchain
///
/// Returns every committed block in its canonical encoding
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully, shaped as {\"chains\": [block, ...]}")
    )
)]
pub async fn get_chain(ledger: LedgerData) -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(ledger.to_canonical_json())
}

/// Response for the pending transactions endpoint
#[derive(Serialize, ToSchema)]
pub struct PoolResponse {
    /// The pending transactions
    #[schema(value_type = Vec<Object>)]
    pub transactions: Vec<Box<RawValue>>,

    /// Number of pending transactions
    pub length: usize,
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = PoolResponse)
    )
)]
pub async fn get_pending_transactions(ledger: LedgerData) -> impl Responder {
    let pool = ledger.snapshot_pool();

    let encoded: Result<Vec<_>, _> = pool.iter().map(|transaction| raw_json(transaction)).collect();
    let transactions = match encoded {
        Ok(transactions) => transactions,
        Err(err) => return internal_error("Failed to encode transactions", err),
    };

    HttpResponse::Ok().json(PoolResponse {
        length: transactions.len(),
        transactions,
    })
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender_address: String,

    /// The receiver's address
    pub receiver_address: String,

    /// The amount to transfer
    pub value: f32,

    /// The sender's public key (hex encoded)
    pub sender_public_key: PublicKey,

    /// Signature over the transaction digest (hex encoded)
    pub signature: DigitalSignature,
}

/// Submit a signed transaction
///
/// Adds the transaction to the pool if its signature verifies
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction admitted to the pool"),
        (status = 400, description = "Transaction rejected or sender reserved")
    )
)]
pub async fn new_transaction(
    ledger: LedgerData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    // Rewards are only ever created by mining
    if transaction_req.sender_address == MINING_SENDER {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Reserved sender address"
        }));
    }

    let admitted = ledger.submit_transaction(
        &transaction_req.sender_address,
        &transaction_req.receiver_address,
        transaction_req.value,
        Some(&transaction_req.sender_public_key),
        Some(&transaction_req.signature),
    );

    if admitted {
        HttpResponse::Created().json(serde_json::json!({ "message": "success" }))
    } else {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Transaction rejected"
        }))
    }
}

/// Response for the mine endpoint
#[derive(Serialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    #[schema(value_type = Object)]
    pub block: Box<RawValue>,

    /// Hash of the newly mined block
    #[schema(value_type = String)]
    pub hash: crate::blockchain::Hash256,
}

/// Mine a new block
///
/// Creates a new block with all pending transactions plus the mining reward
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 400, description = "Ledger not initialized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(ledger: LedgerData) -> impl Responder {
    // Proof of work is CPU bound; keep it off the async workers
    let worker_ledger = ledger.clone();
    let result = match web::block(move || worker_ledger.mine()).await {
        Ok(result) => result,
        Err(err) => return internal_error("Mining worker failed", err),
    };

    let block = match result {
        Ok(block) => block,
        Err(err) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Failed to mine block: {}", err)
            }))
        }
    };

    match raw_json(&block) {
        Ok(raw) => HttpResponse::Ok().json(MineResponse {
            message: "New Block Mined".to_string(),
            block: raw,
            hash: block.digest(),
        }),
        Err(err) => internal_error("Failed to encode block", err),
    }
}

/// Response for the amount endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AmountResponse {
    /// The queried address
    pub address: String,

    /// Net committed amount for the address
    pub amount: f32,
}

/// Get the balance of an address
///
/// Sums every committed transfer to and from the address
#[utoipa::path(
    get,
    path = "/api/v1/amount/{address}",
    params(
        ("address" = String, Path, description = "Address to query")
    ),
    responses(
        (status = 200, description = "Amount retrieved successfully", body = AmountResponse)
    )
)]
pub async fn get_amount(ledger: LedgerData, address: web::Path<String>) -> impl Responder {
    let address = address.into_inner();
    let amount = ledger.balance_of(&address);

    HttpResponse::Ok().json(AmountResponse { address, amount })
}

/// Check if the blockchain is valid
///
/// Validates the links and proofs of the entire chain
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(ledger: LedgerData) -> impl Responder {
    HttpResponse::Ok().json(ledger.is_valid())
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's address
    pub address: String,

    /// The wallet's public key (hex encoded)
    pub public_key: String,

    /// The wallet's private key (hex encoded)
    pub private_key: String,
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair
///
/// The private key must be stored by your own
#[utoipa::path(
    post,
    path = "/api/v1/wallet/new",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();

    HttpResponse::Created().json(WalletResponse {
        address: wallet.address().to_string(),
        public_key: wallet.public_key().0,
        private_key: wallet.private_key(),
    })
}

/// Request for the wallet transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionRequest {
    /// The sender's private key (hex encoded)
    pub sender_private_key: String,

    /// The sender's address
    pub sender_address: String,

    /// The receiver's address
    pub receiver_address: String,

    /// The amount to transfer
    pub value: f32,
}

/// Sign and submit a transaction
///
/// Signs the transaction with the supplied private key and submits it
#[utoipa::path(
    post,
    path = "/api/v1/wallet/transaction",
    request_body = WalletTransactionRequest,
    responses(
        (status = 201, description = "Transaction admitted to the pool"),
        (status = 400, description = "Invalid key or transaction rejected")
    )
)]
pub async fn wallet_transaction(
    ledger: LedgerData,
    transaction_req: web::Json<WalletTransactionRequest>,
) -> impl Responder {
    let wallet = match Wallet::from_private_key(&transaction_req.sender_private_key) {
        Ok(wallet) => wallet,
        Err(err) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Invalid private key: {}", err)
            }));
        }
    };

    // Check if the wallet address matches the sender address
    if wallet.address() != transaction_req.sender_address {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Private key does not match sender address"
        }));
    }

    let transaction = Transaction::new(
        transaction_req.sender_address.as_str(),
        transaction_req.receiver_address.as_str(),
        transaction_req.value,
    );

    let signature = match crypto::sign(&transaction, &transaction_req.sender_private_key) {
        Ok(signature) => signature,
        Err(err) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Failed to sign transaction: {}", err)
            }));
        }
    };

    let admitted = ledger.submit_transaction(
        transaction.sender(),
        transaction.receiver(),
        transaction.value(),
        Some(&wallet.public_key()),
        Some(&signature),
    );

    if admitted {
        HttpResponse::Created().json(serde_json::json!({
            "message": "success",
            "signature": signature
        }))
    } else {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Transaction rejected"
        }))
    }
}
