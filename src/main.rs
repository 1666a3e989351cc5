use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pow_ledger::api;
use pow_ledger::blockchain::{self, Ledger, Wallet};
use pow_ledger::config::Cli;

// Load the miner identity and build a ledger with its genesis block
fn initialize_ledger(cli: &Cli) -> anyhow::Result<Ledger> {
    let wallet = match &cli.miner_key {
        Some(key) => Wallet::from_private_key(key).context("Failed to load miner key")?,
        None => {
            let wallet = Wallet::new();
            info!("Generated miner wallet, private key: {}", wallet.private_key());
            wallet
        }
    };
    info!("Miner address: {}", wallet.address());

    Ok(Ledger::initialized(wallet.address(), cli.port, cli.ledger_config()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::mine_block,
        api::handlers::get_amount,
        api::handlers::validate_chain,
        api::handlers::create_wallet,
        api::handlers::wallet_transaction
    ),
    components(
        schemas(
            blockchain::Transaction,
            blockchain::PublicKey,
            blockchain::DigitalSignature,
            api::handlers::PoolResponse,
            api::handlers::TransactionRequest,
            api::handlers::MineResponse,
            api::handlers::AmountResponse,
            api::handlers::WalletResponse,
            api::handlers::WalletTransactionRequest
        )
    ),
    tags(
        (name = "ledger", description = "Ledger API endpoints")
    ),
    info(
        title = "Ledger API",
        version = "1.0.0",
        description = "A single-node proof-of-work ledger API",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();

    let ledger = web::Data::new(initialize_ledger(&cli)?);

    info!("Starting HTTP server at http://{}:{}", cli.host, cli.port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((cli.host.as_str(), cli.port))
    .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?
    .run()
    .await
    .context("HTTP server failed")
}
