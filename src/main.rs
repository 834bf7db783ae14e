//! Sealkeeper - operator CLI for the custody core

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sealkeeper::{
    config::{Args, Command},
    custodial_keys::{CustodialKeyService, MasterKey, VerificationOutcome},
    db::{redact_credentials, MongoClient},
    store::MongoStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sealkeeper={},info", log_level).into());
    if args.json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let master_key = match MasterKey::resolve(args.master_key.as_deref()) {
        Ok(key) => key,
        Err(e) => {
            error!("Master key error: {}", e);
            std::process::exit(1);
        }
    };
    info!(encoding = ?master_key.encoding(), stretched = master_key.is_stretched(), "Master key resolved");

    info!(
        uri = %redact_credentials(&args.mongodb_uri),
        database = %args.mongodb_db,
        "Connecting custody store"
    );
    let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    let store = Arc::new(MongoStore::new(&mongo).await?);
    info!(database = mongo.db_name(), "Custody store ready");

    let service = CustodialKeyService::new(store, master_key, args.custody_config())?;

    match args.command {
        Command::Generate { principal } => {
            print_json(&service.generate_and_seal_key_pair(&principal).await?)?;
        }
        Command::Sign {
            principal,
            text,
            store_text,
        } => {
            print_json(&service.sign(&principal, &text, store_text).await?)?;
        }
        Command::VerifyId {
            signature_id,
            requester,
        } => {
            let outcome = service.verify_by_id(&signature_id, &requester).await?;
            print_json(&VerificationOutcome::from(outcome))?;
        }
        Command::VerifyPayload {
            text,
            signature_b64,
            requester,
        } => {
            let outcome = service
                .verify_by_payload(&text, &signature_b64, &requester)
                .await?;
            print_json(&VerificationOutcome::from(outcome))?;
        }
        Command::Reveal { principal, token } => {
            let private_key_pem = service
                .reveal_private_key(&principal, token.as_deref())
                .await?;
            print_json(&serde_json::json!({
                "principalId": principal,
                "privateKeyPem": private_key_pem.as_str(),
            }))?;
        }
        Command::PublicKey { principal } => {
            print_json(&service.fetch_public_key_info(&principal).await?)?;
        }
    }

    let stats = service.ledger_stats();
    if stats.failed > 0 {
        error!(failed = stats.failed, "Verification ledger writes failed");
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
