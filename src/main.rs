//! Homegate - home sharing and access control

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use homegate::{
    config::Args,
    db::{AccessStore, MemoryAccessStore, MongoAccessStore, MongoClient},
    logging,
    server,
    services::LogNotifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Homegate - home sharing and access");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Invitation TTL: {}h", args.invitation_ttl_hours);
    info!("App URL: {}", args.app_url);
    if !args.dev_mode {
        info!("MongoDB: {} (db {})", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    // Dev mode never touches MongoDB
    let (store, backend): (Arc<dyn AccessStore>, &'static str) = if args.dev_mode {
        (Arc::new(MemoryAccessStore::new()), "memory")
    } else {
        let client = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                info!("MongoDB connected successfully");
                client
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };
        (Arc::new(MongoAccessStore::new(client).await?), "mongodb")
    };

    let notifier = Arc::new(LogNotifier::new(&args.app_url).with_links(args.dev_mode));
    let state = Arc::new(server::AppState::new(args, store, notifier, backend)?);

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
