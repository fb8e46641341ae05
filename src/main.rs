mod backup;
mod config;
mod crypto;
mod resolver;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use resolver::Resolver;
use store::mongo::MongoStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "metadata_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "metadata_server=info".parse().unwrap()),
            )
            .init();
    }

    let store_config = config.store.clone().unwrap_or_default();

    // Handle --backup: single-shot dump-and-mail, then exit. Failures
    // propagate to the operator as a non-zero exit.
    if config.backup {
        let smtp = config
            .smtp
            .as_ref()
            .ok_or("--backup requires an [smtp] section in the config file")?;
        backup::run(&store_config, smtp).await?;
        return Ok(());
    }

    tracing::info!("metadata-server v{} starting", env!("CARGO_PKG_VERSION"));

    // Build application state. The store holds only connection parameters;
    // each request opens and drops its own connection.
    let app_state = state::AppState {
        resolver: Arc::new(Resolver::new(Arc::new(MongoStore::new(store_config)))),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve. ConnectInfo supplies the peer address the resolver
    // checks whitelists against.
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
